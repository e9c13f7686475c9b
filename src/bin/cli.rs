//! LeadShark CLI
//!
//! Enriches prospect rows in a Google Sheet or a local CSV file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use leadshark::{
    cache::{CacheCategory, FileCache},
    error::{AppError, Result},
    models::{Config, RowRange, RunOptions},
    pipeline::Enricher,
    services::{HandlerRegistry, LookupService},
    storage::{GoogleSheet, LocalSheet, SheetStore},
    utils::{http::HttpClient, log as banner},
};

/// LeadShark - spreadsheet prospect enrichment
#[derive(Parser, Debug)]
#[command(
    name = "leadshark",
    version,
    about = "Enrich prospect rows with link intelligence and lead scores"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "leadshark.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Where the rows live.
#[derive(Args, Debug)]
struct SheetArgs {
    /// Google spreadsheet ID
    #[arg(long, conflicts_with = "csv")]
    sheet_id: Option<String>,

    /// Local CSV file instead of a Google Sheet
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Worksheet (tab) name; defaults to the configured one
    #[arg(long)]
    worksheet: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enrich rows and write results back
    Enrich {
        #[command(flatten)]
        sheet: SheetArgs,

        /// Row range such as 2-500 (row 1 holds headers)
        #[arg(long)]
        rows: Option<RowRange>,

        /// Compute everything but write nothing
        #[arg(long)]
        dry_run: bool,

        /// Only rows without a combined report
        #[arg(long)]
        only_new: bool,

        /// Only process URLs on these domains (comma separated)
        #[arg(long, value_delimiter = ',')]
        force_domains: Vec<String>,

        /// Number of per-link summary columns
        #[arg(long)]
        max_link_summaries: Option<usize>,

        /// Bypass the on-disk cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Validate configuration
    Validate,

    /// Show spreadsheet metadata
    Info {
        #[command(flatten)]
        sheet: SheetArgs,
    },

    /// Inspect or prune the on-disk cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Files and bytes per category
    Stats,
    /// Delete cached entries
    Clear {
        /// handlers, api or robots; all when omitted
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete expired and unreadable entries
    Cleanup,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_config(path: &PathBuf) -> Config {
    let mut config = Config::load_or_default(path);
    config.apply_env();
    config
}

fn open_store(config: &Config, args: &SheetArgs, http: HttpClient) -> Result<Arc<dyn SheetStore>> {
    let worksheet = args
        .worksheet
        .clone()
        .unwrap_or_else(|| config.sheet.worksheet.clone());

    match (&args.csv, &args.sheet_id) {
        (Some(path), _) => Ok(Arc::new(LocalSheet::new(path))),
        (None, Some(id)) => Ok(Arc::new(GoogleSheet::new(http, &config.google, id, worksheet)?)),
        (None, None) => Err(AppError::config("Pass --sheet-id or --csv")),
    }
}

fn open_cache(config: &Config) -> FileCache {
    FileCache::new(&config.cache.dir, Duration::from_secs(config.cache.ttl_secs))
}

fn print_config_summary(config: &Config, cache_enabled: bool) {
    let apis = config.apis.available();
    banner::summary(
        "Configuration",
        &[
            (
                "APIs",
                if apis.is_empty() {
                    "none".to_string()
                } else {
                    apis.join(", ")
                },
            ),
            (
                "Rate limit",
                format!("{} req/s per domain", config.http.per_domain_rps),
            ),
            (
                "Cache",
                if cache_enabled {
                    config.cache.dir.display().to_string()
                } else {
                    "disabled".to_string()
                },
            ),
            ("Namespace", config.sheet.namespace.clone()),
            ("Lookups", config.lookups.enabled.to_string()),
        ],
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(&cli.config);

    match cli.command {
        Command::Enrich {
            sheet,
            rows,
            dry_run,
            only_new,
            force_domains,
            max_link_summaries,
            no_cache,
        } => {
            if let Some(n) = max_link_summaries {
                config.sheet.max_link_summaries = n;
            }
            config.validate()?;
            let config = Arc::new(config);

            let cache_enabled = config.cache.enabled && !no_cache;
            print_config_summary(&config, cache_enabled);

            let http = HttpClient::new(&config.http)?;
            let store = open_store(&config, &sheet, http.clone())?;
            let cache = cache_enabled.then(|| Arc::new(open_cache(&config)));
            let registry = HandlerRegistry::from_config(&config, http.clone(), cache.clone());

            let enricher = Enricher::new(Arc::clone(&config), store, registry);
            let lookups =
                LookupService::new(http, &config.lookups, config.apis.github_token.clone())
                    .with_cache(cache)
                    .with_limiter(enricher.limiter());
            let enricher = enricher.with_lookups(Arc::new(lookups));
            let options = RunOptions {
                rows,
                dry_run,
                only_new,
                force_domains,
            };
            let stats = enricher.process_sheet(&options).await?;
            log::info!(
                "Processed {} rows ({} successful)",
                stats.total_processed,
                stats.successful
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            print_config_summary(&config, config.cache.enabled);
            log::info!("All validations passed!");
        }

        Command::Info { sheet } => {
            let http = HttpClient::new(&config.http)?;
            let store = open_store(&config, &sheet, http)?;
            let info = store.info().await?;
            banner::header(&info.title);
            for ws in &info.worksheets {
                banner::sub_item(&format!("{}: {} rows x {} columns", ws.title, ws.rows, ws.cols));
            }
        }

        Command::Cache { action } => {
            let cache = open_cache(&config);
            match action {
                CacheAction::Stats => {
                    let stats = cache.stats().await?;
                    let mut items: Vec<(&str, String)> = stats
                        .categories
                        .iter()
                        .map(|(cat, s)| (cat.as_str(), format!("{} files, {} bytes", s.files, s.bytes)))
                        .collect();
                    items.push((
                        "total",
                        format!("{} files, {} bytes", stats.total_files, stats.total_bytes),
                    ));
                    banner::summary(&format!("Cache at {}", cache.root().display()), &items);
                }
                CacheAction::Clear { category } => {
                    let category = category
                        .map(|name| {
                            CacheCategory::parse(&name).ok_or_else(|| {
                                AppError::validation(format!("Unknown cache category '{}'", name))
                            })
                        })
                        .transpose()?;
                    let removed = cache.clear(category).await?;
                    log::info!("Removed {} cache entries", removed);
                }
                CacheAction::Cleanup => {
                    let removed = cache.cleanup_expired().await?;
                    log::info!("Removed {} expired cache entries", removed);
                }
            }
        }
    }

    Ok(())
}
