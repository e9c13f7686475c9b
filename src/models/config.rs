//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Slowest accepted per-host request rate (one request every 1000 s).
pub const MIN_PER_DOMAIN_RPS: f64 = 0.001;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client and politeness settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Spreadsheet layout and write-back settings
    #[serde(default)]
    pub sheet: SheetConfig,

    /// On-disk response cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Credentials for platform APIs
    #[serde(default)]
    pub apis: ApiConfig,

    /// Free third-party contact lookups
    #[serde(default)]
    pub lookups: LookupConfig,

    /// Google Sheets backend
    #[serde(default)]
    pub google: GoogleConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        if !path.as_ref().exists() {
            log::debug!("No config file at {:?}, using defaults", path.as_ref());
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply overrides from process environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("HEADER_NAMESPACE") {
            self.sheet.namespace = v;
        }
        if let Some(v) = get("WORKSHEET_NAME") {
            self.sheet.worksheet = v;
        }
        if let Some(v) = get("USER_AGENT") {
            self.http.user_agent = v;
        }
        if let Some(v) = get("DRY_RUN") {
            self.sheet.dry_run = parse_bool(&v);
        }
        if let Some(v) = get("CACHE_DIR") {
            self.cache.dir = PathBuf::from(v);
        }

        override_parsed(&get, "PER_DOMAIN_RPS", &mut self.http.per_domain_rps);
        override_parsed(&get, "TIMEOUT_SECONDS", &mut self.http.timeout_secs);
        override_parsed(&get, "MAX_CELL_CHARS", &mut self.sheet.max_cell_chars);
        override_parsed(&get, "MAX_COMBINED_CHARS", &mut self.sheet.max_combined_chars);
        override_parsed(&get, "MAX_LINK_SUMMARIES", &mut self.sheet.max_link_summaries);
        override_parsed(&get, "CACHE_TTL_SECONDS", &mut self.cache.ttl_secs);

        if let Some(v) = get("TWITTER_BEARER") {
            self.apis.twitter_bearer = Some(v);
        }
        if let Some(v) = get("YOUTUBE_API_KEY") {
            self.apis.youtube_api_key = Some(v);
        }
        if let Some(v) = get("GITHUB_TOKEN") {
            self.apis.github_token = Some(v);
        }
        if let Some(v) = get("GOOGLE_ACCESS_TOKEN") {
            self.google.access_token = Some(v);
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if !(MIN_PER_DOMAIN_RPS..f64::INFINITY).contains(&self.http.per_domain_rps) {
            return Err(AppError::validation(format!(
                "http.per_domain_rps must be a finite value >= {}",
                MIN_PER_DOMAIN_RPS
            )));
        }
        if self.http.max_concurrent == 0 {
            return Err(AppError::validation("http.max_concurrent must be > 0"));
        }
        if self.sheet.namespace.trim().is_empty() {
            return Err(AppError::validation("sheet.namespace is empty"));
        }
        if self.sheet.worksheet.trim().is_empty() {
            return Err(AppError::validation("sheet.worksheet is empty"));
        }
        if self.sheet.max_link_summaries == 0 {
            return Err(AppError::validation("sheet.max_link_summaries must be > 0"));
        }
        if self.sheet.max_cell_chars < 10 || self.sheet.max_combined_chars < 10 {
            return Err(AppError::validation(
                "sheet.max_cell_chars and sheet.max_combined_chars must be >= 10",
            ));
        }
        if self.sheet.max_columns <= self.sheet.column_safety_margin {
            return Err(AppError::validation(
                "sheet.max_columns must exceed sheet.column_safety_margin",
            ));
        }
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(AppError::validation("cache.ttl_secs must be > 0"));
        }
        Ok(())
    }

    /// Delay between two requests to the same host.
    ///
    /// Rates below [`MIN_PER_DOMAIN_RPS`] (or NaN) are treated as the minimum.
    pub fn per_domain_delay(&self) -> std::time::Duration {
        let rps = self.http.per_domain_rps.max(MIN_PER_DOMAIN_RPS);
        std::time::Duration::from_secs_f64(1.0 / rps)
    }
}

fn override_parsed<G, T>(get: &G, key: &str, slot: &mut T)
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(raw) = get(key) {
        match raw.parse::<T>() {
            Ok(v) => *slot = v,
            Err(_) => log::warn!("Ignoring {}={:?}: not a valid number", key, raw),
        }
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// HTTP client and politeness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Requests per second allowed against a single host
    #[serde(default = "defaults::per_domain_rps")]
    pub per_domain_rps: f64,

    /// Links of one row fetched at the same time
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Extra attempts for transient failures
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base backoff between attempts, multiplied by the attempt number
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            per_domain_rps: defaults::per_domain_rps(),
            max_concurrent: defaults::max_concurrent(),
            max_retries: defaults::max_retries(),
            retry_backoff_ms: defaults::retry_backoff(),
        }
    }
}

/// Spreadsheet layout and write-back settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Prefix shared by every managed header
    #[serde(default = "defaults::namespace")]
    pub namespace: String,

    /// Worksheet (tab) name
    #[serde(default = "defaults::worksheet")]
    pub worksheet: String,

    #[serde(default = "defaults::max_link_summaries")]
    pub max_link_summaries: usize,

    #[serde(default = "defaults::max_cell_chars")]
    pub max_cell_chars: usize,

    #[serde(default = "defaults::max_combined_chars")]
    pub max_combined_chars: usize,

    /// Pause between rows in milliseconds
    #[serde(default = "defaults::row_delay")]
    pub row_delay_ms: u64,

    /// Hard column limit of the backend
    #[serde(default = "defaults::max_columns")]
    pub max_columns: usize,

    /// Columns kept free below `max_columns`
    #[serde(default = "defaults::column_safety_margin")]
    pub column_safety_margin: usize,

    /// Also create ERROR and RUNTIME_MS columns
    #[serde(default = "defaults::enabled")]
    pub diagnostics_columns: bool,

    /// Compute everything but write nothing
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            namespace: defaults::namespace(),
            worksheet: defaults::worksheet(),
            max_link_summaries: defaults::max_link_summaries(),
            max_cell_chars: defaults::max_cell_chars(),
            max_combined_chars: defaults::max_combined_chars(),
            row_delay_ms: defaults::row_delay(),
            max_columns: defaults::max_columns(),
            column_safety_margin: defaults::column_safety_margin(),
            diagnostics_columns: defaults::enabled(),
            dry_run: false,
        }
    }
}

/// On-disk response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::cache_dir")]
    pub dir: PathBuf,

    /// Default time-to-live in seconds
    #[serde(default = "defaults::cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            dir: defaults::cache_dir(),
            ttl_secs: defaults::cache_ttl(),
        }
    }
}

/// Platform API credentials. Missing keys disable the matching handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub twitter_bearer: Option<String>,

    #[serde(default)]
    pub youtube_api_key: Option<String>,

    #[serde(default)]
    pub github_token: Option<String>,
}

impl ApiConfig {
    /// Names of platforms with credentials available.
    pub fn available(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.twitter_bearer.is_some() {
            out.push("Twitter");
        }
        if self.youtube_api_key.is_some() {
            out.push("YouTube");
        }
        if self.github_token.is_some() {
            out.push("GitHub");
        }
        out
    }
}

/// Contact lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Master switch for all lookups
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "defaults::enabled")]
    pub gender: bool,

    #[serde(default = "defaults::enabled")]
    pub email: bool,

    #[serde(default = "defaults::enabled")]
    pub github_search: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            gender: true,
            email: true,
            github_search: true,
        }
    }
}

/// Google Sheets REST backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// OAuth bearer token with the spreadsheets scope
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "defaults::sheets_endpoint")]
    pub endpoint: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            endpoint: defaults::sheets_endpoint(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn enabled() -> bool {
        true
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "ProspectResearchBot/1.0 (+contact@example.com)".into()
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn per_domain_rps() -> f64 {
        0.2
    }
    pub fn max_concurrent() -> usize {
        4
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn retry_backoff() -> u64 {
        1000
    }

    // Sheet defaults
    pub fn namespace() -> String {
        "ENRICH_".into()
    }
    pub fn worksheet() -> String {
        "Sheet1".into()
    }
    pub fn max_link_summaries() -> usize {
        5
    }
    pub fn max_cell_chars() -> usize {
        4000
    }
    pub fn max_combined_chars() -> usize {
        5000
    }
    pub fn row_delay() -> u64 {
        500
    }
    pub fn max_columns() -> usize {
        18278
    }
    pub fn column_safety_margin() -> usize {
        5
    }

    // Cache defaults
    pub fn cache_dir() -> PathBuf {
        PathBuf::from(".cache")
    }
    pub fn cache_ttl() -> u64 {
        86_400
    }

    pub fn sheets_endpoint() -> String {
        "https://sheets.googleapis.com/v4".into()
    }
}
