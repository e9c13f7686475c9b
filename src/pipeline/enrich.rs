// src/pipeline/enrich.rs

//! Sheet enrichment orchestrator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use futures::stream::{self, StreamExt};

use super::columns::{ColumnMap, ColumnPlan, ColumnSpec, ManagedColumn, plan_columns};
use super::rate_limit::DomainRateLimiter;
use super::report::{combined_report, format_summary};
use super::row::RowFields;
use super::scoring::LeadScorer;
use crate::error::{AppError, Result};
use crate::models::{Config, LinkResult, LinkStatus, RowStatus, RunOptions, RunStats};
use crate::services::{ContactLookup, HandlerRegistry};
use crate::storage::{CellUpdate, SheetStore, write_headers};
use crate::utils::log;
use crate::utils::text::truncate;
use crate::utils::url::{extract_urls_from_row, host_of};

/// What processing one row produced.
#[derive(Debug, Clone)]
pub struct RowOutcome {
    pub row_number: usize,
    pub status: RowStatus,
    /// Identity of the row when it was read
    pub row_key: String,
    pub results: Vec<LinkResult>,
    pub updates: Vec<CellUpdate>,
}

/// Drives a sheet through link discovery, handlers, scoring and write-back.
pub struct Enricher {
    config: Arc<Config>,
    store: Arc<dyn SheetStore>,
    registry: HandlerRegistry,
    lookups: Option<Arc<dyn ContactLookup>>,
    limiter: Arc<DomainRateLimiter>,
    scorer: LeadScorer,
}

impl Enricher {
    /// The registry is given this run's per-host rate limiter.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn SheetStore>,
        mut registry: HandlerRegistry,
    ) -> Self {
        let limiter = Arc::new(DomainRateLimiter::new(config.per_domain_delay()));
        registry.set_limiter(Arc::clone(&limiter));
        Self {
            config,
            store,
            registry,
            lookups: None,
            limiter,
            scorer: LeadScorer::new(),
        }
    }

    /// Contact lookups, run for every row when `lookups.enabled` is set.
    pub fn with_lookups(mut self, lookups: Arc<dyn ContactLookup>) -> Self {
        self.lookups = Some(lookups);
        self
    }

    /// Per-host limiter shared by link handlers, for other request makers.
    pub fn limiter(&self) -> Arc<DomainRateLimiter> {
        Arc::clone(&self.limiter)
    }

    pub fn with_scorer(mut self, scorer: LeadScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Plan the managed columns and write missing headers unless `dry_run`.
    pub async fn setup_managed_columns(
        &self,
        values: &[Vec<String>],
        dry_run: bool,
    ) -> Result<ColumnPlan> {
        let headers = values.first().cloned().unwrap_or_default();
        let data = values.get(1..).unwrap_or_default();
        let plan = plan_columns(&headers, data, &ColumnSpec::from_config(&self.config))?;

        for header in &plan.dropped {
            log::sub_item(&format!("Optional column {} left out (no room)", header));
        }
        if plan.needs_write() {
            if dry_run {
                log::sub_item(&format!(
                    "Dry run: would add {} managed headers",
                    plan.new_headers.len()
                ));
            } else {
                write_headers(self.store.as_ref(), &plan.new_headers).await?;
                ::log::info!("Added {} managed headers", plan.new_headers.len());
            }
        }
        Ok(plan)
    }

    /// Process the selected rows of the sheet and write results back.
    pub async fn process_sheet(&self, options: &RunOptions) -> Result<RunStats> {
        let dry_run = options.dry_run || self.config.sheet.dry_run;
        log::header(if dry_run {
            "Enriching sheet (dry run)"
        } else {
            "Enriching sheet"
        });

        let values = self.store.get_all_values().await?;
        if values.is_empty() {
            return Err(AppError::sheet("Sheet has no header row"));
        }
        let plan = self.setup_managed_columns(&values, dry_run).await?;
        let headers = plan.apply_to(&values[0]);
        let map = plan.map;

        let rows = select_rows(&values[1..], options, &map);
        ::log::info!("Processing {} rows", rows.len());

        let mut stats = RunStats::default();
        let row_delay = Duration::from_millis(self.config.sheet.row_delay_ms);
        let total = rows.len();

        for (i, (row_number, row)) in rows.into_iter().enumerate() {
            match self.run_row(&map, &headers, row_number, &row, options, dry_run).await {
                Ok(Some(status)) => {
                    stats.total_processed += 1;
                    match status {
                        RowStatus::Ok => stats.successful += 1,
                        RowStatus::SkippedTos => stats.skipped_tos += 1,
                        RowStatus::NoLinks => stats.no_urls += 1,
                        RowStatus::Error => stats.errors += 1,
                    }
                }
                Ok(None) => stats.rows_moved += 1,
                Err(e) => {
                    ::log::error!("Row {} failed: {}", row_number, e);
                    stats.total_processed += 1;
                    stats.errors += 1;
                }
            }

            if i + 1 < total && !row_delay.is_zero() {
                tokio::time::sleep(row_delay).await;
            }
        }

        log::summary("Enrichment run", &stats.summary_items());
        Ok(stats)
    }

    /// Process and write one row. `None` when the row moved before writing.
    async fn run_row(
        &self,
        map: &ColumnMap,
        headers: &[String],
        row_number: usize,
        row: &[String],
        options: &RunOptions,
        dry_run: bool,
    ) -> Result<Option<RowStatus>> {
        let outcome = self.process_row(map, headers, row_number, row, options).await;
        log::sub_item(&format!(
            "Row {}: {} ({} links)",
            row_number,
            outcome.status,
            outcome.results.len()
        ));

        if dry_run {
            ::log::debug!("Dry run: skipping {} cell writes", outcome.updates.len());
            return Ok(Some(outcome.status));
        }

        let current = self.store.get_row(row_number).await?;
        let current_key = RowFields::from_row(headers, &current, map.namespace()).row_key(row_number);
        if current_key != outcome.row_key {
            ::log::warn!(
                "Row {} changed identity ({} -> {}); not writing",
                row_number,
                outcome.row_key,
                current_key
            );
            return Ok(None);
        }

        self.store.update_cells(&outcome.updates).await?;
        Ok(Some(outcome.status))
    }

    /// Enrich one row and compute its cell updates without writing them.
    pub async fn process_row(
        &self,
        map: &ColumnMap,
        headers: &[String],
        row_number: usize,
        row: &[String],
        options: &RunOptions,
    ) -> RowOutcome {
        let started = Instant::now();
        let namespace = map.namespace();
        let fields = RowFields::from_row(headers, row, namespace);
        let row_key = fields.row_key(row_number);

        let urls = filter_domains(
            extract_urls_from_row(headers, &user_cells(headers, row, namespace)),
            &options.force_domains,
        );

        let mut writer = RowWriter::new(map, row_number);
        writer.set(ManagedColumn::RowKey, row_key.clone());

        let results = if urls.is_empty() {
            Vec::new()
        } else {
            self.run_handlers(urls).await
        };
        let status = RowStatus::aggregate(&results);

        // Every managed cell is written, blank when this run has no value,
        // so nothing from an earlier run survives.
        let max_cell = self.config.sheet.max_cell_chars;
        let summaries: Vec<String> = results
            .iter()
            .take(self.config.sheet.max_link_summaries)
            .map(|r| format_summary(r, max_cell))
            .collect();
        for slot in map.link_summary_slots() {
            let text = slot
                .checked_sub(1)
                .and_then(|i| summaries.get(i))
                .cloned()
                .unwrap_or_default();
            writer.set(ManagedColumn::LinkSummary(slot), text);
        }

        if results.is_empty() {
            for column in [
                ManagedColumn::CombinedReport,
                ManagedColumn::LeadScore,
                ManagedColumn::LeadScoreNotes,
                ManagedColumn::Error,
            ] {
                writer.set(column, String::new());
            }
        } else {
            writer.set(
                ManagedColumn::CombinedReport,
                combined_report(&results, self.config.sheet.max_combined_chars),
            );

            let score = self.scorer.score(&results);
            writer.set(ManagedColumn::LeadScore, score.score.to_string());
            writer.set(ManagedColumn::LeadScoreNotes, truncate(&score.notes, max_cell));

            let errors: Vec<String> = results
                .iter()
                .filter(|r| r.status == LinkStatus::Error)
                .map(|r| format!("{}: {}", r.url, r.error.as_deref().unwrap_or("unknown error")))
                .collect();
            writer.set(ManagedColumn::Error, truncate(&errors.join("; "), max_cell));
        }

        let lookup_config = &self.config.lookups;
        if let Some(lookups) = self.lookups.as_ref().filter(|_| lookup_config.enabled) {
            let found = lookups.lookup(&fields).await;
            if lookup_config.gender {
                writer.set(ManagedColumn::Gender, found.gender.unwrap_or_default());
            }
            if lookup_config.email {
                writer.set(ManagedColumn::EmailCheck, found.email_check.unwrap_or_default());
            }
            if lookup_config.github_search {
                writer.set(ManagedColumn::GithubSearch, found.github_search.unwrap_or_default());
            }
        }

        writer.set(ManagedColumn::Status, status.to_string());
        writer.set(
            ManagedColumn::LastRun,
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        writer.set(
            ManagedColumn::RuntimeMs,
            started.elapsed().as_millis().to_string(),
        );

        RowOutcome {
            row_number,
            status,
            row_key,
            results,
            updates: writer.updates,
        }
    }

    /// Dispatch URLs with bounded concurrency, keeping input order.
    ///
    /// The registry applies the per-host rate limit on cache misses.
    async fn run_handlers(&self, urls: Vec<String>) -> Vec<LinkResult> {
        let concurrency = self.config.http.max_concurrent.max(1);
        stream::iter(urls)
            .map(|url| async move { self.registry.process(&url).await })
            .buffered(concurrency)
            .collect()
            .await
    }
}

/// Collects updates for the managed columns that exist in the map.
struct RowWriter<'a> {
    map: &'a ColumnMap,
    row: usize,
    updates: Vec<CellUpdate>,
}

impl<'a> RowWriter<'a> {
    fn new(map: &'a ColumnMap, row: usize) -> Self {
        Self {
            map,
            row,
            updates: Vec::new(),
        }
    }

    fn set(&mut self, column: ManagedColumn, value: String) {
        if let Some(col) = self.map.get(column) {
            self.updates.push(CellUpdate::new(self.row, col, value));
        }
    }
}

/// Rows to process as (row number, cells), honoring range and `only_new`.
fn select_rows(
    data: &[Vec<String>],
    options: &RunOptions,
    map: &ColumnMap,
) -> Vec<(usize, Vec<String>)> {
    let report_col = map.get(ManagedColumn::CombinedReport);
    data.iter()
        .enumerate()
        .map(|(i, row)| (i + 2, row))
        .filter(|(n, _)| options.rows.is_none_or(|r| r.contains(*n)))
        .filter(|(_, row)| {
            !options.only_new
                || report_col
                    .and_then(|c| row.get(c - 1))
                    .is_none_or(|cell| cell.trim().is_empty())
        })
        .map(|(n, row)| (n, row.clone()))
        .collect()
}

/// The row with managed cells blanked, so earlier output is never re-read as input.
fn user_cells(headers: &[String], row: &[String], namespace: &str) -> Vec<String> {
    row.iter()
        .enumerate()
        .map(|(i, cell)| {
            let managed = headers
                .get(i)
                .is_some_and(|h| !namespace.is_empty() && h.trim().starts_with(namespace));
            if managed { String::new() } else { cell.clone() }
        })
        .collect()
}

fn filter_domains(urls: Vec<String>, domains: &[String]) -> Vec<String> {
    if domains.is_empty() {
        return urls;
    }
    let domains: Vec<String> = domains.iter().map(|d| d.trim().to_lowercase()).collect();
    urls.into_iter()
        .filter(|u| {
            host_of(u).is_some_and(|host| domains.iter().any(|d| !d.is_empty() && host.contains(d)))
        })
        .collect()
}
