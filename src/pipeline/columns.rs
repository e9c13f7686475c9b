// src/pipeline/columns.rs

//! Managed column block planning.
//!
//! Every header written by the enricher starts with a namespace prefix
//! (`ENRICH_` by default). Planning maps headers that already exist, then
//! places missing ones in columns whose header and data cells are all empty,
//! so user data is never overwritten and repeated runs add nothing.

use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::models::{Config, LookupConfig};

/// A column the enricher writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagedColumn {
    /// 1-based link summary slot
    LinkSummary(usize),
    CombinedReport,
    LeadScore,
    LeadScoreNotes,
    Status,
    LastRun,
    RowKey,
    Error,
    RuntimeMs,
    Gender,
    EmailCheck,
    GithubSearch,
}

impl ManagedColumn {
    fn suffix(&self) -> String {
        match self {
            Self::LinkSummary(i) => format!("LINK_{}_SUMMARY", i),
            Self::CombinedReport => "COMBINED_REPORT".into(),
            Self::LeadScore => "LEAD_SCORE".into(),
            Self::LeadScoreNotes => "LEAD_SCORE_NOTES".into(),
            Self::Status => "STATUS".into(),
            Self::LastRun => "LAST_RUN".into(),
            Self::RowKey => "ROW_KEY".into(),
            Self::Error => "ERROR".into(),
            Self::RuntimeMs => "RUNTIME_MS".into(),
            Self::Gender => "GENDER".into(),
            Self::EmailCheck => "EMAIL_CHECK".into(),
            Self::GithubSearch => "GITHUB_SEARCH".into(),
        }
    }

    /// Full header text under `namespace`.
    pub fn header(&self, namespace: &str) -> String {
        format!("{}{}", namespace, self.suffix())
    }

    /// Optional columns are dropped when the sheet runs out of room.
    pub fn is_required(&self) -> bool {
        !matches!(
            self,
            Self::Error | Self::RuntimeMs | Self::Gender | Self::EmailCheck | Self::GithubSearch
        )
    }
}

/// Which managed columns a run needs.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub namespace: String,
    pub link_summaries: usize,
    pub diagnostics: bool,
    pub gender: bool,
    pub email_check: bool,
    pub github_search: bool,
    /// Usable column limit of the backend
    pub max_columns: usize,
    /// Columns kept free for optional headers below `max_columns`
    pub safety_margin: usize,
}

impl ColumnSpec {
    pub fn from_config(config: &Config) -> Self {
        let LookupConfig {
            enabled,
            gender,
            email,
            github_search,
        } = config.lookups;
        Self {
            namespace: config.sheet.namespace.clone(),
            link_summaries: config.sheet.max_link_summaries,
            diagnostics: config.sheet.diagnostics_columns,
            gender: enabled && gender,
            email_check: enabled && email,
            github_search: enabled && github_search,
            max_columns: config.sheet.max_columns,
            safety_margin: config.sheet.column_safety_margin,
        }
    }

    /// Columns in layout order.
    pub fn columns(&self) -> Vec<ManagedColumn> {
        let mut out: Vec<ManagedColumn> = (1..=self.link_summaries)
            .map(ManagedColumn::LinkSummary)
            .collect();
        out.extend([
            ManagedColumn::CombinedReport,
            ManagedColumn::LeadScore,
            ManagedColumn::LeadScoreNotes,
            ManagedColumn::Status,
            ManagedColumn::LastRun,
            ManagedColumn::RowKey,
        ]);
        if self.diagnostics {
            out.extend([ManagedColumn::Error, ManagedColumn::RuntimeMs]);
        }
        if self.gender {
            out.push(ManagedColumn::Gender);
        }
        if self.email_check {
            out.push(ManagedColumn::EmailCheck);
        }
        if self.github_search {
            out.push(ManagedColumn::GithubSearch);
        }
        out
    }
}

/// Header name to 1-based column index for every namespaced header.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    namespace: String,
    columns: HashMap<String, usize>,
}

impl ColumnMap {
    pub fn get(&self, column: ManagedColumn) -> Option<usize> {
        self.columns.get(&column.header(&self.namespace)).copied()
    }

    pub fn get_header(&self, header: &str) -> Option<usize> {
        self.columns.get(header).copied()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Numbers of every mapped `LINK_<n>_SUMMARY` column, ascending.
    ///
    /// Includes slots left over from runs with a larger summary count.
    pub fn link_summary_slots(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = self
            .columns
            .keys()
            .filter_map(|h| h.strip_prefix(self.namespace.as_str()))
            .filter_map(|s| s.strip_prefix("LINK_")?.strip_suffix("_SUMMARY")?.parse().ok())
            .collect();
        slots.sort_unstable();
        slots
    }
}

/// Result of planning the managed block.
#[derive(Debug, Clone)]
pub struct ColumnPlan {
    pub map: ColumnMap,
    /// Headers to write, as (1-based column, text)
    pub new_headers: Vec<(usize, String)>,
    /// Optional headers left out for lack of room
    pub dropped: Vec<String>,
}

impl ColumnPlan {
    pub fn needs_write(&self) -> bool {
        !self.new_headers.is_empty()
    }

    /// Full header row after applying the plan.
    pub fn apply_to(&self, headers: &[String]) -> Vec<String> {
        let width = self
            .new_headers
            .iter()
            .map(|(col, _)| *col)
            .max()
            .unwrap_or(0)
            .max(headers.len());
        let mut out = headers.to_vec();
        out.resize(width, String::new());
        for (col, header) in &self.new_headers {
            out[col - 1] = header.clone();
        }
        out
    }
}

fn is_blank(cell: Option<&String>) -> bool {
    cell.is_none_or(|c| c.trim().is_empty())
}

/// Plan the managed block for a sheet given its headers and data rows.
pub fn plan_columns(headers: &[String], rows: &[Vec<String>], spec: &ColumnSpec) -> Result<ColumnPlan> {
    let namespace = spec.namespace.as_str();

    let mut columns = HashMap::new();
    for (i, header) in headers.iter().enumerate() {
        let header = header.trim();
        if header.starts_with(namespace) {
            columns.entry(header.to_string()).or_insert(i + 1);
        }
    }

    let column_free = |col: usize| {
        is_blank(headers.get(col - 1)) && rows.iter().all(|row| is_blank(row.get(col - 1)))
    };

    let mut next = match columns.values().copied().max() {
        Some(last_managed) => last_managed + 1,
        None => {
            headers
                .iter()
                .rposition(|h| !h.trim().is_empty())
                .map_or(0, |i| i + 1)
                + 1
        }
    };

    let optional_limit = spec.max_columns.saturating_sub(spec.safety_margin);
    let mut new_headers = Vec::new();
    let mut dropped = Vec::new();

    for column in spec.columns() {
        let header = column.header(namespace);
        if columns.contains_key(&header) {
            continue;
        }

        while !column_free(next) {
            next += 1;
        }

        let limit = if column.is_required() {
            spec.max_columns
        } else {
            optional_limit
        };
        if next > limit {
            if column.is_required() {
                return Err(AppError::sheet(format!(
                    "No room for required column {} (limit {})",
                    header, spec.max_columns
                )));
            }
            log::warn!("Skipping optional column {}: column limit reached", header);
            dropped.push(header);
            continue;
        }

        columns.insert(header.clone(), next);
        new_headers.push((next, header));
        next += 1;
    }

    Ok(ColumnPlan {
        map: ColumnMap {
            namespace: namespace.to_string(),
            columns,
        },
        new_headers,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::column_letter;

    fn headers(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn spec(link_summaries: usize) -> ColumnSpec {
        ColumnSpec {
            namespace: "ENRICH_".into(),
            link_summaries,
            diagnostics: false,
            gender: false,
            email_check: false,
            github_search: false,
            max_columns: 18278,
            safety_margin: 5,
        }
    }

    #[test]
    fn test_link_summary_slots_include_leftovers() {
        let existing = headers(&["name", "ENRICH_LINK_7_SUMMARY", "ENRICH_LINK_1_SUMMARY"]);
        let plan = plan_columns(&existing, &[], &spec(2)).unwrap();
        assert_eq!(plan.map.link_summary_slots(), vec![1, 2, 7]);
    }

    #[test]
    fn test_detect_existing_block() {
        let existing = headers(&[
            "name",
            "email",
            "company",
            "ENRICH_LINK_1_SUMMARY",
            "ENRICH_LINK_2_SUMMARY",
            "ENRICH_COMBINED_REPORT",
            "ENRICH_LEAD_SCORE",
            "ENRICH_STATUS",
            "ENRICH_LAST_RUN",
        ]);
        let plan = plan_columns(&existing, &[], &spec(3)).unwrap();
        assert_eq!(plan.map.get(ManagedColumn::LinkSummary(1)), Some(4));
        assert_eq!(plan.map.get(ManagedColumn::CombinedReport), Some(6));

        // Missing headers go after the block, in layout order
        let added: Vec<&str> = plan.new_headers.iter().map(|(_, h)| h.as_str()).collect();
        assert_eq!(
            added,
            vec!["ENRICH_LINK_3_SUMMARY", "ENRICH_LEAD_SCORE_NOTES", "ENRICH_ROW_KEY"]
        );
        assert_eq!(plan.new_headers[0].0, 10);
    }

    #[test]
    fn test_fresh_block_after_last_used_column() {
        let existing = headers(&["name", "email", "company", "website"]);
        let plan = plan_columns(&existing, &[], &spec(3)).unwrap();
        assert_eq!(plan.map.get(ManagedColumn::LinkSummary(1)), Some(5));
        assert_eq!(plan.map.get(ManagedColumn::CombinedReport), Some(8));
        assert_eq!(plan.new_headers.len(), 3 + 6);

        let row = plan.apply_to(&existing);
        assert_eq!(row[4], "ENRICH_LINK_1_SUMMARY");
        assert_eq!(row.len(), 4 + 9);
    }

    #[test]
    fn test_fresh_block_skips_gap_header() {
        // Last used column wins over the count of non-empty headers
        let existing = headers(&["name", "", "notes"]);
        let plan = plan_columns(&existing, &[], &spec(1)).unwrap();
        assert_eq!(plan.map.get(ManagedColumn::LinkSummary(1)), Some(4));
    }

    #[test]
    fn test_expand_more_summaries() {
        let existing = headers(&[
            "name",
            "email",
            "ENRICH_LINK_1_SUMMARY",
            "ENRICH_LINK_2_SUMMARY",
            "ENRICH_LINK_3_SUMMARY",
            "ENRICH_COMBINED_REPORT",
            "ENRICH_STATUS",
        ]);
        let plan = plan_columns(&existing, &[], &spec(5)).unwrap();
        let updated = plan.apply_to(&existing);
        assert!(updated.contains(&"ENRICH_LINK_4_SUMMARY".to_string()));
        assert!(updated.contains(&"ENRICH_LINK_5_SUMMARY".to_string()));
        // Existing positions never move
        assert_eq!(plan.map.get(ManagedColumn::Status), Some(7));
        assert_eq!(plan.map.get(ManagedColumn::LinkSummary(4)), Some(8));
    }

    #[test]
    fn test_compact_keeps_extra_summaries() {
        let existing = headers(&[
            "name",
            "email",
            "ENRICH_LINK_1_SUMMARY",
            "ENRICH_LINK_2_SUMMARY",
            "ENRICH_LINK_3_SUMMARY",
            "ENRICH_LINK_4_SUMMARY",
            "ENRICH_LINK_5_SUMMARY",
            "ENRICH_COMBINED_REPORT",
            "ENRICH_STATUS",
        ]);
        let plan = plan_columns(&existing, &[], &spec(3)).unwrap();
        assert_eq!(plan.map.get(ManagedColumn::LinkSummary(4)), Some(6));
        assert_eq!(plan.map.get(ManagedColumn::LinkSummary(5)), Some(7));
        assert_eq!(plan.map.get(ManagedColumn::LinkSummary(1)), Some(3));
        assert_eq!(plan.map.get(ManagedColumn::LinkSummary(3)), Some(5));
    }

    #[test]
    fn test_idempotent() {
        let existing = headers(&["name", "email", "website"]);
        let first = plan_columns(&existing, &[], &spec(2)).unwrap();
        assert!(first.needs_write());

        let updated = first.apply_to(&existing);
        let second = plan_columns(&updated, &[], &spec(2)).unwrap();
        assert!(!second.needs_write());
        assert_eq!(
            second.map.get(ManagedColumn::LastRun),
            first.map.get(ManagedColumn::LastRun)
        );
    }

    #[test]
    fn test_custom_namespace() {
        let existing = headers(&["name", "ENRICH_STATUS", "LS_STATUS"]);
        let mut spec = spec(1);
        spec.namespace = "LS_".into();
        let plan = plan_columns(&existing, &[], &spec).unwrap();
        assert_eq!(plan.map.get(ManagedColumn::Status), Some(3));
        assert_eq!(plan.map.get_header("ENRICH_STATUS"), None);
        assert!(plan.new_headers.iter().all(|(_, h)| h.starts_with("LS_")));
    }

    #[test]
    fn test_never_clobbers_user_data() {
        // Column D has no header but holds data in a row
        let existing = headers(&["name", "website", "ENRICH_STATUS"]);
        let rows = vec![
            vec!["a".into(), "a.com".into(), "OK".into(), "user note".into()],
            vec!["b".into(), "b.com".into(), "".into(), "".into(), "".into()],
        ];
        let plan = plan_columns(&existing, &rows, &spec(1)).unwrap();
        let placed: Vec<usize> = plan.new_headers.iter().map(|(c, _)| *c).collect();
        assert!(!placed.contains(&4));
        assert_eq!(placed[0], 5);
    }

    #[test]
    fn test_optional_columns_dropped_at_limit() {
        let existing = headers(&["name"]);
        let mut spec = spec(1);
        spec.diagnostics = true;
        spec.gender = true;
        // Required: 1 summary + 6 = 7 columns at B..H; optional limit is 10 - 2 = 8
        spec.max_columns = 10;
        spec.safety_margin = 2;

        let plan = plan_columns(&existing, &[], &spec).unwrap();
        assert_eq!(plan.map.get(ManagedColumn::RowKey), Some(8));
        assert_eq!(plan.map.get(ManagedColumn::Error), None);
        assert_eq!(
            plan.dropped,
            vec!["ENRICH_ERROR", "ENRICH_RUNTIME_MS", "ENRICH_GENDER"]
        );
    }

    #[test]
    fn test_required_column_overflow_is_error() {
        let existing = headers(&["a", "b", "c"]);
        let mut spec = spec(5);
        spec.max_columns = 6;
        spec.safety_margin = 0;
        assert!(plan_columns(&existing, &[], &spec).is_err());
    }

    #[test]
    fn test_letters_for_planned_columns() {
        let existing: Vec<String> = (0..26).map(|i| format!("c{}", i)).collect();
        let plan = plan_columns(&existing, &[], &spec(1)).unwrap();
        let col = plan.map.get(ManagedColumn::LinkSummary(1)).unwrap();
        assert_eq!(column_letter(col), "AA");
    }
}
