// src/models/run.rs

use std::str::FromStr;

use crate::error::AppError;

/// Inclusive range of 1-based sheet row numbers (row 1 is the header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn new(start: usize, end: usize) -> Result<Self, AppError> {
        if start < 2 {
            return Err(AppError::validation(format!(
                "Row range must start at 2 or later (row 1 holds headers), got {}",
                start
            )));
        }
        if end < start {
            return Err(AppError::validation(format!(
                "Row range end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, row: usize) -> bool {
        (self.start..=self.end).contains(&row)
    }
}

impl FromStr for RowRange {
    type Err = AppError;

    /// Parse `"2-500"` or a single row `"7"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::validation(format!("Invalid row range format: {:?}", s));
        let s = s.trim();
        match s.split_once('-') {
            Some((start, end)) => {
                let start = start.trim().parse().map_err(|_| invalid())?;
                let end = end.trim().parse().map_err(|_| invalid())?;
                Self::new(start, end)
            }
            None => {
                let row = s.parse().map_err(|_| invalid())?;
                Self::new(row, row)
            }
        }
    }
}

/// Per-run switches, typically from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Rows to process; all data rows when `None`
    pub rows: Option<RowRange>,
    /// Compute everything but write nothing
    pub dry_run: bool,
    /// Skip rows that already have a combined report
    pub only_new: bool,
    /// Only process URLs whose text contains one of these
    pub force_domains: Vec<String>,
}

/// Counters for a processing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total_processed: usize,
    pub successful: usize,
    pub skipped_tos: usize,
    pub no_urls: usize,
    pub errors: usize,
    /// Rows whose identity changed between read and write
    pub rows_moved: usize,
}

impl RunStats {
    pub fn summary_items(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Rows processed", self.total_processed.to_string()),
            ("Successful", self.successful.to_string()),
            ("Skipped (ToS)", self.skipped_tos.to_string()),
            ("No URLs", self.no_urls.to_string()),
            ("Errors", self.errors.to_string()),
            ("Moved rows", self.rows_moved.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_row_range() {
        assert_eq!("2-500".parse::<RowRange>().unwrap(), RowRange { start: 2, end: 500 });
        assert_eq!(" 7 ".parse::<RowRange>().unwrap(), RowRange { start: 7, end: 7 });
        assert_eq!("3 - 4".parse::<RowRange>().unwrap(), RowRange { start: 3, end: 4 });
    }

    #[test]
    fn test_reject_invalid_ranges() {
        assert!("1-10".parse::<RowRange>().is_err());
        assert!("10-5".parse::<RowRange>().is_err());
        assert!("a-b".parse::<RowRange>().is_err());
        assert!("".parse::<RowRange>().is_err());
    }

    #[test]
    fn test_contains() {
        let range = RowRange::new(2, 4).unwrap();
        assert!(range.contains(2));
        assert!(range.contains(4));
        assert!(!range.contains(5));
    }
}
