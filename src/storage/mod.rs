//! Spreadsheet backends.
//!
//! Rows and columns are 1-based as in the spreadsheet UI; row 1 holds headers.
//!
//! - [`LocalSheet`]: a CSV file, for offline runs and tests
//! - [`GoogleSheet`]: a worksheet reached through the Sheets v4 REST API

pub mod google;
pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::utils::column_letter;

pub use google::GoogleSheet;
pub use local::LocalSheet;

/// A single cell write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub row: usize,
    pub col: usize,
    pub value: String,
}

impl CellUpdate {
    pub fn new(row: usize, col: usize, value: impl Into<String>) -> Self {
        Self {
            row,
            col,
            value: value.into(),
        }
    }

    /// Cell reference such as `C7`.
    pub fn a1(&self) -> String {
        format!("{}{}", column_letter(self.col), self.row)
    }
}

/// Metadata about one worksheet.
#[derive(Debug, Clone)]
pub struct WorksheetInfo {
    pub title: String,
    pub rows: usize,
    pub cols: usize,
}

/// Metadata about a spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetInfo {
    pub title: String,
    pub worksheets: Vec<WorksheetInfo>,
}

/// Trait for spreadsheet backends.
#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn info(&self) -> Result<SheetInfo>;

    /// Every row including the header row. Rows may be ragged.
    async fn get_all_values(&self) -> Result<Vec<Vec<String>>>;

    async fn get_headers(&self) -> Result<Vec<String>> {
        Ok(self.get_all_values().await?.into_iter().next().unwrap_or_default())
    }

    /// One row by number; empty when past the end.
    async fn get_row(&self, row: usize) -> Result<Vec<String>>;

    /// Grow the grid so at least `count` columns exist.
    async fn ensure_columns(&self, _count: usize) -> Result<()> {
        Ok(())
    }

    async fn update_cells(&self, updates: &[CellUpdate]) -> Result<()>;
}

/// Write header cells in row 1, growing the grid first when needed.
pub async fn write_headers(store: &dyn SheetStore, headers: &[(usize, String)]) -> Result<()> {
    let Some(max_col) = headers.iter().map(|(col, _)| *col).max() else {
        return Ok(());
    };
    store.ensure_columns(max_col).await?;

    let updates: Vec<CellUpdate> = headers
        .iter()
        .map(|(col, header)| CellUpdate::new(1, *col, header.clone()))
        .collect();
    store.update_cells(&updates).await
}

/// Quote a worksheet title for use in an A1 range.
pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}
