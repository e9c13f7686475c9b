//! CSV file worksheet.
//!
//! The whole file is re-read for every query and rewritten atomically on
//! every update, which keeps it consistent with edits made between runs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::{CellUpdate, SheetInfo, SheetStore, WorksheetInfo};

/// Local CSV spreadsheet backend.
pub struct LocalSheet {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::sheet(format!(
                    "CSV file not found: {}",
                    self.path.display()
                )));
            }
            Err(e) => return Err(AppError::Io(e)),
        };
        parse_csv(&bytes)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_rows(&self, rows: &[Vec<String>]) -> Result<()> {
        let bytes = render_csv(rows)?;
        let tmp = self.path.with_extension("csv.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn parse_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Render rows padded to a uniform width.
fn render_csv(rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    for row in rows {
        let mut padded = row.clone();
        padded.resize(width, String::new());
        writer.write_record(&padded)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::sheet(format!("CSV flush failed: {}", e)))
}

#[async_trait]
impl SheetStore for LocalSheet {
    async fn info(&self) -> Result<SheetInfo> {
        let rows = self.read_rows().await?;
        let title = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sheet".to_string());
        Ok(SheetInfo {
            title: title.clone(),
            worksheets: vec![WorksheetInfo {
                title,
                rows: rows.len(),
                cols: rows.iter().map(Vec::len).max().unwrap_or(0),
            }],
        })
    }

    async fn get_all_values(&self) -> Result<Vec<Vec<String>>> {
        self.read_rows().await
    }

    async fn get_row(&self, row: usize) -> Result<Vec<String>> {
        let rows = self.read_rows().await?;
        Ok(row
            .checked_sub(1)
            .and_then(|i| rows.get(i).cloned())
            .unwrap_or_default())
    }

    async fn update_cells(&self, updates: &[CellUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        let mut rows = self.read_rows().await?;

        for update in updates {
            if update.row == 0 || update.col == 0 {
                return Err(AppError::validation(format!(
                    "Cell coordinates are 1-based, got row {} col {}",
                    update.row, update.col
                )));
            }
            if rows.len() < update.row {
                rows.resize(update.row, Vec::new());
            }
            let row = &mut rows[update.row - 1];
            if row.len() < update.col {
                row.resize(update.col, String::new());
            }
            row[update.col - 1] = update.value.clone();
        }

        self.write_rows(&rows).await?;
        log::debug!("Wrote {} cells to {}", updates.len(), self.path.display());
        Ok(())
    }
}
