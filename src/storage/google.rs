//! Google Sheets v4 REST backend.
//!
//! Authenticates with a pre-issued OAuth bearer token carrying the
//! `spreadsheets` scope.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::GoogleConfig;
use crate::storage::{CellUpdate, SheetInfo, SheetStore, WorksheetInfo, quote_title};
use crate::utils::http::HttpClient;

/// Ranges per `values:batchUpdate` call.
const UPDATE_CHUNK: usize = 100;

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetMeta {
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: usize,
    #[serde(default)]
    column_count: usize,
}

/// One worksheet of a Google spreadsheet.
pub struct GoogleSheet {
    http: HttpClient,
    endpoint: String,
    spreadsheet_id: String,
    worksheet: String,
    token: String,
}

impl GoogleSheet {
    pub fn new(
        http: HttpClient,
        config: &GoogleConfig,
        spreadsheet_id: impl Into<String>,
        worksheet: impl Into<String>,
    ) -> Result<Self> {
        let token = config.access_token.clone().ok_or_else(|| {
            AppError::config("GOOGLE_ACCESS_TOKEN is required for the Google Sheets backend")
        })?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: worksheet.into(),
            token,
        })
    }

    fn spreadsheet_url(&self, suffix: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/spreadsheets/{}{}",
            self.endpoint, self.spreadsheet_id, suffix
        ))?)
    }

    fn values_url(&self, range: &str) -> Result<Url> {
        let mut url = self.spreadsheet_url("/values/")?;
        url.path_segments_mut()
            .map_err(|_| AppError::config("Sheets endpoint cannot be a base URL"))?
            .pop_if_empty()
            .push(range);
        Ok(url)
    }

    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(range)?;
        let resp = self
            .http
            .send(|c| c.get(url.clone()).bearer_auth(&self.token))
            .await?;
        let body: ValueRange = resp.json().await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn metadata(&self) -> Result<SpreadsheetMeta> {
        let url = self.spreadsheet_url("")?;
        let resp = self
            .http
            .send(|c| {
                c.get(url.clone())
                    .query(&[("fields", "properties.title,sheets.properties")])
                    .bearer_auth(&self.token)
            })
            .await?;
        Ok(resp.json().await?)
    }

    async fn post(&self, suffix: &str, body: &serde_json::Value) -> Result<()> {
        let url = self.spreadsheet_url(suffix)?;
        self.http
            .send(|c| c.post(url.clone()).bearer_auth(&self.token).json(body))
            .await?;
        Ok(())
    }
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn batch_update_body(worksheet: &str, updates: &[CellUpdate]) -> serde_json::Value {
    let title = quote_title(worksheet);
    let data: Vec<serde_json::Value> = updates
        .iter()
        .map(|u| {
            json!({
                "range": format!("{}!{}", title, u.a1()),
                "values": [[u.value]],
            })
        })
        .collect();
    json!({ "valueInputOption": "USER_ENTERED", "data": data })
}

#[async_trait]
impl SheetStore for GoogleSheet {
    async fn info(&self) -> Result<SheetInfo> {
        let meta = self.metadata().await?;
        Ok(SheetInfo {
            title: meta.properties.title,
            worksheets: meta
                .sheets
                .into_iter()
                .map(|s| WorksheetInfo {
                    title: s.properties.title,
                    rows: s.properties.grid_properties.row_count,
                    cols: s.properties.grid_properties.column_count,
                })
                .collect(),
        })
    }

    async fn get_all_values(&self) -> Result<Vec<Vec<String>>> {
        self.get_range(&quote_title(&self.worksheet)).await
    }

    async fn get_row(&self, row: usize) -> Result<Vec<String>> {
        let range = format!("{}!{}:{}", quote_title(&self.worksheet), row, row);
        Ok(self.get_range(&range).await?.into_iter().next().unwrap_or_default())
    }

    async fn ensure_columns(&self, count: usize) -> Result<()> {
        let meta = self.metadata().await?;
        let sheet = meta
            .sheets
            .iter()
            .find(|s| s.properties.title == self.worksheet)
            .ok_or_else(|| AppError::sheet(format!("Worksheet '{}' not found", self.worksheet)))?;

        let current = sheet.properties.grid_properties.column_count;
        if current >= count {
            return Ok(());
        }

        log::info!(
            "Expanding worksheet '{}' from {} to {} columns",
            self.worksheet,
            current,
            count
        );
        let body = json!({
            "requests": [{
                "appendDimension": {
                    "sheetId": sheet.properties.sheet_id,
                    "dimension": "COLUMNS",
                    "length": count - current,
                }
            }]
        });
        self.post(":batchUpdate", &body).await
    }

    async fn update_cells(&self, updates: &[CellUpdate]) -> Result<()> {
        for chunk in updates.chunks(UPDATE_CHUNK) {
            let body = batch_update_body(&self.worksheet, chunk);
            self.post("/values:batchUpdate", &body).await?;
        }
        log::debug!("Updated {} cells in '{}'", updates.len(), self.worksheet);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpConfig;

    fn sheet() -> GoogleSheet {
        let config = GoogleConfig {
            access_token: Some("token".into()),
            ..GoogleConfig::default()
        };
        GoogleSheet::new(HttpClient::new(&HttpConfig::default()).unwrap(), &config, "abc123", "Lead List")
            .unwrap()
    }

    #[test]
    fn test_requires_token() {
        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        assert!(GoogleSheet::new(http, &GoogleConfig::default(), "id", "Sheet1").is_err());
    }

    #[test]
    fn test_values_url_encodes_range() {
        let url = sheet().values_url("'Lead List'!2:2").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/'Lead%20List'!2:2"
        );
    }

    #[test]
    fn test_batch_update_body() {
        let body = batch_update_body("Sheet1", &[CellUpdate::new(2, 27, "OK")]);
        assert_eq!(body["valueInputOption"], "USER_ENTERED");
        assert_eq!(body["data"][0]["range"], "'Sheet1'!AA2");
        assert_eq!(body["data"][0]["values"][0][0], "OK");
    }

    #[test]
    fn test_metadata_parsing() {
        let meta: SpreadsheetMeta = serde_json::from_value(json!({
            "properties": {"title": "Leads"},
            "sheets": [{"properties": {
                "sheetId": 0, "title": "Sheet1",
                "gridProperties": {"rowCount": 1000, "columnCount": 26}
            }}]
        }))
        .unwrap();
        assert_eq!(meta.properties.title, "Leads");
        assert_eq!(meta.sheets[0].properties.grid_properties.column_count, 26);
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(json!("a")), "a");
        assert_eq!(cell_text(json!(42)), "42");
        assert_eq!(cell_text(json!(null)), "");
    }
}
