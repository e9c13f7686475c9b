// src/models/link.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Outcome of processing a single link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
    /// Not fetched because the site's terms or robots rules forbid it
    #[serde(rename = "SKIPPED_TOS")]
    SkippedTos,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Ok => "OK",
            LinkStatus::Error => "ERROR",
            LinkStatus::SkippedTos => "SKIPPED_TOS",
        }
    }
}

/// Overall outcome written to a row's STATUS column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "SKIPPED_TOS")]
    SkippedTos,
    #[serde(rename = "NO_LINKS")]
    NoLinks,
    #[serde(rename = "ERROR")]
    Error,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Ok => "OK",
            RowStatus::SkippedTos => "SKIPPED_TOS",
            RowStatus::NoLinks => "NO_LINKS",
            RowStatus::Error => "ERROR",
        }
    }

    /// Aggregate per-link outcomes into a row outcome.
    ///
    /// All skipped gives `SkippedTos`, any success gives `Ok`, anything else `Error`.
    pub fn aggregate(results: &[LinkResult]) -> Self {
        if results.is_empty() {
            return RowStatus::NoLinks;
        }
        if results.iter().all(|r| r.status == LinkStatus::SkippedTos) {
            RowStatus::SkippedTos
        } else if results.iter().any(|r| r.status == LinkStatus::Ok) {
            RowStatus::Ok
        } else {
            RowStatus::Error
        }
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enrichment data gathered from one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkResult {
    /// Platform or domain the data came from
    pub source: String,
    pub url: String,
    pub key_points: Vec<String>,
    pub signals: Vec<String>,
    pub status: LinkStatus,
    #[serde(default)]
    pub error: Option<String>,
    pub last_checked: DateTime<Utc>,
}

impl LinkResult {
    pub fn ok(
        source: impl Into<String>,
        url: impl Into<String>,
        key_points: Vec<String>,
        signals: Vec<String>,
    ) -> Self {
        Self {
            source: source.into(),
            url: url.into(),
            key_points,
            signals,
            status: LinkStatus::Ok,
            error: None,
            last_checked: Utc::now(),
        }
    }

    pub fn error(url: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            source: host_or_unknown(url),
            url: url.to_string(),
            key_points: vec![format!("Processing failed: {}", message)],
            signals: Vec::new(),
            status: LinkStatus::Error,
            error: Some(message),
            last_checked: Utc::now(),
        }
    }

    pub fn skipped(url: &str, reason: impl AsRef<str>) -> Self {
        Self {
            source: host_or_unknown(url),
            url: url.to_string(),
            key_points: vec![format!("Skipped: {}", reason.as_ref())],
            signals: Vec::new(),
            status: LinkStatus::SkippedTos,
            error: None,
            last_checked: Utc::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == LinkStatus::Ok
    }
}

fn host_or_unknown(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Which handler family a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Sites whose terms forbid automated access
    Forbidden,
    Twitter,
    YouTube,
    GitHub,
    News,
    Website,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Forbidden => "forbidden",
            Platform::Twitter => "twitter",
            Platform::YouTube => "youtube",
            Platform::GitHub => "github",
            Platform::News => "news",
            Platform::Website => "website",
        }
    }
}
