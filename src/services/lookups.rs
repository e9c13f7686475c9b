// src/services/lookups.rs

//! Free third-party contact lookups.
//!
//! Each lookup yields a short cell value. Failures are written as
//! `ERROR: ...` text instead of failing the row. Responses are kept in the
//! `api` cache category and requests share the per-host rate limiter.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::cache::{CacheCategory, FileCache};
use crate::error::Result;
use crate::models::LookupConfig;
use crate::pipeline::rate_limit::DomainRateLimiter;
use crate::pipeline::row::RowFields;
use crate::utils::http::HttpClient;
use crate::utils::url::host_of;

const GENDERIZE_URL: &str = "https://api.genderize.io/";
const EVA_URL: &str = "https://api.eva.pingutil.com/email";
const GITHUB_SEARCH_URL: &str = "https://api.github.com/search";

/// Lookup cell values for one row; `None` when the input field was missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowLookups {
    pub gender: Option<String>,
    pub email_check: Option<String>,
    pub github_search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenderPrediction {
    pub gender: Option<String>,
    #[serde(default)]
    pub probability: f64,
}

#[derive(Debug, Deserialize)]
pub struct EmailVerification {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: Option<EmailData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailData {
    #[serde(default)]
    pub deliverable: bool,
    #[serde(default)]
    pub disposable: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchResults<T> {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct OrgHit {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct RepoHit {
    pub full_name: String,
    #[serde(default)]
    pub stargazers_count: u64,
}

/// Contact data for a row, beyond what its links provide.
#[async_trait]
pub trait ContactLookup: Send + Sync {
    /// Run every lookup that has an input in `fields`.
    async fn lookup(&self, fields: &RowFields) -> RowLookups;
}

/// Lookups against genderize.io, EVA and the GitHub search API.
pub struct LookupService {
    http: HttpClient,
    config: LookupConfig,
    github_token: Option<String>,
    cache: Option<Arc<FileCache>>,
    limiter: Option<Arc<DomainRateLimiter>>,
}

impl LookupService {
    pub fn new(http: HttpClient, config: &LookupConfig, github_token: Option<String>) -> Self {
        Self {
            http,
            config: config.clone(),
            github_token,
            cache: None,
            limiter: None,
        }
    }

    pub fn with_cache(mut self, cache: Option<Arc<FileCache>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_limiter(mut self, limiter: Arc<DomainRateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }
}

#[async_trait]
impl ContactLookup for LookupService {
    async fn lookup(&self, fields: &RowFields) -> RowLookups {
        let mut out = RowLookups::default();
        if !self.config.enabled {
            return out;
        }

        if self.config.gender {
            if let Some(first) = fields.first_name() {
                out.gender = Some(cell(self.gender(first).await));
            }
        }
        if self.config.email {
            if let Some(email) = fields.email.as_deref() {
                out.email_check = Some(cell(self.verify_email(email).await));
            }
        }
        if self.config.github_search {
            if let Some(company) = fields.company.as_deref() {
                out.github_search = Some(cell(self.search_github(company).await));
            }
        }
        out
    }
}

impl LookupService {
    pub async fn gender(&self, first_name: &str) -> Result<String> {
        let prediction: GenderPrediction = self
            .get_json(GENDERIZE_URL, &[("name", first_name.to_string())], None)
            .await?;
        Ok(gender_cell(&prediction))
    }

    pub async fn verify_email(&self, email: &str) -> Result<String> {
        let verification: EmailVerification = self
            .get_json(EVA_URL, &[("email", email.to_string())], None)
            .await?;
        Ok(email_cell(&verification))
    }

    pub async fn search_github(&self, company: &str) -> Result<String> {
        let token = self.github_token.as_deref();
        let orgs: SearchResults<OrgHit> = self
            .get_json(
                &format!("{}/users", GITHUB_SEARCH_URL),
                &[("q", format!("\"{}\" type:org", company)), ("per_page", "5".into())],
                token,
            )
            .await?;
        let repos: SearchResults<RepoHit> = self
            .get_json(
                &format!("{}/repositories", GITHUB_SEARCH_URL),
                &[
                    ("q", format!("\"{}\" in:name,description", company)),
                    ("per_page", "10".into()),
                ],
                token,
            )
            .await?;
        Ok(github_cell(&orgs, &repos))
    }

    /// GET a JSON endpoint, through the `api` cache and the host's rate limit.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<T> {
        let key = cache_key(url, query);
        if let Some(cache) = &self.cache {
            match cache.get::<serde_json::Value>(&key, CacheCategory::Api).await {
                Ok(Some(value)) => {
                    log::debug!("Cache hit for {}", key);
                    return Ok(serde_json::from_value(value)?);
                }
                Ok(None) => {}
                Err(e) => log::warn!("Cache read failed for {}: {}", key, e),
            }
        }

        if let (Some(limiter), Some(host)) = (&self.limiter, host_of(url)) {
            limiter.acquire(&host).await;
        }
        let value: serde_json::Value = self.http.get_json(url, query, bearer).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &value, CacheCategory::Api).await {
                log::warn!("Cache write failed for {}: {}", key, e);
            }
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Endpoint plus query, e.g. `https://api.genderize.io/?name=ada`.
fn cache_key(url: &str, query: &[(&str, String)]) -> String {
    let params: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}?{}", url, params.join("&"))
}

fn cell(result: Result<String>) -> String {
    result.unwrap_or_else(|e| {
        log::warn!("Lookup failed: {}", e);
        format!("ERROR: {}", e)
    })
}

pub fn gender_cell(prediction: &GenderPrediction) -> String {
    match prediction.gender.as_deref() {
        Some(gender) => format!("{} ({:.0}%)", gender, prediction.probability * 100.0),
        None => "unknown".to_string(),
    }
}

pub fn email_cell(verification: &EmailVerification) -> String {
    let data = verification.data.as_ref();
    let deliverable =
        verification.status == "deliverable" || data.is_some_and(|d| d.deliverable);
    let mut out = if deliverable { "deliverable" } else { "undeliverable" }.to_string();
    if data.is_some_and(|d| d.disposable) {
        out.push_str(" (disposable)");
    }
    out
}

pub fn github_cell(orgs: &SearchResults<OrgHit>, repos: &SearchResults<RepoHit>) -> String {
    let mut parts = vec![format!("{} orgs, {} repos", orgs.total_count, repos.total_count)];
    let top_orgs: Vec<&str> = orgs.items.iter().take(3).map(|o| o.login.as_str()).collect();
    if !top_orgs.is_empty() {
        parts.push(format!("orgs: {}", top_orgs.join(", ")));
    }
    let top_repos: Vec<String> = repos
        .items
        .iter()
        .take(3)
        .map(|r| format!("{} ({} stars)", r.full_name, r.stargazers_count))
        .collect();
    if !top_repos.is_empty() {
        parts.push(format!("repos: {}", top_repos.join(", ")));
    }
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::AppError;
    use crate::models::HttpConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn offline_http() -> HttpClient {
        let config = HttpConfig {
            timeout_secs: 1,
            max_retries: 0,
            ..HttpConfig::default()
        };
        HttpClient::new(&config).unwrap()
    }

    #[test]
    fn test_gender_cell() {
        let p: GenderPrediction =
            serde_json::from_str(r#"{"name": "ada", "gender": "female", "probability": 0.984, "count": 120}"#)
                .unwrap();
        assert_eq!(gender_cell(&p), "female (98%)");
        let unknown: GenderPrediction =
            serde_json::from_str(r#"{"name": "zz", "gender": null, "probability": 0.0}"#).unwrap();
        assert_eq!(gender_cell(&unknown), "unknown");
    }

    #[test]
    fn test_email_cell() {
        let ok: EmailVerification = serde_json::from_str(
            r#"{"status": "success", "data": {"deliverable": true, "disposable": false}}"#,
        )
        .unwrap();
        assert_eq!(email_cell(&ok), "deliverable");
        let legacy: EmailVerification = serde_json::from_str(r#"{"status": "deliverable"}"#).unwrap();
        assert_eq!(email_cell(&legacy), "deliverable");
        let burner: EmailVerification = serde_json::from_str(
            r#"{"status": "success", "data": {"deliverable": false, "disposable": true}}"#,
        )
        .unwrap();
        assert_eq!(email_cell(&burner), "undeliverable (disposable)");
    }

    #[test]
    fn test_github_cell() {
        let orgs: SearchResults<OrgHit> =
            serde_json::from_str(r#"{"total_count": 2, "items": [{"login": "acme"}, {"login": "acme-labs"}]}"#)
                .unwrap();
        let repos: SearchResults<RepoHit> = serde_json::from_str(
            r#"{"total_count": 1, "items": [{"full_name": "acme/widgets", "stargazers_count": 120}]}"#,
        )
        .unwrap();
        assert_eq!(
            github_cell(&orgs, &repos),
            "2 orgs, 1 repos; orgs: acme, acme-labs; repos: acme/widgets (120 stars)"
        );
        let none: SearchResults<OrgHit> = serde_json::from_str(r#"{"total_count": 0}"#).unwrap();
        let no_repos: SearchResults<RepoHit> = serde_json::from_str(r#"{"total_count": 0}"#).unwrap();
        assert_eq!(github_cell(&none, &no_repos), "0 orgs, 0 repos");
    }

    #[test]
    fn test_failures_become_error_text() {
        let text = cell(Err(AppError::status(429, "https://api.genderize.io/")));
        assert!(text.starts_with("ERROR: HTTP 429"));
    }

    #[tokio::test]
    async fn test_disabled_lookups_do_nothing() {
        let service = LookupService::new(offline_http(), &LookupConfig::default(), None);
        let fields = RowFields {
            name: Some("Ada Lovelace".into()),
            email: Some("ada@example.com".into()),
            ..RowFields::default()
        };
        assert_eq!(service.lookup(&fields).await, RowLookups::default());
    }

    #[test]
    fn test_cache_key_includes_query() {
        assert_eq!(
            cache_key(GENDERIZE_URL, &[("name", "ada".to_string())]),
            "https://api.genderize.io/?name=ada"
        );
    }

    #[tokio::test]
    async fn test_repeat_lookup_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(FileCache::new(dir.path(), Duration::from_secs(60)));
        let key = cache_key(GENDERIZE_URL, &[("name", "Zyxw".to_string())]);
        cache
            .set(
                &key,
                &json!({"name": "Zyxw", "gender": "male", "probability": 0.5}),
                CacheCategory::Api,
            )
            .await
            .unwrap();

        let limiter = Arc::new(DomainRateLimiter::new(Duration::from_secs(60)));
        let service = LookupService::new(offline_http(), &LookupConfig::default(), None)
            .with_cache(Some(cache))
            .with_limiter(limiter);

        let started = std::time::Instant::now();
        assert_eq!(service.gender("Zyxw").await.unwrap(), "male (50%)");
        assert_eq!(service.gender("Zyxw").await.unwrap(), "male (50%)");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
