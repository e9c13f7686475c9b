// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Shared client that retries transient failures with linear backoff.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    max_retries: u32,
    backoff: Duration,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// The underlying client, for requests that need the raw status.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Send a request built by `build`, retrying on timeouts, 429 and 5xx.
    ///
    /// Any non-2xx final status is returned as [`AppError::Status`].
    pub async fn send<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let err = match build(&self.client).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => AppError::status(resp.status().as_u16(), resp.url().as_str()),
                Err(e) => AppError::Http(e),
            };

            if attempt >= self.max_retries || !err.is_transient() {
                return Err(err);
            }
            attempt += 1;
            let wait = self.backoff * attempt;
            log::debug!("Retrying after {:?} (attempt {}): {}", wait, attempt, err);
            tokio::time::sleep(wait).await;
        }
    }

    /// Fetch a page body as text.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self.send(|c| c.get(url)).await?;
        Ok(resp.text().await?)
    }

    /// GET a JSON API endpoint with optional bearer auth.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
    ) -> Result<T> {
        let resp = self
            .send(|c| {
                let mut req = c.get(url).query(query).header(ACCEPT, "application/json");
                if let Some(token) = bearer {
                    req = req.bearer_auth(token);
                }
                req
            })
            .await?;
        Ok(resp.json().await?)
    }
}
