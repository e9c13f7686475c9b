// src/services/robots.rs

//! robots.txt compliance.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::Mutex;
use url::Url;

use crate::cache::{CacheCategory, FileCache};
use crate::utils::http::HttpClient;

/// Hosts that are never fetched, whatever their robots.txt says.
const FORBIDDEN_HOSTS: &[&str] = &["linkedin.com", "www.linkedin.com"];

const ROBOTS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Checks URLs against the robots.txt of their host.
///
/// Bodies are kept in memory for the run and in the `robots` cache
/// category for a day. An empty body allows everything; an unreachable
/// robots.txt also allows the fetch.
pub struct RobotsChecker {
    http: HttpClient,
    cache: Option<Arc<FileCache>>,
    user_agent: String,
    memory: Mutex<HashMap<String, String>>,
}

impl RobotsChecker {
    pub fn new(http: HttpClient, cache: Option<Arc<FileCache>>, user_agent: &str) -> Self {
        Self {
            http,
            cache,
            user_agent: agent_token(user_agent),
            memory: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_forbidden_host(host: &str) -> bool {
        let host = host.to_lowercase();
        FORBIDDEN_HOSTS.contains(&host.as_str())
    }

    /// Whether our user agent may fetch `url`.
    pub async fn can_fetch(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if Self::is_forbidden_host(host) {
            log::debug!("{} is on the forbidden list", host);
            return false;
        }

        match self.robots_body(host).await {
            Some(body) => {
                let allowed = body_allows(&body, &self.user_agent, url.as_str());
                if !allowed {
                    log::info!("robots.txt disallows {}", url);
                }
                allowed
            }
            None => true,
        }
    }

    async fn robots_body(&self, host: &str) -> Option<String> {
        let host = host.to_lowercase();
        if let Some(body) = self.memory.lock().await.get(&host) {
            return Some(body.clone());
        }

        let key = format!("robots:{}", host);
        if let Some(cache) = &self.cache {
            if let Ok(Some(body)) = cache.get::<String>(&key, CacheCategory::Robots).await {
                self.memory.lock().await.insert(host, body.clone());
                return Some(body);
            }
        }

        let body = self.fetch(&host).await?;
        if let Some(cache) = &self.cache {
            if let Err(e) = cache
                .set_with_ttl(&key, &body, ROBOTS_TTL, CacheCategory::Robots)
                .await
            {
                log::warn!("Failed to cache robots.txt for {}: {}", host, e);
            }
        }
        self.memory.lock().await.insert(host, body.clone());
        Some(body)
    }

    /// Try https then http. A 404 counts as an empty robots.txt.
    async fn fetch(&self, host: &str) -> Option<String> {
        for scheme in ["https", "http"] {
            let robots_url = format!("{}://{}/robots.txt", scheme, host);
            match self.http.inner().get(&robots_url).send().await {
                Ok(resp) if resp.status() == StatusCode::OK => match resp.text().await {
                    Ok(body) => return Some(body),
                    Err(e) => log::debug!("Unreadable robots.txt at {}: {}", robots_url, e),
                },
                Ok(resp) if resp.status() == StatusCode::NOT_FOUND => return Some(String::new()),
                Ok(resp) => log::debug!("robots.txt at {} returned {}", robots_url, resp.status()),
                Err(e) => log::debug!("Could not fetch {}: {}", robots_url, e),
            }
        }
        None
    }
}

/// Product token of a user agent string, e.g. `LeadShark` from `LeadShark/1.0 (+url)`.
fn agent_token(user_agent: &str) -> String {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or(user_agent)
        .to_string()
}

fn body_allows(body: &str, agent: &str, url: &str) -> bool {
    if body.trim().is_empty() {
        return true;
    }
    let mut matcher = robotstxt::DefaultMatcher::default();
    matcher.one_agent_allowed_by_robots(body, agent, url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpConfig;

    const ROBOTS: &str = "\
User-agent: *
Disallow: /private/
Crawl-delay: 5

User-agent: LeadShark
Disallow: /no-bots/
Crawl-delay: 2
";

    #[test]
    fn test_agent_token() {
        assert_eq!(agent_token("LeadShark/1.0 (+https://example.com)"), "LeadShark");
        assert_eq!(agent_token("Bot"), "Bot");
    }

    #[test]
    fn test_body_allows() {
        assert!(body_allows("", "LeadShark", "https://a.com/anything"));
        assert!(body_allows(ROBOTS, "LeadShark", "https://a.com/private/x"));
        assert!(!body_allows(ROBOTS, "LeadShark", "https://a.com/no-bots/x"));
        assert!(!body_allows(ROBOTS, "OtherBot", "https://a.com/private/x"));
        assert!(body_allows(ROBOTS, "OtherBot", "https://a.com/public"));
    }

    #[test]
    fn test_forbidden_hosts() {
        assert!(RobotsChecker::is_forbidden_host("www.LinkedIn.com"));
        assert!(!RobotsChecker::is_forbidden_host("example.com"));
    }

    #[tokio::test]
    async fn test_forbidden_host_is_never_fetched() {
        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let checker = RobotsChecker::new(http, None, "LeadShark/1.0");
        let url = Url::parse("https://linkedin.com/company/acme").unwrap();
        assert!(!checker.can_fetch(&url).await);
    }

    #[tokio::test]
    async fn test_memory_cache_is_used() {
        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let checker = RobotsChecker::new(http, None, "LeadShark/1.0");
        checker
            .memory
            .lock()
            .await
            .insert("example.test".into(), "User-agent: *\nDisallow: /\n".into());
        let url = Url::parse("https://example.test/page").unwrap();
        assert!(!checker.can_fetch(&url).await);
    }
}
