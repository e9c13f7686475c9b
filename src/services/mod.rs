//! Link handlers.
//!
//! Every URL found in a row is routed to the first handler whose
//! [`LinkHandler::can_handle`] accepts it:
//! - Forbidden platforms (LinkedIn) are skipped without a request
//! - Twitter/X, YouTube and GitHub go through their public APIs
//! - News articles and plain websites are scraped, honoring robots.txt
//!
//! [`HandlerRegistry`] owns the routing and the per-URL result cache.

mod github;
pub mod lookups;
mod news;
mod robots;
mod twitter;
mod website;
mod youtube;

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::cache::{CacheCategory, FileCache};
use crate::error::{AppError, Result};
use crate::models::{Config, LinkResult, LinkStatus, Platform};
use crate::pipeline::rate_limit::DomainRateLimiter;
use crate::utils::http::HttpClient;
use crate::utils::url::classify_url;

pub use github::GitHubHandler;
pub use lookups::{ContactLookup, LookupService, RowLookups};
pub use news::NewsHandler;
pub use robots::RobotsChecker;
pub use twitter::TwitterHandler;
pub use website::WebsiteHandler;
pub use youtube::YouTubeHandler;

/// A source of enrichment data for one family of URLs.
#[async_trait]
pub trait LinkHandler: Send + Sync {
    /// Short name, used in cache keys and logs.
    fn name(&self) -> &'static str;

    fn can_handle(&self, url: &Url) -> bool;

    /// Whether `process` makes network requests. Only those wait for the
    /// per-host rate limiter.
    fn fetches(&self) -> bool {
        true
    }

    /// Fetch and summarize `url`.
    ///
    /// Errors are turned into `ERROR` results by the registry.
    async fn process(&self, url: &Url) -> Result<LinkResult>;
}

/// Platforms whose terms forbid automated access.
pub struct ForbiddenHandler;

#[async_trait]
impl LinkHandler for ForbiddenHandler {
    fn name(&self) -> &'static str {
        "forbidden"
    }

    fn can_handle(&self, url: &Url) -> bool {
        classify_url(url.as_str()) == Platform::Forbidden
    }

    fn fetches(&self) -> bool {
        false
    }

    async fn process(&self, url: &Url) -> Result<LinkResult> {
        Ok(LinkResult::skipped(
            url.as_str(),
            "Platform terms of service prohibit automated access",
        ))
    }
}

/// Ordered handler list with a result cache in front.
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn LinkHandler>>,
    cache: Option<Arc<FileCache>>,
    limiter: Option<Arc<DomainRateLimiter>>,
}

impl HandlerRegistry {
    pub fn new(cache: Option<Arc<FileCache>>) -> Self {
        Self {
            handlers: Vec::new(),
            cache,
            limiter: None,
        }
    }

    /// Space out requests per host. Cache hits and request-free handlers
    /// never wait.
    pub fn set_limiter(&mut self, limiter: Arc<DomainRateLimiter>) {
        self.limiter = Some(limiter);
    }

    /// The standard handler chain.
    pub fn from_config(config: &Config, http: HttpClient, cache: Option<Arc<FileCache>>) -> Self {
        let robots = Arc::new(RobotsChecker::new(
            http.clone(),
            cache.clone(),
            &config.http.user_agent,
        ));

        let mut registry = Self::new(cache);
        registry.register(Arc::new(ForbiddenHandler));
        registry.register(Arc::new(TwitterHandler::new(
            http.clone(),
            config.apis.twitter_bearer.clone(),
        )));
        registry.register(Arc::new(YouTubeHandler::new(
            http.clone(),
            config.apis.youtube_api_key.clone(),
        )));
        registry.register(Arc::new(GitHubHandler::new(
            http.clone(),
            config.apis.github_token.clone(),
        )));
        registry.register(Arc::new(NewsHandler::new(http.clone(), Arc::clone(&robots))));
        registry.register(Arc::new(WebsiteHandler::new(http, robots)));
        registry
    }

    /// Append a handler; earlier handlers take precedence.
    pub fn register(&mut self, handler: Arc<dyn LinkHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    fn handler_for(&self, url: &Url) -> Option<&Arc<dyn LinkHandler>> {
        self.handlers.iter().find(|h| h.can_handle(url))
    }

    /// Process one URL. Never fails: problems become `ERROR` results.
    pub async fn process(&self, raw_url: &str) -> LinkResult {
        let url = match Url::parse(raw_url) {
            Ok(url) => url,
            Err(e) => return LinkResult::error(raw_url, format!("Invalid URL: {}", e)),
        };
        let Some(handler) = self.handler_for(&url) else {
            return LinkResult::error(raw_url, "No handler accepts this URL");
        };

        let key = format!("{}:{}", handler.name(), url);
        if let Some(cache) = &self.cache {
            match cache.get::<LinkResult>(&key, CacheCategory::Handlers).await {
                Ok(Some(hit)) => {
                    log::debug!("Cache hit for {}", url);
                    return hit;
                }
                Ok(None) => {}
                Err(e) => log::warn!("Cache read failed for {}: {}", url, e),
            }
        }

        if handler.fetches() {
            if let (Some(limiter), Some(host)) = (&self.limiter, url.host_str()) {
                limiter.acquire(host).await;
            }
        }

        log::debug!("Processing {} with {} handler", url, handler.name());
        let result = match handler.process(&url).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("{} handler failed for {}: {}", handler.name(), url, e);
                LinkResult::error(url.as_str(), e.to_string())
            }
        };

        if result.status != LinkStatus::Error {
            if let Some(cache) = &self.cache {
                if let Err(e) = cache.set(&key, &result, CacheCategory::Handlers).await {
                    log::warn!("Cache write failed for {}: {}", url, e);
                }
            }
        }
        result
    }
}

pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Trimmed, whitespace-collapsed text of the first match.
pub(crate) fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|t| !t.is_empty())
}

/// `content` attribute of the first matching `<meta>` tag.
pub(crate) fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

/// Lowercased text of the page, without scripts and styles.
pub(crate) fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    for node in document.tree.nodes() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element())
            .is_some_and(|el| matches!(el.name(), "script" | "style" | "noscript" | "template"));
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    out.to_lowercase()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use super::*;
    use tempfile::TempDir;

    struct CountingHandler {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl LinkHandler for CountingHandler {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn can_handle(&self, url: &Url) -> bool {
            url.host_str() == Some("example.com")
        }

        async fn process(&self, url: &Url) -> Result<LinkResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::handler(url.as_str(), "boom"));
            }
            Ok(LinkResult::ok("example.com", url.as_str(), vec!["Title: Example".into()], vec![]))
        }
    }

    fn registry(dir: &TempDir, fail: bool) -> (HandlerRegistry, Arc<CountingHandler>) {
        let cache = Arc::new(FileCache::new(dir.path(), Duration::from_secs(60)));
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
            fail,
        });
        let mut registry = HandlerRegistry::new(Some(cache));
        registry.register(Arc::new(ForbiddenHandler));
        registry.register(handler.clone());
        (registry, handler)
    }

    #[tokio::test]
    async fn test_linkedin_is_skipped() {
        let dir = TempDir::new().unwrap();
        let (registry, handler) = registry(&dir, false);
        let result = registry.process("https://www.linkedin.com/in/someone").await;
        assert_eq!(result.status, LinkStatus::SkippedTos);
        assert_eq!(result.source, "www.linkedin.com");
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_results_are_cached() {
        let dir = TempDir::new().unwrap();
        let (registry, handler) = registry(&dir, false);
        let first = registry.process("https://example.com/").await;
        let second = registry.process("https://example.com/").await;
        assert!(first.is_ok());
        assert_eq!(first, second);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let dir = TempDir::new().unwrap();
        let (registry, handler) = registry(&dir, true);
        let result = registry.process("https://example.com/").await;
        assert_eq!(result.status, LinkStatus::Error);
        assert!(result.error.as_deref().unwrap().contains("boom"));
        registry.process("https://example.com/").await;
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unhandled_and_invalid_urls() {
        let dir = TempDir::new().unwrap();
        let (registry, _) = registry(&dir, false);
        assert_eq!(registry.process("https://other.org").await.status, LinkStatus::Error);
        assert_eq!(registry.process("not a url").await.status, LinkStatus::Error);
    }

    #[tokio::test]
    async fn test_cache_hits_and_skips_do_not_wait() {
        let dir = TempDir::new().unwrap();
        let (mut registry, handler) = registry(&dir, false);
        registry.set_limiter(Arc::new(DomainRateLimiter::new(Duration::from_secs(60))));

        let started = Instant::now();
        registry.process("https://example.com/").await;
        registry.process("https://example.com/").await;
        registry.process("https://www.linkedin.com/in/a").await;
        registry.process("https://www.linkedin.com/in/b").await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_fetching_handlers_are_spaced() {
        let dir = TempDir::new().unwrap();
        let (mut registry, handler) = registry(&dir, false);
        registry.set_limiter(Arc::new(DomainRateLimiter::new(Duration::from_millis(200))));

        let started = Instant::now();
        registry.process("https://example.com/a").await;
        registry.process("https://example.com/b").await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn test_standard_chain_order() {
        let http = HttpClient::new(&Config::default().http).unwrap();
        let registry = HandlerRegistry::from_config(&Config::default(), http, None);
        assert_eq!(
            registry.handler_names(),
            vec!["forbidden", "twitter", "youtube", "github", "news", "website"]
        );
    }

    #[test]
    fn test_visible_text_skips_scripts() {
        let doc = Html::parse_document(
            "<html><head><script>var pricing = 1;</script><style>.x{}</style></head>\
             <body><p>Contact Us</p></body></html>",
        );
        let text = visible_text(&doc);
        assert!(text.contains("contact us"));
        assert!(!text.contains("pricing"));
    }
}
