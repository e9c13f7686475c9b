// src/services/website.rs

//! Generic company website handler.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use super::{LinkHandler, RobotsChecker, first_text, meta_content, parse_selector, visible_text};
use crate::error::Result;
use crate::models::LinkResult;
use crate::utils::http::HttpClient;
use crate::utils::text::{squash_whitespace, title_case, truncate};

const PRICING_KEYWORDS: &[&str] = &[
    "pricing",
    "plans",
    "subscribe",
    "contact sales",
    "get started",
    "free trial",
    "demo",
    "quote",
    "buy now",
    "purchase",
];

const HIRING_KEYWORDS: &[&str] = &[
    "we're hiring",
    "join our team",
    "careers",
    "job openings",
    "open positions",
    "work with us",
];

const TECH_KEYWORDS: &[&str] = &[
    "api",
    "integration",
    "developer",
    "technical",
    "saas",
    "platform",
    "software",
    "solution",
    "automation",
];

const CONTACT_KEYWORDS: &[&str] = &["contact", "get in touch", "reach out"];

const RECENT_SELECTORS: &[&str] = &[
    "article h2",
    "article h3",
    ".blog-post h2",
    ".blog-post h3",
    ".news h2",
    ".news h3",
    ".post-title",
    ".article-title",
];

struct PageSelectors {
    title: Selector,
    description: Selector,
    og_description: Selector,
    headings: Selector,
    recent: Vec<Selector>,
}

static SELECTORS: LazyLock<PageSelectors> = LazyLock::new(|| PageSelectors {
    title: parse_selector("title").expect("valid title selector"),
    description: parse_selector(r#"meta[name="description"]"#).expect("valid meta selector"),
    og_description: parse_selector(r#"meta[property="og:description"]"#)
        .expect("valid og selector"),
    headings: parse_selector("h1, h2").expect("valid heading selector"),
    recent: RECENT_SELECTORS
        .iter()
        .map(|s| parse_selector(s).expect("valid recent-content selector"))
        .collect(),
});

/// Fallback handler for any http(s) page.
pub struct WebsiteHandler {
    http: HttpClient,
    robots: Arc<RobotsChecker>,
}

impl WebsiteHandler {
    pub fn new(http: HttpClient, robots: Arc<RobotsChecker>) -> Self {
        Self { http, robots }
    }
}

#[async_trait]
impl LinkHandler for WebsiteHandler {
    fn name(&self) -> &'static str {
        "website"
    }

    fn can_handle(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
    }

    async fn process(&self, url: &Url) -> Result<LinkResult> {
        if !self.robots.can_fetch(url).await {
            return Ok(LinkResult::skipped(url.as_str(), "Blocked by robots.txt"));
        }
        let html = self.http.get_text(url.as_str()).await?;
        let host = url.host_str().unwrap_or("unknown");
        Ok(analyze_page(url.as_str(), host, &html))
    }
}

/// Extract key points and outreach signals from a fetched page.
pub fn analyze_page(url: &str, host: &str, html: &str) -> LinkResult {
    let document = Html::parse_document(html);
    let sel = &*SELECTORS;
    let mut key_points = Vec::new();

    if let Some(title) = first_text(&document, &sel.title) {
        key_points.push(format!("Title: {}", truncate(&title, 100)));
    }

    let description = meta_content(&document, &sel.description)
        .or_else(|| meta_content(&document, &sel.og_description));
    if let Some(description) = description {
        key_points.push(format!("Description: {}", truncate(&description, 150)));
    }

    let headings: Vec<String> = document
        .select(&sel.headings)
        .take(6)
        .map(|el| squash_whitespace(&el.text().collect::<String>()))
        .filter(|t| t.chars().count() > 3)
        .collect();
    key_points.extend(
        headings
            .iter()
            .take(3)
            .map(|h| format!("Section: {}", truncate(h, 80))),
    );

    let text = visible_text(&document);
    let signals = business_signals(&text);

    let recent = recent_content(&document, &sel.recent);
    key_points.extend(recent.into_iter().take(2));

    LinkResult::ok(host, url, key_points, signals)
}

fn business_signals(text: &str) -> Vec<String> {
    let mut signals = Vec::new();

    if let Some(keyword) = PRICING_KEYWORDS.iter().find(|k| text.contains(*k)) {
        signals.push(format!("Has {} content", title_case(keyword)));
    }
    if HIRING_KEYWORDS.iter().any(|k| text.contains(k)) {
        signals.push("Currently hiring".to_string());
    }
    if TECH_KEYWORDS.iter().filter(|k| text.contains(*k)).count() >= 3 {
        signals.push("Technology-focused company".to_string());
    }
    if CONTACT_KEYWORDS.iter().any(|k| text.contains(k)) {
        signals.push("Easy to contact".to_string());
    }

    signals.truncate(4);
    signals
}

fn recent_content(document: &Html, selectors: &[Selector]) -> Vec<String> {
    let mut items = Vec::new();
    for selector in selectors {
        for el in document.select(selector).take(3) {
            let text = squash_whitespace(&el.text().collect::<String>());
            if text.chars().count() > 10 {
                items.push(format!("Recent: {}", truncate(&text, 60)));
            }
        }
    }
    items.truncate(3);
    items
}
