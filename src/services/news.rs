// src/services/news.rs

//! News articles, press releases and blog posts.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::{LinkHandler, RobotsChecker, first_text, meta_content, parse_selector, visible_text};
use crate::error::Result;
use crate::models::{LinkResult, Platform};
use crate::utils::http::HttpClient;
use crate::utils::text::{squash_whitespace, truncate};
use crate::utils::url::classify_url;

const NEWS_DOMAINS: &[&str] = &[
    "techcrunch.com",
    "venturebeat.com",
    "techradar.com",
    "engadget.com",
    "theverge.com",
    "wired.com",
    "arstechnica.com",
    "reuters.com",
    "bloomberg.com",
    "wsj.com",
    "nytimes.com",
    "washingtonpost.com",
    "forbes.com",
    "businessinsider.com",
    "cnbc.com",
    "cnn.com",
    "bbc.com",
    "guardian.co.uk",
    "independent.co.uk",
];

const BUSINESS_DOMAINS: &[&str] = &[
    "techcrunch.com",
    "venturebeat.com",
    "bloomberg.com",
    "wsj.com",
    "forbes.com",
    "businessinsider.com",
    "cnbc.com",
    "reuters.com",
];

const PATH_KEYWORDS: &[&str] = &[
    "news",
    "article",
    "story",
    "blog",
    "post",
    "press",
    "announcement",
    "update",
    "release",
];

const BUSINESS_EVENTS: &[(&str, &str)] = &[
    ("funding", "Mentions funding/investment"),
    ("acquisition", "Mentions acquisition/merger"),
    ("ipo", "Mentions IPO/public offering"),
    ("partnership", "Mentions partnerships"),
    ("launch", "Product/service launch"),
    ("expansion", "Business expansion"),
    ("hiring", "Hiring/team growth"),
];

const TECH_TERMS: &[&str] = &[
    "ai",
    "artificial intelligence",
    "machine learning",
    "blockchain",
    "cloud",
    "saas",
];

/// Articles published this many days ago or less count as recent.
const RECENT_DAYS: i64 = 90;

static NEWS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/(news|article|story|blog|post|press-release|announcement|update)/")
        .expect("valid news path regex")
});

struct ArticleSelectors {
    titles: Vec<Selector>,
    json_ld: Selector,
    date_meta: Vec<Selector>,
    time: Selector,
    authors: Vec<Selector>,
    author_meta: Selector,
    summaries: Vec<Selector>,
    first_paragraphs: Vec<Selector>,
    list_items: Selector,
    subheadings: Selector,
}

fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .map(|s| parse_selector(s).expect("valid article selector"))
        .collect()
}

static SELECTORS: LazyLock<ArticleSelectors> = LazyLock::new(|| ArticleSelectors {
    titles: selectors(&[
        r#"h1[class*="title"]"#,
        r#"h1[class*="headline"]"#,
        ".article-title",
        ".post-title",
        ".entry-title",
        "h1",
        "title",
    ]),
    json_ld: parse_selector(r#"script[type="application/ld+json"]"#).expect("valid json-ld selector"),
    date_meta: selectors(&[
        r#"meta[property="article:published_time"]"#,
        r#"meta[name="publishdate"]"#,
        r#"meta[name="date"]"#,
        r#"meta[property="og:updated_time"]"#,
    ]),
    time: parse_selector("time[datetime]").expect("valid time selector"),
    authors: selectors(&[
        ".author-name",
        ".byline-author",
        r#"[rel="author"]"#,
        ".post-author",
        ".article-author",
    ]),
    author_meta: parse_selector(r#"meta[name="author"]"#).expect("valid author selector"),
    summaries: selectors(&[
        ".article-summary",
        ".post-excerpt",
        ".entry-summary",
        ".article-lead",
        ".intro-text",
    ]),
    first_paragraphs: selectors(&[
        ".article-content p:first-of-type",
        ".post-content p:first-of-type",
        ".entry-content p:first-of-type",
        "article p:first-of-type",
    ]),
    list_items: parse_selector("article li, .article-content li, .post-content li")
        .expect("valid list selector"),
    subheadings: parse_selector("article h2, article h3, .article-content h2, .article-content h3")
        .expect("valid subheading selector"),
});

pub struct NewsHandler {
    http: HttpClient,
    robots: Arc<RobotsChecker>,
}

impl NewsHandler {
    pub fn new(http: HttpClient, robots: Arc<RobotsChecker>) -> Self {
        Self { http, robots }
    }

    /// Known news host, article-like path pattern or path keyword.
    pub fn looks_like_article(url: &Url) -> bool {
        let host = url.host_str().unwrap_or("").to_lowercase();
        let path = url.path().to_lowercase();
        classify_url(url.as_str()) == Platform::News
            || NEWS_DOMAINS.iter().any(|d| host.contains(d))
            || NEWS_PATH.is_match(url.as_str())
            || PATH_KEYWORDS.iter().any(|k| path.contains(k))
    }
}

#[async_trait]
impl LinkHandler for NewsHandler {
    fn name(&self) -> &'static str {
        "news"
    }

    fn can_handle(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https") && Self::looks_like_article(url)
    }

    async fn process(&self, url: &Url) -> Result<LinkResult> {
        if !self.robots.can_fetch(url).await {
            return Ok(LinkResult::skipped(url.as_str(), "Blocked by robots.txt"));
        }
        let html = self.http.get_text(url.as_str()).await?;
        let host = url.host_str().unwrap_or("unknown").to_lowercase();
        Ok(analyze_article(url.as_str(), &host, &html, Utc::now().date_naive()))
    }
}

/// Summarize an article page. `today` anchors the recency signal.
pub fn analyze_article(url: &str, host: &str, html: &str, today: NaiveDate) -> LinkResult {
    let document = Html::parse_document(html);
    let sel = &*SELECTORS;
    let mut key_points = Vec::new();
    let mut signals = Vec::new();

    if let Some(title) = sel.titles.iter().find_map(|s| first_text(&document, s)) {
        key_points.push(format!("Title: {}", truncate(&title, 100)));
    }

    if let Some(published) = publish_date(&document, sel) {
        if is_recent(&published, today) {
            signals.push(format!("Recent publication (within {} days)", RECENT_DAYS));
        }
        key_points.push(format!("Published: {}", published));
    }

    let author = sel
        .authors
        .iter()
        .find_map(|s| first_text(&document, s))
        .or_else(|| meta_content(&document, &sel.author_meta));
    if let Some(author) = author {
        key_points.push(format!("Author: {}", author));
    }

    if let Some(summary) = content_summary(&document, sel) {
        key_points.push(format!("Summary: {}", truncate(&summary, 150)));
    }

    key_points.extend(
        takeaways(&document, sel)
            .iter()
            .take(3)
            .map(|t| format!("Takeaway: {}", truncate(t, 80))),
    );

    let text = visible_text(&document);
    signals.extend(content_signals(&text).into_iter().take(3));

    if BUSINESS_DOMAINS.iter().any(|d| host.contains(d)) {
        signals.push("Business/tech publication".to_string());
    }

    LinkResult::ok(host, url, key_points, signals)
}

fn publish_date(document: &Html, sel: &ArticleSelectors) -> Option<String> {
    let from_json_ld = document.select(&sel.json_ld).next().and_then(|script| {
        let raw: String = script.text().collect();
        let value: serde_json::Value = serde_json::from_str(&raw).ok()?;
        let value = match value {
            serde_json::Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            other => other,
        };
        value
            .get("datePublished")
            .or_else(|| value.get("dateCreated"))
            .and_then(|d| d.as_str())
            .map(format_date)
    });

    from_json_ld
        .or_else(|| {
            sel.date_meta
                .iter()
                .find_map(|s| meta_content(document, s))
                .map(|d| format_date(&d))
        })
        .or_else(|| {
            document
                .select(&sel.time)
                .filter_map(|el| el.value().attr("datetime"))
                .find(|d| !d.trim().is_empty())
                .map(format_date)
        })
}

/// `YYYY-MM-DD` when the value starts with a date, else its first ten characters.
fn format_date(raw: &str) -> String {
    let raw = raw.trim();
    let head: String = raw.chars().take(10).collect();
    match NaiveDate::parse_from_str(&head, "%Y-%m-%d") {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => head,
    }
}

fn is_recent(date: &str, today: NaiveDate) -> bool {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| (today - d).num_days() <= RECENT_DAYS)
        .unwrap_or(false)
}

fn content_summary(document: &Html, sel: &ArticleSelectors) -> Option<String> {
    sel.summaries
        .iter()
        .find_map(|s| first_text(document, s))
        .or_else(|| {
            sel.first_paragraphs
                .iter()
                .filter_map(|s| first_text(document, s))
                .find(|p| p.chars().count() > 50)
        })
}

fn takeaways(document: &Html, sel: &ArticleSelectors) -> Vec<String> {
    let mut items: Vec<String> = document
        .select(&sel.list_items)
        .take(5)
        .map(|el| squash_whitespace(&el.text().collect::<String>()))
        .filter(|t| (21..200).contains(&t.chars().count()))
        .collect();

    if items.len() < 3 {
        items.extend(
            document
                .select(&sel.subheadings)
                .take(3)
                .map(|el| squash_whitespace(&el.text().collect::<String>()))
                .filter(|t| (11..100).contains(&t.chars().count())),
        );
    }
    items
}

fn content_signals(text: &str) -> Vec<String> {
    let mut signals: Vec<String> = BUSINESS_EVENTS
        .iter()
        .filter(|(keyword, _)| text.contains(keyword))
        .map(|(_, signal)| signal.to_string())
        .collect();

    if TECH_TERMS.iter().filter(|t| text.contains(*t)).count() >= 2 {
        signals.push("Technology-focused content".to_string());
    }
    signals
}
