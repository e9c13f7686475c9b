// src/services/twitter.rs

//! Twitter/X profiles through the v2 API.
//!
//! Scraping is not permitted, so without a bearer token every URL is skipped.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use url::Url;

use super::LinkHandler;
use crate::error::{AppError, Result};
use crate::models::{LinkResult, Platform};
use crate::utils::http::HttpClient;
use crate::utils::text::{truncate, with_commas};
use crate::utils::url::classify_url;

const API_BASE: &str = "https://api.twitter.com/2";

/// First path segments that are app pages, not profiles.
const RESERVED_PATHS: &[&str] = &[
    "home",
    "explore",
    "notifications",
    "messages",
    "bookmarks",
    "lists",
    "profile",
    "more",
    "compose",
    "settings",
    "help",
    "login",
    "signup",
    "i",
    "search",
    "intent",
];

const BUSINESS_KEYWORDS: &[&str] = &[
    "hiring",
    "job",
    "position",
    "team",
    "launch",
    "product",
    "announcement",
    "partnership",
    "funding",
    "growth",
];

static TWEET_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid tweet url regex"));
static TWEET_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\w+").expect("valid mention regex"));

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TwitterUser {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub public_metrics: UserMetrics,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserMetrics {
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub tweet_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct Tweet {
    #[serde(default)]
    pub text: String,
}

pub struct TwitterHandler {
    http: HttpClient,
    bearer: Option<String>,
}

impl TwitterHandler {
    pub fn new(http: HttpClient, bearer: Option<String>) -> Self {
        Self { http, bearer }
    }

    async fn user(&self, username: &str, bearer: &str) -> Result<TwitterUser> {
        let url = format!("{}/users/by/username/{}", API_BASE, username);
        let query = [(
            "user.fields",
            "id,username,name,description,location,public_metrics,created_at,verified,url"
                .to_string(),
        )];
        let envelope: Envelope<TwitterUser> = self.http.get_json(&url, &query, Some(bearer)).await?;
        envelope
            .data
            .ok_or_else(|| AppError::handler("twitter", format!("user @{} not found", username)))
    }

    async fn recent_tweets(&self, user_id: &str, bearer: &str) -> Vec<Tweet> {
        let url = format!("{}/users/{}/tweets", API_BASE, user_id);
        let query = [
            ("tweet.fields", "id,text,created_at,public_metrics,lang".to_string()),
            ("max_results", "10".to_string()),
            ("exclude", "retweets".to_string()),
        ];
        match self.http.get_json::<Envelope<Vec<Tweet>>>(&url, &query, Some(bearer)).await {
            Ok(envelope) => envelope.data.unwrap_or_default(),
            Err(e) => {
                log::warn!("Could not fetch tweets for user {}: {}", user_id, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl LinkHandler for TwitterHandler {
    fn name(&self) -> &'static str {
        "twitter"
    }

    fn can_handle(&self, url: &Url) -> bool {
        classify_url(url.as_str()) == Platform::Twitter
    }

    fn fetches(&self) -> bool {
        self.bearer.is_some()
    }

    async fn process(&self, url: &Url) -> Result<LinkResult> {
        let Some(bearer) = self.bearer.as_deref() else {
            return Ok(LinkResult::skipped(
                url.as_str(),
                "No Twitter API token (ToS compliance - scraping not allowed)",
            ));
        };
        let username = extract_username(url)
            .ok_or_else(|| AppError::handler(url.as_str(), "could not extract username"))?;

        let user = self.user(&username, bearer).await?;
        let tweets = self.recent_tweets(&user.id, bearer).await;
        Ok(summarize(url.as_str(), &user, &tweets))
    }
}

/// Handle from a profile URL or an `intent/user?screen_name=` link.
pub fn extract_username(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let first = segments.next()?;

    if first.eq_ignore_ascii_case("intent") {
        return url
            .query_pairs()
            .find(|(k, _)| k == "screen_name")
            .map(|(_, v)| v.trim_start_matches('@').to_string())
            .filter(|v| !v.is_empty());
    }
    if RESERVED_PATHS.contains(&first.to_lowercase().as_str()) {
        return None;
    }
    let name = first.trim_start_matches('@');
    (!name.is_empty()).then(|| name.to_string())
}

/// Replace links and mentions so tweet text is safe to quote.
fn clean_tweet(text: &str) -> String {
    let text = TWEET_URL.replace_all(text, "[URL]");
    TWEET_MENTION.replace_all(&text, "[USER]").into_owned()
}

pub fn summarize(url: &str, user: &TwitterUser, tweets: &[Tweet]) -> LinkResult {
    let mut key_points = Vec::new();
    let mut signals = Vec::new();

    if !user.name.is_empty() {
        key_points.push(format!("Name: {} (@{})", user.name, user.username));
    }
    if !user.description.is_empty() {
        key_points.push(format!("Bio: {}", truncate(&user.description, 120)));
    }
    if !user.location.is_empty() {
        key_points.push(format!("Location: {}", user.location));
    }

    let metrics = &user.public_metrics;
    key_points.push(format!(
        "Metrics: {} followers, {} tweets",
        with_commas(metrics.followers_count),
        with_commas(metrics.tweet_count)
    ));

    if user.verified {
        signals.push("Verified account".to_string());
    }
    if metrics.followers_count > 10_000 {
        signals.push("High follower count (10k+)".to_string());
    } else if metrics.followers_count > 1_000 {
        signals.push("Good follower count (1k+)".to_string());
    }

    let recent: Vec<String> = tweets
        .iter()
        .take(3)
        .map(|t| t.text.trim())
        .filter(|t| !t.is_empty() && !t.starts_with("RT @"))
        .map(|t| truncate(&clean_tweet(t), 80))
        .collect();

    if !recent.is_empty() {
        for (i, text) in recent.iter().enumerate() {
            key_points.push(format!("Recent tweet {}: {}", i + 1, text));
        }

        let all_text = tweets
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        signals.extend(
            BUSINESS_KEYWORDS
                .iter()
                .filter(|k| all_text.contains(*k))
                .map(|k| format!("Recent tweets mention {}", k)),
        );
        if tweets.len() >= 5 {
            signals.push("Active on Twitter (5+ recent tweets)".to_string());
        }
    }

    LinkResult::ok("Twitter/X", url, key_points, signals)
}
