// src/services/youtube.rs

//! YouTube channels through the Data API v3.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use url::Url;

use super::LinkHandler;
use crate::error::{AppError, Result};
use crate::models::{LinkResult, Platform};
use crate::utils::http::HttpClient;
use crate::utils::text::{format_number, truncate, with_commas};
use crate::utils::url::classify_url;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

const THEME_KEYWORDS: &[&str] = &[
    "tutorial",
    "how to",
    "review",
    "tips",
    "guide",
    "business",
    "marketing",
    "strategy",
    "course",
    "launch",
    "announcement",
    "new",
];

/// How a URL identifies its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    Id(String),
    /// `@handle` URLs
    Handle(String),
    /// Legacy `user/` and `c/` URLs
    Username(String),
    /// A video; the channel is looked up from it
    Video(String),
}

#[derive(Debug, Deserialize)]
struct ItemList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub snippet: ChannelSnippet,
    #[serde(default)]
    pub statistics: ChannelStatistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub custom_url: String,
}

/// The API returns counts as strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    #[serde(default, deserialize_with = "count")]
    pub subscriber_count: u64,
    #[serde(default, deserialize_with = "count")]
    pub video_count: u64,
    #[serde(default, deserialize_with = "count")]
    pub view_count: u64,
}

#[derive(Debug, Deserialize)]
struct Video {
    snippet: VideoSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    channel_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub snippet: SearchSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnippet {
    #[serde(default)]
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
}

fn count<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }
    Ok(match Count::deserialize(deserializer)? {
        Count::Number(n) => n,
        Count::Text(s) => s.parse().unwrap_or(0),
    })
}

pub struct YouTubeHandler {
    http: HttpClient,
    api_key: Option<String>,
}

impl YouTubeHandler {
    pub fn new(http: HttpClient, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    async fn list<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        key: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("key", key.to_string()));
        let url = format!("{}/{}", API_BASE, endpoint);
        let list: ItemList<T> = self.http.get_json(&url, &query, None).await?;
        Ok(list.items)
    }

    async fn channel(&self, reference: &ChannelRef, key: &str) -> Result<Channel> {
        let part = ("part", "snippet,statistics,brandingSettings".to_string());
        let selector = match reference {
            ChannelRef::Id(id) => ("id", id.clone()),
            ChannelRef::Handle(handle) => ("forHandle", handle.clone()),
            ChannelRef::Username(name) => ("forUsername", name.clone()),
            ChannelRef::Video(video_id) => {
                let videos: Vec<Video> = self
                    .list("videos", key, &[("part", "snippet".to_string()), ("id", video_id.clone())])
                    .await?;
                let video = videos.into_iter().next().ok_or_else(|| {
                    AppError::handler("youtube", format!("video {} not found", video_id))
                })?;
                ("id", video.snippet.channel_id)
            }
        };

        self.list::<Channel>("channels", key, &[part, selector])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::handler("youtube", format!("channel not found for {:?}", reference)))
    }

    async fn recent_videos(&self, channel_id: &str, key: &str) -> Vec<SearchItem> {
        let params = [
            ("part", "snippet".to_string()),
            ("channelId", channel_id.to_string()),
            ("order", "date".to_string()),
            ("maxResults", "5".to_string()),
            ("type", "video".to_string()),
        ];
        match self.list("search", key, &params).await {
            Ok(items) => items,
            Err(e) => {
                log::warn!("Could not list videos for channel {}: {}", channel_id, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl LinkHandler for YouTubeHandler {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn can_handle(&self, url: &Url) -> bool {
        classify_url(url.as_str()) == Platform::YouTube
    }

    fn fetches(&self) -> bool {
        self.api_key.is_some()
    }

    async fn process(&self, url: &Url) -> Result<LinkResult> {
        let Some(key) = self.api_key.as_deref() else {
            return Ok(LinkResult::skipped(url.as_str(), "No YouTube API key available"));
        };
        let reference = channel_ref(url).ok_or_else(|| {
            AppError::handler(url.as_str(), "could not extract channel information")
        })?;

        let channel = self.channel(&reference, key).await?;
        let videos = self.recent_videos(&channel.id, key).await;
        Ok(summarize(url.as_str(), &channel, &videos, Utc::now()))
    }
}

pub fn channel_ref(url: &Url) -> Option<ChannelRef> {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    let host = url.host_str().unwrap_or("").to_lowercase();

    match segments.as_slice() {
        ["channel", id, ..] => Some(ChannelRef::Id(id.to_string())),
        [first, ..] if first.starts_with('@') && first.len() > 1 => {
            Some(ChannelRef::Handle(first.to_string()))
        }
        ["user" | "c", name, ..] => Some(ChannelRef::Username(name.to_string())),
        ["watch", ..] => url
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| ChannelRef::Video(v.into_owned())),
        ["embed" | "shorts" | "live", id, ..] => Some(ChannelRef::Video(id.to_string())),
        [id] if host == "youtu.be" => Some(ChannelRef::Video(id.to_string())),
        _ => None,
    }
}

pub fn summarize(url: &str, channel: &Channel, videos: &[SearchItem], now: DateTime<Utc>) -> LinkResult {
    let mut key_points = Vec::new();
    let mut signals = Vec::new();
    let snippet = &channel.snippet;
    let stats = &channel.statistics;

    if !snippet.title.is_empty() {
        key_points.push(format!("Channel: {}", snippet.title));
    }
    if !snippet.custom_url.is_empty() {
        key_points.push(format!("Handle: {}", snippet.custom_url));
    }
    if !snippet.description.is_empty() {
        let first_sentence = snippet.description.split('.').next().unwrap_or("");
        key_points.push(format!("About: {}", truncate(first_sentence.trim(), 100)));
    }

    if stats.subscriber_count > 0 {
        key_points.push(format!("Subscribers: {}", format_number(stats.subscriber_count)));
    }
    key_points.push(format!(
        "Videos: {}, Views: {}",
        with_commas(stats.video_count),
        format_number(stats.view_count)
    ));

    if stats.subscriber_count > 100_000 {
        signals.push("Large channel (100k+ subscribers)".to_string());
    } else if stats.subscriber_count > 10_000 {
        signals.push("Medium channel (10k+ subscribers)".to_string());
    } else if stats.subscriber_count > 1_000 {
        signals.push("Growing channel (1k+ subscribers)".to_string());
    }
    if stats.video_count > 50 {
        signals.push("Active content creator (50+ videos)".to_string());
    }

    let titles: Vec<String> = videos
        .iter()
        .take(3)
        .map(|v| v.snippet.title.trim())
        .filter(|t| !t.is_empty())
        .map(|t| truncate(t, 60))
        .collect();

    if !titles.is_empty() {
        for (i, title) in titles.iter().enumerate() {
            key_points.push(format!("Recent video {}: {}", i + 1, title));
        }

        let all_titles = titles.join(" ").to_lowercase();
        let themes: Vec<&str> = THEME_KEYWORDS
            .iter()
            .copied()
            .filter(|k| all_titles.contains(k))
            .take(3)
            .collect();
        if !themes.is_empty() {
            signals.push(format!("Content themes: {}", themes.join(", ")));
        }

        if let Some(published) = videos.first().and_then(|v| v.snippet.published_at) {
            let days = (now - published).num_days();
            if days <= 7 {
                signals.push("Very recent activity (within 7 days)".to_string());
            } else if days <= 30 {
                signals.push("Recent activity (within 30 days)".to_string());
            }
        }
    }

    LinkResult::ok("YouTube", url, key_points, signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference(u: &str) -> Option<ChannelRef> {
        channel_ref(&Url::parse(u).unwrap())
    }

    #[test]
    fn test_channel_ref() {
        assert_eq!(
            reference("https://www.youtube.com/channel/UC123abc"),
            Some(ChannelRef::Id("UC123abc".into()))
        );
        assert_eq!(
            reference("https://www.youtube.com/@acme/videos"),
            Some(ChannelRef::Handle("@acme".into()))
        );
        assert_eq!(
            reference("https://youtube.com/user/acmecorp"),
            Some(ChannelRef::Username("acmecorp".into()))
        );
        assert_eq!(
            reference("https://youtube.com/c/AcmeCorp"),
            Some(ChannelRef::Username("AcmeCorp".into()))
        );
        assert_eq!(
            reference("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10"),
            Some(ChannelRef::Video("dQw4w9WgXcQ".into()))
        );
        assert_eq!(
            reference("https://youtu.be/dQw4w9WgXcQ"),
            Some(ChannelRef::Video("dQw4w9WgXcQ".into()))
        );
        assert_eq!(
            reference("https://www.youtube.com/embed/abc"),
            Some(ChannelRef::Video("abc".into()))
        );
        assert_eq!(reference("https://www.youtube.com/"), None);
    }

    #[test]
    fn test_statistics_accept_strings() {
        let channel: Channel = serde_json::from_str(
            r#"{"id": "UC1", "statistics": {"subscriberCount": "12500", "videoCount": 80, "viewCount": "bad"}}"#,
        )
        .unwrap();
        assert_eq!(channel.statistics.subscriber_count, 12_500);
        assert_eq!(channel.statistics.video_count, 80);
        assert_eq!(channel.statistics.view_count, 0);
    }

    #[test]
    fn test_summarize() {
        let channel: Channel = serde_json::from_str(
            r#"{"id": "UC1",
                "snippet": {"title": "Acme", "customUrl": "@acme", "description": "Automation tips. Weekly."},
                "statistics": {"subscriberCount": "250000", "videoCount": "120", "viewCount": "3400000"}}"#,
        )
        .unwrap();
        let videos: Vec<SearchItem> = serde_json::from_str(
            r#"[{"snippet": {"title": "How to automate invoices", "publishedAt": "2024-05-28T12:00:00Z"}},
                {"snippet": {"title": "Product launch recap", "publishedAt": "2024-05-01T12:00:00Z"}}]"#,
        )
        .unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let result = summarize("https://youtube.com/@acme", &channel, &videos, now);
        assert_eq!(result.source, "YouTube");
        assert_eq!(
            result.key_points,
            vec![
                "Channel: Acme",
                "Handle: @acme",
                "About: Automation tips",
                "Subscribers: 250.0K",
                "Videos: 120, Views: 3.4M",
                "Recent video 1: How to automate invoices",
                "Recent video 2: Product launch recap",
            ]
        );
        assert_eq!(
            result.signals,
            vec![
                "Large channel (100k+ subscribers)",
                "Active content creator (50+ videos)",
                "Content themes: how to, launch",
                "Very recent activity (within 7 days)",
            ]
        );
    }
}
