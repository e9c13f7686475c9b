// src/pipeline/scoring.rs

//! Deterministic weighted lead scoring.
//!
//! Five dimensions are each scored 0-100 from the text of successful link
//! results and combined with fixed weights:
//!
//! | Dimension       | Weight |
//! |-----------------|--------|
//! | relevance       | 30     |
//! | purchase intent | 25     |
//! | authority       | 20     |
//! | recency         | 15     |
//! | data quality    | 10     |

use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::Regex;

use crate::models::LinkResult;
use crate::utils::text::with_commas;

const WEIGHT_RELEVANCE: u32 = 30;
const WEIGHT_INTENT: u32 = 25;
const WEIGHT_AUTHORITY: u32 = 20;
const WEIGHT_RECENCY: u32 = 15;
const WEIGHT_QUALITY: u32 = 10;

const MAX_NOTES: usize = 5;

const RELEVANCE_HIGH: &[&str] = &[
    "saas",
    "software",
    "technology",
    "digital",
    "automation",
    "platform",
    "api",
    "integration",
    "cloud",
    "data",
    "analytics",
    "marketing",
    "sales",
    "crm",
    "lead generation",
];
const RELEVANCE_MEDIUM: &[&str] = &[
    "business",
    "service",
    "solution",
    "consulting",
    "agency",
    "startup",
    "company",
    "organization",
];

const INTENT_HIGH: &[&str] = &[
    "pricing",
    "plans",
    "contact sales",
    "get started",
    "free trial",
    "demo",
    "quote",
    "buy now",
    "purchase",
    "subscription",
    "upgrade",
    "enterprise",
];
const INTENT_MEDIUM: &[&str] = &[
    "solution",
    "service",
    "product",
    "offering",
    "hire",
    "hiring",
    "looking for",
    "need help",
];

const BUSINESS_SIZE: &[&str] = &["enterprise", "corporation", "inc.", "ltd.", "llc"];
const TEAM_SIZE: &[&str] = &["team of", "employees", "staff", "founded"];

const RECENT_WORDS: &[&str] = &[
    "recent",
    "latest",
    "new",
    "updated",
    "last week",
    "last month",
    "yesterday",
    "today",
];
const RECENT_POSTS: &[&str] = &["recent tweet", "recent video", "recent post", "latest video"];
const RECENT_CONTENT: &[&str] = &["recent:", "published:", "updated:"];

static FOLLOWERS_BEFORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*([km])?\+?\s*followers").expect("valid regex")
});
static FOLLOWERS_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)followers:\s*(\d[\d,]*(?:\.\d+)?)\s*([km])?\b").expect("valid regex")
});
static STARS_BEFORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*)\+?\s*(?:stars\b|⭐)").expect("valid regex")
});
static STARS_AFTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:stars:|⭐)\s*(\d[\d,]*)").expect("valid regex"));

/// Per-dimension scores, each 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub relevance: u32,
    pub purchase_intent: u32,
    pub authority: u32,
    pub recency: u32,
    pub data_quality: u32,
}

impl ScoreBreakdown {
    /// Weighted total, rounded and clamped to 0-100.
    pub fn weighted_total(&self) -> u8 {
        let sum = self.relevance * WEIGHT_RELEVANCE
            + self.purchase_intent * WEIGHT_INTENT
            + self.authority * WEIGHT_AUTHORITY
            + self.recency * WEIGHT_RECENCY
            + self.data_quality * WEIGHT_QUALITY;
        (sum as f64 / 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Final score with its explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadScore {
    pub score: u8,
    pub notes: String,
    pub breakdown: ScoreBreakdown,
}

/// Scores link results against the weighted rubric.
#[derive(Debug, Clone)]
pub struct LeadScorer {
    /// Year treated as "current" for recency keywords
    reference_year: i32,
}

impl Default for LeadScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl LeadScorer {
    pub fn new() -> Self {
        Self::with_reference_year(Utc::now().year())
    }

    pub fn with_reference_year(reference_year: i32) -> Self {
        Self { reference_year }
    }

    pub fn score(&self, results: &[LinkResult]) -> LeadScore {
        let successful: Vec<&LinkResult> = results.iter().filter(|r| r.is_ok()).collect();
        if successful.is_empty() {
            return LeadScore {
                score: 0,
                notes: "No successful data collection".to_string(),
                breakdown: ScoreBreakdown::default(),
            };
        }

        let content = combined_content(&successful).to_lowercase();
        let breakdown = ScoreBreakdown {
            relevance: score_relevance(&content),
            purchase_intent: score_intent(&content),
            authority: score_authority(&content),
            recency: self.score_recency(&content),
            data_quality: score_data_quality(successful.len(), results.len(), &successful),
        };
        let score = breakdown.weighted_total();
        let notes = score_notes(&breakdown, &content, successful.len());

        log::debug!("Calculated lead score: {} ({:?})", score, breakdown);
        LeadScore {
            score,
            notes,
            breakdown,
        }
    }

    fn score_recency(&self, content: &str) -> u32 {
        let this_year = self.reference_year.to_string();
        let last_year = (self.reference_year - 1).to_string();
        let matches = RECENT_WORDS
            .iter()
            .copied()
            .chain([this_year.as_str(), last_year.as_str()])
            .filter(|w| content.contains(w))
            .count();

        if contains_any(content, RECENT_POSTS) {
            85
        } else if contains_any(content, RECENT_CONTENT) {
            70
        } else {
            match matches {
                0 => 10,
                1 => 30,
                2 => 45,
                _ => 60,
            }
        }
    }
}

fn combined_content(results: &[&LinkResult]) -> String {
    results
        .iter()
        .flat_map(|r| r.key_points.iter().chain(r.signals.iter()))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

fn contains_any(content: &str, words: &[&str]) -> bool {
    words.iter().any(|w| content.contains(w))
}

fn count_matches(content: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| content.contains(*w)).count()
}

fn score_relevance(content: &str) -> u32 {
    let high = count_matches(content, RELEVANCE_HIGH);
    let medium = count_matches(content, RELEVANCE_MEDIUM);
    match (high, medium) {
        (h, _) if h >= 3 => 90,
        (2, _) => 75,
        (1, _) => 60,
        (_, m) if m >= 2 => 40,
        (_, 1) => 25,
        _ => 10,
    }
}

fn score_intent(content: &str) -> u32 {
    let high = count_matches(content, INTENT_HIGH);
    let medium = count_matches(content, INTENT_MEDIUM);

    if contains_any(content, &["contact sales", "sales team", "pricing", "plans", "cost"]) {
        90
    } else if contains_any(content, &["free trial", "trial", "demo"]) {
        75
    } else if high >= 2 {
        65
    } else if high == 1 {
        50
    } else if contains_any(content, &["hiring", "careers"]) {
        45
    } else if medium >= 2 {
        35
    } else if medium == 1 {
        20
    } else {
        5
    }
}

fn score_authority(content: &str) -> u32 {
    let mut score = 0;

    let followers = extract_follower_count(content);
    score = score.max(match followers {
        n if n >= 100_000 => 90,
        n if n >= 10_000 => 75,
        n if n >= 1_000 => 60,
        n if n >= 100 => 40,
        _ => 0,
    });

    let stars = extract_star_count(content);
    score = score.max(match stars {
        n if n >= 1_000 => 85,
        n if n >= 100 => 70,
        n if n >= 50 => 55,
        n if n >= 10 => 35,
        _ => 0,
    });

    if contains_any(content, BUSINESS_SIZE) {
        score = score.max(60);
    }
    if contains_any(content, TEAM_SIZE) {
        score = score.max(45);
    }

    // Any successful professional presence counts for something
    if score == 0 { 25 } else { score }
}

fn score_data_quality(successful: usize, total: usize, results: &[&LinkResult]) -> u32 {
    if total == 0 {
        return 0;
    }

    let success_rate = successful as f64 / total as f64;
    let sources = match successful {
        0 => 0.0,
        1 => 10.0,
        2 => 20.0,
        _ => 30.0,
    };

    let key_points: usize = results.iter().map(|r| r.key_points.len()).sum();
    let avg = key_points as f64 / successful.max(1) as f64;
    let richness = if avg >= 4.0 {
        30.0
    } else if avg >= 3.0 {
        25.0
    } else if avg >= 2.0 {
        20.0
    } else if avg >= 1.0 {
        15.0
    } else {
        5.0
    };

    ((success_rate * 40.0 + sources + richness).round() as u32).min(100)
}

fn parse_scaled(digits: &str, suffix: Option<&str>) -> Option<u64> {
    let value: f64 = digits.replace(',', "").parse().ok()?;
    let factor = match suffix.map(|s| s.to_ascii_lowercase()) {
        Some(s) if s == "k" => 1_000.0,
        Some(s) if s == "m" => 1_000_000.0,
        _ => 1.0,
    };
    Some((value * factor).round() as u64)
}

/// First follower count mentioned in `content`, or 0.
///
/// Understands `10,000 followers`, `10K followers`, `1.5M followers`,
/// `150+ followers` and `Followers: 10,000`.
pub fn extract_follower_count(content: &str) -> u64 {
    [&*FOLLOWERS_BEFORE, &*FOLLOWERS_AFTER]
        .iter()
        .find_map(|re| {
            let caps = re.captures(content)?;
            parse_scaled(caps.get(1)?.as_str(), caps.get(2).map(|m| m.as_str()))
        })
        .unwrap_or(0)
}

/// First star count mentioned in `content`, or 0.
pub fn extract_star_count(content: &str) -> u64 {
    [&*STARS_BEFORE, &*STARS_AFTER]
        .iter()
        .find_map(|re| {
            let caps = re.captures(content)?;
            parse_scaled(caps.get(1)?.as_str(), None)
        })
        .unwrap_or(0)
}

fn score_notes(breakdown: &ScoreBreakdown, content: &str, sources: usize) -> String {
    let mut notes = Vec::new();

    if breakdown.relevance >= 75 {
        notes.push("High service relevance".to_string());
    } else if breakdown.relevance >= 50 {
        notes.push("Moderate service relevance".to_string());
    }

    if content.contains("pricing") || content.contains("plans") {
        notes.push("Pricing page found".to_string());
    }
    if content.contains("contact sales") {
        notes.push("Sales contact available".to_string());
    }
    if content.contains("hiring") {
        notes.push("Currently hiring".to_string());
    }

    let followers = extract_follower_count(content);
    if followers >= 10_000 {
        notes.push(format!("Large following ({})", with_commas(followers)));
    } else if followers >= 1_000 {
        notes.push(format!("Good following ({})", with_commas(followers)));
    }

    let stars = extract_star_count(content);
    if stars >= 100 {
        notes.push(format!("Popular projects ({}+ stars)", stars));
    }

    if content.contains("recent") {
        notes.push("Recent activity detected".to_string());
    }
    if sources >= 3 {
        notes.push(format!("Multiple data sources ({})", sources));
    }

    notes.truncate(MAX_NOTES);
    if notes.is_empty() {
        "Basic lead profile".to_string()
    } else {
        notes.join("; ")
    }
}
