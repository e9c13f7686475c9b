// src/services/github.rs

//! GitHub users, organizations and repositories through the REST API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::LinkHandler;
use crate::error::{AppError, Result};
use crate::models::{LinkResult, Platform};
use crate::utils::http::HttpClient;
use crate::utils::text::truncate;
use crate::utils::url::classify_url;

const API_BASE: &str = "https://api.github.com";

/// Top-level github.com pages that are not accounts.
const RESERVED_PATHS: &[&str] = &[
    "features",
    "pricing",
    "explore",
    "search",
    "trending",
    "topics",
    "collections",
    "marketplace",
    "settings",
    "sponsors",
    "about",
    "login",
    "join",
    "enterprise",
    "notifications",
];

/// What a github.com URL points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubTarget {
    /// A user or organization; the API tells which.
    Account(String),
    Org(String),
    Repo { owner: String, repo: String },
}

#[derive(Debug, Default, Deserialize)]
pub struct Account {
    pub login: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub followers: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct Organization {
    pub login: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub blog: Option<String>,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub followers: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct Repository {
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Aggregate over an account's most recently updated repositories.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RepoStats {
    /// Languages in first-seen order
    pub languages: Vec<String>,
    pub total_stars: u64,
    /// Repositories updated within the last 90 days
    pub recently_updated: usize,
}

impl RepoStats {
    pub fn from_repos(repos: &[Repository], now: DateTime<Utc>) -> Self {
        let mut stats = RepoStats::default();
        for repo in repos {
            if let Some(lang) = repo.language.as_deref().filter(|l| !l.is_empty()) {
                if !stats.languages.iter().any(|l| l == lang) {
                    stats.languages.push(lang.to_string());
                }
            }
            stats.total_stars += repo.stargazers_count;
            if repo.updated_at.is_some_and(|t| (now - t).num_days() <= 90) {
                stats.recently_updated += 1;
            }
        }
        stats
    }
}

pub struct GitHubHandler {
    http: HttpClient,
    token: Option<String>,
}

impl GitHubHandler {
    pub fn new(http: HttpClient, token: Option<String>) -> Self {
        Self { http, token }
    }

    /// GET an API path; `None` on 404.
    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let url = format!("{}/{}", API_BASE, path);
        match self.http.get_json(&url, query, self.token.as_deref()).await {
            Ok(value) => Ok(Some(value)),
            Err(AppError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn recent_repos(&self, path: &str, per_page: u32) -> Vec<Repository> {
        let query = [("sort", "updated".to_string()), ("per_page", per_page.to_string())];
        match self.fetch::<Vec<Repository>>(path, &query).await {
            Ok(repos) => repos.unwrap_or_default(),
            Err(e) => {
                log::warn!("Could not list repositories at {}: {}", path, e);
                Vec::new()
            }
        }
    }

    async fn process_account(&self, url: &str, login: &str) -> Result<LinkResult> {
        let account: Account = self
            .fetch(&format!("users/{}", login), &[])
            .await?
            .ok_or_else(|| AppError::handler("github", format!("user {} not found", login)))?;

        if account.kind == "Organization" {
            return self.process_org(url, login).await;
        }
        let repos = self.recent_repos(&format!("users/{}/repos", login), 5).await;
        Ok(summarize_user(url, &account, &RepoStats::from_repos(&repos, Utc::now())))
    }

    async fn process_org(&self, url: &str, login: &str) -> Result<LinkResult> {
        let org: Organization = self
            .fetch(&format!("orgs/{}", login), &[])
            .await?
            .ok_or_else(|| {
                AppError::handler("github", format!("organization {} not found", login))
            })?;
        let repos = self.recent_repos(&format!("orgs/{}/repos", login), 10).await;
        Ok(summarize_org(url, &org, &RepoStats::from_repos(&repos, Utc::now())))
    }

    async fn process_repo(&self, url: &str, owner: &str, name: &str) -> Result<LinkResult> {
        let repo: Repository = self
            .fetch(&format!("repos/{}/{}", owner, name), &[])
            .await?
            .ok_or_else(|| {
                AppError::handler("github", format!("repository {}/{} not found", owner, name))
            })?;
        Ok(summarize_repo(url, owner, &repo, Utc::now()))
    }
}

#[async_trait]
impl LinkHandler for GitHubHandler {
    fn name(&self) -> &'static str {
        "github"
    }

    fn can_handle(&self, url: &Url) -> bool {
        classify_url(url.as_str()) == Platform::GitHub
    }

    async fn process(&self, url: &Url) -> Result<LinkResult> {
        let target = parse_target(url)
            .ok_or_else(|| AppError::handler(url.as_str(), "could not parse GitHub URL"))?;
        match target {
            GitHubTarget::Account(login) => self.process_account(url.as_str(), &login).await,
            GitHubTarget::Org(login) => self.process_org(url.as_str(), &login).await,
            GitHubTarget::Repo { owner, repo } => {
                self.process_repo(url.as_str(), &owner, &repo).await
            }
        }
    }
}

pub fn parse_target(url: &Url) -> Option<GitHubTarget> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let first = *segments.first()?;
    if RESERVED_PATHS.contains(&first.to_lowercase().as_str()) {
        return None;
    }

    match segments.as_slice() {
        ["orgs", org, ..] => Some(GitHubTarget::Org(org.to_string())),
        [owner] => Some(GitHubTarget::Account(owner.to_string())),
        [owner, repo, ..] => Some(GitHubTarget::Repo {
            owner: owner.to_string(),
            repo: repo.trim_end_matches(".git").to_string(),
        }),
        [] => None,
    }
}

pub fn summarize_user(url: &str, account: &Account, repos: &RepoStats) -> LinkResult {
    let mut key_points = Vec::new();
    let mut signals = Vec::new();

    let name = account.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&account.login);
    key_points.push(format!("User: {}", name));
    if let Some(bio) = non_empty(&account.bio) {
        key_points.push(format!("Bio: {}", truncate(bio, 100)));
    }
    if let Some(company) = non_empty(&account.company) {
        key_points.push(format!("Company: {}", company));
    }
    if let Some(location) = non_empty(&account.location) {
        key_points.push(format!("Location: {}", location));
    }
    key_points.push(format!(
        "Repos: {}, Followers: {}",
        account.public_repos, account.followers
    ));

    if account.followers > 100 {
        signals.push(format!("Popular developer ({}+ followers)", account.followers));
    }
    if account.public_repos > 10 {
        signals.push(format!("Active contributor ({}+ repos)", account.public_repos));
    }
    if !repos.languages.is_empty() {
        signals.push(format!("Languages: {}", head(&repos.languages, 3)));
    }
    if repos.total_stars > 50 {
        signals.push(format!("Notable projects ({} stars total)", repos.total_stars));
    }

    LinkResult::ok("GitHub", url, key_points, signals)
}

pub fn summarize_org(url: &str, org: &Organization, repos: &RepoStats) -> LinkResult {
    let mut key_points = Vec::new();
    let mut signals = Vec::new();

    let name = org.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&org.login);
    key_points.push(format!("Organization: {}", name));
    if let Some(description) = non_empty(&org.description) {
        key_points.push(format!("About: {}", truncate(description, 120)));
    }
    if let Some(location) = non_empty(&org.location) {
        key_points.push(format!("Location: {}", location));
    }
    if let Some(blog) = non_empty(&org.blog) {
        key_points.push(format!("Website: {}", blog));
    }
    key_points.push(format!("Public repos: {}", org.public_repos));
    if org.followers > 0 {
        key_points.push(format!("Followers: {}", org.followers));
    }

    if org.public_repos > 20 {
        signals.push(format!("Large organization ({}+ repos)", org.public_repos));
    } else if org.public_repos > 5 {
        signals.push(format!("Active organization ({}+ repos)", org.public_repos));
    }
    if org.followers > 100 {
        signals.push(format!("Popular organization ({}+ followers)", org.followers));
    }
    if !repos.languages.is_empty() {
        signals.push(format!("Tech stack: {}", head(&repos.languages, 4)));
    }
    if repos.total_stars > 100 {
        signals.push(format!("Notable projects ({} stars total)", repos.total_stars));
    }
    if repos.recently_updated > 0 {
        signals.push(format!(
            "Recently updated repositories ({} within 90 days)",
            repos.recently_updated
        ));
    }

    LinkResult::ok("GitHub", url, key_points, signals)
}

pub fn summarize_repo(url: &str, owner: &str, repo: &Repository, now: DateTime<Utc>) -> LinkResult {
    let mut key_points = vec![format!("Repository: {}/{}", owner, repo.name)];
    let mut signals = Vec::new();

    if let Some(description) = non_empty(&repo.description) {
        key_points.push(format!("Description: {}", truncate(description, 120)));
    }
    if let Some(language) = non_empty(&repo.language) {
        key_points.push(format!("Primary language: {}", language));
    }
    key_points.push(format!(
        "Stars: {}, Forks: {}, Issues: {}",
        repo.stargazers_count, repo.forks_count, repo.open_issues_count
    ));

    if repo.stargazers_count > 500 {
        signals.push(format!("Popular project ({}+ stars)", repo.stargazers_count));
    } else if repo.stargazers_count > 50 {
        signals.push(format!("Notable project ({}+ stars)", repo.stargazers_count));
    }
    if repo.forks_count > 100 {
        signals.push(format!("Active community ({}+ forks)", repo.forks_count));
    }
    if let Some(updated) = repo.updated_at {
        let days = (now - updated).num_days();
        if days <= 30 {
            signals.push("Recently updated (within 30 days)".to_string());
        } else if days <= 90 {
            signals.push("Actively maintained".to_string());
        }
    }
    if !repo.topics.is_empty() {
        key_points.push(format!("Topics: {}", head(&repo.topics, 5)));
    }

    LinkResult::ok("GitHub", url, key_points, signals)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn head(items: &[String], n: usize) -> String {
    items.iter().take(n).cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn target(u: &str) -> Option<GitHubTarget> {
        parse_target(&Url::parse(u).unwrap())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(target("https://github.com/acme"), Some(GitHubTarget::Account("acme".into())));
        assert_eq!(
            target("https://github.com/acme/widgets.git"),
            Some(GitHubTarget::Repo {
                owner: "acme".into(),
                repo: "widgets".into()
            })
        );
        assert_eq!(
            target("https://github.com/acme/widgets/issues/4"),
            Some(GitHubTarget::Repo {
                owner: "acme".into(),
                repo: "widgets".into()
            })
        );
        assert_eq!(target("https://github.com/orgs/acme/people"), Some(GitHubTarget::Org("acme".into())));
        assert_eq!(target("https://github.com/pricing"), None);
        assert_eq!(target("https://github.com/Trending/rust"), None);
        assert_eq!(target("https://github.com/"), None);
    }

    #[test]
    fn test_repo_stats() {
        let repos: Vec<Repository> = serde_json::from_str(
            r#"[{"name": "a", "language": "Rust", "stargazers_count": 40, "updated_at": "2024-05-20T00:00:00Z"},
                {"name": "b", "language": "Go", "stargazers_count": 15, "updated_at": "2023-01-01T00:00:00Z"},
                {"name": "c", "language": "Rust", "stargazers_count": 0},
                {"name": "d", "language": null}]"#,
        )
        .unwrap();
        let stats = RepoStats::from_repos(&repos, now());
        assert_eq!(stats.languages, vec!["Rust", "Go"]);
        assert_eq!(stats.total_stars, 55);
        assert_eq!(stats.recently_updated, 1);
    }

    #[test]
    fn test_summarize_user() {
        let account: Account = serde_json::from_str(
            r#"{"login": "ada", "type": "User", "name": null, "bio": "Builds compilers",
                "company": "@acme", "location": "", "public_repos": 42, "followers": 300}"#,
        )
        .unwrap();
        let stats = RepoStats {
            languages: vec!["Rust".into(), "C".into(), "Go".into(), "Zig".into()],
            total_stars: 120,
            recently_updated: 2,
        };
        let result = summarize_user("https://github.com/ada", &account, &stats);
        assert_eq!(
            result.key_points,
            vec![
                "User: ada",
                "Bio: Builds compilers",
                "Company: @acme",
                "Repos: 42, Followers: 300",
            ]
        );
        assert_eq!(
            result.signals,
            vec![
                "Popular developer (300+ followers)",
                "Active contributor (42+ repos)",
                "Languages: Rust, C, Go",
                "Notable projects (120 stars total)",
            ]
        );
    }

    #[test]
    fn test_summarize_org() {
        let org = Organization {
            login: "acme".into(),
            name: Some("Acme Inc.".into()),
            description: Some("Workflow automation".into()),
            blog: Some("https://acme.dev".into()),
            public_repos: 8,
            followers: 150,
            ..Organization::default()
        };
        let stats = RepoStats {
            languages: vec!["Rust".into()],
            total_stars: 80,
            recently_updated: 3,
        };
        let result = summarize_org("https://github.com/acme", &org, &stats);
        assert_eq!(result.source, "GitHub");
        assert_eq!(
            result.key_points,
            vec![
                "Organization: Acme Inc.",
                "About: Workflow automation",
                "Website: https://acme.dev",
                "Public repos: 8",
                "Followers: 150",
            ]
        );
        assert_eq!(
            result.signals,
            vec![
                "Active organization (8+ repos)",
                "Popular organization (150+ followers)",
                "Tech stack: Rust",
                "Recently updated repositories (3 within 90 days)",
            ]
        );
    }

    #[test]
    fn test_summarize_repo() {
        let repo: Repository = serde_json::from_str(
            r#"{"name": "widgets", "description": "Widget toolkit", "language": "Rust",
                "stargazers_count": 812, "forks_count": 130, "open_issues_count": 7,
                "updated_at": "2024-04-01T00:00:00Z", "topics": ["ui", "rust"]}"#,
        )
        .unwrap();
        let result = summarize_repo("https://github.com/acme/widgets", "acme", &repo, now());
        assert_eq!(
            result.key_points,
            vec![
                "Repository: acme/widgets",
                "Description: Widget toolkit",
                "Primary language: Rust",
                "Stars: 812, Forks: 130, Issues: 7",
                "Topics: ui, rust",
            ]
        );
        assert_eq!(
            result.signals,
            vec![
                "Popular project (812+ stars)",
                "Active community (130+ forks)",
                "Actively maintained",
            ]
        );
    }
}
