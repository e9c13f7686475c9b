// src/utils/url.rs

//! URL discovery, normalization and classification for spreadsheet cells.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::Platform;

static HTTP_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s<>"{}|\\^`\[\]]+"#).expect("valid http url regex")
});

static BARE_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*\.(?:[a-z]{2,}|xn--[a-z0-9]+)(?:/.*)?$",
    )
    .expect("valid domain regex")
});

/// Header fragments that mark a column as holding links.
const URL_HEADER_HINTS: &[&str] = &[
    "link",
    "url",
    "website",
    "site",
    "twitter",
    "x.com",
    "youtube",
    "github",
    "social",
    "profile",
    "portfolio",
    "company",
];

const URL_CONTENT_HINTS: &[&str] = &["http://", "https://", "www.", ".com", ".org", ".net"];

/// Query parameters that only carry tracking information.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gclid",
    "fbclid",
    "msclkid",
    "ref",
    "referrer",
    "source",
    "_ga",
    "_gid",
    "mc_cid",
    "mc_eid",
    "ck_subscriber_id",
];

const NEWS_HOST_HINTS: &[&str] = &[
    "news",
    "blog",
    "post",
    "article",
    "press",
    "media",
    "techcrunch",
    "venturebeat",
    "wired",
    "theverge",
    "reuters",
    "bloomberg",
    "wsj",
    "nytimes",
    "forbes",
];

/// Public suffixes spanning two labels.
const TWO_LABEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "com.au", "net.au", "org.au", "co.nz",
    "co.jp", "co.kr", "com.br", "com.cn", "co.in", "com.mx", "co.za", "com.sg", "com.tr",
];

/// Indices of columns that likely hold URLs.
///
/// A column qualifies by header name, or by its cell in `row` containing a URL hint.
pub fn identify_url_columns(headers: &[String], row: &[String]) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .filter(|(i, header)| {
            let header = header.trim().to_lowercase();
            if header.is_empty() {
                return false;
            }
            if URL_HEADER_HINTS.iter().any(|hint| header.contains(hint)) {
                return true;
            }
            row.get(*i).is_some_and(|cell| contains_url(cell))
        })
        .map(|(i, _)| i)
        .collect()
}

/// Quick check for URL-looking text. Email addresses do not count.
pub fn contains_url(text: &str) -> bool {
    let text = text.trim().to_lowercase();
    if text.len() < 4 {
        return false;
    }
    if looks_like_email(&text) {
        return false;
    }
    URL_CONTENT_HINTS.iter().any(|hint| text.contains(hint))
}

fn looks_like_email(text: &str) -> bool {
    !text.contains(char::is_whitespace) && text.contains('@') && !text.contains('/')
}

/// Raw URL candidates found in one cell, in order of appearance.
pub fn extract_urls_from_cell(cell: &str) -> Vec<String> {
    let mut urls = Vec::new();

    for part in cell.split(|c: char| matches!(c, ',' | '|' | ';') || c.is_whitespace()) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let mut matched = false;
        for m in HTTP_URL.find_iter(part) {
            let candidate = trim_trailing_punctuation(m.as_str());
            if !candidate.is_empty() {
                urls.push(candidate.to_string());
                matched = true;
            }
        }

        if !matched {
            let part = trim_trailing_punctuation(part);
            if looks_like_domain(part) {
                urls.push(format!("https://{}", part));
            }
        }
    }

    urls
}

fn trim_trailing_punctuation(s: &str) -> &str {
    s.trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '\'', '"'])
}

/// Whether `text` is a bare domain with an optional path, such as `corp.com/about`.
pub fn looks_like_domain(text: &str) -> bool {
    let text = text.trim().to_lowercase();
    if text.len() < 4 {
        return false;
    }
    let text = text.strip_prefix("www.").unwrap_or(&text);
    BARE_DOMAIN.is_match(text)
}

/// Canonical form of a URL, or `None` when it cannot be a web address.
///
/// Scheme and host are lowercased, tracking parameters and the fragment are
/// removed, the path is kept exactly as written.
pub fn normalize_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let lower = raw.to_ascii_lowercase();
    let (scheme, rest) = if lower.starts_with("https://") {
        ("https", &raw[8..])
    } else if lower.starts_with("http://") {
        ("http", &raw[7..])
    } else if let Some(rest) = raw.strip_prefix("//") {
        ("https", rest)
    } else if raw.contains("://") {
        return None;
    } else {
        ("https", raw)
    };

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = rest[..authority_end].to_lowercase();
    if !valid_authority(scheme, &authority) {
        return None;
    }

    let remainder = &rest[authority_end..];
    let remainder = remainder.split('#').next().unwrap_or_default();
    let (path, query) = match remainder.split_once('?') {
        Some((path, query)) => (path, clean_query(query)),
        None => (remainder, String::new()),
    };

    let mut out = format!("{}://{}{}", scheme, authority, path);
    if !query.is_empty() {
        out.push('?');
        out.push_str(&query);
    }
    Some(out)
}

fn valid_authority(scheme: &str, authority: &str) -> bool {
    if authority.is_empty() {
        return false;
    }
    let Ok(parsed) = url::Url::parse(&format!("{}://{}/", scheme, authority)) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    if host == "localhost" {
        return true;
    }
    let labels: Vec<&str> = host.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// Drop tracking parameters, keeping the rest verbatim and in order.
fn clean_query(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default().to_ascii_lowercase();
            !TRACKING_PARAMS.contains(&key.as_str())
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Remove URLs sharing scheme, host and path with an earlier one.
///
/// Trailing slashes on the path are ignored; the query is not part of the key.
pub fn deduplicate(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|u| seen.insert(dedup_key(u)))
        .collect()
}

fn dedup_key(url: &str) -> (String, String, String) {
    let (scheme, rest) = url.split_once("://").unwrap_or(("", url));
    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let host = rest[..authority_end].to_lowercase();
    let path = rest[authority_end..]
        .split('?')
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_string();
    (scheme.to_lowercase(), host, path)
}

/// Normalized, deduplicated URLs found across a row's URL columns.
pub fn extract_urls_from_row(headers: &[String], row: &[String]) -> Vec<String> {
    let raw: Vec<String> = identify_url_columns(headers, row)
        .into_iter()
        .filter_map(|i| row.get(i))
        .flat_map(|cell| extract_urls_from_cell(cell))
        .collect();

    let normalized = raw.iter().filter_map(|u| normalize_url(u)).collect();
    let unique = deduplicate(normalized);
    log::debug!("Extracted {} unique URLs from row", unique.len());
    unique
}

/// Lowercased host of a URL string.
pub fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

fn host_is(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Which handler family should process a URL.
pub fn classify_url(url: &str) -> Platform {
    let Some(host) = host_of(url) else {
        return Platform::Website;
    };

    if host.contains("linkedin.com") {
        Platform::Forbidden
    } else if host_is(&host, "twitter.com") || host_is(&host, "x.com") {
        Platform::Twitter
    } else if host_is(&host, "youtube.com") || host_is(&host, "youtu.be") {
        Platform::YouTube
    } else if host_is(&host, "github.com") {
        Platform::GitHub
    } else if is_news_host(&host) {
        Platform::News
    } else {
        Platform::Website
    }
}

pub fn is_news_host(host: &str) -> bool {
    NEWS_HOST_HINTS.iter().any(|hint| host.contains(hint))
}

/// Host broken into its registrable parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainInfo {
    pub full_domain: String,
    pub subdomain: String,
    pub domain: String,
    pub suffix: String,
    pub scheme: String,
    pub path: String,
}

impl DomainInfo {
    /// `domain.suffix`, e.g. `company.co.uk`.
    pub fn registered_domain(&self) -> String {
        if self.suffix.is_empty() {
            self.domain.clone()
        } else {
            format!("{}.{}", self.domain, self.suffix)
        }
    }
}

pub fn domain_info(url: &str) -> Option<DomainInfo> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let labels: Vec<&str> = host.split('.').collect();

    let suffix_len = if labels.len() >= 3
        && TWO_LABEL_SUFFIXES.contains(&labels[labels.len() - 2..].join(".").as_str())
    {
        2
    } else if labels.len() >= 2 {
        1
    } else {
        0
    };

    let domain_idx = labels.len().saturating_sub(suffix_len + 1);
    Some(DomainInfo {
        full_domain: host.clone(),
        subdomain: labels[..domain_idx].join("."),
        domain: labels.get(domain_idx).copied().unwrap_or_default().to_string(),
        suffix: labels[labels.len() - suffix_len..].join("."),
        scheme: parsed.scheme().to_string(),
        path: parsed.path().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_and_multi_url_cells() {
        assert_eq!(extract_urls_from_cell("https://example.com"), vec!["https://example.com"]);

        let urls = extract_urls_from_cell(
            "https://example.com, https://twitter.com/john, https://github.com/john",
        );
        assert_eq!(urls.len(), 3);

        for cell in [
            "https://example.com | https://twitter.com/john",
            "https://example.com\nhttps://github.com/john",
            "https://example.com\r\nhttps://github.com/john",
            "https://example.com; https://youtube.com/channel/123",
            "https://example.com https://linkedin.com/in/john",
        ] {
            assert_eq!(extract_urls_from_cell(cell).len(), 2, "failed for {:?}", cell);
        }
    }

    #[test]
    fn test_cell_edge_cases() {
        assert!(extract_urls_from_cell("").is_empty());
        assert!(extract_urls_from_cell("   ").is_empty());

        let long_url = format!("https://example.com/{}", "a".repeat(1000));
        assert_eq!(extract_urls_from_cell(&long_url).len(), 1);

        let mixed = "Check out my website https://example.com and follow me on Twitter!";
        assert_eq!(extract_urls_from_cell(mixed), vec!["https://example.com"]);

        assert_eq!(extract_urls_from_cell("See corp.com."), vec!["https://corp.com"]);
        assert!(extract_urls_from_cell("john@example.com").is_empty());
    }

    #[test]
    fn test_normalization() {
        let cases = [
            ("example.com", "https://example.com"),
            ("www.example.com", "https://www.example.com"),
            ("http://example.com", "http://example.com"),
            ("https://example.com/", "https://example.com/"),
            ("Example.Com", "https://example.com"),
            ("//cdn.example.com/x", "https://cdn.example.com/x"),
            ("HTTPS://Example.com/Path#section", "https://example.com/Path"),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_url(input).as_deref(), Some(expected), "input {}", input);
        }
    }

    #[test]
    fn test_tracking_params_removed() {
        let normalized =
            normalize_url("https://example.com/page?utm_source=twitter&utm_campaign=test&id=123")
                .unwrap();
        assert_eq!(normalized, "https://example.com/page?id=123");

        let normalized = normalize_url("https://example.com/?REF=abc&fbclid=1").unwrap();
        assert_eq!(normalized, "https://example.com/");
    }

    #[test]
    fn test_invalid_urls() {
        for input in ["", "ftp://example.com", "javascript:alert(1)", "http://", "https://."] {
            assert_eq!(normalize_url(input), None, "input {:?}", input);
        }
        // Non-ASCII hosts must not panic
        for input in ["münchen.de", "пример.рф", "example.中国"] {
            let _ = normalize_url(input);
        }
    }

    #[test]
    fn test_deduplication() {
        let urls: Vec<String> = [
            "https://example.com",
            "https://example.com/",
            "https://example.com?utm_source=test",
            "http://example.com",
            "https://www.example.com",
        ]
        .iter()
        .filter_map(|u| normalize_url(u))
        .collect();

        let unique = deduplicate(urls);
        assert_eq!(
            unique,
            vec!["https://example.com", "http://example.com", "https://www.example.com"]
        );
    }

    #[test]
    fn test_identify_url_columns() {
        let headers = strings(&["name", "website_url", "twitter_profile", "email", "company_site"]);
        let row = strings(&[
            "John",
            "https://example.com",
            "https://twitter.com/john",
            "john@example.com",
            "corp.com",
        ]);
        assert_eq!(identify_url_columns(&headers, &row), vec![1, 2, 4]);

        let headers = strings(&["name", "notes"]);
        let row = strings(&["Jane", "see www.jane.dev"]);
        assert_eq!(identify_url_columns(&headers, &row), vec![1]);
    }

    #[test]
    fn test_row_extraction() {
        let headers = strings(&["name", "website", "social_links", "email"]);
        let row = strings(&[
            "John Doe",
            "https://johndoe.com",
            "https://twitter.com/john, https://github.com/john, johndoe.com/",
            "john@johndoe.com",
        ]);
        let urls = extract_urls_from_row(&headers, &row);
        assert_eq!(
            urls,
            vec!["https://johndoe.com", "https://twitter.com/john", "https://github.com/john"]
        );
    }

    #[test]
    fn test_classification() {
        let cases = [
            ("https://twitter.com/john", Platform::Twitter),
            ("https://x.com/john", Platform::Twitter),
            ("https://mobile.twitter.com/john", Platform::Twitter),
            ("https://netflix.com", Platform::Website),
            ("https://github.com/john/repo", Platform::GitHub),
            ("https://youtube.com/channel/123", Platform::YouTube),
            ("https://youtu.be/abc", Platform::YouTube),
            ("https://www.linkedin.com/in/john", Platform::Forbidden),
            ("https://example.com", Platform::Website),
            ("https://techcrunch.com/article/123", Platform::News),
            ("https://blog.example.com/hello", Platform::News),
        ];
        for (url, expected) in cases {
            assert_eq!(classify_url(url), expected, "url {}", url);
        }
    }

    #[test]
    fn test_domain_info() {
        let cases = [
            ("https://www.example.com", "www", "example", "com"),
            ("https://blog.company.co.uk", "blog", "company", "co.uk"),
            ("https://api.v2.service.io", "api.v2", "service", "io"),
            ("https://example.com/a", "", "example", "com"),
        ];
        for (url, sub, domain, suffix) in cases {
            let info = domain_info(url).unwrap();
            assert_eq!(info.subdomain, sub);
            assert_eq!(info.domain, domain);
            assert_eq!(info.suffix, suffix);
        }
        assert_eq!(
            domain_info("https://blog.company.co.uk/x").unwrap().registered_domain(),
            "company.co.uk"
        );
    }
}
