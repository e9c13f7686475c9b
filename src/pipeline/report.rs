// src/pipeline/report.rs

//! Cell text for per-link summaries and the combined row report.

use std::collections::HashSet;

use crate::models::LinkResult;
use crate::utils::text::truncate;

const SUMMARY_KEY_POINTS: usize = 6;
const SUMMARY_SIGNALS: usize = 4;
const SNAPSHOT_PER_SOURCE: usize = 2;
const SNAPSHOT_TOTAL: usize = 4;
const REPORT_SIGNALS: usize = 6;

/// Markdown-ish summary of one link result, capped at `max_chars`.
pub fn format_summary(result: &LinkResult, max_chars: usize) -> String {
    let mut lines = vec![
        format!("**Source:** {}", result.source),
        format!("**URL:** {}", result.url),
    ];

    if !result.key_points.is_empty() {
        lines.push("**Key Points:**".into());
        lines.extend(
            result
                .key_points
                .iter()
                .take(SUMMARY_KEY_POINTS)
                .map(|p| format!("• {}", p)),
        );
    }

    if !result.signals.is_empty() {
        lines.push("**Signals for Outreach:**".into());
        lines.extend(
            result
                .signals
                .iter()
                .take(SUMMARY_SIGNALS)
                .map(|s| format!("• {}", s)),
        );
    }

    lines.push(format!("**Last Checked:** {}", result.last_checked.to_rfc3339()));
    truncate(&lines.join("\n"), max_chars)
}

/// Report combining every link of a row, capped at `max_chars`.
pub fn combined_report(results: &[LinkResult], max_chars: usize) -> String {
    let successful: Vec<&LinkResult> = results.iter().filter(|r| r.is_ok()).collect();
    let mut lines = vec!["**Profile Snapshot:**".to_string()];

    let insights = successful
        .iter()
        .flat_map(|r| r.key_points.iter().take(SNAPSHOT_PER_SOURCE))
        .filter(|p| p.trim().chars().count() > 10)
        .take(SNAPSHOT_TOTAL)
        .map(|p| format!("• {}", p));
    lines.extend(insights);
    lines.push(String::new());

    lines.push("**Pain / Opportunity Signals:**".into());
    let all_signals: Vec<&String> = successful.iter().flat_map(|r| r.signals.iter()).collect();
    let mut seen = HashSet::new();
    lines.extend(
        all_signals
            .iter()
            .copied()
            .filter(|s| seen.insert(s.as_str()))
            .take(REPORT_SIGNALS)
            .map(|s| format!("• {}", s)),
    );
    lines.push(String::new());

    lines.push("**Suggested Angle & CTA:**".into());
    lines.push("• Personalized outreach based on recent activity".into());
    lines.push("• Reference specific content or projects mentioned".into());
    let sales_ready = all_signals.iter().any(|s| {
        let s = s.to_lowercase();
        s.contains("pricing") || s.contains("contact")
    });
    if sales_ready {
        lines.push("• Sales-qualified lead - ready for direct outreach".into());
    }
    lines.push(String::new());

    lines.push("**Data Sources:**".into());
    let mut sources: Vec<String> = Vec::new();
    for r in &successful {
        if !sources.contains(&r.source) {
            sources.push(r.source.clone());
        }
    }
    if results.len() > sources.len() {
        let extra = results.len() - sources.len();
        sources.push(format!("(+{} more)", extra));
    }
    lines.push(sources.join(", "));

    truncate(&lines.join("\n"), max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(source: &str, key_points: &[&str], signals: &[&str]) -> LinkResult {
        LinkResult::ok(
            source,
            format!("https://{}", source),
            key_points.iter().map(|s| s.to_string()).collect(),
            signals.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_summary_layout() {
        let r = result(
            "example.com",
            &["Title: Example", "a", "b", "c", "d", "e", "seventh"],
            &["Has Pricing content"],
        );
        let summary = format_summary(&r, 4000);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "**Source:** example.com");
        assert_eq!(lines[1], "**URL:** https://example.com");
        assert_eq!(lines[2], "**Key Points:**");
        assert_eq!(lines[3], "• Title: Example");
        assert!(!summary.contains("seventh"));
        assert!(summary.contains("**Signals for Outreach:**\n• Has Pricing content"));
        assert!(lines.last().unwrap().starts_with("**Last Checked:** "));
    }

    #[test]
    fn test_summary_truncated() {
        let long = "x".repeat(500);
        let r = result("example.com", &[&long], &[]);
        let summary = format_summary(&r, 100);
        assert_eq!(summary.chars().count(), 100);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_combined_report_sections() {
        let results = vec![
            result(
                "example.com",
                &["Title: Example Corp homepage", "Description: We build tools", "Section: third"],
                &["Has Pricing content", "Easy to contact"],
            ),
            result("GitHub", &["short", "Organization: example-org"], &["Easy to contact"]),
            LinkResult::error("https://broken.dev", "timeout"),
        ];
        let report = combined_report(&results, 5000);

        assert!(report.starts_with("**Profile Snapshot:**\n• Title: Example Corp homepage"));
        assert!(!report.contains("Section: third"));
        assert!(!report.contains("• short"));
        assert_eq!(report.matches("• Easy to contact").count(), 1);
        assert!(report.contains("• Sales-qualified lead - ready for direct outreach"));
        assert!(report.ends_with("**Data Sources:**\nexample.com, GitHub, (+1 more)"));
    }

    #[test]
    fn test_combined_report_without_sales_signals() {
        let results = vec![result("blog.example.com", &["Headline: Something happened"], &[
            "Recent publication (within 90 days)",
        ])];
        let report = combined_report(&results, 5000);
        assert!(!report.contains("Sales-qualified"));
        assert!(report.ends_with("**Data Sources:**\nblog.example.com"));
    }

    #[test]
    fn test_combined_report_truncated() {
        let results = vec![result("a.com", &[&"y".repeat(200)], &[])];
        let report = combined_report(&results, 50);
        assert_eq!(report.chars().count(), 50);
    }
}
