// src/utils/text.rs

//! Text helpers shared by handlers and report formatting.

use unicode_segmentation::UnicodeSegmentation;

/// Truncate to at most `max` user-perceived characters, ending with `...` when cut.
pub fn truncate(text: &str, max: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return ".".repeat(max);
    }
    let mut out: String = graphemes[..max - 3].concat();
    out.push_str("...");
    out
}

/// Collapse runs of whitespace into single spaces.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compact count, e.g. `1.2M`, `3.4K`, `950`.
pub fn format_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Count with thousands separators, e.g. `12,345`.
pub fn with_commas(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Uppercase the first letter of each word.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("hello world", 8).chars().count(), 8);
        // Multi-byte content is cut on grapheme boundaries
        assert_eq!(truncate("안녕하세요 여러분", 6), "안녕하...");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(950), "950");
        assert_eq!(format_number(3_400), "3.4K");
        assert_eq!(format_number(1_234_567), "1.2M");
    }

    #[test]
    fn test_with_commas() {
        assert_eq!(with_commas(0), "0");
        assert_eq!(with_commas(999), "999");
        assert_eq!(with_commas(1_000), "1,000");
        assert_eq!(with_commas(1_234_567), "1,234,567");
    }

    #[test]
    fn test_title_case_and_whitespace() {
        assert_eq!(title_case("contact sales"), "Contact Sales");
        assert_eq!(squash_whitespace("  a \n\t b  "), "a b");
    }
}
