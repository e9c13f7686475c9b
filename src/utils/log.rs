// src/utils/log.rs

//! Console output for run headers and summaries.
//!
//! Diagnostic logging goes through the `log` facade; these helpers print the
//! human-facing banners with the same timestamp layout.

use chrono::Local;

fn stamp(message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] {}", timestamp, message)
}

/// Print a boxed header line.
pub fn header(title: &str) {
    let border = "═".repeat(60);
    println!("{}", stamp(&border));
    println!("{}", stamp(&format!("  {}", title)));
    println!("{}", stamp(&border));
}

/// Print an indented sub-item.
pub fn sub_item(message: &str) {
    println!("{}", stamp(&format!("    {}", message)));
}

pub fn separator() {
    println!("{}", stamp(&"─".repeat(60)));
}

/// Print a titled key/value block.
pub fn summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("{}", stamp(&format!("[SUMMARY] {}", title)));
    for line in summary_lines(items) {
        println!("{}", stamp(&line));
    }
}

fn summary_lines(items: &[(&str, String)]) -> Vec<String> {
    let width = items.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    items
        .iter()
        .map(|(key, value)| format!("    {:<width$} : {}", key, value, width = width))
        .collect()
}
