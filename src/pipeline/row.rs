// src/pipeline/row.rs

//! Identity fields of a prospect row.

use std::sync::LazyLock;

use regex::Regex;

use crate::utils::url::{contains_url, extract_urls_from_cell};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").expect("valid email regex")
});

const COMPANY_HINTS: &[&str] = &["company", "organization", "organisation", "business", "employer"];
const NAME_EXCLUDES: &[&str] = &["company", "organization", "organisation", "business", "user", "file"];

/// Contact fields found by header name or cell shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub linkedin: Option<String>,
}

impl RowFields {
    /// Read fields from a data row, ignoring columns whose header starts with `namespace`.
    pub fn from_row(headers: &[String], row: &[String], namespace: &str) -> Self {
        let mut fields = RowFields::default();
        let cells = row.iter().enumerate().filter_map(|(i, cell)| {
            let header = headers.get(i).map(|h| h.trim()).unwrap_or("");
            let cell = cell.trim();
            if cell.is_empty() || (!namespace.is_empty() && header.starts_with(namespace)) {
                None
            } else {
                Some((header.to_lowercase(), cell))
            }
        });

        for (header, cell) in cells {
            if fields.email.is_none() && EMAIL.is_match(cell) {
                fields.email = Some(cell.to_lowercase());
                continue;
            }
            if fields.linkedin.is_none() && cell.to_lowercase().contains("linkedin.com") {
                fields.linkedin = extract_urls_from_cell(cell)
                    .into_iter()
                    .find(|u| u.to_lowercase().contains("linkedin.com"));
                if fields.linkedin.is_some() {
                    continue;
                }
            }
            if contains_url(cell) {
                continue;
            }
            if fields.company.is_none() && COMPANY_HINTS.iter().any(|h| header.contains(h)) {
                fields.company = Some(cell.to_string());
            } else if fields.name.is_none()
                && header.contains("name")
                && !NAME_EXCLUDES.iter().any(|h| header.contains(h))
            {
                fields.name = Some(cell.to_string());
            }
        }
        fields
    }

    /// First token of the contact name.
    pub fn first_name(&self) -> Option<&str> {
        self.name.as_deref()?.split_whitespace().next()
    }

    /// Stable identity used to detect rows that moved between read and write.
    ///
    /// Preference: LinkedIn URL, email, company plus name, then row number.
    pub fn row_key(&self, row_number: usize) -> String {
        if let Some(linkedin) = &self.linkedin {
            return format!("linkedin:{}", linkedin.trim_end_matches('/').to_lowercase());
        }
        if let Some(email) = &self.email {
            return format!("email:{}", email);
        }
        if let (Some(company), Some(name)) = (&self.company, &self.name) {
            return format!(
                "compound:{}:{}",
                company.trim().to_lowercase(),
                name.trim().to_lowercase()
            );
        }
        format!("row:{}", row_number)
    }
}
