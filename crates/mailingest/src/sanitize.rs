//! Helpers for turning email-derived strings into storage-safe names and for
//! sanitizing data before it enters tracing span attributes.
//!
//! Storage paths and catalog names are built from sender addresses and
//! attachment filenames; everything goes through [`slugify`] first so that a
//! hostile filename cannot introduce path separators or traversal segments.

use chrono::{DateTime, Utc};
use deunicode::deunicode;

/// Transliterates `value` to ASCII, lower-cases it and collapses every run of
/// characters outside `[a-z0-9]` into a single `-`, trimming separators at
/// both ends.
///
/// - `Trusted.Emails@Server.com` → `trusted-emails-server-com`
/// - `Q1 report (final).csv` → `q1-report-final-csv`
/// - `Résumé.csv` → `resume-csv`
pub fn slugify(value: &str) -> String {
    deunicode(value)
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Slug of the last `/`-separated segment of an object key.
///
/// Falls back to `email` when the key has no usable characters.
pub fn display_name_from_key(key: &str) -> String {
    let last = key.rsplit('/').next().unwrap_or(key);
    let slug = slugify(last);
    if slug.is_empty() {
        "email".to_string()
    } else {
        slug
    }
}

/// Received timestamp rendered the way it is stored in attachment metadata.
pub fn received_date_string(received_at: &DateTime<Utc>) -> String {
    received_at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Date partition value for a stored `received_date` string.
///
/// `2021-01-11 07:29:38` → `20210111`
pub fn partition_date(received_date: &str) -> String {
    received_date
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .replace('-', "")
}

/// Catalog table name for an attachment logical name.
///
/// Catalogs reject `-` in identifiers, so separators become `_`.
pub fn table_name(logical_name: &str) -> String {
    logical_name.replace('-', "_")
}

/// Masks the local part of an address for span fields.
///
/// - `trusted_emails@server.com` → `t***@server.com`
/// - `no-at-sign` → `***`
pub fn redact_address(address: &str) -> String {
    match address.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}
