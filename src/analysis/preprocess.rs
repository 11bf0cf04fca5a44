//! Canonical text for profiles and queries.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::profile::ProfileRecord;

lazy_static! {
    static ref DISALLOWED_QUERY_CHARS: Regex = Regex::new(r"[^\w\s,.:;?!-]").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Render a profile as the single string that gets embedded.
///
/// Field order and labels are fixed; missing optional fields render as empty
/// strings so every profile follows the same template.
pub fn preprocess_profile(record: &ProfileRecord) -> String {
    let project_details = record
        .projects
        .iter()
        .map(|project| {
            format!(
                "Abstract: {}, Terms: {}\n",
                project.abstract_text.as_deref().unwrap_or(""),
                project.terms.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join(" ");

    let text = format!(
        "Department: {}.School: {}.About: {}.Projects: {}",
        record.department,
        record.school,
        record.about.as_deref().unwrap_or(""),
        project_details
    );
    debug!("Processed text for profile {}: {} chars", record.name, text.len());
    text
}

/// Canonicalize a user query.
///
/// Lowercases, drops everything except word characters, whitespace and
/// `, . : ; ? ! -`, collapses whitespace runs to one space and trims. Semantic
/// and exact-word searches both go through this.
pub fn preprocess_query(query: &str) -> String {
    let lowered = query.to_lowercase();
    let filtered = DISALLOWED_QUERY_CHARS.replace_all(&lowered, "");
    WHITESPACE_RUN.replace_all(&filtered, " ").trim().to_string()
}
