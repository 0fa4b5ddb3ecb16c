use crate::regex::Regex;
use std::sync::LazyLock;

static DOI_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:dx\.)?doi\.org/(.+)$").unwrap());

/// Formats a DOI string by removing URL prefixes and [doi] suffixes
///
/// # Arguments
///
/// * `doi_str` - The DOI string to format
pub fn format_doi(doi_str: &str) -> Option<String> {
    if doi_str.is_empty() {
        return None;
    }
    let doi = doi_str
        .trim()
        .trim_end_matches("[doi]")
        .trim()
        .replace(|c: char| c.is_whitespace(), "")
        .to_lowercase();

    // A DOI always starts with the "10." directory indicator
    let pos = doi.find("10.")?;
    let doi = &doi[pos..];
    match DOI_URL_REGEX.captures(doi) {
        Some(captures) => Some(captures[1].to_string()),
        None => Some(doi.to_string()),
    }
}

/// First whitespace-separated token of an author list, or `Unknown`.
pub fn first_author_token(authors: &str) -> &str {
    authors
        .split_whitespace()
        .next()
        .unwrap_or(crate::UNKNOWN)
}
