//! Keyword matching over the loaded catalog.
//!
//! A record matches when ANY supplied keyword appears as a lowercase
//! substring of its title or description.  No scoring — results come back
//! in catalog order, capped at [`MAX_RESULTS`], deduplicated by id.

use std::collections::HashSet;

use serde::Serialize;

use super::CatalogRecord;

/// Maximum number of summaries returned per search.
pub const MAX_RESULTS: usize = 5;

/// A qualifying match: id, title, and the dataset's page URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// Outcome of one catalog search.
///
/// The three non-match variants are deliberately distinct so the caller
/// can tell a contract violation from catalog state from an empty result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Matches(Vec<DatasetSummary>),
    /// No successful catalog fetch this process.
    CatalogUnavailable,
    /// The supplied keyword list was absent, empty, or malformed.
    NoValidKeywords,
    /// A valid search ran and zero records qualified.
    NoMatches { keywords: Vec<String> },
}

/// Scan the catalog in order for records matching any of the supplied
/// keywords.
///
/// Keyword validation precedes the catalog check: an empty keyword list is
/// a caller-contract violation even when the catalog is also empty.
pub fn search(records: &[CatalogRecord], matched_keywords: &[String]) -> SearchOutcome {
    if matched_keywords.is_empty() {
        return SearchOutcome::NoValidKeywords;
    }
    if records.is_empty() {
        return SearchOutcome::CatalogUnavailable;
    }

    let keywords: Vec<String> = matched_keywords.iter().map(|k| k.to_lowercase()).collect();

    let mut seen_ids = HashSet::new();
    let mut matches = Vec::new();

    for record in records {
        let title = record.title.as_deref().unwrap_or("").to_lowercase();
        let description = record.description.as_deref().unwrap_or("").to_lowercase();

        let hit = keywords
            .iter()
            .any(|k| title.contains(k.as_str()) || description.contains(k.as_str()));
        if !hit {
            continue;
        }

        // Only complete records qualify; first occurrence of an id wins.
        let (Some(id), Some(title), Some(url)) = (
            record.id.as_deref(),
            record.title.as_deref(),
            record.sample_code_url.as_deref(),
        ) else {
            continue;
        };
        if id.is_empty() || title.is_empty() || url.is_empty() {
            continue;
        }
        if !seen_ids.insert(id.to_string()) {
            continue;
        }

        matches.push(DatasetSummary {
            id: id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
        });
        if matches.len() >= MAX_RESULTS {
            break;
        }
    }

    if matches.is_empty() {
        SearchOutcome::NoMatches { keywords }
    } else {
        SearchOutcome::Matches(matches)
    }
}
