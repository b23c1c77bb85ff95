//! Keyword vocabulary derived from catalog text.
//!
//! The vocabulary bounds what the conversational coordinator may ask the
//! matcher for: every token occurs verbatim (case-insensitively) in at
//! least one record's title or description.

use std::collections::BTreeSet;

use super::CatalogRecord;

/// Tokens shorter than this are noise (articles, units, axis labels).
const MIN_TOKEN_LEN: usize = 3;

/// Derive the deduplicated, ascending-sorted vocabulary from all record
/// titles and descriptions.  An empty catalog yields an empty vocabulary.
pub fn build_keywords(records: &[CatalogRecord]) -> Vec<String> {
    let mut vocab = BTreeSet::new();
    for record in records {
        let mut text = String::new();
        if let Some(ref title) = record.title {
            text.push_str(title);
        }
        if let Some(ref description) = record.description {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(description);
        }
        for token in tokenize(&text.to_lowercase()) {
            vocab.insert(token);
        }
    }
    vocab.into_iter().collect()
}

/// Extract maximal ASCII-alphanumeric runs, keeping only tokens longer
/// than two characters that are not purely numeric.  Expects lowercased
/// input.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .filter(|t| !t.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}
