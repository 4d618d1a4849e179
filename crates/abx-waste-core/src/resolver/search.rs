//! Drug name search for pickers.
//!
//! Substring matches (case-insensitive) come back in catalog order. When
//! nothing contains the query, names are ranked by fuzzy similarity so a
//! misspelling still offers candidates.

use strsim::{jaro_winkler, normalized_levenshtein};

/// Minimum similarity for a fuzzy suggestion.
const MIN_SIMILARITY: f64 = 0.70;

/// Maximum number of fuzzy suggestions.
const MAX_SUGGESTIONS: usize = 5;

/// Filter drug names by a search term.
pub fn search_drugs(names: &[String], query: &str) -> Vec<String> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return names.to_vec();
    }

    let matches: Vec<String> = names
        .iter()
        .filter(|name| name.to_lowercase().contains(&query))
        .cloned()
        .collect();
    if !matches.is_empty() {
        return matches;
    }

    let mut scored: Vec<(f64, &String)> = names
        .iter()
        .map(|name| (fuzzy_match(&query, &name.to_lowercase()), name))
        .filter(|(score, _)| *score >= MIN_SIMILARITY)
        .collect();

    // Sort by similarity descending
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, name)| name.clone())
        .collect()
}

/// Combined Jaro-Winkler / Levenshtein similarity.
fn fuzzy_match(a: &str, b: &str) -> f64 {
    jaro_winkler(a, b) * 0.6 + normalized_levenshtein(a, b) * 0.4
}
