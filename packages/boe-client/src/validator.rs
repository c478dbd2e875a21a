//! Relevance check for free-text searches.
//!
//! The remote search is known to return records unrelated to the query. This
//! module scores how many results mention at least one query token.
//!
//! Identifiers are matched with the same substring rule as titles, although
//! they are structured codes (`BOE-A-2015-10566`) rather than prose. A short
//! numeric token like `20` will therefore match many identifiers. The rule is
//! kept for compatibility with observed behaviour.

use serde::{Deserialize, Serialize};

use crate::document::GenericDocument;

/// Below this fraction of matching results a search is flagged.
pub const MATCH_THRESHOLD: f64 = 0.30;

/// Placeholder recorded for mismatched results that have no title.
pub const UNTITLED: &str = "(untitled)";

/// Record fields read when building a [`SearchResult`] from a document.
pub const IDENTIFIER_FIELD: &str = "identificador";
pub const TITLE_FIELD: &str = "titulo";

/// The two fields of a search record the validator looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub identifier: Option<String>,
    pub title: Option<String>,
}

impl SearchResult {
    pub fn new(identifier: Option<&str>, title: Option<&str>) -> Self {
        Self {
            identifier: identifier.map(str::to_string),
            title: title.map(str::to_string),
        }
    }

    pub fn titled(title: &str) -> Self {
        Self::new(None, Some(title))
    }

    /// Reads `identificador` / `titulo` from a record.
    pub fn from_document(record: &GenericDocument) -> Self {
        Self::from_document_fields(record, IDENTIFIER_FIELD, TITLE_FIELD)
    }

    pub fn from_document_fields(
        record: &GenericDocument,
        identifier_field: &str,
        title_field: &str,
    ) -> Self {
        Self::new(record.text_at(identifier_field), record.text_at(title_field))
    }
}

/// Outcome of [`ResultValidator::validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub search_text: String,
    pub total_results: usize,
    pub matching_results: usize,
    pub confidence: f64,
    pub likely_incorrect: bool,
    pub mismatched_titles: Vec<String>,
}

/// Whitespace split, lowercased. The tokenization rule used for scoring.
pub fn tokenize(search_text: &str) -> Vec<String> {
    search_text
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultValidator {
    threshold: f64,
}

impl Default for ResultValidator {
    fn default() -> Self {
        Self {
            threshold: MATCH_THRESHOLD,
        }
    }
}

impl ResultValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the match threshold; clamped to `[0, 1]`.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score `results` against `search_text`.
    pub fn validate(&self, search_text: &str, results: &[SearchResult]) -> ValidationReport {
        let tokens = tokenize(search_text);
        let mut matching_results = 0;
        let mut mismatched_titles = Vec::new();

        for result in results {
            if matches_any(&tokens, result) {
                matching_results += 1;
            } else {
                mismatched_titles.push(result.title.clone().unwrap_or_else(|| UNTITLED.to_string()));
            }
        }

        let total_results = results.len();
        let confidence = if total_results > 0 {
            matching_results as f64 / total_results as f64
        } else {
            0.0
        };

        ValidationReport {
            search_text: search_text.to_string(),
            total_results,
            matching_results,
            confidence,
            likely_incorrect: confidence < self.threshold,
            mismatched_titles,
        }
    }
}

fn matches_any(tokens: &[String], result: &SearchResult) -> bool {
    let title = result.title.as_deref().unwrap_or_default().to_lowercase();
    let identifier = result.identifier.as_deref().unwrap_or_default().to_lowercase();
    tokens
        .iter()
        .any(|token| title.contains(token.as_str()) || identifier.contains(token.as_str()))
}
