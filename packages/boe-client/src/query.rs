//! Structured search queries.
//!
//! Each supplied filter contributes one clause and clauses are AND-combined.
//! Clauses are kept in a canonical order, so two queries built from the same
//! filters compare equal no matter which order the filters were set in.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Field searched by date range clauses.
const DATE_FIELD: &str = "fecha_publicacion";

/// Optional filters for a legislation search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Full-text search.
    pub text: Option<String>,
    /// Search in the title only.
    pub title: Option<String>,
    pub department_code: Option<String>,
    pub legal_range_code: Option<String>,
    pub matter_code: Option<String>,
    /// Inclusive lower publication date, `YYYYMMDD`.
    pub date_from: Option<String>,
    /// Inclusive upper publication date, `YYYYMMDD`.
    pub date_to: Option<String>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_department(mut self, code: impl Into<String>) -> Self {
        self.department_code = Some(code.into());
        self
    }

    pub fn with_legal_range(mut self, code: impl Into<String>) -> Self {
        self.legal_range_code = Some(code.into());
        self
    }

    pub fn with_matter(mut self, code: impl Into<String>) -> Self {
        self.matter_code = Some(code.into());
        self
    }

    pub fn with_date_from(mut self, date: impl Into<String>) -> Self {
        self.date_from = Some(date.into());
        self
    }

    pub fn with_date_to(mut self, date: impl Into<String>) -> Self {
        self.date_to = Some(date.into());
        self
    }

    /// The free text a search result should be checked against: the
    /// full-text filter, falling back to the title filter.
    pub fn search_text(&self) -> Option<&str> {
        present(&self.text).or_else(|| present(&self.title))
    }

    /// True when any non-date filter is set.
    pub fn has_terms(&self) -> bool {
        [
            &self.text,
            &self.title,
            &self.department_code,
            &self.legal_range_code,
            &self.matter_code,
        ]
        .into_iter()
        .any(|filter| present(filter).is_some())
    }
}

/// One AND-combined term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum Clause {
    Text(String),
    Title(String),
    Department(String),
    LegalRange(String),
    Matter(String),
}

impl Clause {
    /// Query-string form understood by the search endpoint.
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Text(text) => format!("texto:\"{}\"", escape_quotes(text)),
            Self::Title(title) => format!("titulo:\"{}\"", escape_quotes(title)),
            Self::Department(code) => format!("departamento@codigo:{}", code),
            Self::LegalRange(code) => format!("rango@codigo:{}", code),
            Self::Matter(code) => format!("materia@codigo:{}", code),
        }
    }
}

/// Inclusive publication date range; only supplied bounds are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
}

/// Output of [`build_query`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchQuery {
    /// No filter at all: an unfiltered search.
    Empty,
    Filtered {
        /// Canonically ordered, AND-combined.
        clauses: Vec<Clause>,
        #[serde(skip_serializing_if = "Option::is_none")]
        date_range: Option<DateRange>,
    },
}

impl SearchQuery {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn clauses(&self) -> &[Clause] {
        match self {
            Self::Empty => &[],
            Self::Filtered { clauses, .. } => clauses,
        }
    }

    pub fn date_range(&self) -> Option<&DateRange> {
        match self {
            Self::Empty => None,
            Self::Filtered { date_range, .. } => date_range.as_ref(),
        }
    }

    /// Terms joined with ` AND `.
    pub fn query_string(&self) -> String {
        self.clauses()
            .iter()
            .map(Clause::to_query_string)
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Serialized payload for the `query` parameter; `None` when empty.
    pub fn to_payload(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut query = Map::new();
        query.insert(
            "query_string".to_string(),
            json!({ "query": self.query_string() }),
        );
        if let Some(range) = self.date_range() {
            query.insert("range".to_string(), json!({ DATE_FIELD: range }));
        }

        Some(json!({ "query": Value::Object(query) }).to_string())
    }
}

/// Combine the supplied filters into a query. Blank strings count as absent.
pub fn build_query(filters: &SearchFilters) -> SearchQuery {
    let candidates = [
        present(&filters.text).map(|v| Clause::Text(v.to_string())),
        present(&filters.title).map(|v| Clause::Title(v.to_string())),
        present(&filters.department_code).map(|v| Clause::Department(v.to_string())),
        present(&filters.legal_range_code).map(|v| Clause::LegalRange(v.to_string())),
        present(&filters.matter_code).map(|v| Clause::Matter(v.to_string())),
    ];
    let mut clauses: Vec<Clause> = candidates.into_iter().flatten().collect();
    clauses.sort();

    let gte = present(&filters.date_from).map(str::to_string);
    let lte = present(&filters.date_to).map(str::to_string);
    let date_range = (gte.is_some() || lte.is_some()).then_some(DateRange { gte, lte });

    if clauses.is_empty() && date_range.is_none() {
        return SearchQuery::Empty;
    }

    SearchQuery::Filtered {
        clauses,
        date_range,
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
