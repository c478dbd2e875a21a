//! Code lookups over auxiliary tables.

use serde::Serialize;

use crate::endpoint::AuxiliaryTable;
use crate::error::{ApiError, Result};
use crate::response::ApiResponse;

/// What a table entry must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeQuery {
    /// Code equal to the given one.
    Exact(String),
    /// Code or description containing the text, case-insensitive.
    Contains(String),
}

impl CodeQuery {
    /// Rejects blank queries.
    pub fn validate(&self) -> Result<()> {
        let (field, value) = match self {
            Self::Exact(code) => ("code", code),
            Self::Contains(text) => ("query", text),
        };
        if value.trim().is_empty() {
            return Err(ApiError::validation(field, value, "a non-empty value"));
        }
        Ok(())
    }

    pub fn matches(&self, code: &str, description: &str) -> bool {
        match self {
            Self::Exact(wanted) => code == wanted.trim(),
            Self::Contains(text) => {
                let text = text.trim().to_lowercase();
                code.to_lowercase().contains(&text) || description.to_lowercase().contains(&text)
            }
        }
    }
}

/// One `{codigo, descripcion}` row of an auxiliary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeEntry {
    pub table: &'static str,
    pub code: String,
    pub description: String,
}

/// Rows of a fetched `table` that satisfy `query`, in table order.
pub fn matching_entries(
    table: AuxiliaryTable,
    response: &ApiResponse,
    query: &CodeQuery,
) -> Vec<CodeEntry> {
    response
        .records()
        .into_iter()
        .filter_map(|record| {
            let code = record.field("codigo")?;
            let description = record.field("descripcion").unwrap_or_default();
            query.matches(code, description).then(|| CodeEntry {
                table: table.name(),
                code: code.to_string(),
                description: description.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DocumentFormat, ErrorKind};

    const DEPARTMENTS: &str = r#"{
        "status": {"code": "200", "text": "ok"},
        "data": [
            {"codigo": "7723", "descripcion": "Jefatura del Estado"},
            {"codigo": "9574", "descripcion": "Ministerio de Hacienda"},
            {"codigo": "77230", "descripcion": "Otro"}
        ]
    }"#;

    fn departments() -> ApiResponse {
        ApiResponse::parse(DEPARTMENTS, DocumentFormat::Json).unwrap()
    }

    #[test]
    fn test_exact_code() {
        let found = matching_entries(
            AuxiliaryTable::Departments,
            &departments(),
            &CodeQuery::Exact("7723".into()),
        );
        assert_eq!(
            found,
            vec![CodeEntry {
                table: "departamentos",
                code: "7723".into(),
                description: "Jefatura del Estado".into(),
            }]
        );
    }

    #[test]
    fn test_contains_searches_code_and_description() {
        let response = departments();
        let by_text = matching_entries(
            AuxiliaryTable::Departments,
            &response,
            &CodeQuery::Contains("HACIENDA".into()),
        );
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].code, "9574");

        let by_code = matching_entries(
            AuxiliaryTable::Departments,
            &response,
            &CodeQuery::Contains("7723".into()),
        );
        assert_eq!(by_code.len(), 2);
    }

    #[test]
    fn test_xml_table_rows() {
        let raw = "<response><status><code>200</code><text>ok</text></status><data>\
            <item codigo=\"1300\"><descripcion>Ley</descripcion></item>\
            <item codigo=\"1290\"><descripcion>Ley Orgánica</descripcion></item>\
            </data></response>";
        let response = ApiResponse::parse(raw, DocumentFormat::Xml).unwrap();
        let found = matching_entries(
            AuxiliaryTable::LegalRanges,
            &response,
            &CodeQuery::Exact("1290".into()),
        );
        assert_eq!(found[0].description, "Ley Orgánica");
    }

    #[test]
    fn test_blank_query_rejected() {
        assert_eq!(
            CodeQuery::Exact("  ".into()).validate().unwrap_err().kind,
            ErrorKind::Validation
        );
        assert!(CodeQuery::Contains("ley".into()).validate().is_ok());
    }
}
