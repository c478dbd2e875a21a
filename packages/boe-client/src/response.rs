//! The `{status, data}` envelope every BOE endpoint answers with.

use serde::Serialize;

use crate::document::GenericDocument;
use crate::error::{ApiError, Result};
use crate::normalize::{normalize, DocumentFormat};

/// XML answers arrive wrapped in this root element.
const XML_ROOT: &str = "response";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseStatus {
    pub code: String,
    pub text: String,
}

impl ResponseStatus {
    pub fn is_ok(&self) -> bool {
        self.code == "200"
    }
}

/// A normalized answer split into status and payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: ResponseStatus,
    pub data: GenericDocument,
}

impl ApiResponse {
    /// Normalize `raw` and split the envelope.
    pub fn parse(raw: &str, format: DocumentFormat) -> Result<Self> {
        Self::from_document(normalize(raw, format)?, format)
    }

    /// Split an already normalized document. A missing `status` is a format
    /// error; a missing `data` is an empty list.
    pub fn from_document(document: GenericDocument, format: DocumentFormat) -> Result<Self> {
        let mut map = match document {
            GenericDocument::Map(map) => map,
            _ => return Err(ApiError::format(format.name(), "response is not an object")),
        };

        if map.len() == 1 && matches!(map.get(XML_ROOT), Some(GenericDocument::Map(_))) {
            if let Some(GenericDocument::Map(inner)) = map.shift_remove(XML_ROOT) {
                map = inner;
            }
        }

        let status = match map.shift_remove("status") {
            Some(status) => parse_status(&status)
                .ok_or_else(|| ApiError::format(format.name(), "`status` has no `code`"))?,
            None => return Err(ApiError::format(format.name(), "missing `status` in response")),
        };
        let data = map
            .shift_remove("data")
            .unwrap_or_else(|| GenericDocument::List(Vec::new()));

        Ok(Self { status, data })
    }

    /// Record views over `data`.
    ///
    /// A list yields its items. A map with a single list or map entry (the
    /// repeated `<item>` of XML answers) yields that entry's items. Any other
    /// map is one record; a scalar is none.
    pub fn records(&self) -> Vec<&GenericDocument> {
        match &self.data {
            GenericDocument::List(items) => items.iter().collect(),
            GenericDocument::Map(map) if map.len() == 1 => match map.values().next() {
                Some(inner @ (GenericDocument::List(_) | GenericDocument::Map(_))) => inner.items(),
                _ => vec![&self.data],
            },
            GenericDocument::Map(map) if map.is_empty() => Vec::new(),
            GenericDocument::Map(_) => vec![&self.data],
            GenericDocument::Scalar(_) => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

fn parse_status(status: &GenericDocument) -> Option<ResponseStatus> {
    let code = status.text_at("code")?;
    Some(ResponseStatus {
        code: code.to_string(),
        text: status.text_at("text").unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_json_envelope() {
        let raw = r#"{"status":{"code":"200","text":"ok"},"data":[{"identificador":"BOE-A-1","titulo":"Uno"},{"identificador":"BOE-A-2","titulo":"Dos"}]}"#;
        let response = ApiResponse::parse(raw, DocumentFormat::Json).unwrap();

        assert!(response.status.is_ok());
        assert_eq!(response.status.text, "ok");
        let records = response.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text_at("titulo"), Some("Dos"));
    }

    #[test]
    fn test_numeric_status_code() {
        let raw = r#"{"status":{"code":200,"text":"ok"},"data":{}}"#;
        let response = ApiResponse::parse(raw, DocumentFormat::Json).unwrap();
        assert_eq!(response.status.code, "200");
        assert!(response.is_empty());
    }

    #[test]
    fn test_xml_envelope_unwraps_root() {
        let raw = r#"<response>
            <status><code>200</code><text>ok</text></status>
            <data>
                <item><identificador>BOE-A-1</identificador><titulo>Uno</titulo></item>
                <item><identificador>BOE-A-2</identificador><titulo>Dos</titulo></item>
            </data>
        </response>"#;
        let response = ApiResponse::parse(raw, DocumentFormat::Xml).unwrap();

        assert_eq!(response.status.code, "200");
        let records = response.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text_at("identificador"), Some("BOE-A-1"));
    }

    #[test]
    fn test_single_xml_item_is_one_record() {
        let raw = r#"<response><status><code>200</code></status>
            <data><item><titulo>Solo</titulo></item></data></response>"#;
        let response = ApiResponse::parse(raw, DocumentFormat::Xml).unwrap();
        let records = response.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text_at("titulo"), Some("Solo"));
        assert_eq!(response.status.text, "");
    }

    #[test]
    fn test_flat_map_is_one_record() {
        let raw = r#"{"status":{"code":"200"},"data":{"identificador":"BOE-A-1","titulo":"Uno"}}"#;
        let response = ApiResponse::parse(raw, DocumentFormat::Json).unwrap();
        assert_eq!(response.records().len(), 1);
    }

    #[test]
    fn test_missing_data_is_empty() {
        let raw = r#"{"status":{"code":"200","text":"ok"}}"#;
        let response = ApiResponse::parse(raw, DocumentFormat::Json).unwrap();
        assert_eq!(response.data, GenericDocument::List(Vec::new()));
        assert!(response.is_empty());
    }

    #[test]
    fn test_missing_status_is_format_error() {
        let err = ApiResponse::parse(r#"{"data":[]}"#, DocumentFormat::Json).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Format);
        assert_eq!(err.code, 500);

        let err = ApiResponse::parse(r#"["a"]"#, DocumentFormat::Json).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Format);
    }
}
