//! Format-neutral document tree.
//!
//! JSON and XML responses both normalize into [`GenericDocument`], so callers
//! pattern-match one shape instead of probing for keys.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// A normalized response: text leaves, ordered lists, ordered maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GenericDocument {
    Scalar(String),
    List(Vec<GenericDocument>),
    Map(IndexMap<String, GenericDocument>),
}

impl GenericDocument {
    pub fn scalar(text: impl Into<String>) -> Self {
        Self::Scalar(text.into())
    }

    /// Map lookup. `None` for lists, scalars, or a missing key.
    pub fn get(&self, key: &str) -> Option<&GenericDocument> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Follows a `/`-separated chain of map keys.
    pub fn path(&self, path: &str) -> Option<&GenericDocument> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, key| node.get(key))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, GenericDocument>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[GenericDocument]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Text of a scalar child, e.g. `record.text_at("titulo")`.
    pub fn text_at(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Self::as_str)
    }

    /// A named value stored either as a child (JSON) or as an attribute
    /// (XML `@name`).
    pub fn field(&self, name: &str) -> Option<&str> {
        self.text_at(name)
            .or_else(|| self.text_at(&format!("@{}", name)))
    }

    /// Map children under `key`, one or many. Empty when the key is missing.
    pub fn children(&self, key: &str) -> Vec<&GenericDocument> {
        self.get(key)
            .map(Self::items)
            .unwrap_or_default()
            .into_iter()
            .filter(|child| child.as_map().is_some())
            .collect()
    }

    /// Views a node as a sequence: a list yields its items, anything else
    /// yields itself. XML collapses single-occurrence children, so a field
    /// that is "usually a list" may arrive as one node.
    pub fn items(&self) -> Vec<&GenericDocument> {
        match self {
            Self::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scalar(text) => text.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(map) => map.is_empty(),
        }
    }

    /// Nesting depth; a scalar is depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::List(items) => 1 + items.iter().map(Self::depth).max().unwrap_or(0),
            Self::Map(map) => 1 + map.values().map(Self::depth).max().unwrap_or(0),
        }
    }
}

impl From<serde_json::Value> for GenericDocument {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Scalar(String::new()),
            Value::Bool(flag) => Self::Scalar(flag.to_string()),
            Value::Number(number) => Self::Scalar(number.to_string()),
            Value::String(text) => Self::Scalar(text),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(object) => Self::Map(
                object
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for GenericDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_key_order() {
        let doc = GenericDocument::from(json!({"z": "1", "a": "2", "m": "3"}));
        let keys: Vec<_> = doc.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_non_string_scalars_become_text() {
        let doc = GenericDocument::from(json!({"n": 42, "f": 1.5, "b": true, "x": null}));
        assert_eq!(doc.text_at("n"), Some("42"));
        assert_eq!(doc.text_at("f"), Some("1.5"));
        assert_eq!(doc.text_at("b"), Some("true"));
        assert_eq!(doc.text_at("x"), Some(""));
    }

    #[test]
    fn test_path_and_items() {
        let doc = GenericDocument::from(json!({
            "data": {"item": [{"id": "1"}, {"id": "2"}], "single": {"id": "3"}}
        }));

        let items = doc.path("data/item").unwrap().items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].text_at("id"), Some("2"));

        let single = doc.path("data/single").unwrap().items();
        assert_eq!(single.len(), 1);
        assert!(doc.path("data/missing").is_none());
    }

    #[test]
    fn test_field_reads_child_or_attribute() {
        let json = GenericDocument::from(json!({"codigo": "1", "nombre": "I"}));
        let xml = GenericDocument::from(json!({"@codigo": "1"}));
        assert_eq!(json.field("codigo"), Some("1"));
        assert_eq!(xml.field("codigo"), Some("1"));
        assert_eq!(xml.field("nombre"), None);
    }

    #[test]
    fn test_children_skips_scalars() {
        let doc = GenericDocument::from(json!({
            "many": [{"id": "1"}, "", {"id": "2"}],
            "one": {"id": "3"},
            "blank": ""
        }));
        assert_eq!(doc.children("many").len(), 2);
        assert_eq!(doc.children("one")[0].text_at("id"), Some("3"));
        assert!(doc.children("blank").is_empty());
        assert!(doc.children("missing").is_empty());
    }

    #[test]
    fn test_depth() {
        assert_eq!(GenericDocument::scalar("x").depth(), 1);
        assert_eq!(GenericDocument::List(vec![]).depth(), 1);
        let doc = GenericDocument::from(json!({"a": [{"b": "c"}]}));
        assert_eq!(doc.depth(), 4);
    }

    #[test]
    fn test_serializes_untagged() {
        let doc = GenericDocument::from(json!({"a": ["1", {"b": "2"}]}));
        assert_eq!(
            serde_json::to_string(&doc).unwrap(),
            r#"{"a":["1",{"b":"2"}]}"#
        );
    }
}
