//! Document types exchanged with the remote store

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::domain::StoreError;

/// Raw document body as held by the store
pub type Document = Map<String, Value>;

/// Equality filter on a single top-level document field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns true if the document carries the field with an equal value
    pub fn matches(&self, document: &Document) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

/// Trait for typed records persisted in a named collection
pub trait StoreDocument: Clone + Debug + Send + Sync + Serialize + DeserializeOwned {
    /// Collection the record type lives in
    const COLLECTION: &'static str;

    /// Returns the record's document id
    fn document_id(&self) -> &str;

    fn to_document(&self) -> Result<Document, StoreError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StoreError::validation(format!(
                "Record for '{}' must serialize to an object, got {}",
                Self::COLLECTION,
                other
            ))),
            Err(e) => Err(StoreError::validation(format!(
                "Failed to serialize record for '{}': {}",
                Self::COLLECTION,
                e
            ))),
        }
    }

    fn from_document(document: Document) -> Result<Self, StoreError> {
        serde_json::from_value(Value::Object(document)).map_err(|e| {
            StoreError::internal(format!(
                "Failed to deserialize record from '{}': {}",
                Self::COLLECTION,
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    impl StoreDocument for Note {
        const COLLECTION: &'static str = "notes";

        fn document_id(&self) -> &str {
            &self.id
        }
    }

    #[test]
    fn test_document_conversion() {
        let note = Note {
            id: "n-1".to_string(),
            body: "hello".to_string(),
        };

        let document = note.to_document().unwrap();
        assert_eq!(document.get("body"), Some(&json!("hello")));

        let restored = Note::from_document(document).unwrap();
        assert_eq!(restored, note);
    }

    #[test]
    fn test_from_document_rejects_wrong_shape() {
        let mut document = Document::new();
        document.insert("id".to_string(), json!(42));

        let result = Note::from_document(document);
        assert!(matches!(result, Err(StoreError::Internal { .. })));
    }

    #[test]
    fn test_field_filter_matches() {
        let mut document = Document::new();
        document.insert("domain".to_string(), json!("finance"));

        assert!(FieldFilter::equals("domain", "finance").matches(&document));
        assert!(!FieldFilter::equals("domain", "research").matches(&document));
        assert!(!FieldFilter::equals("missing", "finance").matches(&document));
    }
}
