//! Knowledge unit record

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::store::{KNOWLEDGE_UNITS, StoreDocument};

/// Domain-tagged content record with an optional vector embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeUnit {
    id: String,
    pub domain: String,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default)]
    pub embeddings: Option<Vec<f32>>,
    created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub confidence_score: f64,
}

impl KnowledgeUnit {
    /// Creates a unit stamped with the current time
    pub fn new(id: impl Into<String>, domain: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            domain: domain.into(),
            content: content.into(),
            metadata: HashMap::new(),
            embeddings: None,
            created_at: now,
            updated_at: now,
            confidence_score: 0.0,
        }
    }

    /// Restores a unit with known timestamps (e.g. imported from elsewhere)
    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_embeddings(mut self, embeddings: Vec<f32>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn with_confidence(mut self, score: f64) -> Self {
        self.confidence_score = score;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn has_embeddings(&self) -> bool {
        self.embeddings.is_some()
    }

    /// Refreshes `updated_at`; callers performing an update are expected to call this
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub(crate) fn assign_id(&mut self, id: String) {
        self.id = id;
    }

    pub(crate) fn keep_created_at(&mut self, created_at: DateTime<Utc>) {
        self.created_at = created_at;
    }
}

impl StoreDocument for KnowledgeUnit {
    const COLLECTION: &'static str = KNOWLEDGE_UNITS;

    fn document_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_new_stamps_equal_timestamps() {
        let unit = KnowledgeUnit::new("ku-1", "finance", "Rates rose");

        assert_eq!(unit.id(), "ku-1");
        assert_eq!(unit.created_at(), unit.updated_at);
        assert_eq!(unit.confidence_score, 0.0);
        assert!(!unit.has_embeddings());
        assert!(unit.metadata.is_empty());
    }

    #[test]
    fn test_touch_only_moves_updated_at() {
        let created = Utc::now() - Duration::hours(2);
        let mut unit = KnowledgeUnit::new("ku-1", "finance", "Rates rose")
            .with_timestamps(created, created);

        unit.touch();

        assert_eq!(unit.created_at(), created);
        assert!(unit.updated_at > created);
    }

    #[test]
    fn test_builder_fields() {
        let unit = KnowledgeUnit::new("ku-2", "research", "Paper abstract")
            .with_metadata("source", "arxiv")
            .with_embeddings(vec![0.1, 0.2, 0.3])
            .with_confidence(0.85);

        assert_eq!(unit.metadata.get("source"), Some(&json!("arxiv")));
        assert_eq!(unit.embeddings.as_deref(), Some(&[0.1, 0.2, 0.3][..]));
        assert_eq!(unit.confidence_score, 0.85);
    }

    #[test]
    fn test_document_roundtrip_keeps_timestamps() {
        let unit = KnowledgeUnit::new("ku-3", "healthcare", "Trial results")
            .with_metadata("phase", 3);

        let document = unit.to_document().unwrap();
        assert_eq!(document.get("domain"), Some(&json!("healthcare")));

        let restored = KnowledgeUnit::from_document(document).unwrap();
        assert_eq!(restored, unit);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let document = json!({
            "id": "ku-4",
            "domain": "technology",
            "content": "Release notes",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        });

        let unit: KnowledgeUnit = serde_json::from_value(document).unwrap();
        assert!(unit.embeddings.is_none());
        assert!(unit.metadata.is_empty());
        assert_eq!(unit.confidence_score, 0.0);
    }
}
