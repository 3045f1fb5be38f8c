//! Integration point record - a link between units of two domains

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::KnowledgeUnit;
use crate::domain::store::{INTEGRATION_POINTS, StoreDocument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationPoint {
    id: String,
    pub source_unit_id: String,
    pub target_unit_id: String,
    pub source_domain: String,
    pub target_domain: String,
    pub similarity: f64,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    created_at: DateTime<Utc>,
}

impl IntegrationPoint {
    /// Links two units under a freshly generated id
    pub fn between(source: &KnowledgeUnit, target: &KnowledgeUnit, similarity: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_unit_id: source.id().to_string(),
            target_unit_id: target.id().to_string(),
            source_domain: source.domain.clone(),
            target_domain: target.domain.clone(),
            similarity,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_cross_domain(&self) -> bool {
        self.source_domain != self.target_domain
    }
}

impl StoreDocument for IntegrationPoint {
    const COLLECTION: &'static str = INTEGRATION_POINTS;

    fn document_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_copies_unit_identity() {
        let source = KnowledgeUnit::new("ku-1", "healthcare", "Dosage study");
        let target = KnowledgeUnit::new("ku-2", "finance", "Pharma earnings");

        let point = IntegrationPoint::between(&source, &target, 0.82);

        assert_eq!(point.source_unit_id, "ku-1");
        assert_eq!(point.target_unit_id, "ku-2");
        assert_eq!(point.source_domain, "healthcare");
        assert_eq!(point.target_domain, "finance");
        assert!(point.is_cross_domain());
        assert!(Uuid::parse_str(point.id()).is_ok());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = KnowledgeUnit::new("a", "finance", "x");
        let b = KnowledgeUnit::new("b", "finance", "y");

        let first = IntegrationPoint::between(&a, &b, 0.9);
        let second = IntegrationPoint::between(&a, &b, 0.9);

        assert_ne!(first.id(), second.id());
        assert!(!first.is_cross_domain());
    }
}
