//! Knowledge record validation utilities

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::KnowledgeUnit;
use crate::domain::StoreError;

/// Maximum length for document ids
pub const MAX_UNIT_ID_LENGTH: usize = 255;

/// Document ids may not contain path separators
static UNIT_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^/]+$").unwrap());

/// Knowledge validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeValidationError {
    EmptyId,
    IdTooLong { length: usize, max: usize },
    InvalidIdFormat { id: String },
    UnsupportedDomain { domain: String, supported: Vec<String> },
    EmptyContent,
    /// Score outside [0, 1] or not finite
    InvalidConfidence { value: f64 },
    InvalidSimilarity { value: f64 },
    SimilarityBelowThreshold { value: f64, threshold: f64 },
    NonFiniteEmbedding { index: usize },
    EmptyEmbeddings,
}

impl fmt::Display for KnowledgeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "Knowledge unit ID cannot be empty"),
            Self::IdTooLong { length, max } => {
                write!(f, "Knowledge unit ID too long: {} characters (max {})", length, max)
            }
            Self::InvalidIdFormat { id } => {
                write!(
                    f,
                    "Invalid knowledge unit ID '{}': must not contain '/' or be '.' or '..'",
                    id
                )
            }
            Self::UnsupportedDomain { domain, supported } => {
                write!(
                    f,
                    "Unsupported domain '{}': expected one of [{}]",
                    domain,
                    supported.join(", ")
                )
            }
            Self::EmptyContent => write!(f, "Knowledge unit content cannot be empty"),
            Self::InvalidConfidence { value } => {
                write!(f, "Invalid confidence_score {}: must be between 0 and 1", value)
            }
            Self::InvalidSimilarity { value } => {
                write!(f, "Invalid similarity {}: must be between 0 and 1", value)
            }
            Self::SimilarityBelowThreshold { value, threshold } => {
                write!(
                    f,
                    "Similarity {} is below the configured threshold {}",
                    value, threshold
                )
            }
            Self::NonFiniteEmbedding { index } => {
                write!(f, "Embedding value at index {} is not a finite number", index)
            }
            Self::EmptyEmbeddings => write!(f, "Embeddings, when present, cannot be empty"),
        }
    }
}

impl std::error::Error for KnowledgeValidationError {}

impl From<KnowledgeValidationError> for StoreError {
    fn from(err: KnowledgeValidationError) -> Self {
        StoreError::validation(err.to_string())
    }
}

pub fn validate_unit_id(id: &str) -> Result<(), KnowledgeValidationError> {
    if id.is_empty() {
        return Err(KnowledgeValidationError::EmptyId);
    }

    if id.len() > MAX_UNIT_ID_LENGTH {
        return Err(KnowledgeValidationError::IdTooLong {
            length: id.len(),
            max: MAX_UNIT_ID_LENGTH,
        });
    }

    if id == "." || id == ".." || !UNIT_ID_PATTERN.is_match(id) {
        return Err(KnowledgeValidationError::InvalidIdFormat { id: id.to_string() });
    }

    Ok(())
}

/// Canonical form of a domain tag, used both for allow-list checks and storage
pub fn normalize_domain(domain: &str) -> String {
    domain.to_lowercase()
}

pub fn validate_domain(domain: &str, supported: &[String]) -> Result<(), KnowledgeValidationError> {
    let normalized = normalize_domain(domain);
    if supported.iter().any(|d| normalize_domain(d) == normalized) {
        return Ok(());
    }

    Err(KnowledgeValidationError::UnsupportedDomain {
        domain: domain.to_string(),
        supported: supported.to_vec(),
    })
}

fn is_unit_interval(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

pub fn validate_confidence(value: f64) -> Result<(), KnowledgeValidationError> {
    if is_unit_interval(value) {
        Ok(())
    } else {
        Err(KnowledgeValidationError::InvalidConfidence { value })
    }
}

pub fn validate_similarity(value: f64, threshold: f64) -> Result<(), KnowledgeValidationError> {
    if !is_unit_interval(value) {
        return Err(KnowledgeValidationError::InvalidSimilarity { value });
    }

    if value < threshold {
        return Err(KnowledgeValidationError::SimilarityBelowThreshold { value, threshold });
    }

    Ok(())
}

pub fn validate_embeddings(embeddings: &[f32]) -> Result<(), KnowledgeValidationError> {
    if embeddings.is_empty() {
        return Err(KnowledgeValidationError::EmptyEmbeddings);
    }

    match embeddings.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(KnowledgeValidationError::NonFiniteEmbedding { index }),
        None => Ok(()),
    }
}

/// Validates a unit before it is written
pub fn validate_knowledge_unit(
    unit: &KnowledgeUnit,
    supported_domains: &[String],
) -> Result<(), KnowledgeValidationError> {
    validate_unit_id(unit.id())?;
    validate_domain(&unit.domain, supported_domains)?;

    if unit.content.trim().is_empty() {
        return Err(KnowledgeValidationError::EmptyContent);
    }

    validate_confidence(unit.confidence_score)?;

    if let Some(embeddings) = &unit.embeddings {
        validate_embeddings(embeddings)?;
    }

    Ok(())
}
