//! LIF Core - Annotation graph model, vocabulary and shared traits
//!
//! This crate defines the abstractions every producer in the pipeline shares:
//! - The annotation graph (container, views, annotations)
//! - Vocabulary identifiers for annotation types and features
//! - Common error types
//! - The `Producer` capability interface
//! - Configuration management

pub mod config;
pub mod container;
pub mod producer;
pub mod vocabulary;

pub use config::{AppConfig, ConfigError, LoggingConfig, NerConfig, ParserConfig};
pub use container::{
    Annotation, Container, Contribution, FeatureValue, TextIndex, View, ViewMetadata,
};
pub use producer::Producer;

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for annotation producers
#[derive(Error, Debug)]
pub enum LifError {
    /// A required upstream annotation layer is absent
    #[error("Wrong input: cannot find {annotation_type} within previous annotations")]
    MissingAnnotation { annotation_type: String },

    /// A model reported a token span outside the token layer it was given
    #[error("Token span [{first}, {last}] out of range for {len} tokens")]
    Index { first: usize, last: usize, len: usize },

    #[error("Invalid span ({start}, {end}) on annotation {id}")]
    InvalidSpan { id: String, start: i64, end: i64 },

    #[error("Invalid view: {0}")]
    InvalidView(String),

    #[error("Malformed tree: {0}")]
    MalformedTree(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl LifError {
    /// Create a missing-annotation error for the given type
    pub fn missing(annotation_type: impl Into<String>) -> Self {
        Self::MissingAnnotation {
            annotation_type: annotation_type.into(),
        }
    }

    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, LifError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_annotation_message_names_type() {
        let err = LifError::missing(vocabulary::types::TOKEN);
        assert!(err.to_string().contains("Token"));
    }

    #[test]
    fn test_index_error_message() {
        let err = LifError::Index {
            first: 2,
            last: 7,
            len: 4,
        };
        assert_eq!(err.to_string(), "Token span [2, 7] out of range for 4 tokens");
    }
}
