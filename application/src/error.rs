//! Gate pipeline error taxonomy.
//!
//! Every variant is fatal to the current gate computation; callers decide
//! whether to abort the merge or retry with different configuration.

use crate::ports::classifier::ClassifierError;
use crate::ports::model_registry::ModelError;
use crate::ports::tokenizer::TokenizerError;
use moegate_domain::DomainError;
use thiserror::Error;

/// Errors that can occur while computing gate tensors
#[derive(Error, Debug)]
pub enum GateError {
    /// Raised during setup, before any prompt is tokenized
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to tokenize prompts for expert '{expert}': {source}")]
    Tokenization {
        expert: String,
        source: TokenizerError,
    },

    #[error("Shape mismatch: expected {expected}, got {actual} ({detail})")]
    ShapeMismatch {
        expected: String,
        actual: String,
        detail: String,
    },

    /// Registry failures pass through with their own message
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error(transparent)]
    Domain(DomainError),
}

impl GateError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        GateError::Configuration(msg.into())
    }

    pub fn shape_mismatch(
        expected: impl Into<String>,
        actual: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        GateError::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
            detail: detail.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, GateError::Configuration(_))
    }
}

impl From<DomainError> for GateError {
    fn from(error: DomainError) -> Self {
        if error.is_configuration() {
            GateError::Configuration(error.to_string())
        } else {
            GateError::Domain(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_mode_becomes_configuration_error() {
        let error: GateError = DomainError::UnknownMode("bogus_mode".to_string()).into();
        assert!(error.is_configuration());
        assert_eq!(
            error.to_string(),
            "Configuration error: Unknown routing mode: bogus_mode"
        );
    }

    #[test]
    fn test_invalid_expert_stays_domain_error() {
        let error: GateError = DomainError::InvalidExpert("empty".to_string()).into();
        assert!(matches!(error, GateError::Domain(_)));
    }

    #[test]
    fn test_model_error_is_transparent() {
        let error: GateError = ModelError::MissingTensor("model.embed_tokens.weight".into()).into();
        assert_eq!(
            error.to_string(),
            "Missing weight tensor: model.embed_tokens.weight"
        );
    }

    #[test]
    fn test_tokenization_error_names_expert() {
        let error = GateError::Tokenization {
            expert: "coder".to_string(),
            source: TokenizerError::encode(Some("bad"), "invalid utf-8"),
        };
        let message = error.to_string();
        assert!(message.contains("coder"));
        assert!(message.contains("\"bad\""));
    }
}
