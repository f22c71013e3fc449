//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Unknown routing mode: {0}")]
    UnknownMode(String),

    #[error("Invalid expert: {0}")]
    InvalidExpert(String),

    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[error("Tokenized batch is ragged: row {row} has {actual} entries, expected {expected}")]
    RaggedBatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("load_in_4bit and load_in_8bit cannot both be enabled")]
    ConflictingQuantization,
}

impl DomainError {
    /// Check if this error stems from configuration rather than data
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DomainError::UnknownMode(_)
                | DomainError::InvalidDevice(_)
                | DomainError::ConflictingQuantization
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_mode_display() {
        let error = DomainError::UnknownMode("bogus_mode".to_string());
        assert_eq!(error.to_string(), "Unknown routing mode: bogus_mode");
    }

    #[test]
    fn test_is_configuration_check() {
        assert!(DomainError::UnknownMode("x".to_string()).is_configuration());
        assert!(DomainError::ConflictingQuantization.is_configuration());
        assert!(!DomainError::InvalidExpert("x".to_string()).is_configuration());
        assert!(
            !DomainError::RaggedBatch {
                row: 1,
                expected: 3,
                actual: 2
            }
            .is_configuration()
        );
    }
}
