//! Expert entity

use crate::core::error::DomainError;
use serde::Serialize;

/// One constituent model in the mixture, identified by its prompt sets.
///
/// Positive prompts describe inputs the expert should receive; negative
/// prompts describe inputs it should be pushed away from. Immutable once
/// constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expert {
    name: String,
    positive_prompts: Vec<String>,
    negative_prompts: Vec<String>,
}

impl Expert {
    /// Create an expert, rejecting empty names and empty positive prompt sets.
    pub fn new(
        name: impl Into<String>,
        positive_prompts: Vec<String>,
        negative_prompts: Vec<String>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::InvalidExpert(
                "expert name cannot be empty".to_string(),
            ));
        }
        if positive_prompts.is_empty() {
            return Err(DomainError::InvalidExpert(format!(
                "expert '{}' has no positive prompts",
                name
            )));
        }
        Ok(Self {
            name,
            positive_prompts,
            negative_prompts,
        })
    }

    /// Shorthand for an expert without negative prompts
    pub fn positive_only(
        name: impl Into<String>,
        positive_prompts: Vec<String>,
    ) -> Result<Self, DomainError> {
        Self::new(name, positive_prompts, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn positive_prompts(&self) -> &[String] {
        &self.positive_prompts
    }

    pub fn negative_prompts(&self) -> &[String] {
        &self.negative_prompts
    }

    pub fn has_negative_prompts(&self) -> bool {
        !self.negative_prompts.is_empty()
    }
}
