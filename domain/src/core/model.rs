//! Model reference and dimension value objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a pretrained base model (Value Object)
///
/// Only identifies the model; resolving it to configuration, weights, or a
/// runnable network is the job of a model registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelReference {
    /// Local directory or hub identifier
    pub path: String,
    /// Optional revision (branch, tag, or commit)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl ModelReference {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(rev) => write!(f, "{}@{}", self.path, rev),
            None => write!(f, "{}", self.path),
        }
    }
}

/// The subset of a model's configuration the gate pipeline reads.
///
/// Field names match Hugging Face `config.json`, so this deserializes
/// directly from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDims {
    pub num_hidden_layers: usize,
    pub hidden_size: usize,
    pub vocab_size: usize,
}

impl ModelDims {
    pub fn new(num_hidden_layers: usize, hidden_size: usize, vocab_size: usize) -> Self {
        Self {
            num_hidden_layers,
            hidden_size,
            vocab_size,
        }
    }
}
