//! Expert classifier port
//!
//! An externally trained prompt-to-expert mapper. Training and checkpoint
//! formats are outside the gate pipeline; only prediction is consumed.

use candle_core::{Device, Tensor};
use moegate_domain::TokenizedBatch;
use thiserror::Error;

/// Errors raised by classifier implementations
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Failed to load classifier: {0}")]
    Load(String),

    #[error("Classifier prediction failed: {0}")]
    Prediction(String),

    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

/// Maps a prompt batch to routing probabilities.
pub trait ExpertClassifier: Send + Sync {
    /// Predict routing probabilities for the whole batch.
    ///
    /// Returns either `(layers, experts)` or `(layers, experts, hidden)`.
    /// The layer count and hidden size may differ from the base model;
    /// the expert count may not.
    fn predict(&self, batch: &TokenizedBatch, device: &Device) -> Result<Tensor, ClassifierError>;
}
