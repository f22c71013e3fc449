//! Model registry port
//!
//! Defines how the gate pipeline reaches a pretrained model: its
//! configuration, individual weight tensors, and a runnable network.

use candle_core::{Device, Tensor};
use moegate_domain::{LoadOptions, ModelDims, ModelReference, TokenizedBatch};
use thiserror::Error;

/// Errors raised by model registries and loaders.
///
/// The gate pipeline propagates these unchanged.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model not found: {0}")]
    NotFound(String),

    #[error("Missing weight tensor: {0}")]
    MissingTensor(String),

    #[error("Invalid model config: {0}")]
    InvalidConfig(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Forward pass failed: {0}")]
    Forward(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

/// Fetches single named weight tensors without materializing the full model
pub trait TensorLoader: Send + Sync {
    fn get_tensor(&self, name: &str, device: &Device) -> Result<Tensor, ModelError>;
}

/// A loaded causal language model capable of a forward pass.
///
/// The model is shared read-only across all experts; implementations must
/// not mutate weights.
pub trait CausalModel: Send + Sync {
    /// Hidden states at every layer boundary.
    ///
    /// Returns `num_hidden_layers + 1` tensors of shape
    /// `(batch, seq_len, hidden_size)`: the embedding output followed by
    /// each decoder layer's output.
    fn hidden_states(&self, batch: &TokenizedBatch) -> Result<Vec<Tensor>, ModelError>;
}

/// Resolves model references to configuration, tensors, and networks.
pub trait ModelRegistry: Send + Sync {
    /// Read layer count, hidden size, and vocabulary size
    fn config(
        &self,
        model: &ModelReference,
        trust_remote_code: bool,
    ) -> Result<ModelDims, ModelError>;

    /// Open a loader for individual weight tensors
    fn lazy_loader(
        &self,
        model: &ModelReference,
        lazy_unpickle: bool,
    ) -> Result<Box<dyn TensorLoader>, ModelError>;

    /// Load the full model for forward passes, honoring quantization flags
    fn load_causal_model(
        &self,
        model: &ModelReference,
        options: &LoadOptions,
    ) -> Result<Box<dyn CausalModel>, ModelError>;
}
