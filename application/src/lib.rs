//! Application layer for moegate
//!
//! This crate contains the gate computation use cases, embedding strategies,
//! port definitions, and application configuration. It depends only on the
//! domain layer.

pub mod config;
pub mod device;
pub mod error;
pub mod gate_tensor;
pub mod ports;
pub mod strategy;
pub mod tokenize;
pub mod use_cases;

// Re-export commonly used types
pub use config::GateParams;
pub use error::GateError;
pub use gate_tensor::{GateTensor, GateTensorKind};
pub use ports::{
    classifier::{ClassifierError, ExpertClassifier},
    model_registry::{CausalModel, ModelError, ModelRegistry, TensorLoader},
    progress::{GateProgressNotifier, NoProgress},
    tokenizer::{PromptTokenizer, TokenizerError},
};
pub use use_cases::check_degeneracy::check_gate_degeneracy;
pub use use_cases::compute_gate_tensor::{
    ComputeGateTensorInput, ComputeGateTensorUseCase, compute_gate_tensor,
};
