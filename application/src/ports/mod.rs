//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement:
//! model registry and loaders, the prompt tokenizer, the optional expert
//! classifier, and progress reporting.

pub mod classifier;
pub mod model_registry;
pub mod progress;
pub mod tokenizer;
