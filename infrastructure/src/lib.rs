//! Infrastructure layer for moegate
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer against local files, plus configuration file loading.

pub mod classifier;
pub mod config;
pub mod model;
pub mod tokenizer;

// Re-export commonly used types
pub use classifier::CheckpointClassifier;
pub use config::{
    ConfigLoader, FileClassifierConfig, FileConfig, FileExpertConfig, FileGateConfig,
    FileModelConfig, FileTokenizerConfig, parse_experts,
};
pub use model::{HfModelConfig, LlamaHiddenStates, LocalModelRegistry};
pub use tokenizer::HfPromptTokenizer;
