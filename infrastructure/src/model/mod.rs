//! Model registry adapters
//!
//! Local Hugging Face style checkpoints: `config.json`, safetensors shards,
//! and a built-in Llama-family forward pass.

pub mod hf_config;
pub mod llama;
pub mod registry;
pub mod safetensors;

pub use hf_config::HfModelConfig;
pub use llama::LlamaHiddenStates;
pub use registry::{CausalModelLoader, LocalModelRegistry, ModelFiles};
pub use safetensors::{IndexedTensorLoader, MmapedTensorLoader};
