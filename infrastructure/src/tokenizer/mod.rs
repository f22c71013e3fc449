//! Tokenizer adapters

pub mod hf_tokenizer;

pub use hf_tokenizer::HfPromptTokenizer;
