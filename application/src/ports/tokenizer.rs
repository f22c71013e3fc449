//! Prompt tokenizer port
//!
//! Defines the interface for turning prompt strings into padded token batches.

use moegate_domain::TokenizedBatch;
use thiserror::Error;

/// Errors that can occur while tokenizing prompts
#[derive(Error, Debug, Clone)]
pub enum TokenizerError {
    #[error("Failed to encode prompt {prompt:?}: {message}")]
    Encode {
        prompt: Option<String>,
        message: String,
    },

    #[error("Failed to load tokenizer: {0}")]
    Load(String),
}

impl TokenizerError {
    pub fn encode(prompt: Option<&str>, message: impl Into<String>) -> Self {
        TokenizerError::Encode {
            prompt: prompt.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Tokenizer capability used by the gate pipeline.
///
/// Implementations live in the infrastructure layer.
pub trait PromptTokenizer: Send + Sync {
    /// Beginning-of-sequence token string, if the vocabulary has one
    fn bos_token(&self) -> Option<&str>;

    /// Encode all texts as one batch padded to the longest entry.
    ///
    /// No special tokens may be added; callers prepend what they need.
    fn encode_batch(&self, texts: &[String]) -> Result<TokenizedBatch, TokenizerError>;
}
