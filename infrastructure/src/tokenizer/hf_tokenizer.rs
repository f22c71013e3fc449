//! [`PromptTokenizer`] backed by a Hugging Face `tokenizer.json`

use moegate_application::{PromptTokenizer, TokenizerError};
use moegate_domain::TokenizedBatch;
use serde_json::Value;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::debug;

/// Prompt tokenizer reading `tokenizer.json` and `tokenizer_config.json`.
///
/// Special tokens are never added by encoding; the BOS string is exposed
/// through [`PromptTokenizer::bos_token`] for callers to prepend. Batches are
/// right-padded to the longest prompt.
pub struct HfPromptTokenizer {
    tokenizer: Tokenizer,
    bos_token: Option<String>,
    pad_id: u32,
}

impl HfPromptTokenizer {
    /// Load from a model or tokenizer directory
    pub fn from_dir(dir: &Path) -> Result<Self, TokenizerError> {
        let path = dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&path)
            .map_err(|e| TokenizerError::Load(format!("{}: {}", path.display(), e)))?;
        let bos_token = read_bos_token(&dir.join("tokenizer_config.json"))?;
        debug!("Loaded {} (bos: {:?})", path.display(), bos_token);
        Ok(Self::new(tokenizer, bos_token))
    }

    pub fn new(tokenizer: Tokenizer, bos_token: Option<String>) -> Self {
        let pad_id = tokenizer.get_padding().map(|p| p.pad_id).unwrap_or(0);
        Self {
            tokenizer,
            bos_token,
            pad_id,
        }
    }

    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }
}

/// `bos_token` from `tokenizer_config.json`, either a plain string or an
/// added-token object with a `content` field. A missing file means no BOS.
fn read_bos_token(path: &Path) -> Result<Option<String>, TokenizerError> {
    if !path.is_file() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| TokenizerError::Load(format!("{}: {}", path.display(), e)))?;
    let config: Value = serde_json::from_str(&raw)
        .map_err(|e| TokenizerError::Load(format!("{}: {}", path.display(), e)))?;

    Ok(match config.get("bos_token") {
        Some(Value::String(token)) => Some(token.clone()),
        Some(Value::Object(token)) => token
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    })
}

impl PromptTokenizer for HfPromptTokenizer {
    fn bos_token(&self) -> Option<&str> {
        self.bos_token.as_deref()
    }

    fn encode_batch(&self, texts: &[String]) -> Result<TokenizedBatch, TokenizerError> {
        let mut rows = Vec::with_capacity(texts.len());
        for text in texts {
            let encoding = self
                .tokenizer
                .encode(text.as_str(), false)
                .map_err(|e| TokenizerError::encode(Some(text.as_str()), e.to_string()))?;
            rows.push(encoding.get_ids().to_vec());
        }

        let seq_len = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut masks = Vec::with_capacity(rows.len());
        for row in &mut rows {
            let mut mask = vec![1; row.len()];
            mask.resize(seq_len, 0);
            row.resize(seq_len, self.pad_id);
            masks.push(mask);
        }

        TokenizedBatch::new(rows, masks).map_err(|e| TokenizerError::encode(None, e.to_string()))
    }
}
