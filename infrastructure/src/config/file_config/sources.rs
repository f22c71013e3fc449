//! Tokenizer and classifier locations (`[tokenizer]`, `[classifier]` sections)

use serde::{Deserialize, Serialize};

/// Raw tokenizer configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTokenizerConfig {
    /// Directory holding `tokenizer.json`; defaults to the model directory
    pub path: Option<String>,
}

/// Raw expert classifier configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileClassifierConfig {
    /// Safetensors checkpoint; required by `smart_hidden`
    pub path: Option<String>,
}
