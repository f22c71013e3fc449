//! Hugging Face `config.json` reader

use moegate_application::ModelError;
use moegate_domain::ModelDims;
use serde::Deserialize;
use std::path::Path;

/// Architectures the built-in forward pass can run
pub const SUPPORTED_ARCHITECTURES: [&str; 3] = ["llama", "mistral", "qwen2"];

/// Subset of a transformer `config.json` used for gate computation
#[derive(Debug, Clone, Deserialize)]
pub struct HfModelConfig {
    #[serde(default)]
    pub model_type: Option<String>,
    pub num_hidden_layers: usize,
    pub hidden_size: usize,
    pub vocab_size: usize,
    #[serde(default)]
    pub intermediate_size: Option<usize>,
    #[serde(default)]
    pub num_attention_heads: Option<usize>,
    #[serde(default)]
    pub num_key_value_heads: Option<usize>,
    #[serde(default = "default_rms_norm_eps")]
    pub rms_norm_eps: f64,
    #[serde(default = "default_rope_theta")]
    pub rope_theta: f64,
    #[serde(default = "default_max_position_embeddings")]
    pub max_position_embeddings: usize,
    /// Bias on q/k/v projections (always on for Qwen2)
    #[serde(default)]
    pub attention_bias: bool,
    /// Present when the architecture ships custom modeling code
    #[serde(default)]
    pub auto_map: Option<serde_json::Value>,
}

fn default_rms_norm_eps() -> f64 {
    1e-6
}

fn default_rope_theta() -> f64 {
    10_000.0
}

fn default_max_position_embeddings() -> usize {
    4096
}

impl HfModelConfig {
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| ModelError::InvalidConfig(format!("{}: {}", path.display(), e)))
    }

    pub fn dims(&self) -> ModelDims {
        ModelDims::new(self.num_hidden_layers, self.hidden_size, self.vocab_size)
    }

    pub fn requires_remote_code(&self) -> bool {
        self.auto_map.is_some()
    }

    pub fn architecture(&self) -> &str {
        self.model_type.as_deref().unwrap_or("unknown")
    }

    pub fn is_supported_architecture(&self) -> bool {
        SUPPORTED_ARCHITECTURES.contains(&self.architecture())
    }

    pub fn has_qkv_bias(&self) -> bool {
        self.attention_bias || self.architecture() == "qwen2"
    }

    pub fn num_attention_heads(&self) -> Result<usize, ModelError> {
        self.num_attention_heads
            .filter(|heads| *heads > 0 && self.hidden_size % heads == 0)
            .ok_or_else(|| {
                ModelError::InvalidConfig(format!(
                    "num_attention_heads must divide hidden_size {}",
                    self.hidden_size
                ))
            })
    }

    pub fn num_key_value_heads(&self) -> Result<usize, ModelError> {
        let heads = self.num_attention_heads()?;
        let kv_heads = self.num_key_value_heads.unwrap_or(heads);
        if kv_heads == 0 || heads % kv_heads != 0 {
            return Err(ModelError::InvalidConfig(format!(
                "num_key_value_heads {} must divide num_attention_heads {}",
                kv_heads, heads
            )));
        }
        Ok(kv_heads)
    }

    pub fn intermediate_size(&self) -> Result<usize, ModelError> {
        self.intermediate_size
            .ok_or_else(|| ModelError::InvalidConfig("missing intermediate_size".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISTRAL: &str = r#"{
        "model_type": "mistral",
        "num_hidden_layers": 32,
        "hidden_size": 4096,
        "intermediate_size": 14336,
        "num_attention_heads": 32,
        "num_key_value_heads": 8,
        "vocab_size": 32000,
        "rms_norm_eps": 1e-5
    }"#;

    #[test]
    fn test_parse_dims() {
        let config: HfModelConfig = serde_json::from_str(MISTRAL).unwrap();
        let dims = config.dims();
        assert_eq!(dims.num_hidden_layers, 32);
        assert_eq!(dims.hidden_size, 4096);
        assert_eq!(dims.vocab_size, 32000);
        assert!(config.is_supported_architecture());
        assert!(!config.requires_remote_code());
        assert_eq!(config.num_key_value_heads().unwrap(), 8);
        assert_eq!(config.rope_theta, 10_000.0);
    }

    #[test]
    fn test_qwen2_has_qkv_bias() {
        let config: HfModelConfig = serde_json::from_str(
            r#"{"model_type": "qwen2", "num_hidden_layers": 2, "hidden_size": 8, "vocab_size": 16}"#,
        )
        .unwrap();
        assert!(config.has_qkv_bias());
    }

    #[test]
    fn test_kv_heads_must_divide_heads() {
        let config: HfModelConfig = serde_json::from_str(
            r#"{"num_hidden_layers": 2, "hidden_size": 8, "vocab_size": 16,
                "num_attention_heads": 4, "num_key_value_heads": 3}"#,
        )
        .unwrap();
        assert!(matches!(
            config.num_key_value_heads(),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_dims_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"hidden_size": 8}"#).unwrap();
        assert!(matches!(
            HfModelConfig::from_file(&path),
            Err(ModelError::InvalidConfig(_))
        ));
    }
}
