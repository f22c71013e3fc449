//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted to domain and application
//! types with every problem collected as a [`ConfigIssue`].

mod experts;
mod gate;
mod model;
mod sources;

pub use experts::{FileExpertConfig, parse_experts};
pub use gate::FileGateConfig;
pub use model::FileModelConfig;
pub use sources::{FileClassifierConfig, FileTokenizerConfig};

use moegate_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Gate computation settings
    pub gate: FileGateConfig,
    /// Base model settings
    pub model: FileModelConfig,
    /// Tokenizer location override
    pub tokenizer: FileTokenizerConfig,
    /// Expert classifier checkpoint
    pub classifier: FileClassifierConfig,
    /// Experts in routing order
    pub experts: Vec<FileExpertConfig>,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Checks, without stopping at the first failure:
    /// 1. Gate mode name
    /// 2. Model path, quantization flags, and device string
    /// 3. Expert entries (count, names, positive prompts)
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        issues.extend(self.gate.parse_mode().1);

        if self.model.model_reference().is_none() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingModelPath,
                "model.path: a local model directory is required",
            ));
        }
        issues.extend(self.model.to_load_options().1);

        issues.extend(parse_experts(&self.experts).1);

        issues
    }

    /// Directory the tokenizer is read from
    pub fn tokenizer_path(&self) -> Option<&str> {
        self.tokenizer.path.as_deref().or(self.model.path.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moegate_domain::GateMode;

    const FULL_CONFIG: &str = r#"
[gate]
mode = "hidden_last"
degeneracy_threshold = 10.0
seed = 1234

[model]
path = "/models/base"
lazy_unpickle = true
device = "cpu"

[tokenizer]
path = "/models/tokenizer"

[classifier]
path = "/models/router.safetensors"

[[experts]]
name = "code"
positive_prompts = ["Write a function", "Fix this bug"]
negative_prompts = ["Once upon a time"]

[[experts]]
name = "story"
positive_prompts = ["Once upon a time"]
"#;

    #[test]
    fn test_deserialize_full_config() {
        let config: FileConfig = toml::from_str(FULL_CONFIG).unwrap();
        assert_eq!(config.gate.parse_mode().0, Some(GateMode::HiddenLast));
        assert_eq!(config.gate.seed, Some(1234));
        assert!(config.model.lazy_unpickle);
        assert_eq!(config.tokenizer_path(), Some("/models/tokenizer"));
        assert_eq!(
            config.classifier.path.as_deref(),
            Some("/models/router.safetensors")
        );
        assert_eq!(config.experts.len(), 2);
        assert_eq!(config.experts[0].negative_prompts.len(), 1);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: FileConfig = toml::from_str("[gate]\nmode = \"random\"\n").unwrap();
        assert_eq!(config.gate.mode, "random");
        assert_eq!(config.gate.degeneracy_threshold, 5.0);
        assert_eq!(config.model.device, "auto");
        assert!(config.experts.is_empty());
    }

    #[test]
    fn test_tokenizer_defaults_to_model_path() {
        let config: FileConfig = toml::from_str("[model]\npath = \"/m\"\n").unwrap();
        assert_eq!(config.tokenizer_path(), Some("/m"));
    }

    #[test]
    fn test_validate_collects_everything() {
        let toml_str = r#"
[gate]
mode = "bogus_mode"

[model]
load_in_4bit = true
load_in_8bit = true
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let codes: Vec<ConfigIssueCode> = config.validate().into_iter().map(|i| i.code).collect();
        assert_eq!(codes.len(), 4);
        assert!(matches!(codes[0], ConfigIssueCode::InvalidEnumValue { .. }));
        assert_eq!(codes[1], ConfigIssueCode::MissingModelPath);
        assert_eq!(codes[2], ConfigIssueCode::ConflictingQuantization);
        assert_eq!(codes[3], ConfigIssueCode::NoExperts);
    }
}
