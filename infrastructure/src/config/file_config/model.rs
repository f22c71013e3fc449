//! Base model configuration from TOML (`[model]` section)

use moegate_domain::{ConfigIssue, ConfigIssueCode, DevicePlacement, LoadOptions, ModelReference};
use serde::{Deserialize, Serialize};

/// Raw base model configuration from TOML
///
/// # Example
///
/// ```toml
/// [model]
/// path = "/models/Mistral-7B-v0.1"
/// lazy_unpickle = true
/// device = "cuda:0"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelConfig {
    /// Local model directory
    pub path: Option<String>,
    /// Revision subdirectory, if the model directory holds several
    pub revision: Option<String>,
    pub load_in_4bit: bool,
    pub load_in_8bit: bool,
    /// Memory-map weights instead of reading them eagerly
    pub lazy_unpickle: bool,
    pub trust_remote_code: bool,
    /// `auto`, `cpu`, `cuda[:N]`, or `metal[:N]`
    pub device: String,
}

impl Default for FileModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            revision: None,
            load_in_4bit: false,
            load_in_8bit: false,
            lazy_unpickle: false,
            trust_remote_code: false,
            device: DevicePlacement::default().to_string(),
        }
    }
}

impl FileModelConfig {
    pub fn model_reference(&self) -> Option<ModelReference> {
        let path = self.path.as_deref().filter(|p| !p.trim().is_empty())?;
        let reference = ModelReference::new(path);
        Some(match &self.revision {
            Some(revision) => reference.with_revision(revision.clone()),
            None => reference,
        })
    }

    /// Build load options, collecting issues for invalid values.
    pub fn to_load_options(&self) -> (Option<LoadOptions>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();

        if self.load_in_4bit && self.load_in_8bit {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ConflictingQuantization,
                "model: load_in_4bit and load_in_8bit are mutually exclusive",
            ));
        }

        let device = match self.device.parse::<DevicePlacement>() {
            Ok(device) => Some(device),
            Err(e) => {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "model.device".to_string(),
                        value: self.device.clone(),
                        valid_values: vec![
                            "auto".to_string(),
                            "cpu".to_string(),
                            "cuda[:N]".to_string(),
                            "metal[:N]".to_string(),
                        ],
                    },
                    format!("model.device: {}", e),
                ));
                None
            }
        };

        if !issues.is_empty() {
            return (None, issues);
        }

        let options = LoadOptions::default()
            .with_load_in_4bit(self.load_in_4bit)
            .with_load_in_8bit(self.load_in_8bit)
            .with_lazy_unpickle(self.lazy_unpickle)
            .with_trust_remote_code(self.trust_remote_code)
            .with_device(device.unwrap_or_default());
        (Some(options), issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_reference_requires_path() {
        assert!(FileModelConfig::default().model_reference().is_none());

        let config = FileModelConfig {
            path: Some("/models/base".to_string()),
            revision: Some("main".to_string()),
            ..Default::default()
        };
        let reference = config.model_reference().unwrap();
        assert_eq!(reference.to_string(), "/models/base@main");
    }

    #[test]
    fn test_load_options() {
        let config = FileModelConfig {
            lazy_unpickle: true,
            device: "cuda:1".to_string(),
            ..Default::default()
        };
        let (options, issues) = config.to_load_options();
        assert!(issues.is_empty());
        let options = options.unwrap();
        assert!(options.lazy_unpickle);
        assert_eq!(options.device, DevicePlacement::Cuda(1));
    }

    #[test]
    fn test_conflicting_quantization_and_bad_device_both_reported() {
        let config = FileModelConfig {
            load_in_4bit: true,
            load_in_8bit: true,
            device: "tpu".to_string(),
            ..Default::default()
        };
        let (options, issues) = config.to_load_options();
        assert!(options.is_none());
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].code, ConfigIssueCode::ConflictingQuantization);
    }
}
