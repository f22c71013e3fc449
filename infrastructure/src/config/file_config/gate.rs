//! Gate computation configuration from TOML (`[gate]` section)

use moegate_application::GateParams;
use moegate_application::config::gate_params::{
    DEFAULT_DEGENERACY_THRESHOLD, DEFAULT_EMBED_TENSOR_NAME, DEFAULT_NORM_EPSILON,
};
use moegate_domain::{ConfigIssue, ConfigIssueCode, GateMode};
use serde::{Deserialize, Serialize};

/// Raw gate configuration from TOML
///
/// # Example
///
/// ```toml
/// [gate]
/// mode = "hidden_avg"
/// degeneracy_threshold = 5.0
/// seed = 42
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGateConfig {
    /// Gate mode name (`random`, `cheap_embed`, `hidden`, ...)
    pub mode: String,
    /// Condition number above which a layer is reported as degenerate
    pub degeneracy_threshold: f64,
    /// Lower bound for L2 norms
    pub norm_epsilon: f64,
    /// Seed for random modes
    pub seed: Option<u64>,
    /// Weight name used by `cheap_embed`
    pub embed_tensor_name: String,
}

impl Default for FileGateConfig {
    fn default() -> Self {
        Self {
            mode: GateMode::default().as_str().to_string(),
            degeneracy_threshold: DEFAULT_DEGENERACY_THRESHOLD,
            norm_epsilon: DEFAULT_NORM_EPSILON,
            seed: None,
            embed_tensor_name: DEFAULT_EMBED_TENSOR_NAME.to_string(),
        }
    }
}

impl FileGateConfig {
    /// Parse the mode string, collecting an issue for unknown names.
    pub fn parse_mode(&self) -> (Option<GateMode>, Vec<ConfigIssue>) {
        match self.mode.parse::<GateMode>() {
            Ok(mode) => (Some(mode), Vec::new()),
            Err(_) => (
                None,
                vec![ConfigIssue::error(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "gate.mode".to_string(),
                        value: self.mode.clone(),
                        valid_values: GateMode::ALL
                            .iter()
                            .map(|m| m.as_str().to_string())
                            .collect(),
                    },
                    format!("gate.mode: unknown mode '{}'", self.mode),
                )],
            ),
        }
    }

    pub fn to_gate_params(&self) -> GateParams {
        GateParams::default()
            .with_degeneracy_threshold(self.degeneracy_threshold)
            .with_norm_epsilon(self.norm_epsilon)
            .with_seed(self.seed)
            .with_embed_tensor_name(self.embed_tensor_name.clone())
    }
}
