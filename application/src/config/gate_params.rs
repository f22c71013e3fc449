//! Gate computation parameters.
//!
//! [`GateParams`] groups the tunable constants of the gate pipeline so they
//! can be injected in tests instead of living as literals.

use serde::{Deserialize, Serialize};

/// Condition number above which a layer is reported as degenerate
pub const DEFAULT_DEGENERACY_THRESHOLD: f64 = 5.0;

/// Lower bound applied to L2 norms before dividing
pub const DEFAULT_NORM_EPSILON: f64 = 1e-8;

/// Weight name of the token embedding matrix in Llama/Mistral checkpoints
pub const DEFAULT_EMBED_TENSOR_NAME: &str = "model.embed_tokens.weight";

/// Gate pipeline parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateParams {
    pub degeneracy_threshold: f64,
    pub norm_epsilon: f64,
    /// Seed for `random` / `uniform_random`; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Tensor fetched by `cheap_embed`
    pub embed_tensor_name: String,
}

impl Default for GateParams {
    fn default() -> Self {
        Self {
            degeneracy_threshold: DEFAULT_DEGENERACY_THRESHOLD,
            norm_epsilon: DEFAULT_NORM_EPSILON,
            seed: None,
            embed_tensor_name: DEFAULT_EMBED_TENSOR_NAME.to_string(),
        }
    }
}

impl GateParams {
    // ==================== Builder Methods ====================

    pub fn with_degeneracy_threshold(mut self, threshold: f64) -> Self {
        self.degeneracy_threshold = threshold;
        self
    }

    pub fn with_norm_epsilon(mut self, epsilon: f64) -> Self {
        self.norm_epsilon = epsilon;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_embed_tensor_name(mut self, name: impl Into<String>) -> Self {
        self.embed_tensor_name = name.into();
        self
    }
}
