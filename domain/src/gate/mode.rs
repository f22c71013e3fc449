//! Gate mode definitions.
//!
//! Defines [`GateMode`], the user-facing selector for how per-layer,
//! per-expert gate vectors are produced:
//! - `random` / `uniform_random`: no prompts, the tensor is sampled directly
//! - `cheap_embed`: prompts projected through the token embedding matrix
//! - `hidden` / `hidden_avg` / `hidden_last`: prompts run through the model
//! - `smart_hidden`: hidden states weighted by an external expert classifier

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strategy selector for gate vector computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Independent standard-normal values
    Random,
    /// Uniform values in `[-s, s]`, `s = sqrt(1 / hidden_size)`
    UniformRandom,
    /// One-hot projection through the embedding matrix, same vector on every layer
    CheapEmbed,
    /// Hidden states averaged over the sequence
    #[default]
    Hidden,
    /// Hidden states averaged over the sequence
    HiddenAvg,
    /// Hidden state at the last sequence position
    HiddenLast,
    /// Sequence-averaged hidden states weighted by classifier routing probabilities
    SmartHidden,
}

/// How hidden states are reduced over the sequence axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceReduction {
    Mean,
    Last,
}

impl GateMode {
    pub const ALL: [GateMode; 7] = [
        GateMode::Random,
        GateMode::UniformRandom,
        GateMode::CheapEmbed,
        GateMode::Hidden,
        GateMode::HiddenAvg,
        GateMode::HiddenLast,
        GateMode::SmartHidden,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GateMode::Random => "random",
            GateMode::UniformRandom => "uniform_random",
            GateMode::CheapEmbed => "cheap_embed",
            GateMode::Hidden => "hidden",
            GateMode::HiddenAvg => "hidden_avg",
            GateMode::HiddenLast => "hidden_last",
            GateMode::SmartHidden => "smart_hidden",
        }
    }

    /// Modes that sample the tensor directly and never look at prompts
    pub fn is_trivial(&self) -> bool {
        matches!(self, GateMode::Random | GateMode::UniformRandom)
    }

    /// Modes that need a fully loaded model for forward passes
    pub fn requires_forward_pass(&self) -> bool {
        matches!(
            self,
            GateMode::Hidden | GateMode::HiddenAvg | GateMode::HiddenLast | GateMode::SmartHidden
        )
    }

    /// Modes that need an external expert classifier
    pub fn requires_classifier(&self) -> bool {
        matches!(self, GateMode::SmartHidden)
    }

    /// Sequence reduction for hidden-state modes
    pub fn sequence_reduction(&self) -> Option<SequenceReduction> {
        match self {
            GateMode::Hidden | GateMode::HiddenAvg | GateMode::SmartHidden => {
                Some(SequenceReduction::Mean)
            }
            GateMode::HiddenLast => Some(SequenceReduction::Last),
            _ => None,
        }
    }
}

impl fmt::Display for GateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GateMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "random" => Ok(GateMode::Random),
            "uniform_random" => Ok(GateMode::UniformRandom),
            "cheap_embed" => Ok(GateMode::CheapEmbed),
            "hidden" => Ok(GateMode::Hidden),
            "hidden_avg" => Ok(GateMode::HiddenAvg),
            "hidden_last" => Ok(GateMode::HiddenLast),
            "smart_hidden" | "classifier" => Ok(GateMode::SmartHidden),
            _ => Err(DomainError::UnknownMode(s.to_string())),
        }
    }
}
