//! `smart_hidden`: hidden states weighted by classifier routing probabilities
//!
//! The classifier's output is conformed to the base model before use:
//! - layer axis: tiled and truncated to `num_layers`
//! - expert axis: must match exactly, otherwise [`GateError::ShapeMismatch`]
//! - hidden axis (rank-3 output only): resampled by linear interpolation.
//!   This is a heuristic to keep mismatched checkpoints usable, not a
//!   numerically meaningful mapping between hidden spaces.

use super::hidden::HiddenStateEmbedding;
use crate::error::GateError;
use crate::ports::classifier::ExpertClassifier;
use candle_core::{DType, Device, Tensor};
use moegate_domain::TokenizedBatch;
use std::sync::Arc;

/// Routing weights: mean hidden state scaled by the expert's probability
pub struct ClassifierWeightedEmbedding {
    hidden: HiddenStateEmbedding,
    classifier: Arc<dyn ExpertClassifier>,
    num_layers: usize,
    num_experts: usize,
    hidden_size: usize,
    device: Device,
}

impl ClassifierWeightedEmbedding {
    pub fn new(
        hidden: HiddenStateEmbedding,
        classifier: Arc<dyn ExpertClassifier>,
        num_layers: usize,
        num_experts: usize,
        hidden_size: usize,
        device: Device,
    ) -> Self {
        Self {
            hidden,
            classifier,
            num_layers,
            num_experts,
            hidden_size,
            device,
        }
    }

    /// `(num_layers, hidden_size)` routing weights for `expert_index`
    pub fn embed(&self, batch: &TokenizedBatch, expert_index: usize) -> Result<Tensor, GateError> {
        let hidden = self.hidden.embed(batch)?;
        let probs = self
            .classifier
            .predict(batch, &self.device)?
            .to_device(&self.device)?
            .to_dtype(DType::F32)?;
        let probs = conform_routing_probs(&probs, self.num_layers, self.num_experts, self.hidden_size)?;

        let weight = match probs.rank() {
            2 => probs.narrow(1, expert_index, 1)?,
            _ => probs.narrow(1, expert_index, 1)?.squeeze(1)?,
        };
        Ok(hidden.broadcast_mul(&weight)?)
    }
}

/// Bring classifier output to `(num_layers, num_experts[, hidden_size])`.
pub fn conform_routing_probs(
    probs: &Tensor,
    num_layers: usize,
    num_experts: usize,
    hidden_size: usize,
) -> Result<Tensor, GateError> {
    let dims = probs.dims().to_vec();
    if dims.len() != 2 && dims.len() != 3 {
        return Err(GateError::shape_mismatch(
            "(layers, experts) or (layers, experts, hidden)",
            format!("{:?}", dims),
            "unsupported classifier output rank",
        ));
    }
    if dims[1] != num_experts {
        return Err(GateError::shape_mismatch(
            format!("{} experts", num_experts),
            format!("{} experts", dims[1]),
            "classifier expert dimension disagrees with the expert list",
        ));
    }
    if dims[0] == 0 {
        return Err(GateError::shape_mismatch(
            format!("{} layers", num_layers),
            "0 layers",
            "classifier output has an empty layer axis",
        ));
    }

    if dims.len() == 3 && dims[2] == 0 {
        return Err(GateError::shape_mismatch(
            format!("hidden size {}", hidden_size),
            "hidden size 0",
            "classifier output has an empty hidden axis",
        ));
    }

    let mut probs = probs.clone();
    if dims[0] != num_layers {
        let mut reps = vec![1; dims.len()];
        reps[0] = num_layers.div_ceil(dims[0]);
        probs = probs.repeat(reps)?.narrow(0, 0, num_layers)?;
    }
    if dims.len() == 3 && dims[2] != hidden_size {
        probs = resample_last_axis(&probs, hidden_size)?;
    }
    Ok(probs)
}

/// Linear resampling of the last axis of a rank-3 tensor with half-pixel
/// centers (`align_corners = false`).
pub fn resample_last_axis(tensor: &Tensor, target: usize) -> Result<Tensor, GateError> {
    let (a, b, source) = tensor.dims3()?;
    if source == 0 {
        return Err(GateError::shape_mismatch(
            format!("{} values along the last axis", target),
            "0",
            "cannot resample an empty axis",
        ));
    }
    let data: Vec<Vec<Vec<f32>>> = tensor.to_dtype(DType::F32)?.to_vec3()?;
    let scale = source as f64 / target as f64;

    let mut out = Vec::with_capacity(a * b * target);
    for plane in &data {
        for row in plane {
            for j in 0..target {
                let src = ((j as f64 + 0.5) * scale - 0.5).max(0.0);
                let i0 = (src.floor() as usize).min(source - 1);
                let i1 = (i0 + 1).min(source - 1);
                let w = (src - i0 as f64) as f32;
                out.push(row[i0] * (1.0 - w) + row[i1] * w);
            }
        }
    }
    Ok(Tensor::from_vec(out, (a, b, target), tensor.device())?)
}
