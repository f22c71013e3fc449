//! The gate tensor handed back to the merge pipeline

use candle_core::{D, Tensor};
use serde::Serialize;

/// What the vectors in a gate tensor represent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateTensorKind {
    /// L2-normalized prompt embeddings (or random initialization)
    Embeddings,
    /// Classifier-weighted hidden states, not normalized
    RoutingWeights,
}

/// A `(num_layers, num_experts, hidden_size)` tensor, row-major in layer order.
#[derive(Debug, Clone)]
pub struct GateTensor {
    tensor: Tensor,
    kind: GateTensorKind,
}

impl GateTensor {
    pub(crate) fn new(tensor: Tensor, kind: GateTensorKind) -> Self {
        Self { tensor, kind }
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn kind(&self) -> GateTensorKind {
        self.kind
    }

    /// `(num_layers, num_experts, hidden_size)`
    pub fn dims(&self) -> (usize, usize, usize) {
        let dims = self.tensor.dims();
        (dims[0], dims[1], dims[2])
    }

    pub fn num_layers(&self) -> usize {
        self.dims().0
    }

    pub fn num_experts(&self) -> usize {
        self.dims().1
    }

    pub fn hidden_size(&self) -> usize {
        self.dims().2
    }

    /// Gate vector for one (layer, expert) pair as `f32`
    pub fn vector(&self, layer: usize, expert: usize) -> candle_core::Result<Vec<f32>> {
        self.tensor
            .get(layer)?
            .get(expert)?
            .to_dtype(candle_core::DType::F32)?
            .to_vec1()
    }

    /// L2 norm of every vector, shaped `[layer][expert]`
    pub fn norms(&self) -> candle_core::Result<Vec<Vec<f32>>> {
        self.tensor
            .to_dtype(candle_core::DType::F32)?
            .sqr()?
            .sum(D::Minus1)?
            .sqrt()?
            .to_vec2()
    }
}
