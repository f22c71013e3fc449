//! Reportable view of a computed gate tensor

use moegate_application::{GateTensor, GateTensorKind};
use moegate_domain::{DegeneracyReport, Expert, GateMode, ModelReference};
use serde::Serialize;

/// Per-expert line of the report
#[derive(Debug, Clone, Serialize)]
pub struct ExpertSummary {
    pub name: String,
    pub positive_prompts: usize,
    pub negative_prompts: usize,
    /// Mean L2 norm of the expert's gate vectors across layers
    pub mean_norm: Option<f32>,
}

/// Everything the CLI prints about one gate computation
#[derive(Debug, Clone, Serialize)]
pub struct GateSummary {
    pub model: String,
    pub mode: GateMode,
    pub kind: GateTensorKind,
    pub num_layers: usize,
    pub num_experts: usize,
    pub hidden_size: usize,
    pub experts: Vec<ExpertSummary>,
    pub degeneracy: DegeneracyReport,
    pub warnings: Vec<String>,
}

impl GateSummary {
    pub fn new(
        model: &ModelReference,
        mode: GateMode,
        experts: &[Expert],
        gate: &GateTensor,
        degeneracy: DegeneracyReport,
    ) -> Self {
        let norms = gate.norms().ok();
        let experts = experts
            .iter()
            .enumerate()
            .map(|(index, expert)| ExpertSummary {
                name: expert.name().to_string(),
                positive_prompts: expert.positive_prompts().len(),
                negative_prompts: expert.negative_prompts().len(),
                mean_norm: norms.as_ref().and_then(|n| mean_over_layers(n, index)),
            })
            .collect();
        let (num_layers, num_experts, hidden_size) = gate.dims();

        Self {
            model: model.to_string(),
            mode,
            kind: gate.kind(),
            num_layers,
            num_experts,
            hidden_size,
            experts,
            warnings: degeneracy.warning_messages(),
            degeneracy,
        }
    }
}

/// Mean of `norms[layer][expert]` over layers
fn mean_over_layers(norms: &[Vec<f32>], expert: usize) -> Option<f32> {
    let values: Vec<f32> = norms
        .iter()
        .filter_map(|layer| layer.get(expert).copied())
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f32>() / values.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_over_layers() {
        let norms = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert_eq!(mean_over_layers(&norms, 0), Some(2.0));
        assert_eq!(mean_over_layers(&norms, 1), Some(3.0));
        assert_eq!(mean_over_layers(&norms, 5), None);
    }
}
