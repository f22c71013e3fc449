//! `hidden`, `hidden_avg`, `hidden_last`: forward-pass hidden states

use crate::error::GateError;
use crate::ports::model_registry::CausalModel;
use candle_core::{DType, Device, Tensor};
use moegate_domain::{SequenceReduction, TokenizedBatch};

/// Per-layer prompt representation from a loaded model's hidden states
pub struct HiddenStateEmbedding {
    model: Box<dyn CausalModel>,
    reduction: SequenceReduction,
    num_layers: usize,
    device: Device,
}

impl HiddenStateEmbedding {
    pub fn new(
        model: Box<dyn CausalModel>,
        reduction: SequenceReduction,
        num_layers: usize,
        device: Device,
    ) -> Self {
        Self {
            model,
            reduction,
            num_layers,
            device,
        }
    }

    pub fn reduction(&self) -> SequenceReduction {
        self.reduction
    }

    /// `(num_layers, hidden_size)`
    pub fn embed(&self, batch: &TokenizedBatch) -> Result<Tensor, GateError> {
        let states = self.model.hidden_states(batch)?;
        if states.len() != self.num_layers + 1 {
            return Err(GateError::shape_mismatch(
                format!("{} hidden-state tensors", self.num_layers + 1),
                states.len().to_string(),
                "forward pass must return the embedding output plus one tensor per layer",
            ));
        }
        let states = states
            .iter()
            .map(|s| s.to_device(&self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        reduce_hidden_states(&states, batch.attention_mask(), self.reduction)
    }
}

/// Stack every hidden state except the final one, reduce over the sequence,
/// then average over the batch.
///
/// `states` are `(batch, seq_len, hidden)`; the result is
/// `(states.len() - 1, hidden)`. The sequence mean divides by the padded
/// length. `Last` reads each row's last position whose mask is set, so
/// padding never stands in for a prompt's final token.
pub fn reduce_hidden_states(
    states: &[Tensor],
    attention_mask: &[Vec<u32>],
    reduction: SequenceReduction,
) -> Result<Tensor, GateError> {
    if states.len() < 2 {
        return Err(GateError::shape_mismatch(
            "at least 2 hidden-state tensors",
            states.len().to_string(),
            "nothing left after dropping the final layer",
        ));
    }

    // (num_layers, batch, seq_len, hidden)
    let stacked = Tensor::stack(&states[..states.len() - 1], 0)?.to_dtype(DType::F32)?;
    let (_, batch, seq_len, _) = stacked.dims4()?;
    if seq_len == 0 {
        return Err(GateError::shape_mismatch(
            "seq_len > 0",
            "0",
            "hidden states have an empty sequence axis",
        ));
    }

    let per_prompt = match reduction {
        SequenceReduction::Mean => stacked.mean(2)?,
        SequenceReduction::Last => {
            if attention_mask.len() != batch {
                return Err(GateError::shape_mismatch(
                    format!("{} attention mask rows", batch),
                    attention_mask.len().to_string(),
                    "attention mask does not match the hidden-state batch",
                ));
            }
            let rows = attention_mask
                .iter()
                .enumerate()
                .map(|(row, mask)| {
                    let last = last_attended_position(mask, seq_len);
                    stacked.narrow(1, row, 1)?.narrow(2, last, 1)
                })
                .collect::<candle_core::Result<Vec<_>>>()?;
            // (num_layers, batch, 1, hidden)
            Tensor::cat(&rows, 1)?.squeeze(2)?
        }
    };
    Ok(per_prompt.mean(1)?)
}

/// Index of the last set mask entry; rows with no set entry fall back to
/// the final position.
fn last_attended_position(mask: &[u32], seq_len: usize) -> usize {
    mask.iter()
        .take(seq_len)
        .rposition(|&m| m != 0)
        .unwrap_or(seq_len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Layer `l`, prompt `b`, position `s`, channel `h` = 100*l + 10*b + s + h/10
    fn states(layers: usize, batch: usize, seq: usize, hidden: usize) -> Vec<Tensor> {
        (0..layers)
            .map(|l| {
                let mut data = Vec::new();
                for b in 0..batch {
                    for s in 0..seq {
                        for h in 0..hidden {
                            data.push((100 * l + 10 * b + s) as f32 + h as f32 / 10.0);
                        }
                    }
                }
                Tensor::from_vec(data, (batch, seq, hidden), &Device::Cpu).unwrap()
            })
            .collect()
    }

    fn full_mask(batch: usize, seq: usize) -> Vec<Vec<u32>> {
        vec![vec![1; seq]; batch]
    }

    #[test]
    fn test_drops_final_layer() {
        let out = reduce_hidden_states(&states(4, 2, 3, 2), &full_mask(2, 3), SequenceReduction::Mean)
            .unwrap();
        assert_eq!(out.dims(), &[3, 2]);
    }

    #[test]
    fn test_mean_reduction() {
        let out = reduce_hidden_states(&states(2, 2, 3, 1), &full_mask(2, 3), SequenceReduction::Mean)
            .unwrap();
        let values: Vec<Vec<f32>> = out.to_vec2().unwrap();
        // mean over s in {0,1,2} = 1, mean over b in {0,10} = 5
        assert!((values[0][0] - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_last_reduction() {
        let out = reduce_hidden_states(&states(3, 2, 3, 1), &full_mask(2, 3), SequenceReduction::Last)
            .unwrap();
        let values: Vec<Vec<f32>> = out.to_vec2().unwrap();
        // layer 1: 100 + mean(b) 5 + last s 2
        assert!((values[1][0] - 107.0).abs() < 1e-4);
    }

    #[test]
    fn test_requires_two_states() {
        let result = reduce_hidden_states(&states(1, 1, 1, 1), &full_mask(1, 1), SequenceReduction::Mean);
        assert!(matches!(result, Err(GateError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_last_reduction_skips_right_padding() {
        // rows [5, 6, 7] and [5, pad, pad]; every state equals its token id
        let ids = [[5f32, 6.0, 7.0], [5.0, 0.0, 0.0]];
        let layer = Tensor::new(&ids, &Device::Cpu)
            .unwrap()
            .unsqueeze(2)
            .unwrap();
        let states = vec![layer.clone(), layer];
        let mask = vec![vec![1, 1, 1], vec![1, 0, 0]];

        let out = reduce_hidden_states(&states, &mask, SequenceReduction::Last).unwrap();
        let values: Vec<Vec<f32>> = out.to_vec2().unwrap();
        // last real tokens are 7 and 5
        assert!((values[0][0] - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_last_attended_position() {
        assert_eq!(last_attended_position(&[1, 1, 0, 0], 4), 1);
        assert_eq!(last_attended_position(&[1, 1, 1], 3), 2);
        assert_eq!(last_attended_position(&[0, 0], 2), 1);
    }

    #[test]
    fn test_last_reduction_mask_rows_must_match_batch() {
        let result = reduce_hidden_states(&states(2, 2, 3, 1), &full_mask(1, 3), SequenceReduction::Last);
        assert!(matches!(result, Err(GateError::ShapeMismatch { .. })));
    }
}
