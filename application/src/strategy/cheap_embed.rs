//! `cheap_embed`: one-hot projection through the token embedding matrix
//!
//! Needs only the embedding weights, never a forward pass. The single
//! resulting vector is replicated across every layer.

use super::l2_normalize;
use crate::error::GateError;
use candle_core::{D, DType, Tensor};
use candle_nn::encoding::one_hot;
use moegate_domain::TokenizedBatch;

/// Prompt embedding from the raw `(vocab_size, hidden_size)` embedding matrix
pub struct CheapEmbedding {
    embed: Tensor,
    num_layers: usize,
    vocab_size: usize,
    norm_epsilon: f64,
}

impl CheapEmbedding {
    pub fn new(
        embed: &Tensor,
        num_layers: usize,
        vocab_size: usize,
        norm_epsilon: f64,
    ) -> Result<Self, GateError> {
        let (rows, hidden) = embed.dims2()?;
        if rows != vocab_size {
            return Err(GateError::shape_mismatch(
                format!("({}, hidden)", vocab_size),
                format!("({}, {})", rows, hidden),
                "embedding matrix rows must equal vocab_size",
            ));
        }
        Ok(Self {
            embed: embed.to_dtype(DType::F32)?,
            num_layers,
            vocab_size,
            norm_epsilon,
        })
    }

    /// `(num_layers, hidden_size)`, every row identical and unit-norm
    pub fn embed(&self, batch: &TokenizedBatch) -> Result<Tensor, GateError> {
        cheap_embedding(
            &self.embed,
            batch,
            self.num_layers,
            self.vocab_size,
            self.norm_epsilon,
        )
    }
}

/// Sum the masked token embeddings of the whole batch, normalize, and
/// broadcast the vector to `num_layers` rows.
pub fn cheap_embedding(
    embed: &Tensor,
    batch: &TokenizedBatch,
    num_layers: usize,
    vocab_size: usize,
    norm_epsilon: f64,
) -> Result<Tensor, GateError> {
    let device = embed.device();
    let shape = (batch.batch_size(), batch.seq_len());
    let input_ids = Tensor::from_vec(batch.flat_input_ids(), shape, device)?;
    let attention_mask = Tensor::from_vec(batch.flat_attention_mask(), shape, device)?
        .to_dtype(DType::F32)?;

    // (batch, seq, vocab) @ (vocab, hidden) -> (batch, seq, hidden)
    let onehot = one_hot(input_ids, vocab_size, 1f32, 0f32)?;
    let h = onehot.broadcast_matmul(&embed.to_dtype(DType::F32)?)?;

    let embedded = h
        .broadcast_mul(&attention_mask.unsqueeze(D::Minus1)?)?
        .sum(1)?
        .sum_keepdim(0)?; // (1, hidden)

    let normalized = l2_normalize(&embedded, norm_epsilon)?;
    Ok(normalized.repeat((num_layers, 1))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn embed_matrix() -> Tensor {
        // vocab 4, hidden 3
        Tensor::new(
            &[
                [1f32, 0., 0.],
                [0., 1., 0.],
                [0., 0., 1.],
                [1., 1., 0.],
            ],
            &Device::Cpu,
        )
        .unwrap()
    }

    #[test]
    fn test_broadcast_across_layers() {
        let batch = TokenizedBatch::new(vec![vec![0, 3], vec![2, 1]], vec![vec![1, 1], vec![1, 1]])
            .unwrap();
        let out = cheap_embedding(&embed_matrix(), &batch, 5, 4, 1e-8).unwrap();
        assert_eq!(out.dims(), &[5, 3]);

        let rows: Vec<Vec<f32>> = out.to_vec2().unwrap();
        for row in &rows[1..] {
            assert_eq!(row, &rows[0]);
        }
        let norm: f32 = rows[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_mask_excludes_padding() {
        // second token of row 0 is padding and must not contribute
        let batch = TokenizedBatch::new(vec![vec![0, 1]], vec![vec![1, 0]]).unwrap();
        let out = cheap_embedding(&embed_matrix(), &batch, 1, 4, 1e-8).unwrap();
        let row: Vec<f32> = out.get(0).unwrap().to_vec1().unwrap();
        assert!((row[0] - 1.0).abs() < 1e-6);
        assert!(row[1].abs() < 1e-6);
        assert!(row[2].abs() < 1e-6);
    }

    #[test]
    fn test_sums_over_sequence_and_batch() {
        let batch = TokenizedBatch::new(vec![vec![0], vec![1]], vec![vec![1], vec![1]]).unwrap();
        let out = cheap_embedding(&embed_matrix(), &batch, 1, 4, 1e-8).unwrap();
        let row: Vec<f32> = out.get(0).unwrap().to_vec1().unwrap();
        let expected = 1.0 / 2f32.sqrt();
        assert!((row[0] - expected).abs() < 1e-6);
        assert!((row[1] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_wrong_vocab_size() {
        let result = CheapEmbedding::new(&embed_matrix(), 2, 10, 1e-8);
        assert!(matches!(result, Err(GateError::ShapeMismatch { .. })));
    }
}
