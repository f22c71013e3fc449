//! Safetensors checkpoint classifier

use candle_core::{DType, Device, Tensor};
use moegate_application::{ClassifierError, ExpertClassifier};
use moegate_domain::TokenizedBatch;
use std::path::Path;
use tracing::debug;

/// Bag-of-tokens linear classifier, one head per layer.
///
/// The checkpoint holds `weight` of shape `(layers, experts, vocab)` and an
/// optional `bias` of shape `(layers, experts)`. A prompt batch is reduced
/// to the frequency of each token over all unmasked positions; prediction is
/// `softmax(weight · freq + bias)` over the expert axis.
pub struct CheckpointClassifier {
    weight: Tensor,
    bias: Option<Tensor>,
}

impl CheckpointClassifier {
    pub fn from_file(path: &Path) -> Result<Self, ClassifierError> {
        let mut tensors = candle_core::safetensors::load(path, &Device::Cpu)
            .map_err(|e| ClassifierError::Load(format!("{}: {}", path.display(), e)))?;
        let weight = tensors
            .remove("weight")
            .ok_or_else(|| ClassifierError::Load(format!("{}: missing 'weight'", path.display())))?;
        let bias = tensors.remove("bias");
        let classifier = Self::new(weight, bias)?;
        debug!(
            "Loaded classifier {}: {} layers, {} experts, vocab {}",
            path.display(),
            classifier.num_layers(),
            classifier.num_experts(),
            classifier.vocab_size()
        );
        Ok(classifier)
    }

    pub fn new(weight: Tensor, bias: Option<Tensor>) -> Result<Self, ClassifierError> {
        let (layers, experts, _vocab) = weight
            .dims3()
            .map_err(|_| ClassifierError::Load(format!("weight must be rank 3, got {:?}", weight.dims())))?;
        if let Some(bias) = &bias {
            if bias.dims() != [layers, experts] {
                return Err(ClassifierError::Load(format!(
                    "bias shape {:?} does not match ({}, {})",
                    bias.dims(),
                    layers,
                    experts
                )));
            }
        }
        Ok(Self {
            weight: weight.to_dtype(DType::F32)?,
            bias: bias.map(|b| b.to_dtype(DType::F32)).transpose()?,
        })
    }

    pub fn num_layers(&self) -> usize {
        self.weight.dims()[0]
    }

    pub fn num_experts(&self) -> usize {
        self.weight.dims()[1]
    }

    pub fn vocab_size(&self) -> usize {
        self.weight.dims()[2]
    }

    /// Relative frequency of every token id over the unmasked positions
    fn token_frequencies(&self, batch: &TokenizedBatch) -> Result<Vec<f32>, ClassifierError> {
        let vocab = self.vocab_size();
        let mut counts = vec![0f32; vocab];
        let mut total = 0f32;
        for (ids, mask) in batch.input_ids().iter().zip(batch.attention_mask()) {
            for (&id, &keep) in ids.iter().zip(mask) {
                if keep == 0 {
                    continue;
                }
                let slot = counts.get_mut(id as usize).ok_or_else(|| {
                    ClassifierError::Prediction(format!(
                        "token id {} outside classifier vocabulary of {}",
                        id, vocab
                    ))
                })?;
                *slot += 1.0;
                total += 1.0;
            }
        }
        if total > 0.0 {
            counts.iter_mut().for_each(|c| *c /= total);
        }
        Ok(counts)
    }
}

impl ExpertClassifier for CheckpointClassifier {
    fn predict(&self, batch: &TokenizedBatch, device: &Device) -> Result<Tensor, ClassifierError> {
        let (layers, experts, vocab) = self.weight.dims3()?;
        let freqs = Tensor::from_vec(self.token_frequencies(batch)?, (vocab, 1), device)?;

        let logits = self
            .weight
            .to_device(device)?
            .reshape((layers * experts, vocab))?
            .matmul(&freqs)?
            .reshape((layers, experts))?;
        let logits = match &self.bias {
            Some(bias) => logits.add(&bias.to_device(device)?)?,
            None => logits,
        };
        Ok(candle_nn::ops::softmax_last_dim(&logits)?)
    }
}
