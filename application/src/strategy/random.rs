//! Prompt-free random initialization (`random`, `uniform_random`)

use crate::error::GateError;
use candle_core::{Device, Tensor};
use moegate_domain::ModelDims;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal, Uniform};

/// Distribution the gate tensor is drawn from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitDistribution {
    StandardNormal,
    /// Uniform over `[-scale, scale]`
    Uniform { scale: f64 },
}

/// Samples the whole `(layers, experts, hidden)` tensor at once.
#[derive(Debug, Clone)]
pub struct RandomInit {
    distribution: InitDistribution,
    shape: (usize, usize, usize),
    seed: Option<u64>,
}

impl RandomInit {
    pub fn standard_normal(dims: ModelDims, num_experts: usize, seed: Option<u64>) -> Self {
        Self {
            distribution: InitDistribution::StandardNormal,
            shape: (dims.num_hidden_layers, num_experts, dims.hidden_size),
            seed,
        }
    }

    /// Uniform init at the scale of a freshly initialized linear layer:
    /// `s = sqrt(1 / hidden_size)`.
    pub fn uniform(dims: ModelDims, num_experts: usize, seed: Option<u64>) -> Self {
        let scale = (1.0 / dims.hidden_size as f64).sqrt();
        Self {
            distribution: InitDistribution::Uniform { scale },
            shape: (dims.num_hidden_layers, num_experts, dims.hidden_size),
            seed,
        }
    }

    pub fn distribution(&self) -> InitDistribution {
        self.distribution
    }

    pub fn sample(&self, device: &Device) -> Result<Tensor, GateError> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (layers, experts, hidden) = self.shape;
        let count = layers * experts * hidden;

        let values: Vec<f32> = match self.distribution {
            InitDistribution::StandardNormal => {
                (0..count).map(|_| StandardNormal.sample(&mut rng)).collect()
            }
            InitDistribution::Uniform { scale } => {
                let scale = scale as f32;
                let uniform = Uniform::new_inclusive(-scale, scale);
                (0..count).map(|_| uniform.sample(&mut rng)).collect()
            }
        };

        Ok(Tensor::from_vec(values, self.shape, device)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> ModelDims {
        ModelDims::new(4, 16, 100)
    }

    #[test]
    fn test_standard_normal_shape() {
        let tensor = RandomInit::standard_normal(dims(), 3, Some(1))
            .sample(&Device::Cpu)
            .unwrap();
        assert_eq!(tensor.dims(), &[4, 3, 16]);
    }

    #[test]
    fn test_uniform_within_scale() {
        let init = RandomInit::uniform(dims(), 5, Some(42));
        let scale = (1.0f32 / 16.0).sqrt();
        let values: Vec<f32> = init
            .sample(&Device::Cpu)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert_eq!(values.len(), 4 * 5 * 16);
        assert!(values.iter().all(|v| (-scale..=scale).contains(v)));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a: Vec<f32> = RandomInit::standard_normal(dims(), 2, Some(9))
            .sample(&Device::Cpu)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        let b: Vec<f32> = RandomInit::standard_normal(dims(), 2, Some(9))
            .sample(&Device::Cpu)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1()
            .unwrap();
        assert_eq!(a, b);
    }
}
