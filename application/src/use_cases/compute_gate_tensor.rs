//! Compute Gate Tensor use case
//!
//! Orchestrates gate vector computation: strategy setup, the per-expert
//! positive/negative prompt loop, normalization, and final layout.

use crate::config::GateParams;
use crate::device::resolve_device;
use crate::error::GateError;
use crate::gate_tensor::{GateTensor, GateTensorKind};
use crate::ports::classifier::ExpertClassifier;
use crate::ports::model_registry::{ModelError, ModelRegistry};
use crate::ports::progress::{GateProgressNotifier, NoProgress};
use crate::ports::tokenizer::PromptTokenizer;
use crate::strategy::{EmbeddingStrategy, GateSource, StrategyContext, build_gate_source, l2_normalize};
use crate::tokenize::tokenize_prompts;
use candle_core::Tensor;
use moegate_domain::{Expert, GateMode, LoadOptions, ModelDims, ModelReference};
use std::sync::Arc;
use tracing::{debug, info};

/// Input for the ComputeGateTensor use case
#[derive(Debug, Clone)]
pub struct ComputeGateTensorInput {
    pub model: ModelReference,
    pub experts: Vec<Expert>,
    pub mode: GateMode,
    pub options: LoadOptions,
}

impl ComputeGateTensorInput {
    pub fn new(model: ModelReference, experts: Vec<Expert>, mode: GateMode) -> Self {
        Self {
            model,
            experts,
            mode,
            options: LoadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }
}

/// Use case for computing the `(layers, experts, hidden)` gate tensor
pub struct ComputeGateTensorUseCase<R: ModelRegistry, T: PromptTokenizer> {
    registry: Arc<R>,
    tokenizer: Arc<T>,
    classifier: Option<Arc<dyn ExpertClassifier>>,
    params: GateParams,
}

impl<R: ModelRegistry, T: PromptTokenizer> ComputeGateTensorUseCase<R, T> {
    pub fn new(registry: Arc<R>, tokenizer: Arc<T>) -> Self {
        Self {
            registry,
            tokenizer,
            classifier: None,
            params: GateParams::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ExpertClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_params(mut self, params: GateParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &GateParams {
        &self.params
    }

    /// Execute the use case with default (no-op) progress
    pub fn execute(&self, input: ComputeGateTensorInput) -> Result<GateTensor, GateError> {
        self.execute_with_progress(input, &NoProgress)
    }

    /// Execute the use case with progress callbacks
    pub fn execute_with_progress(
        &self,
        input: ComputeGateTensorInput,
        progress: &dyn GateProgressNotifier,
    ) -> Result<GateTensor, GateError> {
        input.options.validate()?;
        if input.experts.is_empty() {
            return Err(GateError::configuration("no experts configured"));
        }
        if input.mode.requires_classifier() && self.classifier.is_none() {
            return Err(GateError::configuration(format!(
                "mode '{}' requires an expert classifier",
                input.mode
            )));
        }

        let dims = self
            .registry
            .config(&input.model, input.options.trust_remote_code)?;
        validate_dims(&dims)?;
        let device = resolve_device(input.options.device)?;

        info!(
            "Computing gate tensor: mode={} layers={} experts={} hidden={}",
            input.mode,
            dims.num_hidden_layers,
            input.experts.len(),
            dims.hidden_size
        );

        let source = build_gate_source(
            input.mode,
            StrategyContext {
                registry: self.registry.as_ref(),
                model: &input.model,
                dims,
                num_experts: input.experts.len(),
                options: &input.options,
                params: &self.params,
                classifier: self.classifier.clone(),
                device: device.clone(),
            },
        )?;

        let gate = match source {
            GateSource::Sampled(init) => {
                debug!("Sampling gate tensor directly ({:?})", init.distribution());
                GateTensor::new(init.sample(&device)?, GateTensorKind::Embeddings)
            }
            GateSource::Prompted(strategy) => {
                self.aggregate(&strategy, &input.experts, progress)?
            }
        };

        info!("Gate tensor ready: {:?}", gate.dims());
        Ok(gate)
    }

    /// Per-expert loop, strictly sequential in input order
    fn aggregate(
        &self,
        strategy: &EmbeddingStrategy,
        experts: &[Expert],
        progress: &dyn GateProgressNotifier,
    ) -> Result<GateTensor, GateError> {
        let kind = strategy.output_kind();
        progress.on_experts_start(experts.len());

        let mut gate_vecs = Vec::with_capacity(experts.len());
        for (index, expert) in experts.iter().enumerate() {
            debug!(
                "Embedding expert '{}' with {} ({} positive, {} negative prompts)",
                expert.name(),
                strategy.name(),
                expert.positive_prompts().len(),
                expert.negative_prompts().len()
            );

            let positive = self.embed_prompts(strategy, expert, expert.positive_prompts(), index)?;
            let negative = if expert.has_negative_prompts() {
                Some(self.embed_prompts(strategy, expert, expert.negative_prompts(), index)?)
            } else {
                None
            };

            let combined = combine_embeddings(&positive, negative.as_ref())?;
            let vectors = match kind {
                GateTensorKind::Embeddings => l2_normalize(&combined, self.params.norm_epsilon)?,
                GateTensorKind::RoutingWeights => combined,
            };
            gate_vecs.push(vectors);
            progress.on_expert_complete(index, expert);
        }
        progress.on_experts_complete();

        // (experts, layers, hidden) -> (layers, experts, hidden)
        let stacked = Tensor::stack(&gate_vecs, 0)?;
        Ok(GateTensor::new(
            stacked.permute((1, 0, 2))?.contiguous()?,
            kind,
        ))
    }

    fn embed_prompts(
        &self,
        strategy: &EmbeddingStrategy,
        expert: &Expert,
        prompts: &[String],
        index: usize,
    ) -> Result<Tensor, GateError> {
        let batch = tokenize_prompts(prompts, self.tokenizer.as_ref()).map_err(|source| {
            GateError::Tokenization {
                expert: expert.name().to_string(),
                source,
            }
        })?;
        strategy.embed(&batch, index)
    }
}

/// Push the positive embedding away from the negative one: `positive - negative`
pub fn combine_embeddings(positive: &Tensor, negative: Option<&Tensor>) -> Result<Tensor, GateError> {
    match negative {
        Some(negative) => Ok(positive.sub(negative)?),
        None => Ok(positive.clone()),
    }
}

/// Convenience entry point taking the mode as a configuration string.
///
/// Unknown modes fail with [`GateError::Configuration`] before the registry
/// or tokenizer is touched.
pub fn compute_gate_tensor<R: ModelRegistry, T: PromptTokenizer>(
    registry: Arc<R>,
    tokenizer: Arc<T>,
    model: ModelReference,
    experts: Vec<Expert>,
    mode: &str,
    options: LoadOptions,
) -> Result<GateTensor, GateError> {
    let mode: GateMode = mode.parse()?;
    ComputeGateTensorUseCase::new(registry, tokenizer)
        .execute(ComputeGateTensorInput::new(model, experts, mode).with_options(options))
}

fn validate_dims(dims: &ModelDims) -> Result<(), GateError> {
    if dims.num_hidden_layers == 0 || dims.hidden_size == 0 || dims.vocab_size == 0 {
        return Err(ModelError::InvalidConfig(format!(
            "num_hidden_layers={}, hidden_size={}, vocab_size={} must all be positive",
            dims.num_hidden_layers, dims.hidden_size, dims.vocab_size
        ))
        .into());
    }
    Ok(())
}
