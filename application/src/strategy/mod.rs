//! Embedding strategies
//!
//! A [`GateMode`] is turned into a [`GateSource`] once, at setup time:
//! either a prompt-free sampler that produces the final tensor directly, or
//! an [`EmbeddingStrategy`] that maps one tokenized prompt batch to a
//! `(num_layers, hidden_size)` tensor. Setup performs all model loading up
//! front; strategies only read what they loaded.

pub mod cheap_embed;
pub mod classifier;
pub mod hidden;
pub mod random;

use crate::config::GateParams;
use crate::error::GateError;
use crate::gate_tensor::GateTensorKind;
use crate::ports::classifier::ExpertClassifier;
use crate::ports::model_registry::ModelRegistry;
use candle_core::{D, Device, Tensor};
use cheap_embed::CheapEmbedding;
use classifier::ClassifierWeightedEmbedding;
use hidden::HiddenStateEmbedding;
use moegate_domain::{GateMode, LoadOptions, ModelDims, ModelReference, SequenceReduction, TokenizedBatch};
use random::RandomInit;
use std::sync::Arc;
use tracing::debug;

/// Divide each vector along the last axis by its L2 norm, clamped below at `epsilon`.
pub fn l2_normalize(tensor: &Tensor, epsilon: f64) -> candle_core::Result<Tensor> {
    let norm = tensor
        .sqr()?
        .sum_keepdim(D::Minus1)?
        .sqrt()?
        .maximum(epsilon)?;
    tensor.broadcast_div(&norm)
}

/// Prompt-driven strategy, dispatched by variant
pub enum EmbeddingStrategy {
    CheapEmbed(CheapEmbedding),
    Hidden(HiddenStateEmbedding),
    SmartHidden(ClassifierWeightedEmbedding),
}

impl EmbeddingStrategy {
    /// Map one prompt batch to `(num_layers, hidden_size)`.
    ///
    /// `expert_index` is only consulted by `smart_hidden`.
    pub fn embed(&self, batch: &TokenizedBatch, expert_index: usize) -> Result<Tensor, GateError> {
        match self {
            EmbeddingStrategy::CheapEmbed(s) => s.embed(batch),
            EmbeddingStrategy::Hidden(s) => s.embed(batch),
            EmbeddingStrategy::SmartHidden(s) => s.embed(batch, expert_index),
        }
    }

    pub fn output_kind(&self) -> GateTensorKind {
        match self {
            EmbeddingStrategy::SmartHidden(_) => GateTensorKind::RoutingWeights,
            _ => GateTensorKind::Embeddings,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EmbeddingStrategy::CheapEmbed(_) => "cheap_embed",
            EmbeddingStrategy::Hidden(s) => match s.reduction() {
                SequenceReduction::Mean => "hidden_avg",
                SequenceReduction::Last => "hidden_last",
            },
            EmbeddingStrategy::SmartHidden(_) => "smart_hidden",
        }
    }
}

/// Where the gate tensor comes from
pub enum GateSource {
    /// Sampled directly; the per-expert loop is skipped
    Sampled(RandomInit),
    Prompted(EmbeddingStrategy),
}

/// Everything a strategy may need at setup time
pub struct StrategyContext<'a> {
    pub registry: &'a dyn ModelRegistry,
    pub model: &'a ModelReference,
    pub dims: ModelDims,
    pub num_experts: usize,
    pub options: &'a LoadOptions,
    pub params: &'a GateParams,
    pub classifier: Option<Arc<dyn ExpertClassifier>>,
    pub device: Device,
}

/// Construct the gate source for `mode`, loading whatever it needs.
pub fn build_gate_source(mode: GateMode, ctx: StrategyContext<'_>) -> Result<GateSource, GateError> {
    let StrategyContext {
        registry,
        model,
        dims,
        num_experts,
        options,
        params,
        classifier,
        device,
    } = ctx;

    match mode {
        GateMode::Random => Ok(GateSource::Sampled(RandomInit::standard_normal(
            dims,
            num_experts,
            params.seed,
        ))),
        GateMode::UniformRandom => Ok(GateSource::Sampled(RandomInit::uniform(
            dims,
            num_experts,
            params.seed,
        ))),
        GateMode::CheapEmbed => {
            debug!("Loading {} from {}", params.embed_tensor_name, model);
            let loader = registry.lazy_loader(model, options.lazy_unpickle)?;
            let embed = loader.get_tensor(&params.embed_tensor_name, &device)?;
            Ok(GateSource::Prompted(EmbeddingStrategy::CheapEmbed(
                CheapEmbedding::new(
                    &embed,
                    dims.num_hidden_layers,
                    dims.vocab_size,
                    params.norm_epsilon,
                )?,
            )))
        }
        GateMode::Hidden | GateMode::HiddenAvg | GateMode::HiddenLast => {
            let reduction = mode
                .sequence_reduction()
                .unwrap_or(SequenceReduction::Mean);
            debug!("Loading {} for forward passes ({:?})", model, reduction);
            let causal = registry.load_causal_model(model, options)?;
            Ok(GateSource::Prompted(EmbeddingStrategy::Hidden(
                HiddenStateEmbedding::new(causal, reduction, dims.num_hidden_layers, device),
            )))
        }
        GateMode::SmartHidden => {
            let classifier = classifier.ok_or_else(|| {
                GateError::configuration("mode 'smart_hidden' requires an expert classifier")
            })?;
            debug!("Loading {} for classifier-weighted forward passes", model);
            let causal = registry.load_causal_model(model, options)?;
            let hidden = HiddenStateEmbedding::new(
                causal,
                SequenceReduction::Mean,
                dims.num_hidden_layers,
                device.clone(),
            );
            Ok(GateSource::Prompted(EmbeddingStrategy::SmartHidden(
                ClassifierWeightedEmbedding::new(
                    hidden,
                    classifier,
                    dims.num_hidden_layers,
                    num_experts,
                    dims.hidden_size,
                    device,
                ),
            )))
        }
    }
}
