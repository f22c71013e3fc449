//! Llama-family decoder returning hidden states at every layer boundary
//!
//! Covers the Llama, Mistral, and Qwen2 checkpoints: pre-norm decoder
//! layers with RMSNorm, rotary position embeddings, grouped-query attention,
//! and a SwiGLU MLP. Only the forward pass needed for gate computation is
//! implemented; there is no KV cache and no LM head.

use super::hf_config::HfModelConfig;
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Embedding, Linear, RmsNorm, VarBuilder, embedding, linear_b, linear_no_bias};
use moegate_application::{CausalModel, ModelError};
use moegate_domain::TokenizedBatch;
use std::path::PathBuf;
use tracing::{debug, info};

struct RotaryEmbedding {
    cos: Tensor,
    sin: Tensor,
}

impl RotaryEmbedding {
    fn new(config: &HfModelConfig, head_dim: usize, device: &Device, dtype: DType) -> candle_core::Result<Self> {
        let inv_freq: Vec<f32> = (0..head_dim)
            .step_by(2)
            .map(|i| 1.0 / config.rope_theta.powf(i as f64 / head_dim as f64) as f32)
            .collect();
        let inv_freq = Tensor::new(inv_freq, device)?;
        let positions: Vec<f32> = (0..config.max_position_embeddings).map(|p| p as f32).collect();
        let positions = Tensor::new(positions, device)?;

        // (max_position_embeddings, head_dim / 2)
        let freqs = positions.unsqueeze(1)?.matmul(&inv_freq.unsqueeze(0)?)?;
        Ok(Self {
            cos: freqs.cos()?.to_dtype(dtype)?,
            sin: freqs.sin()?.to_dtype(dtype)?,
        })
    }

    /// `x` is `(batch, heads, seq_len, head_dim)`
    fn apply(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let seq_len = x.dim(2)?;
        let cos = self.cos.narrow(0, 0, seq_len)?;
        let sin = self.sin.narrow(0, 0, seq_len)?;
        candle_nn::rotary_emb::rope(&x.contiguous()?, &cos, &sin)
    }
}

struct Attention {
    q_proj: Linear,
    k_proj: Linear,
    v_proj: Linear,
    o_proj: Linear,
    num_heads: usize,
    num_kv_heads: usize,
    head_dim: usize,
}

impl Attention {
    fn load(vb: VarBuilder, config: &HfModelConfig) -> Result<Self, ModelError> {
        let num_heads = config.num_attention_heads()?;
        let num_kv_heads = config.num_key_value_heads()?;
        let head_dim = config.hidden_size / num_heads;
        let bias = config.has_qkv_bias();
        Ok(Self {
            q_proj: linear_b(config.hidden_size, num_heads * head_dim, bias, vb.pp("q_proj"))?,
            k_proj: linear_b(config.hidden_size, num_kv_heads * head_dim, bias, vb.pp("k_proj"))?,
            v_proj: linear_b(config.hidden_size, num_kv_heads * head_dim, bias, vb.pp("v_proj"))?,
            o_proj: linear_no_bias(num_heads * head_dim, config.hidden_size, vb.pp("o_proj"))?,
            num_heads,
            num_kv_heads,
            head_dim,
        })
    }

    fn forward(&self, x: &Tensor, rotary: &RotaryEmbedding, mask: &Tensor) -> candle_core::Result<Tensor> {
        let (b, seq_len, _) = x.dims3()?;

        let q = self
            .q_proj
            .forward(x)?
            .reshape((b, seq_len, self.num_heads, self.head_dim))?
            .transpose(1, 2)?;
        let k = self
            .k_proj
            .forward(x)?
            .reshape((b, seq_len, self.num_kv_heads, self.head_dim))?
            .transpose(1, 2)?;
        let v = self
            .v_proj
            .forward(x)?
            .reshape((b, seq_len, self.num_kv_heads, self.head_dim))?
            .transpose(1, 2)?;

        let q = rotary.apply(&q)?;
        let k = rotary.apply(&k)?;

        let n_rep = self.num_heads / self.num_kv_heads;
        let k = repeat_kv(k, n_rep)?;
        let v = repeat_kv(v, n_rep)?.contiguous()?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let scores = (q.matmul(&k.t()?)? * scale)?.broadcast_add(mask)?;
        let weights = candle_nn::ops::softmax_last_dim(&scores)?;

        let out = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((b, seq_len, self.num_heads * self.head_dim))?;
        self.o_proj.forward(&out)
    }
}

fn repeat_kv(x: Tensor, n_rep: usize) -> candle_core::Result<Tensor> {
    if n_rep == 1 {
        return Ok(x);
    }
    let (b, num_kv_heads, seq_len, head_dim) = x.dims4()?;
    x.unsqueeze(2)?
        .expand((b, num_kv_heads, n_rep, seq_len, head_dim))?
        .reshape((b, num_kv_heads * n_rep, seq_len, head_dim))
}

struct Mlp {
    gate_proj: Linear,
    up_proj: Linear,
    down_proj: Linear,
}

impl Mlp {
    fn load(vb: VarBuilder, config: &HfModelConfig) -> Result<Self, ModelError> {
        let intermediate = config.intermediate_size()?;
        Ok(Self {
            gate_proj: linear_no_bias(config.hidden_size, intermediate, vb.pp("gate_proj"))?,
            up_proj: linear_no_bias(config.hidden_size, intermediate, vb.pp("up_proj"))?,
            down_proj: linear_no_bias(intermediate, config.hidden_size, vb.pp("down_proj"))?,
        })
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let gate = candle_nn::ops::silu(&self.gate_proj.forward(x)?)?;
        let up = self.up_proj.forward(x)?;
        self.down_proj.forward(&(gate * up)?)
    }
}

struct DecoderLayer {
    self_attn: Attention,
    mlp: Mlp,
    input_layernorm: RmsNorm,
    post_attention_layernorm: RmsNorm,
}

impl DecoderLayer {
    fn load(vb: VarBuilder, config: &HfModelConfig) -> Result<Self, ModelError> {
        Ok(Self {
            self_attn: Attention::load(vb.pp("self_attn"), config)?,
            mlp: Mlp::load(vb.pp("mlp"), config)?,
            input_layernorm: candle_nn::rms_norm(
                config.hidden_size,
                config.rms_norm_eps,
                vb.pp("input_layernorm"),
            )?,
            post_attention_layernorm: candle_nn::rms_norm(
                config.hidden_size,
                config.rms_norm_eps,
                vb.pp("post_attention_layernorm"),
            )?,
        })
    }

    fn forward(&self, x: &Tensor, rotary: &RotaryEmbedding, mask: &Tensor) -> candle_core::Result<Tensor> {
        let residual = x;
        let h = self
            .self_attn
            .forward(&self.input_layernorm.forward(x)?, rotary, mask)?;
        let x = (residual + h)?;
        let h = self.mlp.forward(&self.post_attention_layernorm.forward(&x)?)?;
        x + h
    }
}

/// `(seq_len, seq_len)` additive mask, `-inf` above the diagonal.
///
/// Batches are right-padded, so real tokens never attend to padding.
fn causal_mask(seq_len: usize, device: &Device, dtype: DType) -> candle_core::Result<Tensor> {
    let mask: Vec<f32> = (0..seq_len)
        .flat_map(|i| (0..seq_len).map(move |j| if j > i { f32::NEG_INFINITY } else { 0.0 }))
        .collect();
    Tensor::from_vec(mask, (seq_len, seq_len), device)?.to_dtype(dtype)
}

/// Decoder stack loaded from a Llama-family checkpoint
pub struct LlamaHiddenStates {
    embed_tokens: Embedding,
    layers: Vec<DecoderLayer>,
    norm: RmsNorm,
    rotary: RotaryEmbedding,
    device: Device,
    dtype: DType,
}

impl LlamaHiddenStates {
    /// Memory-map `shards` and build the decoder on `device`
    pub fn load(
        config: &HfModelConfig,
        shards: &[PathBuf],
        device: &Device,
        dtype: DType,
    ) -> Result<Self, ModelError> {
        info!(
            "Loading {} decoder: {} layers, hidden {}, {:?} on {:?}",
            config.architecture(),
            config.num_hidden_layers,
            config.hidden_size,
            dtype,
            device
        );
        // SAFETY: shards are mapped read-only and not modified while loaded.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(shards, dtype, device)? };
        Self::from_var_builder(config, vb, device, dtype)
    }

    pub fn from_var_builder(
        config: &HfModelConfig,
        vb: VarBuilder,
        device: &Device,
        dtype: DType,
    ) -> Result<Self, ModelError> {
        if config.num_hidden_layers == 0 {
            return Err(ModelError::InvalidConfig(
                "num_hidden_layers must be at least 1".to_string(),
            ));
        }
        let vb_model = vb.pp("model");
        let embed_tokens = embedding(
            config.vocab_size,
            config.hidden_size,
            vb_model.pp("embed_tokens"),
        )?;

        let mut layers = Vec::with_capacity(config.num_hidden_layers);
        for i in 0..config.num_hidden_layers {
            debug!("Loading layer {}/{}", i + 1, config.num_hidden_layers);
            layers.push(DecoderLayer::load(vb_model.pp(format!("layers.{i}")), config)?);
        }

        let norm = candle_nn::rms_norm(config.hidden_size, config.rms_norm_eps, vb_model.pp("norm"))?;
        let head_dim = config.hidden_size / config.num_attention_heads()?;
        let rotary = RotaryEmbedding::new(config, head_dim, device, dtype)?;

        Ok(Self {
            embed_tokens,
            layers,
            norm,
            rotary,
            device: device.clone(),
            dtype,
        })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

impl CausalModel for LlamaHiddenStates {
    /// Embedding output, then each decoder layer's output; the final entry
    /// has the closing RMSNorm applied. All states are returned as F32.
    fn hidden_states(&self, batch: &TokenizedBatch) -> Result<Vec<Tensor>, ModelError> {
        if batch.is_empty() || batch.seq_len() == 0 {
            return Err(ModelError::Forward("empty prompt batch".to_string()));
        }
        let input_ids = Tensor::from_vec(
            batch.flat_input_ids(),
            (batch.batch_size(), batch.seq_len()),
            &self.device,
        )?;
        let mask = causal_mask(batch.seq_len(), &self.device, self.dtype)?;

        let mut hidden = self.embed_tokens.forward(&input_ids)?;
        let mut states = Vec::with_capacity(self.layers.len() + 1);
        states.push(hidden.to_dtype(DType::F32)?);

        let Some((final_layer, inner)) = self.layers.split_last() else {
            return Err(ModelError::InvalidConfig("model has no decoder layers".to_string()));
        };
        for layer in inner {
            hidden = layer.forward(&hidden, &self.rotary, &mask)?;
            states.push(hidden.to_dtype(DType::F32)?);
        }
        // final norm applies to the last layer's output only
        hidden = final_layer.forward(&hidden, &self.rotary, &mask)?;
        states.push(self.norm.forward(&hidden)?.to_dtype(DType::F32)?);
        Ok(states)
    }
}
