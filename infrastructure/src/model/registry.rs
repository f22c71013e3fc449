//! Local-directory model registry

use super::hf_config::HfModelConfig;
use super::llama::LlamaHiddenStates;
use super::safetensors::{IndexedTensorLoader, MmapedTensorLoader, find_safetensors};
use candle_core::{DType, Device};
use moegate_application::device::resolve_device;
use moegate_application::{CausalModel, ModelError, ModelRegistry, TensorLoader};
use moegate_domain::{LoadOptions, ModelDims, ModelReference};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolved files of a local checkpoint
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub dir: PathBuf,
    pub config: HfModelConfig,
    pub shards: Vec<PathBuf>,
}

/// Builds a causal model from checkpoint files
pub type CausalModelLoader =
    dyn Fn(&ModelFiles, &LoadOptions) -> Result<Box<dyn CausalModel>, ModelError> + Send + Sync;

/// Resolves [`ModelReference`]s to local Hugging Face style directories
/// (`config.json` plus `*.safetensors` shards).
///
/// A reference's revision selects a subdirectory when one exists with that
/// name. Causal models of the Llama family are built in; other
/// architectures need a loader injected with
/// [`with_causal_loader`](Self::with_causal_loader).
#[derive(Default)]
pub struct LocalModelRegistry {
    causal_loader: Option<Arc<CausalModelLoader>>,
}

impl LocalModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_causal_loader(mut self, loader: Arc<CausalModelLoader>) -> Self {
        self.causal_loader = Some(loader);
        self
    }

    /// Directory holding the checkpoint
    pub fn resolve_dir(&self, model: &ModelReference) -> Result<PathBuf, ModelError> {
        let base = PathBuf::from(&model.path);
        if !base.is_dir() {
            return Err(ModelError::NotFound(model.to_string()));
        }
        match &model.revision {
            Some(revision) if base.join(revision).is_dir() => Ok(base.join(revision)),
            Some(revision) => {
                debug!("No '{}' subdirectory in {}, using it as is", revision, base.display());
                Ok(base)
            }
            None => Ok(base),
        }
    }

    fn read_config(&self, dir: &Path, trust_remote_code: bool) -> Result<HfModelConfig, ModelError> {
        let path = dir.join("config.json");
        if !path.is_file() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }
        let config = HfModelConfig::from_file(&path)?;
        if config.requires_remote_code() && !trust_remote_code {
            return Err(ModelError::Unsupported(format!(
                "{} ships custom modeling code; set trust_remote_code to load it",
                dir.display()
            )));
        }
        Ok(config)
    }

    fn model_files(&self, model: &ModelReference, trust_remote_code: bool) -> Result<ModelFiles, ModelError> {
        let dir = self.resolve_dir(model)?;
        let config = self.read_config(&dir, trust_remote_code)?;
        let shards = find_safetensors(&dir)?;
        Ok(ModelFiles { dir, config, shards })
    }
}

/// Weights dtype for `device`: F32 on CPU, BF16 on accelerators
fn weight_dtype(device: &Device) -> DType {
    if device.is_cpu() { DType::F32 } else { DType::BF16 }
}

fn load_builtin(files: &ModelFiles, options: &LoadOptions) -> Result<Box<dyn CausalModel>, ModelError> {
    if !files.config.is_supported_architecture() {
        return Err(ModelError::Unsupported(format!(
            "no built-in forward pass for model_type '{}' ({})",
            files.config.architecture(),
            files.dir.display()
        )));
    }
    let device = resolve_device(options.device)
        .map_err(|e| ModelError::Unsupported(e.to_string()))?;
    let dtype = weight_dtype(&device);
    if let Some(quantization) = options.quantization() {
        warn!(
            "{} quantization is not available for the built-in decoder; loading {:?} weights",
            quantization, dtype
        );
    }
    Ok(Box::new(LlamaHiddenStates::load(
        &files.config,
        &files.shards,
        &device,
        dtype,
    )?))
}

impl ModelRegistry for LocalModelRegistry {
    fn config(&self, model: &ModelReference, trust_remote_code: bool) -> Result<ModelDims, ModelError> {
        let dir = self.resolve_dir(model)?;
        let config = self.read_config(&dir, trust_remote_code)?;
        debug!("{}: {:?}", model, config.dims());
        Ok(config.dims())
    }

    fn lazy_loader(&self, model: &ModelReference, lazy_unpickle: bool) -> Result<Box<dyn TensorLoader>, ModelError> {
        let dir = self.resolve_dir(model)?;
        let shards = find_safetensors(&dir)?;
        if lazy_unpickle {
            Ok(Box::new(MmapedTensorLoader::open(&shards)?))
        } else {
            Ok(Box::new(IndexedTensorLoader::open(&shards)?))
        }
    }

    fn load_causal_model(&self, model: &ModelReference, options: &LoadOptions) -> Result<Box<dyn CausalModel>, ModelError> {
        let files = self.model_files(model, options.trust_remote_code)?;
        info!("Loading causal model {} ({} shard(s))", model, files.shards.len());
        match &self.causal_loader {
            Some(loader) => loader(&files, options),
            None => load_builtin(&files, options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Tensor;
    use moegate_domain::{DevicePlacement, TokenizedBatch};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn write_model(dir: &Path, config: &str) {
        std::fs::write(dir.join("config.json"), config).unwrap();
        let embed = Tensor::arange(0f32, 12.0, &Device::Cpu)
            .unwrap()
            .reshape((4, 3))
            .unwrap();
        let tensors = HashMap::from([("model.embed_tokens.weight".to_string(), embed)]);
        candle_core::safetensors::save(&tensors, dir.join("model.safetensors")).unwrap();
    }

    const CONFIG: &str =
        r#"{"model_type": "gpt2", "num_hidden_layers": 2, "hidden_size": 3, "vocab_size": 4}"#;

    fn reference(dir: &Path) -> ModelReference {
        ModelReference::new(dir.to_string_lossy())
    }

    #[test]
    fn test_config_reads_dims() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), CONFIG);
        let dims = LocalModelRegistry::new()
            .config(&reference(dir.path()), false)
            .unwrap();
        assert_eq!(dims, ModelDims::new(2, 3, 4));
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let err = LocalModelRegistry::new()
            .config(&ModelReference::new("/nonexistent/moegate-model"), false)
            .unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn test_revision_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let rev = dir.path().join("v2");
        std::fs::create_dir(&rev).unwrap();
        write_model(&rev, CONFIG);

        let registry = LocalModelRegistry::new();
        let model = reference(dir.path()).with_revision("v2");
        assert_eq!(registry.resolve_dir(&model).unwrap(), rev);
        assert!(registry.config(&model, false).is_ok());
    }

    #[test]
    fn test_remote_code_requires_trust() {
        let dir = tempfile::tempdir().unwrap();
        write_model(
            dir.path(),
            r#"{"num_hidden_layers": 2, "hidden_size": 3, "vocab_size": 4,
                "auto_map": {"AutoModelForCausalLM": "modeling_custom.Model"}}"#,
        );
        let registry = LocalModelRegistry::new();
        assert!(matches!(
            registry.config(&reference(dir.path()), false),
            Err(ModelError::Unsupported(_))
        ));
        assert!(registry.config(&reference(dir.path()), true).is_ok());
    }

    #[test]
    fn test_mmaped_and_indexed_loaders() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), CONFIG);
        let registry = LocalModelRegistry::new();

        for lazy in [true, false] {
            let loader = registry.lazy_loader(&reference(dir.path()), lazy).unwrap();
            let embed = loader
                .get_tensor("model.embed_tokens.weight", &Device::Cpu)
                .unwrap();
            assert_eq!(embed.dims(), &[4, 3]);
        }
    }

    #[test]
    fn test_unsupported_architecture_without_loader() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), CONFIG);
        let options = LoadOptions::default().with_device(DevicePlacement::Cpu);
        let err = LocalModelRegistry::new()
            .load_causal_model(&reference(dir.path()), &options)
            .err()
            .unwrap();
        assert!(matches!(err, ModelError::Unsupported(_)));
        assert!(err.to_string().contains("gpt2"));
    }

    #[test]
    fn test_injected_loader_receives_files() {
        struct Dummy;
        impl CausalModel for Dummy {
            fn hidden_states(&self, _batch: &TokenizedBatch) -> Result<Vec<Tensor>, ModelError> {
                Ok(Vec::new())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), CONFIG);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let registry = LocalModelRegistry::new().with_causal_loader(Arc::new(
            move |files: &ModelFiles, _options: &LoadOptions| {
                assert_eq!(files.shards.len(), 1);
                assert_eq!(files.config.num_hidden_layers, 2);
                seen.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ModelError>(Box::new(Dummy) as Box<dyn CausalModel>)
            },
        ));

        registry
            .load_causal_model(&reference(dir.path()), &LoadOptions::default())
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
