//! Safetensors-backed [`TensorLoader`] implementations

use candle_core::safetensors::MmapedSafetensors;
use candle_core::{DType, Device, Tensor};
use moegate_application::{ModelError, TensorLoader};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// All `*.safetensors` shards in `dir`, sorted by file name
pub fn find_safetensors(dir: &Path) -> Result<Vec<PathBuf>, ModelError> {
    let mut shards = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "safetensors") {
            shards.push(path);
        }
    }
    if shards.is_empty() {
        return Err(ModelError::NotFound(format!(
            "no .safetensors files in {}",
            dir.display()
        )));
    }
    shards.sort();
    Ok(shards)
}

/// Memory-mapped shards; tensors are materialized one at a time on request
pub struct MmapedTensorLoader {
    inner: MmapedSafetensors,
}

impl MmapedTensorLoader {
    pub fn open(shards: &[PathBuf]) -> Result<Self, ModelError> {
        debug!("Memory-mapping {} safetensors shard(s)", shards.len());
        // SAFETY: the files are opened read-only and must not be modified
        // while mapped; model directories are treated as immutable.
        let inner = unsafe { MmapedSafetensors::multi(shards)? };
        Ok(Self { inner })
    }
}

impl TensorLoader for MmapedTensorLoader {
    fn get_tensor(&self, name: &str, device: &Device) -> Result<Tensor, ModelError> {
        if self.inner.get(name).is_err() {
            return Err(ModelError::MissingTensor(name.to_string()));
        }
        Ok(self.inner.load(name, device)?)
    }
}

/// Upper bound on a shard's JSON header
const MAX_HEADER_LEN: u64 = 100_000_000;

#[derive(Debug, Clone, Deserialize)]
struct TensorEntry {
    dtype: String,
    shape: Vec<usize>,
    data_offsets: [u64; 2],
}

#[derive(Debug, Clone)]
struct TensorLocation {
    shard: PathBuf,
    /// Byte offset of the shard's data section
    data_start: u64,
    entry: TensorEntry,
}

/// Shard headers indexed up front; a requested tensor's bytes are read
/// from its own shard into host memory, nothing else is touched.
pub struct IndexedTensorLoader {
    index: HashMap<String, TensorLocation>,
}

impl IndexedTensorLoader {
    pub fn open(shards: &[PathBuf]) -> Result<Self, ModelError> {
        let mut index = HashMap::new();
        for shard in shards {
            debug!("Indexing {}", shard.display());
            let (data_start, entries) = read_header(shard)?;
            for (name, entry) in entries {
                index.insert(
                    name,
                    TensorLocation {
                        shard: shard.clone(),
                        data_start,
                        entry,
                    },
                );
            }
        }
        Ok(Self { index })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl TensorLoader for IndexedTensorLoader {
    fn get_tensor(&self, name: &str, device: &Device) -> Result<Tensor, ModelError> {
        let location = self
            .index
            .get(name)
            .ok_or_else(|| ModelError::MissingTensor(name.to_string()))?;
        let entry = &location.entry;
        let dtype = parse_dtype(&entry.dtype)?;

        let [begin, end] = entry.data_offsets;
        let expected = entry.shape.iter().product::<usize>() * dtype.size_in_bytes();
        if end < begin || (end - begin) as usize != expected {
            return Err(invalid_data(format!(
                "{}: data offsets {:?} do not match {:?} {:?}",
                name, entry.data_offsets, entry.dtype, entry.shape
            )));
        }

        debug!("Reading {} from {}", name, location.shard.display());
        let mut file = File::open(&location.shard)?;
        file.seek(SeekFrom::Start(location.data_start + begin))?;
        let mut bytes = vec![0u8; expected];
        file.read_exact(&mut bytes)?;

        let tensor = Tensor::from_raw_buffer(&bytes, dtype, &entry.shape, &Device::Cpu)?;
        Ok(tensor.to_device(device)?)
    }
}

/// Parse a shard header: 8-byte little-endian length, then JSON.
///
/// Returns the data section offset and every tensor entry.
fn read_header(path: &Path) -> Result<(u64, HashMap<String, TensorEntry>), ModelError> {
    let mut file = File::open(path)?;
    let mut len_bytes = [0u8; 8];
    file.read_exact(&mut len_bytes)?;
    let header_len = u64::from_le_bytes(len_bytes);
    if header_len > MAX_HEADER_LEN {
        return Err(invalid_data(format!(
            "{}: header of {} bytes",
            path.display(),
            header_len
        )));
    }

    let mut header = vec![0u8; header_len as usize];
    file.read_exact(&mut header)?;
    let raw: HashMap<String, serde_json::Value> = serde_json::from_slice(&header)
        .map_err(|e| invalid_data(format!("{}: {}", path.display(), e)))?;

    let mut entries = HashMap::new();
    for (name, value) in raw {
        if name == "__metadata__" {
            continue;
        }
        let entry: TensorEntry = serde_json::from_value(value)
            .map_err(|e| invalid_data(format!("{}: tensor {}: {}", path.display(), name, e)))?;
        entries.insert(name, entry);
    }
    Ok((8 + header_len, entries))
}

fn parse_dtype(dtype: &str) -> Result<DType, ModelError> {
    match dtype {
        "U8" => Ok(DType::U8),
        "U32" => Ok(DType::U32),
        "I64" => Ok(DType::I64),
        "BF16" => Ok(DType::BF16),
        "F16" => Ok(DType::F16),
        "F32" => Ok(DType::F32),
        "F64" => Ok(DType::F64),
        other => Err(ModelError::Unsupported(format!("safetensors dtype {}", other))),
    }
}

fn invalid_data(message: String) -> ModelError {
    ModelError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_shard(dir: &Path, file: &str, name: &str, values: &[f32]) -> PathBuf {
        let path = dir.join(file);
        let tensor = Tensor::new(values, &Device::Cpu).unwrap();
        let tensors = HashMap::from([(name.to_string(), tensor)]);
        candle_core::safetensors::save(&tensors, &path).unwrap();
        path
    }

    #[test]
    fn test_find_safetensors_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_shard(dir.path(), "model-00002.safetensors", "b", &[2.0]);
        write_shard(dir.path(), "model-00001.safetensors", "a", &[1.0]);
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();

        let shards = find_safetensors(dir.path()).unwrap();
        assert_eq!(shards.len(), 2);
        assert!(shards[0].ends_with("model-00001.safetensors"));
    }

    #[test]
    fn test_find_safetensors_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_safetensors(dir.path()),
            Err(ModelError::NotFound(_))
        ));
    }

    #[test]
    fn test_mmaped_and_indexed_agree() {
        let dir = tempfile::tempdir().unwrap();
        write_shard(dir.path(), "a.safetensors", "embed", &[1.0, 2.0, 3.0]);
        write_shard(dir.path(), "b.safetensors", "norm", &[4.0]);
        let shards = find_safetensors(dir.path()).unwrap();

        let mmaped = MmapedTensorLoader::open(&shards).unwrap();
        let indexed = IndexedTensorLoader::open(&shards).unwrap();
        assert_eq!(indexed.len(), 2);

        for loader in [&mmaped as &dyn TensorLoader, &indexed] {
            let embed: Vec<f32> = loader
                .get_tensor("embed", &Device::Cpu)
                .unwrap()
                .to_vec1()
                .unwrap();
            assert_eq!(embed, vec![1.0, 2.0, 3.0]);
            assert!(matches!(
                loader.get_tensor("missing", &Device::Cpu),
                Err(ModelError::MissingTensor(_))
            ));
        }
    }

    #[test]
    fn test_indexed_reads_only_the_requested_shard() {
        let dir = tempfile::tempdir().unwrap();
        write_shard(dir.path(), "a.safetensors", "embed", &[1.0, 2.0, 3.0]);
        let other = write_shard(dir.path(), "b.safetensors", "layers", &[4.0, 5.0, 6.0, 7.0]);

        // cut off the data section of the second shard, header intact
        let bytes = std::fs::read(&other).unwrap();
        std::fs::write(&other, &bytes[..bytes.len() - 8]).unwrap();

        let shards = find_safetensors(dir.path()).unwrap();
        let loader = IndexedTensorLoader::open(&shards).unwrap();
        let embed: Vec<f32> = loader
            .get_tensor("embed", &Device::Cpu)
            .unwrap()
            .to_vec1()
            .unwrap();
        assert_eq!(embed, vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            loader.get_tensor("layers", &Device::Cpu),
            Err(ModelError::Io(_))
        ));
    }

    #[test]
    fn test_indexed_keeps_dtype_and_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        let tensor = Tensor::new(&[[1f32, 2.0], [3.0, 4.0]], &Device::Cpu)
            .unwrap()
            .to_dtype(DType::BF16)
            .unwrap();
        candle_core::safetensors::save(&HashMap::from([("w".to_string(), tensor)]), &path).unwrap();

        let loader = IndexedTensorLoader::open(&[path]).unwrap();
        let w = loader.get_tensor("w", &Device::Cpu).unwrap();
        assert_eq!(w.dtype(), DType::BF16);
        assert_eq!(w.dims(), &[2, 2]);
        let values: Vec<Vec<f32>> = w.to_dtype(DType::F32).unwrap().to_vec2().unwrap();
        assert_eq!(values, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_parse_dtype() {
        assert_eq!(parse_dtype("F16").unwrap(), DType::F16);
        assert!(matches!(parse_dtype("F8_E4M3"), Err(ModelError::Unsupported(_))));
    }
}
