//! Flat checkpoint container
//!
//! File-backed implementations of [`CheckpointStore`] over the flat tensor
//! dump a training framework exports: slash-delimited names keyed to
//! row-major f32 payloads. The container layout is the safetensors layout,
//! restricted to F32 (the translation source dtype):
//!
//! ```text
//! CHECKPOINT := HEADER_LEN HEADER PAYLOAD
//!
//! HEADER_LEN := u64 (little-endian)
//!
//! HEADER := JSON {
//!   "tensor_name": {
//!     "dtype": "F32",
//!     "shape": [dim1, dim2, ...],
//!     "data_offsets": [start, end]      // into PAYLOAD
//!   },
//!   ...
//! }
//! ```
//!
//! [`FlatCheckpoint`] owns the bytes; [`MappedCheckpoint`] memory-maps the
//! file for large checkpoints. Both validate the full index up front, so a
//! truncated or corrupt file fails at load, not mid-translation.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use serde::Deserialize;

use crate::error::{Result, TraducirError};
use crate::store::CheckpointStore;
use crate::tensor::ShapedTensor;

/// JSON tensor metadata (internal)
#[derive(Debug, Deserialize)]
struct RawTensorMeta {
    dtype: String,
    shape: Vec<usize>,
    data_offsets: [usize; 2],
}

/// Validated index entry for one tensor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointTensorInfo {
    /// Tensor name
    pub name: String,
    /// Shape (dimensions)
    pub shape: Vec<usize>,
    /// Payload byte range [start, end)
    pub data_offsets: [usize; 2],
}

/// Parse and validate the container header against the payload length
fn parse_index(bytes: &[u8]) -> Result<(HashMap<String, CheckpointTensorInfo>, usize)> {
    if bytes.len() < 8 {
        return Err(TraducirError::FormatError {
            reason: format!("checkpoint too short for header: {} bytes", bytes.len()),
        });
    }

    let header_len = u64::from_le_bytes(bytes[..8].try_into().expect("8-byte slice"));
    let header_len = usize::try_from(header_len).map_err(|_| TraducirError::FormatError {
        reason: format!("header length {header_len} does not fit in usize"),
    })?;

    let data_start = 8usize.checked_add(header_len).filter(|&s| s <= bytes.len()).ok_or_else(
        || TraducirError::FormatError {
            reason: format!(
                "header length {header_len} exceeds file size {}",
                bytes.len()
            ),
        },
    )?;

    let raw: HashMap<String, RawTensorMeta> = serde_json::from_slice(&bytes[8..data_start])
        .map_err(|e| TraducirError::FormatError {
            reason: format!("checkpoint header JSON parse failed: {e}"),
        })?;

    let payload_len = bytes.len() - data_start;
    let mut tensors = HashMap::with_capacity(raw.len());

    for (name, meta) in raw {
        if meta.dtype != "F32" {
            return Err(TraducirError::FormatError {
                reason: format!("tensor '{name}' has dtype {}, only F32 is supported", meta.dtype),
            });
        }

        let [start, end] = meta.data_offsets;
        if start > end || end > payload_len {
            return Err(TraducirError::FormatError {
                reason: format!(
                    "tensor '{name}' offsets [{start}, {end}) exceed payload length {payload_len}"
                ),
            });
        }

        let byte_len = end - start;
        let elements: usize = meta.shape.iter().product();
        if byte_len != elements * 4 {
            return Err(TraducirError::FormatError {
                reason: format!(
                    "tensor '{name}' has {byte_len} bytes but shape {:?} needs {}",
                    meta.shape,
                    elements * 4
                ),
            });
        }

        tensors.insert(
            name.clone(),
            CheckpointTensorInfo {
                name,
                shape: meta.shape,
                data_offsets: meta.data_offsets,
            },
        );
    }

    Ok((tensors, data_start))
}

/// Decode a validated payload slice into a shaped tensor
fn decode_tensor(info: &CheckpointTensorInfo, payload: &[u8]) -> ShapedTensor {
    let bytes = &payload[info.data_offsets[0]..info.data_offsets[1]];
    let data: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().expect("4-byte chunk")))
        .collect();
    // Element count vs shape was validated by parse_index
    ShapedTensor::from_vec(info.shape.clone(), data).expect("index validated at load")
}

/// Owned flat checkpoint container
#[derive(Debug, Clone)]
pub struct FlatCheckpoint {
    tensors: HashMap<String, CheckpointTensorInfo>,
    payload: Vec<u8>,
}

impl FlatCheckpoint {
    /// Parse a checkpoint from bytes, validating the full index
    ///
    /// # Errors
    ///
    /// Returns `FormatError` for a truncated file, malformed header JSON,
    /// a non-F32 dtype, or offsets inconsistent with shapes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (tensors, data_start) = parse_index(bytes)?;
        Ok(Self {
            tensors,
            payload: bytes[data_start..].to_vec(),
        })
    }

    /// Read and parse a checkpoint file
    ///
    /// # Errors
    ///
    /// `Io` on read failure, otherwise as [`Self::from_bytes`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Materialize a tensor by name
    ///
    /// # Errors
    ///
    /// Returns `MissingSourceTensor` if the name is absent.
    pub fn get_tensor(&self, name: &str) -> Result<ShapedTensor> {
        let info = self
            .tensors
            .get(name)
            .ok_or_else(|| TraducirError::MissingSourceTensor {
                name: name.to_string(),
            })?;
        Ok(decode_tensor(info, &self.payload))
    }

    /// Index metadata for a tensor, if present
    #[must_use]
    pub fn get_tensor_info(&self, name: &str) -> Option<&CheckpointTensorInfo> {
        self.tensors.get(name)
    }

    /// All tensor names, sorted for deterministic diagnostics
    #[must_use]
    pub fn tensor_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tensors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of tensors in the container
    #[must_use]
    pub fn tensor_count(&self) -> usize {
        self.tensors.len()
    }

    /// Encode tensors into the container layout
    ///
    /// Offsets are assigned in the given order. Primarily for exporters and
    /// tests; the translator itself only reads.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` if header serialization fails.
    pub fn encode(tensors: &[(&str, &ShapedTensor)]) -> Result<Vec<u8>> {
        let mut header = serde_json::Map::new();
        let mut offset = 0usize;

        for (name, tensor) in tensors {
            let end = offset + tensor.size() * 4;
            header.insert(
                (*name).to_string(),
                serde_json::json!({
                    "dtype": "F32",
                    "shape": tensor.shape(),
                    "data_offsets": [offset, end],
                }),
            );
            offset = end;
        }

        let header_bytes = serde_json::to_vec(&serde_json::Value::Object(header)).map_err(|e| {
            TraducirError::FormatError {
                reason: format!("checkpoint header serialization failed: {e}"),
            }
        })?;

        let mut out = Vec::with_capacity(8 + header_bytes.len() + offset);
        out.extend_from_slice(&(header_bytes.len() as u64).to_le_bytes());
        out.extend_from_slice(&header_bytes);
        for (_, tensor) in tensors {
            for value in tensor.data() {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }

        Ok(out)
    }
}

impl CheckpointStore for FlatCheckpoint {
    fn lookup(&self, name: &str) -> Option<ShapedTensor> {
        self.get_tensor(name).ok()
    }
}

/// Memory-mapped flat checkpoint container
///
/// Same validation and lookup semantics as [`FlatCheckpoint`] without
/// reading the payload into memory up front.
#[derive(Debug)]
pub struct MappedCheckpoint {
    tensors: HashMap<String, CheckpointTensorInfo>,
    mmap: Mmap,
    data_start: usize,
    path: PathBuf,
}

impl MappedCheckpoint {
    /// Open and map a checkpoint file, validating the full index
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be opened or mapped, otherwise as
    /// [`FlatCheckpoint::from_bytes`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        // SAFETY: the mapping is read-only and lives as long as `self`.
        // External truncation of the file during the pass is undefined
        // behavior, as with any mapped model file.
        let mmap = unsafe { Mmap::map(&file)? };
        let (tensors, data_start) = parse_index(&mmap)?;
        Ok(Self {
            tensors,
            mmap,
            data_start,
            path,
        })
    }

    /// Materialize a tensor by name
    ///
    /// # Errors
    ///
    /// Returns `MissingSourceTensor` if the name is absent.
    pub fn get_tensor(&self, name: &str) -> Result<ShapedTensor> {
        let info = self
            .tensors
            .get(name)
            .ok_or_else(|| TraducirError::MissingSourceTensor {
                name: name.to_string(),
            })?;
        Ok(decode_tensor(info, &self.mmap[self.data_start..]))
    }

    /// All tensor names, sorted for deterministic diagnostics
    #[must_use]
    pub fn tensor_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tensors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of tensors in the container
    #[must_use]
    pub fn tensor_count(&self) -> usize {
        self.tensors.len()
    }

    /// Path the checkpoint was mapped from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mapped file size in bytes
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.mmap.len()
    }
}

impl CheckpointStore for MappedCheckpoint {
    fn lookup(&self, name: &str) -> Option<ShapedTensor> {
        self.get_tensor(name).ok()
    }
}
