//! Reading progress metadata out of training checkpoints.
//!
//! Checkpoints are safetensors containers. The training loop stores `epoch` and
//! `loss` either as scalar tensors or as entries in the header's `__metadata__`
//! map; `timestamp` normally lives in `__metadata__`. Tensors are consulted first.

use crate::error::StatusError;
use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

pub const EPOCH_KEY: &str = "epoch";
pub const LOSS_KEY: &str = "loss";
pub const TIMESTAMP_KEY: &str = "timestamp";

const UNKNOWN_TIMESTAMP: &str = "unknown";

/// Progress metadata persisted alongside a checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointRecord {
    /// Last completed epoch, zero-based.
    pub epoch: u64,
    pub loss: f64,
    /// Opaque to this tool; shown as written.
    pub timestamp: String,
}

impl Default for CheckpointRecord {
    fn default() -> Self {
        Self {
            epoch: 0,
            loss: 0.0,
            timestamp: UNKNOWN_TIMESTAMP.to_string(),
        }
    }
}

/// A value pulled from either a tensor or a metadata string.
#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Int(i128),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if let Ok(i) = trimmed.parse::<i128>() {
            Scalar::Int(i)
        } else if let Ok(f) = trimmed.parse::<f64>() {
            Scalar::Float(f)
        } else {
            Scalar::Text(text.to_string())
        }
    }

    fn into_epoch(self, key: &str) -> Result<u64, StatusError> {
        match self {
            Scalar::Int(i) => u64::try_from(i)
                .map_err(|_| StatusError::invalid_value(key, format!("must be non-negative, got {i}"))),
            Scalar::Float(f) if !f.is_finite() => {
                Err(StatusError::invalid_value(key, format!("must be finite, got {f}")))
            }
            Scalar::Float(f) => {
                let truncated = f.trunc();
                if truncated < 0.0 || truncated > u64::MAX as f64 {
                    Err(StatusError::invalid_value(key, format!("out of range: {f}")))
                } else {
                    Ok(truncated as u64)
                }
            }
            Scalar::Text(t) => Err(StatusError::invalid_value(
                key,
                format!("expected an integer, got '{t}'"),
            )),
        }
    }

    fn into_loss(self, key: &str) -> Result<f64, StatusError> {
        match self {
            Scalar::Int(i) => Ok(i as f64),
            Scalar::Float(f) => Ok(f),
            Scalar::Text(t) => Err(StatusError::invalid_value(
                key,
                format!("expected a number, got '{t}'"),
            )),
        }
    }

    fn into_text(self) -> String {
        match self {
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(t) => t,
        }
    }
}

impl CheckpointRecord {
    /// Load the record from a checkpoint file on disk.
    ///
    /// The file is read into memory in one pass and never modified. A file
    /// rewritten mid-read yields a decode error, not a crash.
    pub fn load(path: &Path) -> Result<Self, StatusError> {
        let buffer = std::fs::read(path)?;
        debug!(path = %path.display(), bytes = buffer.len(), "Reading checkpoint");
        Self::from_bytes(&buffer)
    }

    /// Decode a record from an in-memory safetensors buffer.
    pub fn from_bytes(buffer: &[u8]) -> Result<Self, StatusError> {
        let tensors = SafeTensors::deserialize(buffer)?;
        let (_, header) = SafeTensors::read_metadata(buffer)?;
        let metadata = header.metadata().clone().unwrap_or_default();

        let mut record = Self::default();
        if let Some(value) = lookup(&tensors, &metadata, EPOCH_KEY)? {
            record.epoch = value.into_epoch(EPOCH_KEY)?;
        }
        if let Some(value) = lookup(&tensors, &metadata, LOSS_KEY)? {
            record.loss = value.into_loss(LOSS_KEY)?;
        }
        if let Some(value) = lookup(&tensors, &metadata, TIMESTAMP_KEY)? {
            record.timestamp = value.into_text();
        }
        Ok(record)
    }
}

fn lookup(
    tensors: &SafeTensors<'_>,
    metadata: &HashMap<String, String>,
    key: &str,
) -> Result<Option<Scalar>, StatusError> {
    if let Ok(view) = tensors.tensor(key) {
        return scalar_from_tensor(key, &view).map(Some);
    }
    Ok(metadata.get(key).map(String::as_str).map(Scalar::parse))
}

fn scalar_from_tensor(key: &str, view: &TensorView<'_>) -> Result<Scalar, StatusError> {
    let elements: usize = view.shape().iter().product();
    if elements != 1 {
        return Err(StatusError::NotScalar {
            key: key.to_string(),
            elements,
        });
    }

    let data = view.data();
    let value = match view.dtype() {
        Dtype::BOOL => Scalar::Int(i128::from(le_bytes::<1>(key, data)?[0] != 0)),
        Dtype::U8 => Scalar::Int(i128::from(le_bytes::<1>(key, data)?[0])),
        Dtype::I8 => Scalar::Int(i128::from(i8::from_le_bytes(le_bytes(key, data)?))),
        Dtype::U16 => Scalar::Int(i128::from(u16::from_le_bytes(le_bytes(key, data)?))),
        Dtype::I16 => Scalar::Int(i128::from(i16::from_le_bytes(le_bytes(key, data)?))),
        Dtype::U32 => Scalar::Int(i128::from(u32::from_le_bytes(le_bytes(key, data)?))),
        Dtype::I32 => Scalar::Int(i128::from(i32::from_le_bytes(le_bytes(key, data)?))),
        Dtype::U64 => Scalar::Int(i128::from(u64::from_le_bytes(le_bytes(key, data)?))),
        Dtype::I64 => Scalar::Int(i128::from(i64::from_le_bytes(le_bytes(key, data)?))),
        Dtype::F16 => Scalar::Float(f16_to_f64(u16::from_le_bytes(le_bytes(key, data)?))),
        Dtype::BF16 => {
            let bits = u16::from_le_bytes(le_bytes(key, data)?);
            Scalar::Float(f64::from(f32::from_bits(u32::from(bits) << 16)))
        }
        Dtype::F32 => Scalar::Float(f64::from(f32::from_le_bytes(le_bytes(key, data)?))),
        Dtype::F64 => Scalar::Float(f64::from_le_bytes(le_bytes(key, data)?)),
        other => {
            return Err(StatusError::UnsupportedDtype {
                key: key.to_string(),
                dtype: format!("{other:?}"),
            });
        }
    };
    Ok(value)
}

fn le_bytes<const N: usize>(key: &str, data: &[u8]) -> Result<[u8; N], StatusError> {
    data.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| {
            StatusError::invalid_value(key, format!("expected {N} bytes, found {}", data.len()))
        })
}

/// IEEE 754 half precision to double.
fn f16_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = i32::from((bits >> 10) & 0x1f);
    let fraction = f64::from(bits & 0x03ff);
    match exponent {
        0 => sign * fraction * 2f64.powi(-24),
        0x1f if fraction == 0.0 => sign * f64::INFINITY,
        0x1f => f64::NAN,
        _ => sign * (1.0 + fraction / 1024.0) * 2f64.powi(exponent - 15),
    }
}
