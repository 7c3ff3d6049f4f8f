//! Binary vector codec.
//!
//! RediSearch takes vectors as raw little-endian IEEE-754 arrays: 4 bytes per
//! element for `FLOAT32`, 8 bytes for `FLOAT64`, no length prefix and no
//! padding. The same encoding is used for the `$vector` query parameter and
//! for vectors stored in hash fields.
//!
//! Encoding never validates dimensions; that is the caller's job.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::VectorDataType;

/// Encode an f32 slice as little-endian bytes.
pub fn encode_f32(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Encode an f64 slice as little-endian bytes.
pub fn encode_f64(vector: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 8);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode little-endian bytes into f32 values.
///
/// # Errors
///
/// Returns [`Error::InvalidData`] if the length is not a multiple of 4.
pub fn decode_f32(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::invalid_data(format!(
            "FLOAT32 vector payload of {} bytes is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Decode little-endian bytes into f64 values.
///
/// # Errors
///
/// Returns [`Error::InvalidData`] if the length is not a multiple of 8.
pub fn decode_f64(bytes: &[u8]) -> Result<Vec<f64>> {
    if bytes.len() % 8 != 0 {
        return Err(Error::invalid_data(format!(
            "FLOAT64 vector payload of {} bytes is not a multiple of 8",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        })
        .collect())
}

/// A vector in one of the two element types the engine stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VectorData {
    /// 32-bit elements.
    F32(Vec<f32>),
    /// 64-bit elements.
    F64(Vec<f64>),
}

impl VectorData {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    /// Whether the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element datatype.
    pub fn datatype(&self) -> VectorDataType {
        match self {
            Self::F32(_) => VectorDataType::Float32,
            Self::F64(_) => VectorDataType::Float64,
        }
    }

    /// Convert to `datatype`, widening or narrowing each element.
    pub fn into_datatype(self, datatype: VectorDataType) -> Self {
        match (self, datatype) {
            (Self::F32(v), VectorDataType::Float64) => {
                Self::F64(v.into_iter().map(f64::from).collect())
            }
            (Self::F64(v), VectorDataType::Float32) => {
                Self::F32(v.into_iter().map(|x| x as f32).collect())
            }
            (same, _) => same,
        }
    }

    /// Encode to the wire representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::F32(v) => encode_f32(v),
            Self::F64(v) => encode_f64(v),
        }
    }

    /// Decode a payload of the given datatype.
    pub fn from_bytes(bytes: &[u8], datatype: VectorDataType) -> Result<Self> {
        match datatype {
            VectorDataType::Float32 => decode_f32(bytes).map(Self::F32),
            VectorDataType::Float64 => decode_f64(bytes).map(Self::F64),
        }
    }
}

impl From<Vec<f32>> for VectorData {
    fn from(v: Vec<f32>) -> Self {
        Self::F32(v)
    }
}

impl From<Vec<f64>> for VectorData {
    fn from(v: Vec<f64>) -> Self {
        Self::F64(v)
    }
}

// ============================================================================
// Tests
// ============================================================================
