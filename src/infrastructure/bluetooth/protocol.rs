//! Field wire format
//!
//! Encoding and decoding of field values exchanged over the link.
//!
//! # Layout
//!
//! ```text
//! Vector field (12 bytes):
//! [0-3]   : X (f32 little-endian)
//! [4-7]   : Y (f32 little-endian)
//! [8-11]  : Z (f32 little-endian)
//!
//! Boolean field (1 byte):
//! [0]     : 0 = false, nonzero = true
//! ```
//!
//! Decoding is a plain reinterpretation of the bytes; numeric range is not
//! checked.

use crate::domain::models::{FieldValue, Vector3};
use crate::domain::registry::{FieldKind, BOOL_LEN, FLOAT_LEN, VECTOR_LEN};
use crate::error::DecodeError;

/// Encode a vector into its 12-byte layout
pub fn encode_vector(v: Vector3) -> [u8; VECTOR_LEN] {
    let mut bytes = [0u8; VECTOR_LEN];
    for (chunk, component) in bytes.chunks_exact_mut(FLOAT_LEN).zip([v.x, v.y, v.z]) {
        chunk.copy_from_slice(&component.to_le_bytes());
    }
    bytes
}

/// Decode a 12-byte vector
pub fn decode_vector(bytes: &[u8]) -> Result<Vector3, DecodeError> {
    check_len(bytes, VECTOR_LEN)?;
    let component = |i: usize| {
        let start = i * FLOAT_LEN;
        f32::from_le_bytes([
            bytes[start],
            bytes[start + 1],
            bytes[start + 2],
            bytes[start + 3],
        ])
    };
    Ok(Vector3::new(component(0), component(1), component(2)))
}

pub fn encode_bool(value: bool) -> [u8; BOOL_LEN] {
    [u8::from(value)]
}

pub fn decode_bool(bytes: &[u8]) -> Result<bool, DecodeError> {
    check_len(bytes, BOOL_LEN)?;
    Ok(bytes[0] != 0)
}

/// Encode a field value into its fixed-width layout
pub fn encode(value: &FieldValue) -> Vec<u8> {
    match value {
        FieldValue::Vector3(v) => encode_vector(*v).to_vec(),
        FieldValue::Bool(b) => encode_bool(*b).to_vec(),
    }
}

/// Decode bytes received for a field of the given kind
pub fn decode(kind: FieldKind, bytes: &[u8]) -> Result<FieldValue, DecodeError> {
    match kind {
        FieldKind::Vector3 => decode_vector(bytes).map(FieldValue::Vector3),
        FieldKind::Bool => decode_bool(bytes).map(FieldValue::Bool),
    }
}

fn check_len(bytes: &[u8], expected: usize) -> Result<(), DecodeError> {
    if bytes.len() != expected {
        return Err(DecodeError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}
