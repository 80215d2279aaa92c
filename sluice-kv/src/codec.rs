//! MessagePack encoding of field values for stores which only hold bytes.
use sluice_core::Value;

use crate::StoreError;

/// Encode a value for storage
pub fn encode(value: &Value) -> Result<Vec<u8>, StoreError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Decode a value previously written with [`encode`]
pub fn decode(bytes: &[u8]) -> Result<Value, StoreError> {
    Ok(rmp_serde::from_slice(bytes)?)
}
