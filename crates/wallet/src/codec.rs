//! Strict JSON encoding of stored records.

use serde::Serialize;
use serde::de::DeserializeOwned;

use tokenledger_core::{LedgerError, LedgerResult};

pub(crate) fn encode<T: Serialize>(key: &str, value: &T) -> LedgerResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| LedgerError::validation(format!("cannot encode record for '{key}': {e}")))
}

/// Decode a stored record. Malformed or unknown payloads are validation
/// failures; fields are never defaulted.
pub(crate) fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> LedgerResult<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| LedgerError::validation(format!("malformed record at '{key}': {e}")))
}
