//! World-state collaborator boundary.
//!
//! The ledger never owns storage. Each invocation runs against a host-provided
//! view of a versioned key-value store, reached only through [`WorldState`].

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::id::CallerIdentity;

/// Failure reported by the world-state collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Read, write or scan failed in the backing store.
    #[error("storage failure: {0}")]
    Backend(String),

    /// The host could not resolve the caller identity.
    #[error("identity lookup failed: {0}")]
    Identity(String),

    /// The host refused to attach an event to the transaction.
    #[error("event emission failed: {0}")]
    Event(String),
}

impl StateError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn identity(msg: impl Into<String>) -> Self {
        Self::Identity(msg.into())
    }
}

/// Lazily produced `(key, value)` pairs from a range scan, in key order.
pub type StateScan<'a> = Box<dyn Iterator<Item = Result<(String, Vec<u8>), StateError>> + 'a>;

/// Capabilities the host grants to a single invocation.
///
/// All calls are synchronous and fallible. Atomicity, read-set validation and
/// retry-on-conflict belong to the host's commit protocol: writes made through
/// `put_state` become visible to other invocations only if the host commits.
///
/// Whether an invocation sees its own staged writes is host-defined. A Fabric
/// peer does not; the in-memory simulator does. Contract code must not depend
/// on either.
pub trait WorldState {
    /// Read a key. `Ok(None)` when the key is absent.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StateError>;

    /// Stage a write in the invocation's write-set.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StateError>;

    /// Scan keys in `[start, end)` in key order. An empty `end` means unbounded.
    fn range_scan(&self, start: &str, end: &str) -> Result<StateScan<'_>, StateError>;

    /// Identity of the invoking client.
    fn caller_identity(&self) -> Result<CallerIdentity, StateError>;

    /// Timestamp fixed by the proposer of the transaction. Identical on every
    /// replay, unlike the local clock.
    fn tx_timestamp(&self) -> DateTime<Utc>;

    /// Attach an event to the transaction's event stream.
    fn emit_event(&mut self, name: &str, payload: Vec<u8>) -> Result<(), StateError>;
}

impl<S> WorldState for &mut S
where
    S: WorldState + ?Sized,
{
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
        (**self).get_state(key)
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StateError> {
        (**self).put_state(key, value)
    }

    fn range_scan(&self, start: &str, end: &str) -> Result<StateScan<'_>, StateError> {
        (**self).range_scan(start, end)
    }

    fn caller_identity(&self) -> Result<CallerIdentity, StateError> {
        (**self).caller_identity()
    }

    fn tx_timestamp(&self) -> DateTime<Utc> {
        (**self).tx_timestamp()
    }

    fn emit_event(&mut self, name: &str, payload: Vec<u8>) -> Result<(), StateError> {
        (**self).emit_event(name, payload)
    }
}
