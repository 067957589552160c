//! In-memory versioned world state with optimistic commit.
//!
//! ## Model
//!
//! Committed state is a sorted map from key to `(value, version)`. Every
//! invocation runs inside a [`Transaction`] that holds a snapshot of that map
//! taken at `begin`, so reads never block writers and never observe another
//! invocation's staged writes.
//!
//! ## Commit Protocol
//!
//! ```text
//! Transaction (snapshot, read-set, range-set, write-set, events)
//!   ↓
//! 1. Re-check every point read against the current version
//!   ↓
//! 2. Re-scan every range read and compare (key, version) sequences
//!   ↓
//! 3. Apply the write-set, bumping each key's version
//!   ↓
//! 4. Advance the commit sequence and wrap events in envelopes
//! ```
//!
//! Steps 1 and 2 run under the write lock together with 3 and 4, so a
//! transaction validates against exactly the state it is applied to. A failed
//! check rejects the whole transaction with [`CommitError`]; a caller retries
//! by re-running the invocation from scratch.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use tokenledger_core::{CallerIdentity, ExpectedVersion, StateError};
use tokenledger_events::EventEnvelope;

use super::transaction::{Transaction, key_range};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Versioned {
    pub(crate) value: Vec<u8>,
    /// Starts at 1 on first write. Absent keys are version 0.
    pub(crate) version: u64,
}

pub(crate) type Entries = BTreeMap<String, Versioned>;

#[derive(Debug, Default)]
struct Committed {
    entries: Arc<Entries>,
    sequence: u64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitError {
    /// A key read by the transaction was changed by a later commit.
    #[error("read conflict on '{key}': read version {read}, committed version {current}")]
    ReadConflict { key: String, read: u64, current: u64 },

    /// A range scanned by the transaction gained, lost or changed keys.
    #[error("phantom read in range ['{start}', '{end}')")]
    PhantomRead { start: String, end: String },

    #[error("world state lock poisoned")]
    Poisoned,
}

/// What a successful commit produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub tx_id: Uuid,
    pub commit_sequence: u64,
    pub writes: usize,
    pub events: Vec<EventEnvelope>,
}

/// In-memory versioned key-value store with optimistic transactions.
///
/// Intended for tests and the local host. Transactions simulate against the
/// snapshot taken at `begin`; `commit` re-validates the read-set against the
/// latest committed state and applies the write-set all at once.
#[derive(Debug, Default)]
pub struct InMemoryWorldState {
    committed: RwLock<Committed>,
    rejected_write_prefix: Option<String>,
}

impl InMemoryWorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every transaction fail writes to keys starting with `prefix`,
    /// as a failing backend would.
    pub fn reject_writes_with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.rejected_write_prefix = Some(prefix.into());
        self
    }

    pub fn begin(
        &self,
        caller: CallerIdentity,
        timestamp: DateTime<Utc>,
    ) -> Result<Transaction, StateError> {
        let snapshot = self
            .committed
            .read()
            .map_err(|_| StateError::backend("world state lock poisoned"))?
            .entries
            .clone();
        Ok(Transaction::new(
            Uuid::now_v7(),
            caller,
            timestamp,
            snapshot,
            self.rejected_write_prefix.clone(),
        ))
    }

    /// Validate and apply a transaction. Nothing is applied on error.
    pub fn commit(&self, tx: Transaction) -> Result<CommitReceipt, CommitError> {
        let mut committed = self.committed.write().map_err(|_| CommitError::Poisoned)?;
        let parts = tx.into_parts();

        for key in &parts.reads {
            let read = version_of(&parts.snapshot, key);
            let current = version_of(&committed.entries, key);
            if !ExpectedVersion::at(read).matches(current) {
                debug!(tx_id = %parts.tx_id, %key, read, current, "read conflict");
                return Err(CommitError::ReadConflict {
                    key: key.clone(),
                    read,
                    current,
                });
            }
        }

        for (start, end) in &parts.ranges {
            let bounds = key_range(start, end);
            let unchanged = match bounds {
                Some(bounds) => parts
                    .snapshot
                    .range::<str, _>(bounds)
                    .map(|(k, v)| (k, v.version))
                    .eq(committed
                        .entries
                        .range::<str, _>(bounds)
                        .map(|(k, v)| (k, v.version))),
                None => true,
            };
            if !unchanged {
                debug!(tx_id = %parts.tx_id, %start, %end, "phantom read");
                return Err(CommitError::PhantomRead {
                    start: start.clone(),
                    end: end.clone(),
                });
            }
        }

        let writes = parts.writes.len();
        if writes > 0 {
            let entries = Arc::make_mut(&mut committed.entries);
            for (key, value) in parts.writes {
                let version = entries.get(&key).map_or(0, |v| v.version) + 1;
                entries.insert(key, Versioned { value, version });
            }
        }
        committed.sequence += 1;
        let commit_sequence = committed.sequence;

        let events = parts
            .events
            .into_iter()
            .enumerate()
            .map(|(index, (name, payload))| {
                EventEnvelope::new(parts.tx_id, commit_sequence, index as u32, name, payload)
            })
            .collect();

        Ok(CommitReceipt {
            tx_id: parts.tx_id,
            commit_sequence,
            writes,
            events,
        })
    }

    /// Latest committed value of `key`.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
        let committed = self
            .committed
            .read()
            .map_err(|_| StateError::backend("world state lock poisoned"))?;
        Ok(committed.entries.get(key).map(|v| v.value.clone()))
    }

    /// Latest committed version of `key`; 0 when absent.
    pub fn version(&self, key: &str) -> Result<u64, StateError> {
        let committed = self
            .committed
            .read()
            .map_err(|_| StateError::backend("world state lock poisoned"))?;
        Ok(version_of(&committed.entries, key))
    }

    /// Number of successful commits so far.
    pub fn commit_sequence(&self) -> Result<u64, StateError> {
        let committed = self
            .committed
            .read()
            .map_err(|_| StateError::backend("world state lock poisoned"))?;
        Ok(committed.sequence)
    }
}

fn version_of(entries: &Entries, key: &str) -> u64 {
    entries.get(key).map_or(0, |v| v.version)
}
