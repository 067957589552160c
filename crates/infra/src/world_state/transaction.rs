use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, btree_map};
use std::iter::Peekable;
use std::ops::Bound;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use tokenledger_core::{CallerIdentity, StateError, StateScan, WorldState};

use super::in_memory::{Entries, Versioned};

pub(crate) type KeyRange<'k> = (Bound<&'k str>, Bound<&'k str>);

/// `[start, end)`, with an empty `end` meaning unbounded. `None` when the
/// range is empty by construction (`start > end`).
pub(crate) fn key_range<'k>(start: &'k str, end: &'k str) -> Option<KeyRange<'k>> {
    if end.is_empty() {
        return Some((Bound::Included(start), Bound::Unbounded));
    }
    if start > end {
        return None;
    }
    Some((Bound::Included(start), Bound::Excluded(end)))
}

/// One invocation's view of the world state.
///
/// Reads see the snapshot taken at `begin` overlaid with this transaction's
/// own writes. Every read that reaches the snapshot is recorded for commit-time
/// validation. Dropping the transaction discards it.
#[derive(Debug)]
pub struct Transaction {
    tx_id: Uuid,
    caller: CallerIdentity,
    timestamp: DateTime<Utc>,
    snapshot: Arc<Entries>,
    reads: RefCell<BTreeSet<String>>,
    ranges: RefCell<Vec<(String, String)>>,
    writes: BTreeMap<String, Vec<u8>>,
    events: Vec<(String, Vec<u8>)>,
    rejected_write_prefix: Option<String>,
}

pub(crate) struct TransactionParts {
    pub(crate) tx_id: Uuid,
    pub(crate) snapshot: Arc<Entries>,
    pub(crate) reads: BTreeSet<String>,
    pub(crate) ranges: Vec<(String, String)>,
    pub(crate) writes: BTreeMap<String, Vec<u8>>,
    pub(crate) events: Vec<(String, Vec<u8>)>,
}

impl Transaction {
    pub(crate) fn new(
        tx_id: Uuid,
        caller: CallerIdentity,
        timestamp: DateTime<Utc>,
        snapshot: Arc<Entries>,
        rejected_write_prefix: Option<String>,
    ) -> Self {
        debug!(%tx_id, caller_id = %caller.id, "transaction opened");
        Self {
            tx_id,
            caller,
            timestamp,
            snapshot,
            reads: RefCell::default(),
            ranges: RefCell::default(),
            writes: BTreeMap::new(),
            events: Vec::new(),
            rejected_write_prefix,
        }
    }

    pub fn tx_id(&self) -> Uuid {
        self.tx_id
    }

    pub(crate) fn into_parts(self) -> TransactionParts {
        TransactionParts {
            tx_id: self.tx_id,
            snapshot: self.snapshot,
            reads: self.reads.into_inner(),
            ranges: self.ranges.into_inner(),
            writes: self.writes,
            events: self.events,
        }
    }
}

impl WorldState for Transaction {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
        if let Some(staged) = self.writes.get(key) {
            return Ok(Some(staged.clone()));
        }
        self.reads.borrow_mut().insert(key.to_string());
        Ok(self.snapshot.get(key).map(|v| v.value.clone()))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StateError> {
        if let Some(prefix) = &self.rejected_write_prefix {
            if key.starts_with(prefix.as_str()) {
                return Err(StateError::backend(format!("write to '{key}' rejected")));
            }
        }
        self.writes.insert(key.to_string(), value);
        Ok(())
    }

    fn range_scan(&self, start: &str, end: &str) -> Result<StateScan<'_>, StateError> {
        self.ranges
            .borrow_mut()
            .push((start.to_string(), end.to_string()));
        let Some(bounds) = key_range(start, end) else {
            return Ok(Box::new(std::iter::empty()));
        };
        Ok(Box::new(Overlay {
            committed: self.snapshot.range::<str, _>(bounds).peekable(),
            staged: self.writes.range::<str, _>(bounds).peekable(),
        }))
    }

    fn caller_identity(&self) -> Result<CallerIdentity, StateError> {
        Ok(self.caller.clone())
    }

    fn tx_timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn emit_event(&mut self, name: &str, payload: Vec<u8>) -> Result<(), StateError> {
        self.events.push((name.to_string(), payload));
        Ok(())
    }
}

/// Key-ordered merge of snapshot entries and staged writes; staged wins.
struct Overlay<'a> {
    committed: Peekable<btree_map::Range<'a, String, Versioned>>,
    staged: Peekable<btree_map::Range<'a, String, Vec<u8>>>,
}

impl Iterator for Overlay<'_> {
    type Item = Result<(String, Vec<u8>), StateError>;

    fn next(&mut self) -> Option<Self::Item> {
        let order = match (self.committed.peek(), self.staged.peek()) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((ck, _)), Some((sk, _))) => ck.cmp(sk),
        };

        match order {
            Ordering::Less => self
                .committed
                .next()
                .map(|(k, v)| Ok((k.clone(), v.value.clone()))),
            Ordering::Equal | Ordering::Greater => {
                if order == Ordering::Equal {
                    self.committed.next();
                }
                self.staged.next().map(|(k, v)| Ok((k.clone(), v.clone())))
            }
        }
    }
}
