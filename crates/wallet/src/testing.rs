//! Minimal world-state double for unit tests.
//!
//! Writes land immediately unless `hide_own_writes` is set, in which case
//! they are staged and reads keep seeing the state as of the start of the
//! invocation, as on a Fabric peer. Host-level atomicity is covered by the
//! infra integration tests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use tokenledger_core::{CallerIdentity, StateError, StateScan, WorldState};

pub const ISSUER_ORG: &str = "ServerMSP";

#[derive(Debug)]
pub struct MemoryState {
    pub entries: BTreeMap<String, Vec<u8>>,
    pub events: Vec<(String, Vec<u8>)>,
    pub caller: CallerIdentity,
    pub timestamp: DateTime<Utc>,
    pub fail_writes: bool,
    pub hide_own_writes: bool,
    pub staged: BTreeMap<String, Vec<u8>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            events: Vec::new(),
            caller: CallerIdentity::new("server", ISSUER_ORG),
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            fail_writes: false,
            hide_own_writes: false,
            staged: BTreeMap::new(),
        }
    }

    pub fn with_issuer(org: &str) -> Self {
        let mut state = Self::new();
        state
            .entries
            .insert(crate::schema::AUTHORIZED_ISSUER_KEY.to_string(), org.as_bytes().to_vec());
        state
    }

    pub fn acting_as(&mut self, id: &str, org: &str) -> &mut Self {
        self.caller = CallerIdentity::new(id, org);
        self
    }

    /// Apply staged writes, as a host commit would.
    pub fn commit_staged(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        self.entries.extend(staged);
    }

    pub fn event_names(&self) -> Vec<&str> {
        self.events.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl WorldState for MemoryState {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), StateError> {
        if self.fail_writes {
            return Err(StateError::backend(format!("write to '{key}' rejected")));
        }
        if self.hide_own_writes {
            self.staged.insert(key.to_string(), value);
        } else {
            self.entries.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn range_scan(&self, start: &str, end: &str) -> Result<StateScan<'_>, StateError> {
        let start = start.to_string();
        let end = end.to_string();
        Ok(Box::new(
            self.entries
                .iter()
                .filter(move |(k, _)| k.as_str() >= start.as_str() && (end.is_empty() || k.as_str() < end.as_str()))
                .map(|(k, v)| Ok((k.clone(), v.clone()))),
        ))
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
