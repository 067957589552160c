use serde::de::DeserializeOwned;
use uuid::Uuid;

/// An event as delivered to subscribers after its transaction committed.
///
/// - `tx_id` identifies the committing transaction.
/// - `commit_sequence` is the host's monotonically increasing commit counter.
/// - `index` orders events within one transaction.
/// - `payload` is the JSON emitted by the contract, untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    tx_id: Uuid,
    commit_sequence: u64,
    index: u32,
    name: String,
    payload: Vec<u8>,
}

impl EventEnvelope {
    pub fn new(
        tx_id: Uuid,
        commit_sequence: u64,
        index: u32,
        name: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            tx_id,
            commit_sequence,
            index,
            name: name.into(),
            payload,
        }
    }

    pub fn tx_id(&self) -> Uuid {
        self.tx_id
    }

    pub fn commit_sequence(&self) -> u64 {
        self.commit_sequence
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Parse the payload as untyped JSON.
    pub fn payload_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.payload)
    }

    /// Decode the payload into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.payload)
    }
}
