use chrono::{DateTime, Utc};

/// A ledger event attached to a committed transaction.
///
/// Events are facts: once the transaction that emitted them commits they are
/// never retracted. Names are part of the wire contract with subscribers.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "RewardEvent").
    fn event_name(&self) -> &'static str;

    /// Transaction time at which the event occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}
