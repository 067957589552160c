use tracing::debug;

use tokenledger_core::{LedgerError, LedgerResult, WorldState};
use tokenledger_events::{Event, LedgerEvent};

/// Attaches domain events to the current transaction.
///
/// The host delivers them to subscribers only if the transaction commits.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct EventEmitter;

impl EventEmitter {
    pub fn emit<S: WorldState>(&self, state: &mut S, event: &LedgerEvent) -> LedgerResult<()> {
        let name = event.event_name();
        let payload = event
            .to_payload()
            .map_err(|e| LedgerError::validation(format!("cannot encode {name}: {e}")))?;
        state.emit_event(name, payload)?;
        debug!(event = name, occurred_at = %event.occurred_at(), "event attached to transaction");
        Ok(())
    }
}
