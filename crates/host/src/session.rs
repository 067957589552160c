use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::debug;

use tokenledger_events::{EventEnvelope, InMemoryEventBus};
use tokenledger_infra::command_dispatcher::{DispatchError, InvocationDispatcher};
use tokenledger_infra::config::HostConfig;
use tokenledger_infra::world_state::InMemoryWorldState;
use tokenledger_wallet::TokenContract;

use crate::dto::{InvocationRequest, InvocationResponseDto};
use crate::errors;

pub type SharedBus = Arc<InMemoryEventBus<EventEnvelope>>;

/// One host process: a world state, the contract and the committed-event bus.
#[derive(Debug)]
pub struct Session {
    dispatcher: InvocationDispatcher<SharedBus>,
}

impl Session {
    pub fn new(config: &HostConfig) -> Result<Self, DispatchError> {
        let dispatcher = InvocationDispatcher::new(
            InMemoryWorldState::new(),
            TokenContract::new(config.contract_config()),
            Arc::new(InMemoryEventBus::new()),
        );
        dispatcher.bootstrap(config)?;
        Ok(Self { dispatcher })
    }

    pub fn bus(&self) -> SharedBus {
        self.dispatcher.bus().clone()
    }

    /// Handle one request line. Always yields a JSON response.
    pub fn handle_line(&self, line: &str) -> JsonValue {
        let request: InvocationRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => return errors::json_error("bad_request", format!("malformed request: {e}")),
        };
        let invocation = match request.invocation() {
            Ok(invocation) => invocation,
            Err(e) => return errors::ledger_error_to_json(&e),
        };
        debug!(function = %invocation.function, caller_id = %request.caller.id, "invocation received");

        let timestamp = request.timestamp.unwrap_or_else(Utc::now);
        match self
            .dispatcher
            .invoke_at(request.caller, &invocation, timestamp)
        {
            Ok(response) => serde_json::to_value(InvocationResponseDto::from(response))
                .unwrap_or_else(|e| errors::json_error("encode_error", e.to_string())),
            Err(e) => errors::dispatch_error_to_json(&e),
        }
    }
}
