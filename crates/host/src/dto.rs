use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use tokenledger_core::{CallerIdentity, LedgerError, LedgerResult};
use tokenledger_events::EventEnvelope;
use tokenledger_infra::command::Invocation;
use tokenledger_infra::command_dispatcher::InvocationResponse;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InvocationRequest {
    pub caller: CallerIdentity,
    pub function: String,
    /// Strings or integers; integers are passed on in decimal form.
    #[serde(default)]
    pub args: Vec<JsonValue>,
    /// Proposal timestamp. The host clock is used when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl InvocationRequest {
    pub fn invocation(&self) -> LedgerResult<Invocation> {
        let args = self
            .args
            .iter()
            .enumerate()
            .map(|(i, arg)| match arg {
                JsonValue::String(s) => Ok(s.clone()),
                JsonValue::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
                other => Err(LedgerError::validation(format!(
                    "argument {} must be a string or an integer, got {other}",
                    i + 1
                ))),
            })
            .collect::<LedgerResult<Vec<String>>>()?;
        Ok(Invocation::new(self.function.clone(), args))
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    pub name: String,
    pub index: u32,
    pub payload: JsonValue,
}

impl From<&EventEnvelope> for EventDto {
    fn from(env: &EventEnvelope) -> Self {
        Self {
            name: env.name().to_string(),
            index: env.index(),
            payload: env.payload_json().unwrap_or(JsonValue::Null),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponseDto {
    pub tx_id: String,
    pub function: &'static str,
    pub committed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sequence: Option<u64>,
    pub result: JsonValue,
    pub events: Vec<EventDto>,
}

impl From<InvocationResponse> for InvocationResponseDto {
    fn from(r: InvocationResponse) -> Self {
        Self {
            tx_id: r.tx_id.to_string(),
            function: r.function,
            committed: r.committed(),
            commit_sequence: r.commit_sequence,
            events: r.events.iter().map(EventDto::from).collect(),
            result: r.result,
        }
    }
}
