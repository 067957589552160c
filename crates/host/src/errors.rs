use serde_json::{Value as JsonValue, json};

use tokenledger_core::LedgerError;
use tokenledger_infra::command_dispatcher::DispatchError;

pub fn dispatch_error_to_json(err: &DispatchError) -> JsonValue {
    json_error(err.code(), err.to_string())
}

pub fn ledger_error_to_json(err: &LedgerError) -> JsonValue {
    json_error(err.kind().as_str(), err.to_string())
}

pub fn json_error(code: &str, message: impl Into<String>) -> JsonValue {
    json!({
        "error": code,
        "message": message.into(),
    })
}
