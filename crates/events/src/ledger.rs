//! Domain events published by the token ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tokenledger_core::{Amount, EventHash, LedgerError, LedgerResult, OrgId, OwnerId};

use crate::Event;

pub const ACCOUNT_CREATED: &str = "AccountCreatedEvent";
pub const MINTED: &str = "MintEvent";
pub const TRANSFERRED: &str = "TransferEvent";
pub const BURNED: &str = "BurnEvent";
pub const COMMIT_REWARDED: &str = "RewardEvent";
pub const ISSUER_CHANGED: &str = "IssuerChangedEvent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AccountCreated {
    #[serde(rename = "ownerID")]
    pub owner_id: OwnerId,
    pub balance: Amount,
    #[serde(rename = "timestamp")]
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Minted {
    #[serde(rename = "ownerID")]
    pub owner_id: OwnerId,
    pub amount: Amount,
    /// Balance after the mint.
    pub balance: Amount,
    /// True when the mint opened the account.
    pub created: bool,
    #[serde(rename = "timestamp")]
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Transferred {
    pub from: OwnerId,
    pub to: OwnerId,
    pub amount: Amount,
    #[serde(rename = "timestamp")]
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Burned {
    pub owner: OwnerId,
    pub amount: Amount,
    pub balance: Amount,
    #[serde(rename = "timestamp")]
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommitRewarded {
    pub owner: OwnerId,
    pub amount: Amount,
    pub external_event_hash: EventHash,
    #[serde(rename = "timestamp")]
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IssuerChanged {
    pub previous: Option<OrgId>,
    pub current: OrgId,
    #[serde(rename = "timestamp")]
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    AccountCreated(AccountCreated),
    Minted(Minted),
    Transferred(Transferred),
    Burned(Burned),
    CommitRewarded(CommitRewarded),
    IssuerChanged(IssuerChanged),
}

impl Event for LedgerEvent {
    fn event_name(&self) -> &'static str {
        match self {
            LedgerEvent::AccountCreated(_) => ACCOUNT_CREATED,
            LedgerEvent::Minted(_) => MINTED,
            LedgerEvent::Transferred(_) => TRANSFERRED,
            LedgerEvent::Burned(_) => BURNED,
            LedgerEvent::CommitRewarded(_) => COMMIT_REWARDED,
            LedgerEvent::IssuerChanged(_) => ISSUER_CHANGED,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::AccountCreated(e) => e.occurred_at,
            LedgerEvent::Minted(e) => e.occurred_at,
            LedgerEvent::Transferred(e) => e.occurred_at,
            LedgerEvent::Burned(e) => e.occurred_at,
            LedgerEvent::CommitRewarded(e) => e.occurred_at,
            LedgerEvent::IssuerChanged(e) => e.occurred_at,
        }
    }
}

impl LedgerEvent {
    /// JSON payload as attached to the transaction (no enum tag; the event
    /// name travels separately).
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            LedgerEvent::AccountCreated(e) => serde_json::to_vec(e),
            LedgerEvent::Minted(e) => serde_json::to_vec(e),
            LedgerEvent::Transferred(e) => serde_json::to_vec(e),
            LedgerEvent::Burned(e) => serde_json::to_vec(e),
            LedgerEvent::CommitRewarded(e) => serde_json::to_vec(e),
            LedgerEvent::IssuerChanged(e) => serde_json::to_vec(e),
        }
    }

    /// Decode a payload received under `name`.
    pub fn from_payload(name: &str, payload: &[u8]) -> LedgerResult<Self> {
        fn decode<T: serde::de::DeserializeOwned>(name: &str, payload: &[u8]) -> LedgerResult<T> {
            serde_json::from_slice(payload)
                .map_err(|e| LedgerError::validation(format!("malformed {name} payload: {e}")))
        }

        Ok(match name {
            ACCOUNT_CREATED => LedgerEvent::AccountCreated(decode(name, payload)?),
            MINTED => LedgerEvent::Minted(decode(name, payload)?),
            TRANSFERRED => LedgerEvent::Transferred(decode(name, payload)?),
            BURNED => LedgerEvent::Burned(decode(name, payload)?),
            COMMIT_REWARDED => LedgerEvent::CommitRewarded(decode(name, payload)?),
            ISSUER_CHANGED => LedgerEvent::IssuerChanged(decode(name, payload)?),
            other => {
                return Err(LedgerError::validation(format!("unknown event name '{other}'")));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn reward_payload_uses_external_event_hash_field() {
        let ev = LedgerEvent::CommitRewarded(CommitRewarded {
            owner: OwnerId::new("alice").unwrap(),
            amount: Amount::new(10),
            external_event_hash: EventHash::new("sha1").unwrap(),
            occurred_at: ts(),
        });
        assert_eq!(ev.event_name(), "RewardEvent");

        let json: serde_json::Value = serde_json::from_slice(&ev.to_payload().unwrap()).unwrap();
        assert_eq!(json["owner"], "alice");
        assert_eq!(json["amount"], 10);
        assert_eq!(json["externalEventHash"], "sha1");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn payload_decodes_back_under_its_name() {
        let ev = LedgerEvent::Transferred(Transferred {
            from: OwnerId::new("alice").unwrap(),
            to: OwnerId::new("bob").unwrap(),
            amount: Amount::new(40),
            occurred_at: ts(),
        });
        let bytes = ev.to_payload().unwrap();
        assert_eq!(LedgerEvent::from_payload(TRANSFERRED, &bytes).unwrap(), ev);
    }

    #[test]
    fn unknown_names_and_extra_fields_are_rejected() {
        assert!(matches!(
            LedgerEvent::from_payload("PingEvent", b"{}"),
            Err(LedgerError::Validation(_))
        ));

        let bogus = br#"{"owner":"a","amount":1,"balance":0,"timestamp":"2024-05-01T12:00:00Z","extra":1}"#;
        assert!(LedgerEvent::from_payload(BURNED, bogus).is_err());
    }
}
