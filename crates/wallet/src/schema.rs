//! World-state key layout.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tokenledger_core::{EventHash, LedgerError, LedgerResult, OwnerId};

/// Key holding the organization id allowed to mint and reward.
pub const AUTHORIZED_ISSUER_KEY: &str = "AUTHORIZED_SERVER_MSPID";
pub const WALLET_PREFIX: &str = "wallet_";
pub const COMMIT_PREFIX: &str = "commit_";

/// How account records are keyed.
///
/// Both layouts store the same JSON `Account`; only the key differs.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySchema {
    /// `wallet_<ownerID>`.
    #[default]
    Prefixed,
    /// Bare `<ownerID>` (e.g. a GitHub login), sharing the keyspace with the
    /// reserved commit and issuer keys.
    Plain,
}

impl KeySchema {
    pub fn account_key(self, owner: &OwnerId) -> LedgerResult<String> {
        match self {
            KeySchema::Prefixed => Ok(format!("{WALLET_PREFIX}{owner}")),
            KeySchema::Plain => {
                if is_reserved(owner.as_str()) {
                    return Err(LedgerError::validation(format!(
                        "owner id '{owner}' collides with a reserved key"
                    )));
                }
                Ok(owner.as_str().to_string())
            }
        }
    }

    /// Half-open key range holding every account. An empty end is unbounded.
    pub fn account_range(self) -> (&'static str, &'static str) {
        match self {
            // '`' is the code point right after '_'.
            KeySchema::Prefixed => (WALLET_PREFIX, "wallet`"),
            KeySchema::Plain => ("", ""),
        }
    }

    /// Owner id encoded in `key`, or `None` if the key is not an account key.
    pub fn owner_from_key(self, key: &str) -> Option<&str> {
        match self {
            KeySchema::Prefixed => key.strip_prefix(WALLET_PREFIX),
            KeySchema::Plain if is_reserved(key) => None,
            KeySchema::Plain => Some(key),
        }
    }
}

impl FromStr for KeySchema {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefixed" | "wallet" => Ok(KeySchema::Prefixed),
            "plain" | "github" => Ok(KeySchema::Plain),
            other => Err(LedgerError::validation(format!(
                "unknown key schema '{other}' (expected 'prefixed' or 'plain')"
            ))),
        }
    }
}

pub fn commit_key(hash: &EventHash) -> String {
    format!("{COMMIT_PREFIX}{hash}")
}

fn is_reserved(key: &str) -> bool {
    key == AUTHORIZED_ISSUER_KEY || key.starts_with(COMMIT_PREFIX) || key.starts_with(WALLET_PREFIX)
}

/// Contract-wide settings.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractConfig {
    pub key_schema: KeySchema,
}

impl ContractConfig {
    pub fn with_key_schema(key_schema: KeySchema) -> Self {
        Self { key_schema }
    }
}
