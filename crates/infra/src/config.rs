//! Host configuration from the environment.

use tracing::warn;

use tokenledger_core::{LedgerError, LedgerResult, OrgId, OwnerId};
use tokenledger_wallet::{ContractConfig, KeySchema, SeedAccount};

pub const KEY_SCHEMA_VAR: &str = "TOKENLEDGER_KEY_SCHEMA";
pub const ISSUER_VAR: &str = "TOKENLEDGER_ISSUER_MSPID";
pub const SEED_ACCOUNTS_VAR: &str = "TOKENLEDGER_SEED_ACCOUNTS";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostConfig {
    pub key_schema: KeySchema,
    /// Issuer installed through `InitLedger` when the ledger is empty.
    pub issuer_org: Option<String>,
    pub seed_accounts: Vec<SeedAccount>,
}

impl HostConfig {
    pub fn from_env() -> LedgerResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Unset or blank values fall back to
    /// defaults; present but malformed values are validation errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LedgerResult<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let key_schema = match get(KEY_SCHEMA_VAR) {
            Some(raw) => raw.parse()?,
            None => {
                warn!("{KEY_SCHEMA_VAR} not set; using prefixed wallet_<id> keys");
                KeySchema::default()
            }
        };

        let issuer_org = match get(ISSUER_VAR) {
            Some(raw) => Some(OrgId::new(raw.trim())?.into_inner()),
            None => {
                warn!("{ISSUER_VAR} not set; ledger stays uninitialized until InitLedger");
                None
            }
        };

        let seed_accounts = match get(SEED_ACCOUNTS_VAR) {
            Some(raw) => parse_seed_accounts(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            key_schema,
            issuer_org,
            seed_accounts,
        })
    }

    pub fn contract_config(&self) -> ContractConfig {
        ContractConfig::with_key_schema(self.key_schema)
    }
}

/// `owner=balance,owner=balance`.
fn parse_seed_accounts(raw: &str) -> LedgerResult<Vec<SeedAccount>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (owner, balance) = entry.split_once('=').ok_or_else(|| {
                LedgerError::validation(format!(
                    "{SEED_ACCOUNTS_VAR}: expected owner=balance, got '{entry}'"
                ))
            })?;
            let owner = OwnerId::new(owner.trim())?;
            let balance = balance.trim().parse::<i64>().map_err(|_| {
                LedgerError::validation(format!(
                    "{SEED_ACCOUNTS_VAR}: balance for '{owner}' is not an integer"
                ))
            })?;
            Ok(SeedAccount::new(owner.into_inner(), balance))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokenledger_core::ErrorKind;

    fn config(vars: &[(&str, &str)]) -> LedgerResult<HostConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HostConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]).unwrap(), HostConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let cfg = config(&[
            (KEY_SCHEMA_VAR, "plain"),
            (ISSUER_VAR, "ServerMSP"),
            (SEED_ACCOUNTS_VAR, "alice=100, bob=0"),
        ])
        .unwrap();

        assert_eq!(cfg.key_schema, KeySchema::Plain);
        assert_eq!(cfg.issuer_org.as_deref(), Some("ServerMSP"));
        assert_eq!(
            cfg.seed_accounts,
            vec![SeedAccount::new("alice", 100), SeedAccount::new("bob", 0)]
        );
        assert_eq!(cfg.contract_config().key_schema, KeySchema::Plain);
    }

    #[test]
    fn malformed_values_are_validation_errors() {
        for vars in [
            [(KEY_SCHEMA_VAR, "sharded")],
            [(SEED_ACCOUNTS_VAR, "alice")],
            [(SEED_ACCOUNTS_VAR, "alice=lots")],
            [(SEED_ACCOUNTS_VAR, "=5")],
        ] {
            let err = config(&vars).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{vars:?}");
        }
    }
}
