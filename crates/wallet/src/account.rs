//! Account records and their CRUD over world state.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tokenledger_core::{
    Amount, LedgerError, LedgerResult, OwnerId, StateScan, WorldState,
};

use crate::codec;
use crate::schema::KeySchema;

/// A token account.
///
/// `balance` is an [`Amount`], so it cannot be negative once decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Account {
    #[serde(rename = "ownerID")]
    pub owner_id: OwnerId,
    pub balance: Amount,
}

impl Account {
    pub fn new(owner_id: OwnerId, balance: Amount) -> Self {
        Self { owner_id, balance }
    }
}

/// CRUD over account records, parameterized by key layout.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct AccountLedger {
    schema: KeySchema,
}

impl AccountLedger {
    pub fn new(schema: KeySchema) -> Self {
        Self { schema }
    }

    /// Open a new account. Fails with a conflict if one already exists.
    pub fn create<S: WorldState>(
        &self,
        state: &mut S,
        owner: &OwnerId,
        initial_balance: Amount,
    ) -> LedgerResult<Account> {
        let key = self.schema.account_key(owner)?;
        if state.get_state(&key)?.is_some() {
            return Err(LedgerError::conflict(format!(
                "account already exists for '{owner}'"
            )));
        }

        let account = Account::new(owner.clone(), initial_balance);
        state.put_state(&key, codec::encode(&key, &account)?)?;
        Ok(account)
    }

    pub fn get<S: WorldState>(&self, state: &S, owner: &OwnerId) -> LedgerResult<Account> {
        self.find(state, owner)?
            .ok_or_else(|| LedgerError::not_found(format!("account '{owner}'")))
    }

    pub fn find<S: WorldState>(&self, state: &S, owner: &OwnerId) -> LedgerResult<Option<Account>> {
        let key = self.schema.account_key(owner)?;
        let Some(bytes) = state.get_state(&key)? else {
            debug!(%owner, "account not found");
            return Ok(None);
        };
        decode_account(&key, owner.as_str(), &bytes).map(Some)
    }

    /// Every account in the store's key order.
    ///
    /// Records are decoded lazily as the iterator advances; calling `list`
    /// again starts a fresh scan.
    pub fn list<'s, S: WorldState>(&self, state: &'s S) -> LedgerResult<Accounts<'s>> {
        let (start, end) = self.schema.account_range();
        Ok(Accounts {
            scan: state.range_scan(start, end)?,
            schema: self.schema,
        })
    }

    /// Overwrite a balance. Not authorized on its own: callers validate the
    /// new value, and derive it from a read made in the same invocation.
    pub(crate) fn set_balance<S: WorldState>(
        &self,
        state: &mut S,
        owner: &OwnerId,
        new_balance: Amount,
    ) -> LedgerResult<Account> {
        let key = self.schema.account_key(owner)?;
        let account = Account::new(owner.clone(), new_balance);
        state.put_state(&key, codec::encode(&key, &account)?)?;
        Ok(account)
    }
}

fn decode_account(key: &str, owner: &str, bytes: &[u8]) -> LedgerResult<Account> {
    let account: Account = codec::decode(key, bytes)?;
    if account.owner_id.as_str() != owner {
        return Err(LedgerError::validation(format!(
            "record at '{key}' belongs to '{}'",
            account.owner_id
        )));
    }
    Ok(account)
}

/// Lazy sequence of accounts produced by [`AccountLedger::list`].
pub struct Accounts<'s> {
    scan: StateScan<'s>,
    schema: KeySchema,
}

impl Iterator for Accounts<'_> {
    type Item = LedgerResult<Account>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, bytes) = match self.scan.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };
            let Some(owner) = self.schema.owner_from_key(&key) else {
                continue;
            };
            return Some(decode_account(&key, owner, &bytes));
        }
    }
}
