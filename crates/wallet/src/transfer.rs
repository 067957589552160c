//! Balance moves between accounts, and burns.

use serde::Serialize;

use tokenledger_core::{Amount, LedgerError, LedgerResult, OwnerId, WorldState};

use crate::account::{Account, AccountLedger};

/// Both sides of a completed transfer, after the move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub from: Account,
    pub to: Account,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TransferEngine {
    ledger: AccountLedger,
}

impl TransferEngine {
    pub fn new(ledger: AccountLedger) -> Self {
        Self { ledger }
    }

    /// Move `amount` from one account to another.
    ///
    /// Both updated records are staged in the same invocation; the host
    /// commits them together or not at all.
    pub fn transfer<S: WorldState>(
        &self,
        state: &mut S,
        from: &OwnerId,
        to: &OwnerId,
        amount: Amount,
    ) -> LedgerResult<TransferOutcome> {
        ensure_positive(amount)?;
        if from == to {
            return Err(LedgerError::validation(format!(
                "cannot transfer from '{from}' to itself"
            )));
        }

        let sender = self.ledger.get(state, from)?;
        let receiver = self.ledger.get(state, to)?;

        let debited = sender.balance.checked_sub(amount).ok_or_else(|| {
            LedgerError::insufficient_balance(from.as_str(), sender.balance.units(), amount.units())
        })?;
        let credited = receiver.balance.checked_add(amount).ok_or_else(|| {
            LedgerError::validation(format!("credit to '{to}' would overflow its balance"))
        })?;

        let from = self.ledger.set_balance(state, from, debited)?;
        let to = self.ledger.set_balance(state, to, credited)?;
        Ok(TransferOutcome { from, to })
    }

    /// Destroy `amount` tokens held by `owner`.
    pub fn burn<S: WorldState>(
        &self,
        state: &mut S,
        owner: &OwnerId,
        amount: Amount,
    ) -> LedgerResult<Account> {
        ensure_positive(amount)?;
        let account = self.ledger.get(state, owner)?;
        let remaining = account.balance.checked_sub(amount).ok_or_else(|| {
            LedgerError::insufficient_balance(owner.as_str(), account.balance.units(), amount.units())
        })?;
        self.ledger.set_balance(state, owner, remaining)
    }
}

fn ensure_positive(amount: Amount) -> LedgerResult<()> {
    if amount.is_zero() {
        return Err(LedgerError::validation("amount must be positive (got 0)"));
    }
    Ok(())
}
