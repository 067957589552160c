//! Invocation pipeline: parse, simulate, commit, publish.
//!
//! ```text
//! Invocation
//!   ↓
//! 1. Parse into a LedgerCommand (validation only, no state)
//!   ↓
//! 2. Open a transaction on the world state
//!   ↓
//! 3. Run the command on TokenContract (reads, staged writes, events)
//!   ↓
//! 4. Commit (read-set validation, atomic apply) or discard
//!   ↓
//! 5. Publish committed events to the bus
//! ```
//!
//! Queries stop after step 3 and their transaction is dropped. Any error
//! before step 4 drops the transaction too, so nothing it staged survives.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tokenledger_core::{CallerIdentity, LedgerError, LedgerResult};
use tokenledger_events::{EventBus, EventEnvelope};
use tokenledger_wallet::{Account, TokenContract};

use crate::command::{Invocation, LedgerCommand};
use crate::config::HostConfig;
use crate::world_state::{CommitError, InMemoryWorldState, Transaction};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The contract rejected the invocation; nothing was committed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The transaction lost an optimistic-concurrency race; nothing was
    /// committed and the client may resubmit.
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// The transaction committed but its events could not be published.
    #[error("committed, but event publication failed: {0}")]
    Publish(String),
}

impl DispatchError {
    /// Stable machine-readable code for responses.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::Ledger(e) => e.kind().as_str(),
            DispatchError::Commit(CommitError::Poisoned) => "storage_error",
            DispatchError::Commit(_) => "mvcc_read_conflict",
            DispatchError::Publish(_) => "publish_error",
        }
    }
}

/// Outcome of a successful invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResponse {
    pub tx_id: Uuid,
    pub function: &'static str,
    /// `None` for queries.
    pub commit_sequence: Option<u64>,
    pub result: JsonValue,
    pub events: Vec<EventEnvelope>,
}

impl InvocationResponse {
    pub fn committed(&self) -> bool {
        self.commit_sequence.is_some()
    }
}

#[derive(Debug)]
pub struct InvocationDispatcher<B> {
    world: InMemoryWorldState,
    contract: TokenContract,
    bus: B,
}

impl<B> InvocationDispatcher<B> {
    pub fn new(world: InMemoryWorldState, contract: TokenContract, bus: B) -> Self {
        Self {
            world,
            contract,
            bus,
        }
    }

    pub fn world(&self) -> &InMemoryWorldState {
        &self.world
    }

    pub fn contract(&self) -> &TokenContract {
        &self.contract
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B> InvocationDispatcher<B>
where
    B: EventBus<EventEnvelope>,
{
    /// Run an invocation with the host clock as the transaction timestamp.
    pub fn invoke(
        &self,
        caller: CallerIdentity,
        invocation: &Invocation,
    ) -> Result<InvocationResponse, DispatchError> {
        self.invoke_at(caller, invocation, Utc::now())
    }

    /// Run an invocation with an explicit transaction timestamp.
    pub fn invoke_at(
        &self,
        caller: CallerIdentity,
        invocation: &Invocation,
        timestamp: DateTime<Utc>,
    ) -> Result<InvocationResponse, DispatchError> {
        let command = LedgerCommand::try_from(invocation)?;
        let function = command.name();

        let mut tx = self.world.begin(caller, timestamp).map_err(LedgerError::from)?;
        let tx_id = tx.tx_id();

        let result = match self.execute(&command, &mut tx) {
            Ok(result) => result,
            Err(e) => {
                debug!(%tx_id, function, error = %e, "invocation rejected, transaction discarded");
                return Err(e.into());
            }
        };

        if command.is_read_only() {
            debug!(%tx_id, function, "query evaluated");
            return Ok(InvocationResponse {
                tx_id,
                function,
                commit_sequence: None,
                result,
                events: Vec::new(),
            });
        }

        let receipt = self.world.commit(tx).inspect_err(|e| {
            warn!(%tx_id, function, error = %e, "commit rejected");
        })?;
        info!(
            %tx_id,
            function,
            commit_sequence = receipt.commit_sequence,
            writes = receipt.writes,
            events = receipt.events.len(),
            "transaction committed"
        );

        for envelope in &receipt.events {
            self.bus
                .publish(envelope.clone())
                .map_err(|e| DispatchError::Publish(e.to_string()))?;
        }

        Ok(InvocationResponse {
            tx_id,
            function,
            commit_sequence: Some(receipt.commit_sequence),
            result,
            events: receipt.events,
        })
    }

    /// Install the configured issuer and seed accounts on an empty ledger.
    /// Returns `false` when no issuer is configured or one is already stored.
    pub fn bootstrap(&self, config: &HostConfig) -> Result<bool, DispatchError> {
        let Some(issuer) = &config.issuer_org else {
            warn!("no bootstrap issuer configured; ledger waits for InitLedger");
            return Ok(false);
        };
        let stored = self
            .world
            .get(tokenledger_wallet::AUTHORIZED_ISSUER_KEY)
            .map_err(LedgerError::from)?;
        if stored.is_some() {
            debug!("ledger already initialized, skipping bootstrap");
            return Ok(false);
        }

        let seeds = serde_json::to_string(&config.seed_accounts)
            .map_err(|e| LedgerError::validation(format!("cannot encode seed accounts: {e}")))?;
        let invocation = Invocation::new("InitLedger", [issuer.clone(), seeds]);
        self.invoke(CallerIdentity::new("bootstrap", issuer.clone()), &invocation)?;
        Ok(true)
    }

    fn execute(&self, command: &LedgerCommand, tx: &mut Transaction) -> LedgerResult<JsonValue> {
        let contract = &self.contract;
        match command {
            LedgerCommand::InitLedger { issuer_org, seeds } => {
                contract.init_ledger(tx, issuer_org, seeds)?;
                Ok(JsonValue::Null)
            }
            LedgerCommand::SetAuthorizedIssuer { org } => {
                to_json(&contract.set_authorized_issuer(tx, org)?)
            }
            LedgerCommand::CreateAccount {
                owner,
                initial_balance,
            } => to_json(&contract.create_account(tx, owner, *initial_balance)?),
            LedgerCommand::GetAccount { owner } => to_json(&contract.get_account(&*tx, owner)?),
            LedgerCommand::AccountExists { owner } => {
                to_json(&contract.account_exists(&*tx, owner)?)
            }
            LedgerCommand::ListAccounts => {
                let accounts = contract
                    .list_accounts(&*tx)?
                    .collect::<LedgerResult<Vec<Account>>>()?;
                to_json(&accounts)
            }
            LedgerCommand::BalanceOf { owner } => to_json(&contract.balance_of(&*tx, owner)?),
            LedgerCommand::MyBalance => to_json(&contract.my_balance(&*tx)?),
            LedgerCommand::Transfer { from, to, amount } => {
                to_json(&contract.transfer(tx, from, to, *amount)?)
            }
            LedgerCommand::Burn { owner, amount } => to_json(&contract.burn(tx, owner, *amount)?),
            LedgerCommand::Mint { owner, amount } => to_json(&contract.mint(tx, owner, *amount)?),
            LedgerCommand::RewardForCommit {
                owner,
                hash,
                amount,
            } => to_json(&contract.reward_for_commit(tx, owner, hash, *amount)?),
            LedgerCommand::RewardReviewedCommit {
                owner,
                hash,
                amount,
                verdict,
            } => to_json(&contract.reward_reviewed_commit(tx, owner, hash, *amount, *verdict)?),
            LedgerCommand::GetCommitRecord { hash } => {
                to_json(&contract.get_commit_record(&*tx, hash)?)
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> LedgerResult<JsonValue> {
    serde_json::to_value(value)
        .map_err(|e| LedgerError::validation(format!("cannot encode result: {e}")))
}
