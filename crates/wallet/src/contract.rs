//! `TokenContract`: the public operations of the token ledger.
//!
//! Each method runs once per invocation against the host's view of state.
//! Raw caller input is validated here, before anything is written.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tokenledger_core::{Amount, EventHash, LedgerError, LedgerResult, OrgId, OwnerId, WorldState};
use tokenledger_events::{AccountCreated, Burned, IssuerChanged, LedgerEvent, Transferred};

use crate::account::{Account, AccountLedger, Accounts};
use crate::emitter::EventEmitter;
use crate::issuer::IssuerRegistry;
use crate::reward::{
    CommitRecord, CommitVerdict, DirectMint, ExternalEventReward, RewardIdempotencyTracker,
    RewardSource,
};
use crate::schema::ContractConfig;
use crate::transfer::{TransferEngine, TransferOutcome};

/// Account opened by `init_ledger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedAccount {
    #[serde(rename = "ownerID")]
    pub owner: String,
    pub balance: i64,
}

impl SeedAccount {
    pub fn new(owner: impl Into<String>, balance: i64) -> Self {
        Self {
            owner: owner.into(),
            balance,
        }
    }
}

/// Result of a paid reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardOutcome {
    pub account: Account,
    pub record: CommitRecord,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TokenContract {
    ledger: AccountLedger,
    issuers: IssuerRegistry,
    transfers: TransferEngine,
    rewards: RewardIdempotencyTracker,
    events: EventEmitter,
}

impl TokenContract {
    pub fn new(config: ContractConfig) -> Self {
        let ledger = AccountLedger::new(config.key_schema);
        Self {
            ledger,
            issuers: IssuerRegistry,
            transfers: TransferEngine::new(ledger),
            rewards: RewardIdempotencyTracker,
            events: EventEmitter,
        }
    }

    /// Store the first authorized issuer and open any seed accounts.
    ///
    /// Open to any caller while no issuer is set; conflicts afterwards.
    /// Duplicate seed owners conflict before anything is written, since seeds
    /// cannot see each other's staged records.
    pub fn init_ledger<S: WorldState>(
        &self,
        state: &mut S,
        issuer_org: &str,
        seeds: &[SeedAccount],
    ) -> LedgerResult<()> {
        let org = OrgId::new(issuer_org)?;
        let mut owners = BTreeSet::new();
        for seed in seeds {
            let owner = OwnerId::new(seed.owner.as_str())?;
            if !owners.insert(owner) {
                return Err(LedgerError::conflict(format!(
                    "seed account '{}' is listed more than once",
                    seed.owner
                )));
            }
        }
        self.issuers.initialize(state, org.clone())?;
        let event = LedgerEvent::IssuerChanged(IssuerChanged {
            previous: None,
            current: org.clone(),
            occurred_at: state.tx_timestamp(),
        });
        self.events.emit(state, &event)?;

        for seed in seeds {
            self.create_account(state, &seed.owner, seed.balance)?;
        }

        info!(issuer = %org, seeds = seeds.len(), "ledger initialized");
        Ok(())
    }

    /// Hand the issuer role to another organization. Issuer only.
    pub fn set_authorized_issuer<S: WorldState>(
        &self,
        state: &mut S,
        new_org: &str,
    ) -> LedgerResult<Option<OrgId>> {
        self.issuers.require_issuer(state)?;
        let org = OrgId::new(new_org)?;
        let previous = self.issuers.rotate(state, org.clone())?;

        let event = LedgerEvent::IssuerChanged(IssuerChanged {
            previous: previous.clone(),
            current: org.clone(),
            occurred_at: state.tx_timestamp(),
        });
        self.events.emit(state, &event)?;

        info!(issuer = %org, event = "IssuerChangedEvent", "authorized issuer rotated");
        Ok(previous)
    }

    pub fn create_account<S: WorldState>(
        &self,
        state: &mut S,
        owner: &str,
        initial_balance: i64,
    ) -> LedgerResult<Account> {
        let owner = OwnerId::new(owner)?;
        let balance = Amount::non_negative(initial_balance)?;
        let account = self.ledger.create(state, &owner, balance)?;

        let event = LedgerEvent::AccountCreated(AccountCreated {
            owner_id: owner.clone(),
            balance,
            occurred_at: state.tx_timestamp(),
        });
        self.events.emit(state, &event)?;

        info!(%owner, amount = %balance, event = "AccountCreatedEvent", "account created");
        Ok(account)
    }

    pub fn get_account<S: WorldState>(&self, state: &S, owner: &str) -> LedgerResult<Account> {
        let owner = OwnerId::new(owner)?;
        self.ledger.get(state, &owner)
    }

    pub fn account_exists<S: WorldState>(&self, state: &S, owner: &str) -> LedgerResult<bool> {
        let owner = OwnerId::new(owner)?;
        Ok(self.ledger.find(state, &owner)?.is_some())
    }

    /// Lazily decoded accounts in key order. Administrative enumeration.
    pub fn list_accounts<'s, S: WorldState>(&self, state: &'s S) -> LedgerResult<Accounts<'s>> {
        debug!("listing accounts");
        self.ledger.list(state)
    }

    pub fn balance_of<S: WorldState>(&self, state: &S, owner: &str) -> LedgerResult<Amount> {
        Ok(self.get_account(state, owner)?.balance)
    }

    /// Balance of the account whose owner id equals the caller's id.
    pub fn my_balance<S: WorldState>(&self, state: &S) -> LedgerResult<Amount> {
        let caller = state.caller_identity()?;
        self.balance_of(state, &caller.id)
    }

    pub fn transfer<S: WorldState>(
        &self,
        state: &mut S,
        from: &str,
        to: &str,
        amount: i64,
    ) -> LedgerResult<TransferOutcome> {
        let amount = Amount::positive(amount)?;
        let from = OwnerId::new(from)?;
        let to = OwnerId::new(to)?;
        let outcome = self.transfers.transfer(state, &from, &to, amount)?;

        let event = LedgerEvent::Transferred(Transferred {
            from: from.clone(),
            to: to.clone(),
            amount,
            occurred_at: state.tx_timestamp(),
        });
        self.events.emit(state, &event)?;

        info!(%from, %to, %amount, event = "TransferEvent", "tokens transferred");
        Ok(outcome)
    }

    pub fn burn<S: WorldState>(
        &self,
        state: &mut S,
        owner: &str,
        amount: i64,
    ) -> LedgerResult<Account> {
        let amount = Amount::positive(amount)?;
        let owner = OwnerId::new(owner)?;
        let account = self.transfers.burn(state, &owner, amount)?;

        let event = LedgerEvent::Burned(Burned {
            owner: owner.clone(),
            amount,
            balance: account.balance,
            occurred_at: state.tx_timestamp(),
        });
        self.events.emit(state, &event)?;

        info!(%owner, %amount, event = "BurnEvent", "tokens burned");
        Ok(account)
    }

    /// Issue new tokens. Issuer only; opens the account if it does not exist.
    pub fn mint<S: WorldState>(
        &self,
        state: &mut S,
        owner: &str,
        amount: i64,
    ) -> LedgerResult<Account> {
        self.issuers.require_issuer(state)?;
        let amount = Amount::positive(amount)?;
        let owner = OwnerId::new(owner)?;

        let credit = DirectMint::new(owner.clone()).credit(state, &self.ledger, amount)?;
        self.events.emit(state, &credit.event)?;

        info!(%owner, %amount, event = "MintEvent", "tokens minted");
        Ok(credit.account)
    }

    /// Pay `amount` to `owner` for an external event, once per event hash.
    /// Issuer only.
    pub fn reward_for_commit<S: WorldState>(
        &self,
        state: &mut S,
        owner: &str,
        external_event_hash: &str,
        amount: i64,
    ) -> LedgerResult<RewardOutcome> {
        self.issuers.require_issuer(state)?;
        self.pay_commit_reward(state, owner, external_event_hash, amount)
    }

    fn pay_commit_reward<S: WorldState>(
        &self,
        state: &mut S,
        owner: &str,
        external_event_hash: &str,
        amount: i64,
    ) -> LedgerResult<RewardOutcome> {
        let amount = Amount::positive(amount)?;
        let owner = OwnerId::new(owner)?;
        let hash = EventHash::new(external_event_hash)?;

        let credit = ExternalEventReward::new(owner.clone(), hash.clone()).credit(
            state,
            &self.ledger,
            amount,
        )?;
        self.events.emit(state, &credit.event)?;

        info!(%owner, %amount, hash = %hash, event = "RewardEvent", "commit rewarded");
        Ok(RewardOutcome {
            account: credit.account,
            record: credit.receipt,
        })
    }

    /// Reward an externally reviewed commit. A rejected verdict fails with a
    /// validation error and writes nothing. Issuer only.
    pub fn reward_reviewed_commit<S: WorldState>(
        &self,
        state: &mut S,
        owner: &str,
        external_event_hash: &str,
        amount: i64,
        verdict: CommitVerdict,
    ) -> LedgerResult<RewardOutcome> {
        self.issuers.require_issuer(state)?;
        match verdict {
            CommitVerdict::Approved => {
                self.pay_commit_reward(state, owner, external_event_hash, amount)
            }
            CommitVerdict::Rejected => {
                info!(%owner, hash = %external_event_hash, "commit review rejected");
                Err(LedgerError::validation(format!(
                    "commit '{external_event_hash}' was rejected by review"
                )))
            }
        }
    }

    pub fn get_commit_record<S: WorldState>(
        &self,
        state: &S,
        external_event_hash: &str,
    ) -> LedgerResult<CommitRecord> {
        let hash = EventHash::new(external_event_hash)?;
        self.rewards.get(state, &hash)
    }
}
