//! Reward sources and exactly-once crediting of external events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tokenledger_core::{Amount, EventHash, LedgerError, LedgerResult, OwnerId, WorldState};
use tokenledger_events::{CommitRewarded, LedgerEvent, Minted};

use crate::account::{Account, AccountLedger};
use crate::codec;
use crate::schema::commit_key;

/// Dedup entry proving an external event was rewarded. Written once, never
/// updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommitRecord {
    pub owner: OwnerId,
    pub external_event_hash: EventHash,
    pub reward_amount: Amount,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a credit: the updated account, the event describing it, and
/// whatever receipt the source keeps (the dedup record for external events).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit<R = ()> {
    pub account: Account,
    pub event: LedgerEvent,
    pub receipt: R,
}

/// Where newly issued tokens come from.
///
/// Callers run the issuer check and validate `amount` before `credit`.
/// Implementations derive every write from reads made inside `credit`, and
/// never read back a key they wrote: the host may only expose state as of
/// the start of the transaction.
pub trait RewardSource {
    type Receipt;

    fn credit<S: WorldState>(
        &self,
        state: &mut S,
        ledger: &AccountLedger,
        amount: Amount,
    ) -> LedgerResult<Credit<Self::Receipt>>;
}

/// Plain issuance: credits the account, opening it if needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMint {
    account: OwnerId,
}

impl DirectMint {
    pub fn new(account: OwnerId) -> Self {
        Self { account }
    }
}

impl RewardSource for DirectMint {
    type Receipt = ();

    fn credit<S: WorldState>(
        &self,
        state: &mut S,
        ledger: &AccountLedger,
        amount: Amount,
    ) -> LedgerResult<Credit> {
        let (account, created) = match ledger.find(state, &self.account)? {
            Some(existing) => {
                let balance = credit_balance(&existing, amount)?;
                (ledger.set_balance(state, &self.account, balance)?, false)
            }
            None => (ledger.create(state, &self.account, amount)?, true),
        };

        let event = LedgerEvent::Minted(Minted {
            owner_id: self.account.clone(),
            amount,
            balance: account.balance,
            created,
            occurred_at: state.tx_timestamp(),
        });
        Ok(Credit {
            account,
            event,
            receipt: (),
        })
    }
}

/// Reward for an external event (e.g. an accepted commit), paid at most once
/// per event hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEventReward {
    owner: OwnerId,
    event_hash: EventHash,
    tracker: RewardIdempotencyTracker,
}

impl ExternalEventReward {
    pub fn new(owner: OwnerId, event_hash: EventHash) -> Self {
        Self {
            owner,
            event_hash,
            tracker: RewardIdempotencyTracker,
        }
    }
}

impl RewardSource for ExternalEventReward {
    type Receipt = CommitRecord;

    fn credit<S: WorldState>(
        &self,
        state: &mut S,
        ledger: &AccountLedger,
        amount: Amount,
    ) -> LedgerResult<Credit<CommitRecord>> {
        if self.tracker.is_rewarded(state, &self.event_hash)? {
            return Err(LedgerError::conflict(format!(
                "external event '{}' was already rewarded",
                self.event_hash
            )));
        }

        let existing = ledger.get(state, &self.owner)?;
        let balance = credit_balance(&existing, amount)?;
        let account = ledger.set_balance(state, &self.owner, balance)?;

        let timestamp = state.tx_timestamp();
        let record = CommitRecord {
            owner: self.owner.clone(),
            external_event_hash: self.event_hash.clone(),
            reward_amount: amount,
            timestamp,
        };
        self.tracker.record(state, &record)?;

        let event = LedgerEvent::CommitRewarded(CommitRewarded {
            owner: self.owner.clone(),
            amount,
            external_event_hash: self.event_hash.clone(),
            occurred_at: timestamp,
        });
        Ok(Credit {
            account,
            event,
            receipt: record,
        })
    }
}

fn credit_balance(account: &Account, amount: Amount) -> LedgerResult<Amount> {
    account.balance.checked_add(amount).ok_or_else(|| {
        LedgerError::validation(format!(
            "credit to '{}' would overflow its balance",
            account.owner_id
        ))
    })
}

/// Verdict of an out-of-band commit review.
///
/// Reviews (human or automated) happen before the transaction is proposed;
/// the ledger only sees the verdict.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitVerdict {
    Approved,
    Rejected,
}

impl core::str::FromStr for CommitVerdict {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" => Ok(CommitVerdict::Approved),
            "rejected" => Ok(CommitVerdict::Rejected),
            other => Err(LedgerError::validation(format!(
                "unknown commit verdict '{other}' (expected 'approved' or 'rejected')"
            ))),
        }
    }
}

/// Write-once dedup records keyed by external event hash.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RewardIdempotencyTracker;

impl RewardIdempotencyTracker {
    pub fn is_rewarded<S: WorldState>(&self, state: &S, hash: &EventHash) -> LedgerResult<bool> {
        Ok(state.get_state(&commit_key(hash))?.is_some())
    }

    pub fn get<S: WorldState>(&self, state: &S, hash: &EventHash) -> LedgerResult<CommitRecord> {
        let key = commit_key(hash);
        let bytes = state
            .get_state(&key)?
            .ok_or_else(|| LedgerError::not_found(format!("commit record '{hash}'")))?;
        codec::decode(&key, &bytes)
    }

    fn record<S: WorldState>(&self, state: &mut S, record: &CommitRecord) -> LedgerResult<()> {
        let key = commit_key(&record.external_event_hash);
        state.put_state(&key, codec::encode(&key, record)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryState;
    use proptest::prelude::*;
    use tokenledger_core::ErrorKind;

    fn owner(s: &str) -> OwnerId {
        OwnerId::new(s).unwrap()
    }

    fn hash(s: &str) -> EventHash {
        EventHash::new(s).unwrap()
    }

    #[test]
    fn direct_mint_opens_missing_accounts() {
        let ledger = AccountLedger::default();
        let mut state = MemoryState::new();

        let credit = DirectMint::new(owner("alice"))
            .credit(&mut state, &ledger, Amount::new(25))
            .unwrap();

        assert_eq!(credit.account.balance, Amount::new(25));
        assert!(matches!(credit.event, LedgerEvent::Minted(Minted { created: true, .. })));
    }

    #[test]
    fn direct_mint_increments_existing_accounts() {
        let ledger = AccountLedger::default();
        let mut state = MemoryState::new();
        ledger.create(&mut state, &owner("alice"), Amount::new(5)).unwrap();

        let credit = DirectMint::new(owner("alice"))
            .credit(&mut state, &ledger, Amount::new(25))
            .unwrap();

        assert_eq!(credit.account.balance, Amount::new(30));
        assert!(matches!(credit.event, LedgerEvent::Minted(Minted { created: false, .. })));
    }

    #[test]
    fn external_reward_writes_record_with_tx_timestamp() {
        let ledger = AccountLedger::default();
        let mut state = MemoryState::new();
        ledger.create(&mut state, &owner("alice"), Amount::ZERO).unwrap();

        let credit = ExternalEventReward::new(owner("alice"), hash("sha1"))
            .credit(&mut state, &ledger, Amount::new(10))
            .unwrap();

        let record = RewardIdempotencyTracker.get(&state, &hash("sha1")).unwrap();
        assert_eq!(record, credit.receipt);
        assert_eq!(record.timestamp, state.timestamp);
        assert_eq!(record.reward_amount, Amount::new(10));

        let json: serde_json::Value = serde_json::from_slice(&state.entries["commit_sha1"]).unwrap();
        assert_eq!(json["externalEventHash"], "sha1");
        assert_eq!(json["rewardAmount"], 10);
        assert_eq!(json["owner"], "alice");
    }

    #[test]
    fn second_reward_for_same_hash_conflicts() {
        let ledger = AccountLedger::default();
        let mut state = MemoryState::new();
        ledger.create(&mut state, &owner("alice"), Amount::ZERO).unwrap();
        let source = ExternalEventReward::new(owner("alice"), hash("sha1"));

        source.credit(&mut state, &ledger, Amount::new(10)).unwrap();
        let err = source.credit(&mut state, &ledger, Amount::new(10)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(ledger.get(&state, &owner("alice")).unwrap().balance, Amount::new(10));
    }

    #[test]
    fn hash_dedup_is_global_across_owners() {
        let ledger = AccountLedger::default();
        let mut state = MemoryState::new();
        ledger.create(&mut state, &owner("alice"), Amount::ZERO).unwrap();
        ledger.create(&mut state, &owner("bob"), Amount::ZERO).unwrap();

        ExternalEventReward::new(owner("alice"), hash("sha1"))
            .credit(&mut state, &ledger, Amount::new(10))
            .unwrap();
        let err = ExternalEventReward::new(owner("bob"), hash("sha1"))
            .credit(&mut state, &ledger, Amount::new(10))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(ledger.get(&state, &owner("bob")).unwrap().balance, Amount::ZERO);
    }

    #[test]
    fn reward_for_unknown_owner_writes_nothing() {
        let ledger = AccountLedger::default();
        let mut state = MemoryState::new();

        let err = ExternalEventReward::new(owner("ghost"), hash("sha1"))
            .credit(&mut state, &ledger, Amount::new(10))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!RewardIdempotencyTracker.is_rewarded(&state, &hash("sha1")).unwrap());
    }

    #[test]
    fn missing_record_is_not_found() {
        let state = MemoryState::new();
        let err = RewardIdempotencyTracker.get(&state, &hash("nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn malformed_commit_records_are_validation_errors() {
        let good = r#"{"owner":"alice","externalEventHash":"sha1","rewardAmount":10,"timestamp":"2024-05-01T12:00:00Z"}"#;
        let cases = [
            r#"{"owner":"alice","externalEventHash":"sha1","rewardAmount":10,"timestamp":"2024-05-01T12:00:00Z","bonus":1}"#,
            r#"{"owner":"alice","externalEventHash":"sha1","rewardAmount":-10,"timestamp":"2024-05-01T12:00:00Z"}"#,
            r#"{"owner":"alice","externalEventHash":"sha1","timestamp":"2024-05-01T12:00:00Z"}"#,
            "not json",
        ];

        let mut state = MemoryState::new();
        state.entries.insert("commit_sha1".into(), good.as_bytes().to_vec());
        assert_eq!(
            RewardIdempotencyTracker.get(&state, &hash("sha1")).unwrap().reward_amount,
            Amount::new(10)
        );

        for raw in cases {
            state.entries.insert("commit_sha1".into(), raw.as_bytes().to_vec());
            let err = RewardIdempotencyTracker.get(&state, &hash("sha1")).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "accepted {raw}");
        }
    }

    #[test]
    fn external_reward_returns_record_without_reading_it_back() {
        let ledger = AccountLedger::default();
        let mut state = MemoryState::new();
        ledger.create(&mut state, &owner("alice"), Amount::ZERO).unwrap();
        state.hide_own_writes = true;

        let credit = ExternalEventReward::new(owner("alice"), hash("sha1"))
            .credit(&mut state, &ledger, Amount::new(10))
            .unwrap();

        assert_eq!(credit.receipt.owner, owner("alice"));
        assert_eq!(credit.receipt.reward_amount, Amount::new(10));
        assert!(state.staged.contains_key("commit_sha1"));
        assert!(!RewardIdempotencyTracker.is_rewarded(&state, &hash("sha1")).unwrap());
    }

    #[test]
    fn verdict_parsing() {
        assert_eq!("Approved".parse::<CommitVerdict>().unwrap(), CommitVerdict::Approved);
        assert_eq!("rejected".parse::<CommitVerdict>().unwrap(), CommitVerdict::Rejected);
        assert!("maybe".parse::<CommitVerdict>().is_err());
    }

    proptest! {
        /// Property: however many times each hash is retried, the balance
        /// grows by exactly one reward per distinct hash.
        #[test]
        fn each_hash_pays_exactly_once(
            hashes in prop::collection::vec(0u8..8, 1..30),
            amount in 1u64..1_000,
        ) {
            let ledger = AccountLedger::default();
            let mut state = MemoryState::new();
            ledger.create(&mut state, &owner("alice"), Amount::ZERO).unwrap();

            for h in &hashes {
                let _ = ExternalEventReward::new(owner("alice"), hash(&format!("sha{h}")))
                    .credit(&mut state, &ledger, Amount::new(amount));
            }

            let distinct = hashes.iter().collect::<std::collections::BTreeSet<_>>().len() as u64;
            let balance = ledger.get(&state, &owner("alice")).unwrap().balance.units();
            prop_assert_eq!(balance, distinct * amount);
        }
    }
}
