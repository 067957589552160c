//! Token wallet contract.
//!
//! Deterministic state transitions over a host-provided world state: no IO of
//! its own, no clocks, no process-level caches.

pub mod account;
mod codec;
pub mod contract;
pub mod emitter;
pub mod issuer;
pub mod reward;
pub mod schema;
pub mod transfer;

#[cfg(test)]
mod testing;

pub use account::{Account, AccountLedger, Accounts};
pub use contract::{RewardOutcome, SeedAccount, TokenContract};
pub use emitter::EventEmitter;
pub use issuer::IssuerRegistry;
pub use reward::{
    CommitRecord, CommitVerdict, Credit, DirectMint, ExternalEventReward,
    RewardIdempotencyTracker, RewardSource,
};
pub use schema::{
    AUTHORIZED_ISSUER_KEY, COMMIT_PREFIX, ContractConfig, KeySchema, WALLET_PREFIX, commit_key,
};
pub use transfer::{TransferEngine, TransferOutcome};
