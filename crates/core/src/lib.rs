//! `tokenledger-core` — ledger foundation building blocks.
//!
//! Identifiers, amounts, the error taxonomy and the world-state boundary.
//! Nothing in this crate performs IO.

pub mod amount;
pub mod error;
pub mod id;
pub mod version;
pub mod world_state;

pub use amount::Amount;
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use id::{CallerIdentity, EventHash, OrgId, OwnerId};
pub use version::ExpectedVersion;
pub use world_state::{StateError, StateScan, WorldState};
