//! Host-side world state: committed versioned store plus per-invocation
//! transactions.

mod in_memory;
mod transaction;

pub use in_memory::{CommitError, CommitReceipt, InMemoryWorldState};
pub use transaction::Transaction;
