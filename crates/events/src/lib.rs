//! Ledger events and the committed-event stream.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod ledger;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use ledger::{
    AccountCreated, Burned, CommitRewarded, IssuerChanged, LedgerEvent, Minted, Transferred,
};
