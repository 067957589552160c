//! Committed-event distribution (mechanics only).
//!
//! This module provides the **event bus pattern**: a pub/sub channel that fans
//! committed ledger events out to external consumers (indexers, notifiers,
//! reward bots watching for `RewardEvent`).
//!
//! ## Delivery Guarantees
//!
//! - **After commit only**: the dispatcher publishes a transaction's events once
//!   the world state has accepted its write-set. A discarded or conflicting
//!   transaction publishes nothing.
//! - **Per-transaction order**: events of one transaction arrive in emission
//!   order. Across transactions, order follows commit sequence as long as a
//!   single dispatcher publishes.
//! - **No persistence**: the bus is for distribution. The world state is the
//!   source of truth, and a consumer that falls behind rebuilds from it.
//!
//! ## Why Not Exactly-Once?
//!
//! Exactly-once matters for the ledger's own effects (rewards are deduplicated
//! by commit record inside the transaction), not for notification. Consumers
//! that act on events key their work by `(tx_id, index)` from the envelope.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// A subscription to the committed-event stream.
///
/// Each subscription receives its own copy of every message published after
/// it was created. Meant for consumption from a single thread.
///
/// ```ignore
/// let subscription = bus.subscribe();
/// loop {
///     match subscription.recv_timeout(Duration::from_secs(1)) {
///         Ok(envelope) => index(envelope)?,
///         Err(RecvTimeoutError::Timeout) => continue,
///         Err(RecvTimeoutError::Disconnected) => break,
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Broadcast publish/subscribe transport for committed events.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
