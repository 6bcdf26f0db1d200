//! Transaction - the sole envelope by which components hand batches to one
//! another.
//!
//! A transaction pairs a batch with a one-shot acknowledgement channel. The
//! receiver of a transaction must resolve it exactly once: `Ok(())` once
//! the batch is durably accepted downstream, or the error that prevented
//! acceptance. Consuming the sender on ack makes double-acking
//! unrepresentable; dropping a transaction without acking is observed by
//! the producer as [`Error::Closed`].

use tokio::sync::oneshot;

use crate::{Batch, Error};

#[cfg(test)]
#[path = "transaction_test.rs"]
mod tests;

/// The single value resolved on a transaction's ack channel.
pub type AckResult = Result<(), Error>;

/// Sending half of a transaction's ack channel.
pub type AckSender = oneshot::Sender<AckResult>;

/// A batch paired with its acknowledgement channel.
#[derive(Debug)]
pub struct Transaction {
    batch: Batch,
    ack: AckSender,
}

impl Transaction {
    /// Create a transaction for `batch`, returning the receiving half of
    /// its ack channel to the producer.
    pub fn new(batch: Batch) -> (Self, oneshot::Receiver<AckResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { batch, ack: tx }, rx)
    }

    /// Pair an existing ack sender with a batch. Used when a component
    /// re-issues a batch it received without taking over its ack.
    pub fn with_ack(batch: Batch, ack: AckSender) -> Self {
        Self { batch, ack }
    }

    /// The batch carried by this transaction.
    #[inline]
    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Resolve the transaction. The result is discarded if the producer
    /// has already gone away.
    pub fn ack(self, res: AckResult) {
        let _ = self.ack.send(res);
    }

    /// Split the transaction into its batch and ack sender, transferring
    /// the ack obligation to the caller.
    pub fn into_inner(self) -> (Batch, AckSender) {
        (self.batch, self.ack)
    }
}

/// A transaction whose upstream ack is memoised so it resolves at most
/// once.
///
/// Batchers hold one `Tracked` per contributing upstream transaction and
/// broadcast the flushed batch's single result across all of them; a
/// second resolution attempt is a no-op.
#[derive(Debug)]
pub struct Tracked {
    batch: Batch,
    ack: Option<AckSender>,
}

impl Tracked {
    /// Wrap a transaction, taking over its ack obligation.
    pub fn new(txn: Transaction) -> Self {
        Self {
            batch: txn.batch,
            ack: Some(txn.ack),
        }
    }

    /// The wrapped batch.
    #[inline]
    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Resolve the upstream ack if it has not been resolved yet.
    pub fn ack(&mut self, res: AckResult) {
        if let Some(ack) = self.ack.take() {
            let _ = ack.send(res);
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        // An unresolved upstream must still observe termination.
        if let Some(ack) = self.ack.take() {
            let _ = ack.send(Err(Error::Closed));
        }
    }
}
