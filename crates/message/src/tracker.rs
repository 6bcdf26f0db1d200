//! Acknowledgement tracker - fan-in and fan-out helpers that preserve
//! at-least-once delivery when batches are split or merged.
//!
//! Fan-in converts one upstream ack into N downstream acks: the upstream
//! is resolved once every derived transaction has resolved, with the first
//! non-success winning. Fan-out collapses N upstream acks into one derived
//! transaction whose single result is broadcast to every upstream.

use tokio::sync::oneshot;

use crate::{AckResult, AckSender, Batch, Error, Transaction};

#[cfg(test)]
#[path = "tracker_test.rs"]
mod tests;

/// Derive one transaction per batch from a single upstream ack.
///
/// The returned transactions are sent downstream by the caller; a spawned
/// collector resolves `upstream` once all of them have resolved. The first
/// non-success result wins. A derived transaction dropped without acking
/// (shutdown) resolves the upstream with [`Error::Closed`].
pub fn fan_in(upstream: AckSender, batches: Vec<Batch>) -> Vec<Transaction> {
    let mut txns = Vec::with_capacity(batches.len());
    let mut acks = Vec::with_capacity(batches.len());
    for batch in batches {
        let (txn, rx) = Transaction::new(batch);
        txns.push(txn);
        acks.push(rx);
    }

    tokio::spawn(async move {
        let mut res: AckResult = Ok(());
        for ack in acks {
            match ack.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    if res.is_ok() {
                        res = Err(err);
                    }
                }
                Err(_) => {
                    if res.is_ok() {
                        res = Err(Error::Closed);
                    }
                }
            }
        }
        let _ = upstream.send(res);
    });

    txns
}

/// Collapse the acks of N upstream transactions into one derived
/// transaction carrying `batch`.
///
/// Whatever single result the derived transaction resolves with is
/// broadcast to every upstream ack; a derived transaction dropped without
/// acking broadcasts [`Error::Closed`].
pub fn fan_out(batch: Batch, upstream: Vec<AckSender>) -> Transaction {
    let (txn, rx) = Transaction::new(batch);
    tokio::spawn(async move {
        broadcast(rx, upstream).await;
    });
    txn
}

/// Await one derived ack and deliver its result to every upstream sender.
pub async fn broadcast(derived: oneshot::Receiver<AckResult>, upstream: Vec<AckSender>) {
    let res = match derived.await {
        Ok(res) => res,
        Err(_) => Err(Error::Closed),
    };
    for ack in upstream {
        let _ = ack.send(res.clone());
    }
}
