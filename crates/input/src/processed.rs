//! Processor chains attached to inputs.

use tokio::sync::mpsc;

use sluice_message::{tracker, Error};
use sluice_processor::{execute_all, BoxProcessor};

use crate::Input;

#[cfg(test)]
#[path = "processed_test.rs"]
mod tests;

impl Input {
    /// Run every transaction through `chain` before it reaches the
    /// consumer.
    ///
    /// Each batch the chain emits becomes a derived transaction; the
    /// producer's ack resolves once every derived transaction has, first
    /// error winning. A batch whose parts are all filtered out is acked
    /// success immediately. An empty chain returns the input untouched.
    #[must_use]
    pub fn with_processors(self, chain: Vec<BoxProcessor>, buffer: usize) -> Input {
        if chain.is_empty() {
            return self;
        }

        let (mut rx, handle) = self.into_parts();
        let (tx, out_rx) = mpsc::channel(buffer);
        let signal = handle.shutdown().clone();

        tokio::spawn(async move {
            let mut chain = chain;
            'forward: loop {
                let txn = tokio::select! {
                    txn = rx.recv() => match txn {
                        Some(txn) => txn,
                        None => break 'forward,
                    },
                    _ = signal.closing() => break 'forward,
                };

                let (batch, ack) = txn.into_inner();
                match execute_all(&mut chain, vec![batch]).await {
                    Ok(batches) if batches.is_empty() => {
                        let _ = ack.send(Ok(()));
                    }
                    Ok(batches) => {
                        for derived in tracker::fan_in(ack, batches) {
                            tokio::select! {
                                sent = tx.send(derived) => {
                                    if sent.is_err() {
                                        break 'forward;
                                    }
                                }
                                _ = signal.closing() => break 'forward,
                            }
                        }
                    }
                    Err(Error::Closed) => {
                        let _ = ack.send(Err(Error::Closed));
                        break 'forward;
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "input processor chain failed");
                        let _ = ack.send(Err(err));
                    }
                }
            }
            for processor in &mut chain {
                processor.close();
            }
        });

        Input::new(out_rx, handle)
    }
}
