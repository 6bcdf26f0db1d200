//! Reader wrapper: connect/retry/ack plumbing shared by every adapter.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sluice_component::Backoff;
use sluice_message::{Error, Transaction};

use crate::{Input, InputHandle, Reader};

#[cfg(test)]
#[path = "reader_input_test.rs"]
mod tests;

/// Wrap a [`Reader`] with the shared streaming loop and return its
/// [`Input`].
///
/// The loop connects with capped exponential backoff, creates one
/// transaction per batch, and forwards each transaction's ack result to
/// the reader's ack callback. When the connection drops, every in-flight
/// transaction is negatively acked with [`Error::NotConnected`] before
/// reconnecting; on shutdown the remainder is acked with
/// [`Error::Closed`].
pub fn spawn_reader<R: Reader + 'static>(reader: R, buffer: usize) -> Input {
    let (tx, rx) = mpsc::channel(buffer);
    let handle = InputHandle::new(false);
    let input = Input::new(rx, handle.clone());

    tokio::spawn(run_reader(reader, tx, handle));
    input
}

async fn run_reader<R: Reader>(mut reader: R, tx: mpsc::Sender<Transaction>, handle: InputHandle) {
    let shutdown = handle.shutdown().clone();
    // One epoch per connection; cancelling it nacks that connection's
    // in-flight transactions.
    let mut epoch = CancellationToken::new();

    'outer: loop {
        // Establish the connection, backing off between attempts.
        let mut backoff = Backoff::default();
        loop {
            if shutdown.is_closing() {
                break 'outer;
            }
            match reader.connect().await {
                Ok(()) => {
                    handle.set_connected(true);
                    break;
                }
                Err(err) => {
                    let delay = backoff.next().unwrap_or_default();
                    tracing::warn!(error = %err, retry_in = ?delay, "input connection failed");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.closing() => break 'outer,
                    }
                }
            }
        }

        // Read until the connection drops or shutdown fires.
        loop {
            let (batch, ack_fn) = tokio::select! {
                read = reader.read_batch() => match read {
                    Ok(read) => read,
                    Err(Error::NotConnected) => {
                        handle.set_connected(false);
                        // Replay everything this connection had in
                        // flight.
                        epoch.cancel();
                        epoch = CancellationToken::new();
                        continue 'outer;
                    }
                    Err(Error::Timeout) => continue,
                    Err(Error::Closed) => break 'outer,
                    Err(err) => {
                        tracing::error!(error = %err, "failed to read batch");
                        continue;
                    }
                },
                _ = shutdown.closing() => break 'outer,
            };

            let (txn, ack_rx) = Transaction::new(batch);
            tokio::select! {
                sent = tx.send(txn) => {
                    if sent.is_err() {
                        // Consumer gone; treat as shutdown.
                        ack_fn(Err(Error::Closed));
                        break 'outer;
                    }
                }
                _ = shutdown.closing() => {
                    ack_fn(Err(Error::Closed));
                    break 'outer;
                }
            }

            let conn_lost = epoch.clone();
            let closing = shutdown.clone();
            tokio::spawn(async move {
                tokio::select! {
                    res = ack_rx => match res {
                        Ok(res) => ack_fn(res),
                        Err(_) => ack_fn(Err(Error::Closed)),
                    },
                    _ = conn_lost.cancelled() => ack_fn(Err(Error::NotConnected)),
                    _ = closing.closing() => ack_fn(Err(Error::Closed)),
                }
            });
        }
    }

    handle.set_connected(false);
    reader.close().await;
    shutdown.complete();
}
