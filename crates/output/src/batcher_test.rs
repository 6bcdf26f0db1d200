//! Batcher tests, including the count-trigger shutdown flush law.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use sluice_batch::Policy;
use sluice_message::{AckResult, Batch, Transaction};

use super::*;
use crate::{ChannelWriter, WriterOutput};

fn count_policy(count: usize) -> Policy {
    Policy::new(count, 0, None, None, Vec::new())
}

fn channel_output(buffer: usize) -> (WriterOutput, mpsc::Receiver<Batch>) {
    let (batch_tx, batch_rx) = mpsc::channel(buffer);
    (WriterOutput::new(ChannelWriter::new(batch_tx)), batch_rx)
}

async fn send_txn(
    tx: &mpsc::Sender<Transaction>,
    body: &str,
) -> tokio::sync::oneshot::Receiver<AckResult> {
    let (txn, ack) = Transaction::new(Batch::of([body.to_owned()]));
    tx.send(txn).await.unwrap();
    ack
}

#[tokio::test]
async fn count_trigger_emits_batches_and_final_flush_on_close() {
    let (child, mut batches) = channel_output(8);
    let mut batcher = Batcher::new(count_policy(2), child);

    let (tx, rx) = mpsc::channel(8);
    batcher.consume(rx).unwrap();

    // Three single-part transactions against count=2.
    let ack1 = send_txn(&tx, "one").await;
    let ack2 = send_txn(&tx, "two").await;
    let ack3 = send_txn(&tx, "three").await;

    let first = timeout(Duration::from_secs(1), batches.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.len(), 2);

    // Closing the upstream flushes the remainder.
    drop(tx);
    let second = timeout(Duration::from_secs(1), batches.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.len(), 1);

    for ack in [ack1, ack2, ack3] {
        let res = timeout(Duration::from_secs(1), ack).await.unwrap().unwrap();
        assert_eq!(res, Ok(()));
    }

    batcher.wait_for_close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn flush_ack_fans_across_contributors() {
    let (child, mut batches) = channel_output(8);
    let mut batcher = Batcher::new(count_policy(2), child);

    let (tx, rx) = mpsc::channel(8);
    batcher.consume(rx).unwrap();

    let ack_a = send_txn(&tx, "a").await;
    let ack_b = send_txn(&tx, "b").await;

    let merged = timeout(Duration::from_secs(1), batches.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(merged.len(), 2);

    for ack in [ack_a, ack_b] {
        let res = timeout(Duration::from_secs(1), ack).await.unwrap().unwrap();
        assert_eq!(res, Ok(()));
    }
    drop(tx);
}

#[tokio::test(start_paused = true)]
async fn period_trigger_flushes_without_count() {
    let (child, mut batches) = channel_output(8);
    let policy = Policy::new(0, 0, Some(Duration::from_millis(100)), None, Vec::new());
    let mut batcher = Batcher::new(policy, child);

    let (tx, rx) = mpsc::channel(8);
    batcher.consume(rx).unwrap();

    let _ack = send_txn(&tx, "timed").await;

    let flushed = timeout(Duration::from_secs(2), batches.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(flushed.len(), 1);
    drop(tx);
}

#[tokio::test]
async fn second_consume_is_already_started() {
    let (child, _batches) = channel_output(1);
    let mut batcher = Batcher::new(count_policy(1), child);

    let (_tx, rx) = mpsc::channel(1);
    batcher.consume(rx).unwrap();

    let (_tx2, rx2) = mpsc::channel(1);
    assert!(batcher.consume(rx2).is_err());
}

#[tokio::test]
async fn shutdown_flushes_once_more() {
    let (child, mut batches) = channel_output(8);
    let mut batcher = Batcher::new(count_policy(10), child);

    let (tx, rx) = mpsc::channel(8);
    batcher.consume(rx).unwrap();

    let ack = send_txn(&tx, "pending").await;

    batcher.close_async();
    let flushed = timeout(Duration::from_secs(1), batches.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(flushed.len(), 1);

    let res = timeout(Duration::from_secs(1), ack).await.unwrap().unwrap();
    assert_eq!(res, Ok(()));

    batcher.wait_for_close(Duration::from_secs(1)).await.unwrap();
    drop(tx);
}
