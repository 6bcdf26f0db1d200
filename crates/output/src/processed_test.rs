//! Processor-prefixed output tests.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;

use sluice_message::{Batch, Transaction};
use sluice_processor::BoxProcessor;

use super::*;
use crate::{ChannelWriter, WriterOutput};

/// Uppercases part bodies.
struct Uppercase;

#[async_trait]
impl sluice_component::Processor for Uppercase {
    async fn process(&mut self, mut batch: Batch) -> Result<Vec<Batch>, Error> {
        batch
            .try_for_each_mut(|_, part| {
                let upper = String::from_utf8_lossy(part.body()).to_uppercase();
                part.set_body(upper.into_bytes());
                Ok::<(), Error>(())
            })
            .ok();
        Ok(vec![batch])
    }
}

/// Filters everything out.
struct DropAll;

#[async_trait]
impl sluice_component::Processor for DropAll {
    async fn process(&mut self, _batch: Batch) -> Result<Vec<Batch>, Error> {
        Ok(Vec::new())
    }
}

fn channel_output(buffer: usize) -> (WriterOutput, mpsc::Receiver<Batch>) {
    let (batch_tx, batch_rx) = mpsc::channel(buffer);
    (WriterOutput::new(ChannelWriter::new(batch_tx)), batch_rx)
}

#[tokio::test]
async fn chain_runs_before_the_child_output() {
    let (child, mut batches) = channel_output(4);
    let mut output = Processed::new(vec![Box::new(Uppercase) as BoxProcessor], child);

    let (tx, rx) = mpsc::channel(4);
    output.consume(rx).unwrap();

    let (txn, ack) = Transaction::new(Batch::of(["hello"]));
    tx.send(txn).await.unwrap();

    let written = timeout(Duration::from_secs(1), batches.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(written.get(0).unwrap().body().as_ref(), b"HELLO");

    let res = timeout(Duration::from_secs(1), ack).await.unwrap().unwrap();
    assert_eq!(res, Ok(()));
    drop(tx);
}

#[tokio::test]
async fn fully_filtered_batches_ack_without_writing() {
    let (child, mut batches) = channel_output(4);
    let mut output = Processed::new(vec![Box::new(DropAll) as BoxProcessor], child);

    let (tx, rx) = mpsc::channel(4);
    output.consume(rx).unwrap();

    let (txn, ack) = Transaction::new(Batch::of(["gone"]));
    tx.send(txn).await.unwrap();

    let res = timeout(Duration::from_secs(1), ack).await.unwrap().unwrap();
    assert_eq!(res, Ok(()));

    drop(tx);
    output.wait_for_close(Duration::from_secs(1)).await.unwrap();
    assert!(batches.recv().await.is_none());
}

#[tokio::test]
async fn second_consume_is_already_started() {
    let (child, _batches) = channel_output(1);
    let mut output = Processed::new(Vec::new(), child);

    let (_tx, rx) = mpsc::channel(1);
    output.consume(rx).unwrap();
    let (_tx2, rx2) = mpsc::channel(1);
    assert_eq!(output.consume(rx2).unwrap_err(), Error::AlreadyStarted);
}

#[tokio::test]
async fn closing_releases_the_child() {
    let (child, _batches) = channel_output(1);
    let mut output = Processed::new(Vec::new(), child);

    let (tx, rx) = mpsc::channel(1);
    output.consume(rx).unwrap();

    output.close_async();
    output.wait_for_close(Duration::from_secs(1)).await.unwrap();
    drop(tx);
}
