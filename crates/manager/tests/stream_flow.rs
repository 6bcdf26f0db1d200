//! Full-fabric flow: a channel input feeding a pipeline of combinators
//! into a writer-backed output, with acks tracked end to end.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;

use sluice_component::{BoxProcessor, Processor, ProcessorFactory};
use sluice_input::Input;
use sluice_message::{AckResult, Batch, Error, Transaction};
use sluice_output::{ChannelWriter, StreamOutput, WriterOutput};
use sluice_pipeline::Pipeline;
use sluice_processor::Catch;

/// Deletes parts whose body does not contain the needle.
struct KeepContaining(&'static str);

#[async_trait]
impl Processor for KeepContaining {
    async fn process(&mut self, batch: Batch) -> Result<Vec<Batch>, Error> {
        let kept: Batch = batch
            .into_parts()
            .into_iter()
            .filter(|p| String::from_utf8_lossy(p.body()).contains(self.0))
            .collect();
        if kept.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![kept])
    }
}

fn catch_factory() -> ProcessorFactory {
    Box::new(|| {
        Box::new(Catch::new(vec![
            Box::new(KeepContaining("foo")) as BoxProcessor
        ])) as BoxProcessor
    })
}

async fn send_failed(
    tx: &mpsc::Sender<Transaction>,
    body: &str,
) -> tokio::sync::oneshot::Receiver<AckResult> {
    let mut batch = Batch::of([body.to_owned()]);
    batch.get_mut(0).unwrap().fail("foo");
    let (txn, ack) = Transaction::new(batch);
    tx.send(txn).await.unwrap();
    ack
}

#[tokio::test]
async fn recovered_parts_flow_to_the_output_and_ack_upstream() {
    // Input: an in-process channel.
    let (feed_tx, feed_rx) = mpsc::channel(8);
    let input = Input::from_channel(feed_rx);
    let (pipe_in, _input_handle) = input.into_parts();

    // Pipeline: one worker running a catch that recovers parts
    // containing "foo" and filters the rest.
    let (pipe_out_tx, pipe_out_rx) = mpsc::channel(8);
    let pipeline = Pipeline::new(1, vec![catch_factory()]).unwrap();
    let pipeline_handle = pipeline.spawn(pipe_in, pipe_out_tx);

    // Output: a writer delivering into a local channel.
    let (sink_tx, mut sink_rx) = mpsc::channel(8);
    let mut output = WriterOutput::new(ChannelWriter::new(sink_tx));
    output.consume(pipe_out_rx).unwrap();

    let ack1 = send_failed(&feed_tx, "foo bar baz").await;
    let ack2 = send_failed(&feed_tx, "1 2 3 4").await;
    let ack3 = send_failed(&feed_tx, "hello foo world").await;

    // Two batches survive the catch filter and land in the sink, with
    // their markers cleared.
    let mut bodies = Vec::new();
    for _ in 0..2 {
        let batch = timeout(Duration::from_secs(1), sink_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(batch.get(0).unwrap().error().is_none());
        bodies.push(String::from_utf8_lossy(batch.get(0).unwrap().body()).into_owned());
    }
    bodies.sort();
    assert_eq!(bodies, vec!["foo bar baz", "hello foo world"]);

    // Every upstream transaction acked successfully, including the one
    // whose parts were all filtered out.
    for ack in [ack1, ack2, ack3] {
        let res = timeout(Duration::from_secs(1), ack).await.unwrap().unwrap();
        assert_eq!(res, Ok(()));
    }

    // Cooperative teardown, upstream first.
    drop(feed_tx);
    pipeline_handle
        .wait_for_close(Duration::from_secs(1))
        .await
        .unwrap();
    output.wait_for_close(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn shutdown_nacks_transactions_still_in_flight() {
    let (feed_tx, feed_rx) = mpsc::channel(8);
    let input = Input::from_channel(feed_rx);
    let (pipe_in, _handle) = input.into_parts();

    // No output consuming the pipeline, so derived transactions park in
    // the downstream channel.
    let (pipe_out_tx, mut pipe_out_rx) = mpsc::channel(8);
    let pipeline = Pipeline::new(1, vec![]).unwrap();
    let pipeline_handle = pipeline.spawn(pipe_in, pipe_out_tx);

    let (txn, ack) = Transaction::new(Batch::of(["stranded"]));
    feed_tx.send(txn).await.unwrap();

    // Wait until the derived transaction is parked downstream, then
    // shut down and drop it unresolved.
    let parked = timeout(Duration::from_secs(1), pipe_out_rx.recv())
        .await
        .unwrap()
        .unwrap();
    pipeline_handle.close_async();
    pipeline_handle
        .wait_for_close(Duration::from_secs(1))
        .await
        .unwrap();
    drop(parked);
    drop(pipe_out_rx);

    let res = timeout(Duration::from_secs(1), ack).await.unwrap().unwrap();
    assert_eq!(res, Err(Error::Closed));
    drop(feed_tx);
}
