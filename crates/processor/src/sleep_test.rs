//! Sleep combinator tests.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use sluice_message::{Batch, PartContext};

use crate::expr::constant;
use crate::Processor;

use super::*;

#[tokio::test]
async fn short_sleep_passes_batch_through() {
    let mut sleep = Sleep::new(constant("1ns"), CancellationToken::new());
    let out = sleep.process(Batch::of(["hello world"])).await.unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].get(0).unwrap().body().as_ref(), b"hello world");
}

#[tokio::test]
async fn sleeps_for_at_least_the_period() {
    let mut sleep = Sleep::new(constant("200ms"), CancellationToken::new());

    let before = Instant::now();
    let out = sleep.process(Batch::of(["hello world"])).await.unwrap();
    assert_eq!(out.len(), 1);
    assert!(before.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn close_cancels_in_flight_sleep() {
    let token = CancellationToken::new();
    let mut sleep = Sleep::new(constant("10s"), token.clone());

    let handle = tokio::spawn(async move {
        sleep.process(Batch::of(["hello world"])).await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();
    token.cancel();

    let out = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("sleep did not observe cancellation")
        .unwrap()
        .unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn cancelled_part_context_skips_the_pause() {
    let cancelled = CancellationToken::new();
    cancelled.cancel();

    let mut batch = Batch::new();
    batch.push(
        sluice_message::Part::from("hello world")
            .with_context(PartContext::with_cancel(cancelled)),
    );

    let mut sleep = Sleep::new(constant("10s"), CancellationToken::new());
    let before = Instant::now();
    let out = sleep.process(batch).await.unwrap();

    assert_eq!(out.len(), 1);
    assert!(before.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn unparsable_duration_passes_batch_through() {
    let mut sleep = Sleep::new(constant("not a duration"), CancellationToken::new());
    let out = sleep.process(Batch::of(["hello world"])).await.unwrap();
    assert_eq!(out.len(), 1);
}
