//! Try chain combinator tests.

use sluice_message::Batch;

use crate::testutil::{bodies, AppendBang, DropAll, FailContaining, Uppercase};
use crate::Processor;

use super::*;

#[tokio::test]
async fn clean_parts_run_the_whole_chain() {
    let mut chain = TryChain::new(vec![Box::new(Uppercase), Box::new(AppendBang)]);
    let out = chain.process(Batch::of(["abc", "def"])).await.unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(bodies(&out[0]), vec!["ABC!", "DEF!"]);
}

#[tokio::test]
async fn failed_part_skips_remaining_children() {
    let mut chain = TryChain::new(vec![
        Box::new(FailContaining("bad")),
        Box::new(Uppercase),
    ]);
    let out = chain
        .process(Batch::of(["good one", "bad one", "another good"]))
        .await
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(
        bodies(&out[0]),
        vec!["GOOD ONE", "bad one", "ANOTHER GOOD"]
    );
    assert!(out[0].get(0).unwrap().error().is_none());
    assert!(out[0].get(1).unwrap().error().is_some());
    assert!(out[0].get(2).unwrap().error().is_none());
}

#[tokio::test]
async fn pre_marked_parts_pass_through_untouched() {
    let mut chain = TryChain::new(vec![Box::new(Uppercase)]);

    let mut input = Batch::of(["skip me", "process me"]);
    input.get_mut(0).unwrap().fail("earlier failure");

    let out = chain.process(input).await.unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(bodies(&out[0]), vec!["skip me", "PROCESS ME"]);
    assert!(out[0].get(0).unwrap().error().is_some());
}

#[tokio::test]
async fn filtering_every_part_yields_zero_batches() {
    let mut chain = TryChain::new(vec![Box::new(DropAll), Box::new(Uppercase)]);
    let out = chain.process(Batch::of(["a", "b"])).await.unwrap();
    assert!(out.is_empty());
}
