//! Switch combinator tests.

use std::sync::Arc;

use sluice_message::{Batch, Part};

use crate::expr::PartPredicate;
use crate::testutil::{bodies, AppendBang, DropAll, Uppercase};
use crate::Processor;

use super::*;

fn contains(needle: &'static str) -> PartPredicate {
    Arc::new(move |part: &Part| String::from_utf8_lossy(part.body()).contains(needle))
}

#[tokio::test]
async fn first_match_wins_and_order_is_preserved() {
    let mut switch = Switch::new(vec![
        SwitchCase::new(Some(contains("a")), vec![Box::new(Uppercase)]),
        SwitchCase::new(Some(contains("b")), vec![Box::new(AppendBang)]),
    ]);

    let out = switch
        .process(Batch::of(["abc", "bcd", "zzz"]))
        .await
        .unwrap();

    assert_eq!(out.len(), 1);
    // "abc" matches the first case even though it also contains "b".
    assert_eq!(bodies(&out[0]), vec!["ABC", "bcd!", "zzz"]);
}

#[tokio::test]
async fn unmatched_parts_pass_through_unchanged() {
    let mut switch = Switch::new(vec![SwitchCase::new(
        Some(contains("match")),
        vec![Box::new(Uppercase)],
    )]);

    let out = switch.process(Batch::of(["nope", "nada"])).await.unwrap();
    assert_eq!(bodies(&out[0]), vec!["nope", "nada"]);
}

#[tokio::test]
async fn case_without_check_claims_everything() {
    let mut switch = Switch::new(vec![SwitchCase::new(None, vec![Box::new(Uppercase)])]);
    let out = switch.process(Batch::of(["a", "b"])).await.unwrap();
    assert_eq!(bodies(&out[0]), vec!["A", "B"]);
}

#[tokio::test]
async fn fall_through_pipes_output_into_next_case() {
    let mut switch = Switch::new(vec![
        SwitchCase::new(Some(contains("x")), vec![Box::new(Uppercase)])
            .with_fall_through(true),
        SwitchCase::new(Some(contains("never")), vec![Box::new(AppendBang)]),
    ]);

    let out = switch.process(Batch::of(["x ray", "plain"])).await.unwrap();
    // The fall-through part reaches the second case without its check.
    assert_eq!(bodies(&out[0]), vec!["X RAY!", "plain"]);
}

#[tokio::test]
async fn case_may_filter_its_group() {
    let mut switch = Switch::new(vec![SwitchCase::new(
        Some(contains("drop")),
        vec![Box::new(DropAll)],
    )]);

    let out = switch
        .process(Batch::of(["drop me", "keep me"]))
        .await
        .unwrap();
    assert_eq!(bodies(&out[0]), vec!["keep me"]);
}

#[tokio::test]
async fn filtering_every_part_yields_zero_batches() {
    let mut switch = Switch::new(vec![SwitchCase::new(None, vec![Box::new(DropAll)])]);
    let out = switch.process(Batch::of(["a", "b"])).await.unwrap();
    assert!(out.is_empty());
}
