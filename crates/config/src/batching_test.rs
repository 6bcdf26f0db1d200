//! Batching config tests.

use super::*;

#[test]
fn noop_when_everything_disabled() {
    let conf = BatchingConfig::default();
    assert!(conf.is_noop());
}

#[test]
fn any_trigger_defeats_noop() {
    let count = BatchingConfig {
        count: 1,
        ..Default::default()
    };
    assert!(!count.is_noop());

    let check = BatchingConfig {
        check: Some("errored()".to_owned()),
        ..Default::default()
    };
    assert!(!check.is_noop());

    let procs = BatchingConfig {
        processors: vec![ComponentConfig::of_type("noop")],
        ..Default::default()
    };
    assert!(!procs.is_noop());
}

#[test]
fn period_parses_humantime() {
    let conf: BatchingConfig =
        serde_json::from_str(r#"{"period": "250ms"}"#).unwrap();
    assert_eq!(conf.period, Some(std::time::Duration::from_millis(250)));
    assert!(!conf.is_noop());
}
