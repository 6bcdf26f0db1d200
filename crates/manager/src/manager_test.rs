//! Manager registry tests, mirroring the construction and lookup rules
//! the rest of the system depends on.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use sluice_component::{BoxProcessor, Processor, Resources};
use sluice_config::{BatchingConfig, ComponentConfig, ResourcesConfig};
use sluice_message::{Batch, Transaction};
use sluice_output::StreamOutput as _;

use super::*;

/// Uppercases part bodies; registered under a custom type in tests that
/// need an observable transformation.
struct Uppercase;

#[async_trait]
impl Processor for Uppercase {
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

fn builders_with_upper() -> Builders {
    let mut builders = Builders::new();
    builders.register_processor("upper", |_, _, _| Ok(Box::new(Uppercase) as BoxProcessor));
    builders
}

fn extra_str(mut conf: ComponentConfig, key: &str, value: &str) -> ComponentConfig {
    conf.extra.insert(
        key.to_owned(),
        serde_json::Value::String(value.to_owned()),
    );
    conf
}

fn cache_conf(label: &str) -> ComponentConfig {
    ComponentConfig::of_type("memory").with_label(label)
}

fn rate_limit_conf(label: &str) -> ComponentConfig {
    ComponentConfig::of_type("local").with_label(label)
}

fn processor_conf(label: &str) -> ComponentConfig {
    ComponentConfig::of_type("noop").with_label(label)
}

#[tokio::test]
async fn probe_and_lookup_caches() {
    let manager = Manager::new();
    let conf = ResourcesConfig {
        resource_caches: vec![cache_conf("foo"), cache_conf("bar")],
        ..Default::default()
    };
    manager.build_resources(&conf).unwrap();

    assert!(manager.probe_cache("foo"));
    assert!(manager.probe_cache("bar"));
    assert!(!manager.probe_cache("baz"));

    manager.cache("foo").unwrap();
    let err = match manager.cache("baz") {
        Err(err) => err,
        Ok(_) => panic!("expected error"),
    };
    assert_eq!(err.to_string(), "unable to locate resource: baz");
}

#[tokio::test]
async fn probe_and_lookup_rate_limits() {
    let manager = Manager::new();
    let conf = ResourcesConfig {
        resource_rate_limits: vec![rate_limit_conf("foo"), rate_limit_conf("bar")],
        ..Default::default()
    };
    manager.build_resources(&conf).unwrap();

    assert!(manager.probe_rate_limit("foo"));
    assert!(!manager.probe_rate_limit("baz"));

    manager.rate_limit("bar").unwrap();
    let err = match manager.rate_limit("baz") {
        Err(err) => err,
        Ok(_) => panic!("expected error"),
    };
    assert_eq!(err.to_string(), "unable to locate resource: baz");
}

#[tokio::test]
async fn duplicate_labels_collide() {
    let manager = Manager::new();
    let conf = ResourcesConfig {
        resource_caches: vec![cache_conf("foo"), cache_conf("foo")],
        ..Default::default()
    };
    let err = manager.build_resources(&conf).unwrap_err();
    assert_eq!(
        err.to_string(),
        "cache resource label 'foo' collides with a previously defined resource"
    );

    let conf = ResourcesConfig {
        resource_rate_limits: vec![rate_limit_conf("dup"), rate_limit_conf("dup")],
        ..Default::default()
    };
    let err = manager.build_resources(&conf).unwrap_err();
    assert_eq!(
        err.to_string(),
        "rate limit resource label 'dup' collides with a previously defined resource"
    );
}

#[tokio::test]
async fn empty_labels_are_rejected() {
    let manager = Manager::new();
    let conf = ResourcesConfig {
        resource_caches: vec![ComponentConfig::of_type("memory")],
        ..Default::default()
    };
    let err = manager.build_resources(&conf).unwrap_err();
    assert_eq!(err.to_string(), "cache resource has an empty label");

    let conf = ResourcesConfig {
        resource_processors: vec![ComponentConfig::of_type("noop")],
        ..Default::default()
    };
    let err = manager.build_resources(&conf).unwrap_err();
    assert_eq!(err.to_string(), "processor resource has an empty label");
}

#[tokio::test]
async fn unknown_types_are_rejected() {
    let manager = Manager::new();
    let conf = ResourcesConfig {
        resource_caches: vec![ComponentConfig::of_type("notexist").with_label("bad")],
        ..Default::default()
    };
    let err = manager.build_resources(&conf).unwrap_err();
    assert!(err.to_string().contains("invalid component type"));
}

#[tokio::test]
async fn late_bound_resource_lookup() {
    let manager = Manager::new();

    // A resource processor can be built while its referent is missing.
    let indirect_conf = {
        let mut conf = ComponentConfig::of_type("resource").with_label("indirect");
        conf.extra.insert(
            "resource".to_owned(),
            serde_json::Value::String("real".to_owned()),
        );
        conf
    };
    manager.add_processor_from_config(&indirect_conf).unwrap();

    // Using it before the referent exists fails with the locate error.
    let shared = manager.processor("indirect").unwrap();
    let err = shared
        .lock()
        .await
        .process(Batch::of(["payload"]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "unable to locate resource: real");

    // After the referent is registered the same processor succeeds.
    manager
        .add_processor_from_config(&processor_conf("real"))
        .unwrap();
    let out = shared
        .lock()
        .await
        .process(Batch::of(["payload"]))
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
}

#[tokio::test]
async fn channel_input_is_built_from_config_and_fed_through_its_pipe() {
    let manager = Manager::new();
    let conf = extra_str(
        ComponentConfig::of_type("channel").with_label("ingest"),
        "pipe",
        "flow",
    );

    let mut input = manager.new_input(&conf).unwrap();
    let pipe = manager.get_pipe("flow").unwrap();

    let (txn, ack) = Transaction::new(Batch::of(["through the pipe"]));
    pipe.send(txn).await.unwrap();

    let got = timeout(Duration::from_secs(1), input.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        got.batch().get(0).unwrap().body().as_ref(),
        b"through the pipe"
    );
    got.ack(Ok(()));
    assert_eq!(
        timeout(Duration::from_secs(1), ack).await.unwrap().unwrap(),
        Ok(())
    );
}

#[tokio::test]
async fn channel_input_defaults_its_pipe_to_the_label() {
    let manager = Manager::new();
    let conf = ComponentConfig::of_type("channel").with_label("ingest");

    let _input = manager.new_input(&conf).unwrap();
    assert!(manager.get_pipe("ingest").is_some());

    let anonymous = ComponentConfig::of_type("channel");
    let err = manager.new_input(&anonymous).unwrap_err();
    assert!(err.to_string().contains("'pipe' name or a label"));
}

#[tokio::test]
async fn channel_output_writes_into_its_pipe() {
    let manager = Manager::new();

    // The destination pipe is owned by a channel input.
    let sink_conf = extra_str(
        ComponentConfig::of_type("channel").with_label("sink"),
        "pipe",
        "egress",
    );
    let mut sink = manager.new_input(&sink_conf).unwrap();

    let out_conf = extra_str(ComponentConfig::of_type("channel"), "pipe", "egress");
    let mut output = manager.new_output(&out_conf).unwrap();

    let (tx, rx) = tokio::sync::mpsc::channel(4);
    output.consume(rx).unwrap();

    let (txn, ack) = Transaction::new(Batch::of(["outbound"]));
    tx.send(txn).await.unwrap();

    let got = timeout(Duration::from_secs(1), sink.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.batch().get(0).unwrap().body().as_ref(), b"outbound");
    got.ack(Ok(()));

    assert_eq!(
        timeout(Duration::from_secs(1), ack).await.unwrap().unwrap(),
        Ok(())
    );
    drop(tx);
}

#[tokio::test]
async fn catch_and_fallback_are_built_from_config() {
    let manager = Manager::with_builders(builders_with_upper());

    let mut catch_conf = ComponentConfig::of_type("catch");
    catch_conf.processors = vec![ComponentConfig::of_type("upper")];
    let mut catch = manager.new_processor(&catch_conf).unwrap();

    let mut batch = Batch::of(["fix me", "leave me"]);
    batch.get_mut(0).unwrap().fail("boom");
    let out = catch.process(batch).await.unwrap();
    assert_eq!(out[0].get(0).unwrap().body().as_ref(), b"FIX ME");
    assert_eq!(out[0].get(1).unwrap().body().as_ref(), b"leave me");
    assert!(out[0].get(0).unwrap().error().is_none());

    for alias in ["try", "fallback"] {
        let mut conf = ComponentConfig::of_type(alias);
        conf.processors = vec![ComponentConfig::of_type("upper")];
        let mut chain = manager.new_processor(&conf).unwrap();
        let out = chain.process(Batch::of(["abc"])).await.unwrap();
        assert_eq!(out[0].get(0).unwrap().body().as_ref(), b"ABC");
    }
}

#[tokio::test]
async fn input_processors_from_config_run_before_the_consumer() {
    let manager = Manager::with_builders(builders_with_upper());

    let mut conf = extra_str(
        ComponentConfig::of_type("channel").with_label("ingest"),
        "pipe",
        "proc-flow",
    );
    conf.processors = vec![ComponentConfig::of_type("upper")];

    let mut input = manager.new_input(&conf).unwrap();
    let pipe = manager.get_pipe("proc-flow").unwrap();

    let (txn, ack) = Transaction::new(Batch::of(["hello"]));
    pipe.send(txn).await.unwrap();

    let got = timeout(Duration::from_secs(1), input.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.batch().get(0).unwrap().body().as_ref(), b"HELLO");
    got.ack(Ok(()));
    assert_eq!(
        timeout(Duration::from_secs(1), ack).await.unwrap().unwrap(),
        Ok(())
    );
}

#[tokio::test]
async fn output_processors_and_batching_from_config() {
    let manager = Manager::with_builders(builders_with_upper());

    let sink_conf = extra_str(
        ComponentConfig::of_type("channel").with_label("sink"),
        "pipe",
        "batched",
    );
    let mut sink = manager.new_input(&sink_conf).unwrap();

    let mut out_conf = extra_str(ComponentConfig::of_type("channel"), "pipe", "batched");
    out_conf.processors = vec![ComponentConfig::of_type("upper")];
    out_conf.batching = Some(BatchingConfig {
        count: 2,
        ..Default::default()
    });
    let mut output = manager.new_output(&out_conf).unwrap();

    let (tx, rx) = tokio::sync::mpsc::channel(4);
    output.consume(rx).unwrap();

    for body in ["one", "two"] {
        let (txn, _ack) = Transaction::new(Batch::of([body]));
        tx.send(txn).await.unwrap();
    }

    // Both parts arrive as one batch, uppercased before batching.
    let got = timeout(Duration::from_secs(1), sink.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.batch().len(), 2);
    assert_eq!(got.batch().get(0).unwrap().body().as_ref(), b"ONE");
    assert_eq!(got.batch().get(1).unwrap().body().as_ref(), b"TWO");
    got.ack(Ok(()));
    drop(tx);
}

#[tokio::test]
async fn batching_check_expressions_are_rejected_at_construction() {
    let manager = Manager::new();
    let mut conf = extra_str(ComponentConfig::of_type("channel"), "pipe", "nope");
    conf.batching = Some(BatchingConfig {
        check: Some("errored()".to_owned()),
        ..Default::default()
    });
    let err = match manager.new_output(&conf) {
        Err(err) => err,
        Ok(_) => panic!("expected error"),
    };
    assert!(err.to_string().contains("expression layer"));
}

#[tokio::test]
async fn close_clears_every_registry() {
    let manager = Manager::new();
    let conf = ResourcesConfig {
        resource_caches: vec![cache_conf("c")],
        resource_rate_limits: vec![rate_limit_conf("r")],
        resource_processors: vec![processor_conf("p")],
        ..Default::default()
    };
    manager.build_resources(&conf).unwrap();

    manager.close(Duration::from_secs(1)).await.unwrap();
    assert!(!manager.probe_cache("c"));
    assert!(!manager.probe_rate_limit("r"));
    assert!(!manager.probe_processor("p"));
}
