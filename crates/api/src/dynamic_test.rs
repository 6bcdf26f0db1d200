//! Dynamic registry unit tests.

use serde_json::json;

use super::*;

fn stub_api() -> Arc<DynamicApi> {
    let on_update: UpdateFn = Arc::new(|_, _| Box::pin(async { Ok(()) }));
    let on_delete: DeleteFn = Arc::new(|_| Box::pin(async { Ok(()) }));
    DynamicApi::new(on_update, on_delete)
}

#[tokio::test]
async fn started_endpoints_are_listed_with_uptime() {
    let api = stub_api();
    assert!(api.uptimes().is_empty());

    api.started("a", json!({"type": "channel"}));
    api.started("b", json!({"type": "channel"}));

    let uptimes = api.uptimes();
    assert_eq!(uptimes.len(), 2);
    assert!(uptimes.contains_key("a"));
    assert!(uptimes.contains_key("b"));
}

#[tokio::test]
async fn stopped_endpoints_disappear() {
    let api = stub_api();
    api.started("a", json!({}));
    api.stopped("a");
    assert!(api.uptimes().is_empty());
    assert!(api.config("a").is_none());
}

#[tokio::test]
async fn config_round_trips() {
    let api = stub_api();
    let conf = json!({"type": "channel", "capacity": 8});
    api.started("in", conf.clone());
    assert_eq!(api.config("in"), Some(conf));
}

#[tokio::test]
async fn restart_replaces_the_config() {
    let api = stub_api();
    api.started("in", json!({"capacity": 1}));
    api.started("in", json!({"capacity": 2}));
    assert_eq!(api.config("in"), Some(json!({"capacity": 2})));
    assert_eq!(api.uptimes().len(), 1);
}
