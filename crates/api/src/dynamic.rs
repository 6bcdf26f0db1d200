//! Dynamic endpoint registry and its Axum routes.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;

use sluice_message::Error;

#[cfg(test)]
#[path = "dynamic_test.rs"]
mod tests;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Callback invoked with `(label, config)` when an endpoint is created
/// or replaced. The hosting stream builds the component and splices it
/// in.
pub type UpdateFn = Arc<dyn Fn(String, Value) -> BoxFuture<Result<(), Error>> + Send + Sync>;

/// Callback invoked with the label of an endpoint being removed.
pub type DeleteFn = Arc<dyn Fn(String) -> BoxFuture<Result<(), Error>> + Send + Sync>;

struct Item {
    config: Value,
    started_at: Instant,
}

/// The registry behind one dynamic endpoint set (inputs or outputs).
///
/// Holds the configuration document and start time of every running
/// endpoint; mutation goes through the update/delete callbacks so the
/// API layer never owns components.
pub struct DynamicApi {
    items: Mutex<HashMap<String, Item>>,
    on_update: UpdateFn,
    on_delete: DeleteFn,
}

impl DynamicApi {
    /// A registry dispatching mutations to the given callbacks.
    pub fn new(on_update: UpdateFn, on_delete: DeleteFn) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(HashMap::new()),
            on_update,
            on_delete,
        })
    }

    /// Record that `label` is running with `config`. Invoked after a
    /// successful update, and available to fan-in/fan-out observability
    /// callbacks.
    pub fn started(&self, label: &str, config: Value) {
        self.items.lock().expect("dynamic registry lock").insert(
            label.to_owned(),
            Item {
                config,
                started_at: Instant::now(),
            },
        );
    }

    /// Record that `label` has stopped.
    pub fn stopped(&self, label: &str) {
        self.items
            .lock()
            .expect("dynamic registry lock")
            .remove(label);
    }

    /// Labels of running endpoints mapped to uptime in nanoseconds.
    pub fn uptimes(&self) -> HashMap<String, u64> {
        self.items
            .lock()
            .expect("dynamic registry lock")
            .iter()
            .map(|(label, item)| (label.clone(), item.started_at.elapsed().as_nanos() as u64))
            .collect()
    }

    /// The stored configuration for `label`, if running.
    pub fn config(&self, label: &str) -> Option<Value> {
        self.items
            .lock()
            .expect("dynamic registry lock")
            .get(label)
            .map(|item| item.config.clone())
    }
}

/// Routes for a pair of dynamic endpoint sets. Nest the result under a
/// prefix to relocate the surface.
pub fn dynamic_router(inputs: Arc<DynamicApi>, outputs: Arc<DynamicApi>) -> Router {
    let input_routes = Router::new()
        .route("/inputs", get(list))
        .route(
            "/inputs/{id}",
            get(get_config).post(update).delete(remove),
        )
        .with_state(inputs);
    let output_routes = Router::new()
        .route("/outputs", get(list))
        .route(
            "/outputs/{id}",
            get(get_config).post(update).delete(remove),
        )
        .with_state(outputs);
    input_routes.merge(output_routes)
}

async fn list(State(api): State<Arc<DynamicApi>>) -> Json<HashMap<String, u64>> {
    Json(api.uptimes())
}

async fn get_config(
    State(api): State<Arc<DynamicApi>>,
    Path(id): Path<String>,
) -> Response {
    match api.config(&id) {
        Some(config) => Json(config).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn update(
    State(api): State<Arc<DynamicApi>>,
    Path(id): Path<String>,
    body: String,
) -> Response {
    let config: Value = match serde_json::from_str(&body) {
        Ok(config) => config,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, format!("invalid config document: {err}"))
                .into_response();
        }
    };

    match (api.on_update)(id.clone(), config.clone()).await {
        Ok(()) => {
            api.started(&id, config);
            StatusCode::OK.into_response()
        }
        Err(err) => {
            tracing::error!(endpoint = %id, error = %err, "failed to update dynamic endpoint");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn remove(State(api): State<Arc<DynamicApi>>, Path(id): Path<String>) -> Response {
    match (api.on_delete)(id.clone()).await {
        Ok(()) => {
            api.stopped(&id);
            StatusCode::OK.into_response()
        }
        Err(Error::ResourceNotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            tracing::error!(endpoint = %id, error = %err, "failed to delete dynamic endpoint");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}
