//! Sluice - API
//!
//! The dynamic CRUD HTTP surface for runtime-managed inputs and outputs.
//! Built on Axum; the API layer owns no components, only the
//! configuration documents of started endpoints and a pair of callbacks
//! into the hosting stream:
//!
//! - `GET  /inputs` - map of running input labels to uptime in
//!   nanoseconds
//! - `GET  /inputs/{id}` - the stored configuration document
//! - `POST /inputs/{id}` - create or replace from a JSON configuration
//! - `DELETE /inputs/{id}` - close and remove
//!
//! plus symmetrical `/outputs` endpoints. Mount the router under any
//! path prefix with `Router::nest`.

mod dynamic;

pub use dynamic::{dynamic_router, DeleteFn, DynamicApi, UpdateFn};
