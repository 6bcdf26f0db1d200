//! Sluice - Config
//!
//! Configuration envelope types for components and resources. Parsing a
//! configuration *file* (and documenting its schema) is an external
//! concern; this crate only models the language-neutral envelope every
//! component shares: a `type` discriminator, a `label`, an optional
//! `processors` prefix, and for outputs an optional `batching` policy.
//!
//! Payload fields beyond the envelope are kept as an opaque JSON map and
//! interpreted by the factory registered for the component's type.

mod batching;
mod component;
mod resources;

pub use batching::BatchingConfig;
pub use component::ComponentConfig;
pub use resources::ResourcesConfig;
