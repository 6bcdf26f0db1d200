//! Sluice - Manager
//!
//! The component registry. A manager owns labelled resource components
//! (caches, rate limits, processors, inputs, outputs) for the lifetime
//! of the process, enforces label uniqueness per kind, and hands out
//! late-bound handles through the `Resources` trait so components can
//! reference one another by label in any declaration order.
//!
//! # Design
//!
//! - Every kind has a factory registry mapping `type` discriminators to
//!   builders, the way configuration-driven construction is done across
//!   the workspace.
//! - Lookup failures return `unable to locate resource: <label>` without
//!   blocking, so early accesses during initialisation can be retried
//!   once everything is up.
//! - The pipe registry maps names to in-process transaction senders;
//!   unregistering is a no-op unless the exact sender is presented.

mod builders;
mod manager;
mod pipes;

pub use builders::{
    Builders, CacheBuilder, InputBuilder, OutputBuilder, ProcessorBuilder, RateLimitBuilder,
};
pub use manager::{Manager, SharedInput, SharedOutput};
pub use pipes::Pipes;
