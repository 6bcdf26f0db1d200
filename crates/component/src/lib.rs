//! Sluice - Component
//!
//! Contracts and lifecycle primitives shared by every component kind:
//! the [`Processor`] trait and its per-slot factories, the [`Cache`] and
//! [`RateLimit`] resource contracts, the late-bound [`Resources`] lookup
//! trait, cooperative [`ShutdownSignal`] handling and the shared
//! [`Backoff`] retry policy.
//!
//! Cross-component references are label lookups through [`Resources`],
//! never direct links, so resources may be declared in any order and
//! looked up lazily.

mod backoff;
mod cache;
mod processor;
mod rate_limit;
mod resources;
mod shutdown;

pub use backoff::Backoff;
pub use cache::{Cache, MemoryCache};
pub use processor::{BoxProcessor, Processor, ProcessorFactory};
pub use rate_limit::{LocalRateLimit, RateLimit};
pub use resources::{Resources, SharedProcessor};
pub use shutdown::ShutdownSignal;
