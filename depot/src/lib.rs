//! Process-wide resource cache and object pool.
//!
//! Many independent subsystems can obtain, share and recycle
//! instances of arbitrary resource types without managing allocation
//! or lifetime themselves:
//!
//! - [`Handle`] is a shared-ownership reference to one resource
//!   instance with well-defined validity semantics.
//! - [`Pool`] recycles instances of a single type through a bounded
//!   free list instead of reallocating.
//! - [`Registry`] maps application keys to shared instances, evicts
//!   entries it is the sole remaining owner of, and populates missing
//!   keys on demand through registered [`Fulfiller`]s.
//! - [`Cache`] owns one pool per resource type and one registry per
//!   (key, resource) pair and hands out shared references to them.
//!
//! Faults (invalid accesses, missing keys, duplicate creation) are
//! never surfaced as panics or `Result`s; they are delivered to the
//! process-wide hooks in the [`report`] module while the offending
//! call returns a safe fallback value.

pub mod cache;
pub mod handle;
pub mod pool;
pub mod registry;
pub mod report;
pub mod worker;

pub use cache::Cache;
pub use handle::Handle;
pub use pool::Pool;
pub use registry::{Callback, Fulfiller, Registry};
pub use report::{set_report_fn, set_reporter, Fault, Reporter, Severity};
pub use worker::WorkerFulfiller;

/// Capability contract every type managed by a [`Pool`] or
/// [`Registry`] must satisfy.
///
/// `Default` supplies the fresh, uninitialized instance the pool
/// pre-warm and the fallback instance are built from. The cache never
/// inspects a resource beyond these three operations.
pub trait Resource: Default + Send + Sync + 'static {
    /// Parameters consumed by `initialize`. Resources configured by
    /// more than one value use a tuple.
    type Params;

    /// Prepares or reconfigures the instance for use.
    fn initialize(&mut self, params: Self::Params);

    /// Returns the instance to the uninitialized state without
    /// destroying it.
    fn reset(&mut self);

    /// Reports whether the instance is currently ready for use.
    fn initialized(&self) -> bool;
}
