//! Shared primitives used by the cache crates.

pub mod latch;
