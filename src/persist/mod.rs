//! Persistence of transient trees
//!
//! `Materializer` walks a finished TransientDocument once and writes it
//! through a `StorageBroker`. Wrapper objects for the persistent nodes come
//! from a `NodePool` owned by that single store.

pub mod materializer;
pub mod pool;

pub use materializer::{Materializer, StoreSummary};
pub use pool::{NodePool, Poolable, Reset};
