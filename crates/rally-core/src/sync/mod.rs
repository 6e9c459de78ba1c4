//! Differential sync between a local snapshot and the remote store

pub mod diff;
mod engine;
mod report;

pub use diff::{compute, Diff, Update};
pub use engine::{SyncEngine, SyncOutcome};
pub use report::{IdRemap, SkipReason, SyncFailure, SyncOp, SyncReport};
