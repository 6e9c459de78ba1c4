//! rally-core - Core library for Rally
//!
//! This crate contains the models, the local cache, the remote mirror, and
//! the differential sync engine used by every Rally interface. Applications
//! talk to `StorageCoordinator`; everything below it is exposed for tests
//! and tooling.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod migration;
pub mod models;
pub mod registry;
pub mod remote;
pub mod sync;
pub mod transform;
pub mod util;

pub use cache::LocalCache;
pub use config::{ClientSettings, RemoteConfig, StorageConfig};
pub use coordinator::{
    Collection, HealthReport, StorageCoordinator, SyncEvent, SyncObserver, TracingObserver,
    WriteOp, WriteReceipt,
};
pub use error::{Error, Result};
pub use models::Entity;
pub use registry::{CollectionDescriptor, CollectionKind, Registry};
pub use remote::{ClientState, RemoteClient, RemoteError};
pub use sync::SyncReport;
