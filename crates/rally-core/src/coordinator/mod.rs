//! Storage facade for the application
//!
//! `StorageCoordinator` owns the local cache, the remote client, and the
//! collection registry. Initializing a collection loads its snapshot from the
//! remote when possible, runs the one-time migration, and falls back to the
//! cache on any remote failure. Cached entries that never reached the remote
//! are kept on top of the remote snapshot. Initialization never fails.

mod collection;
mod health;
mod observer;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub use collection::{Collection, WriteOp, WriteReceipt};
pub use health::HealthReport;
pub use observer::{SyncEvent, SyncObserver, TracingObserver};

use crate::cache::LocalCache;
use crate::config::StorageConfig;
use crate::error::Result;
use crate::migration::{MigrationManager, MigrationOutcome};
use crate::models::Entity;
use crate::registry::{CollectionDescriptor, CollectionKind, Registry};
use crate::remote::{ClientState, RemoteClient, RestConnector};
use crate::sync::SyncEngine;

#[derive(Clone)]
pub struct StorageCoordinator {
    cache: LocalCache,
    remote: RemoteClient,
    registry: Registry,
    migrations: MigrationManager,
    observer: Arc<dyn SyncObserver>,
}

impl fmt::Debug for StorageCoordinator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StorageCoordinator")
            .field("cache", &self.cache)
            .field("remote", &self.remote)
            .finish_non_exhaustive()
    }
}

impl StorageCoordinator {
    /// Build a coordinator from its parts with the standard registry.
    pub fn new(
        cache: LocalCache,
        remote: RemoteClient,
        observer: Arc<dyn SyncObserver>,
    ) -> Result<Self> {
        Ok(Self::with_registry(cache, remote, Registry::standard()?, observer))
    }

    pub fn with_registry(
        cache: LocalCache,
        remote: RemoteClient,
        registry: Registry,
        observer: Arc<dyn SyncObserver>,
    ) -> Self {
        Self {
            migrations: MigrationManager::new(cache.clone()),
            cache,
            remote,
            registry,
            observer,
        }
    }

    /// Open the cache at the configured path and connect lazily to the
    /// configured remote. Missing credentials leave the remote disabled.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        let cache = LocalCache::open(&config.cache_path).await?;
        if !config.is_remote_configured() {
            tracing::info!("No remote store configured, running from the local cache");
        }
        let registry = Registry::with_local_only(&config.local_only)?;
        let connector = RestConnector::new(config.remote.clone(), config.client);
        let remote = RemoteClient::new(Arc::new(connector), config.client);
        Ok(Self::with_registry(
            cache,
            remote,
            registry,
            Arc::new(TracingObserver),
        ))
    }

    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    pub const fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub const fn remote(&self) -> &RemoteClient {
        &self.remote
    }

    /// Load a collection and start its sync worker.
    pub async fn initialize<T: Entity>(&self) -> Collection<T> {
        let descriptor = self.registry.get(T::KIND);
        let local = self.load_cached::<T>(&descriptor).await;

        let (snapshot, baseline) = if descriptor.remote_capable {
            self.load_remote(&descriptor, local).await
        } else {
            (local, None)
        };
        tracing::debug!(
            "Initialized {} with {} entries",
            descriptor.key(),
            snapshot.len()
        );

        Collection::start(
            descriptor,
            snapshot,
            baseline,
            self.cache.clone(),
            self.remote.clone(),
            Arc::clone(&self.observer),
        )
    }

    pub fn health(&self) -> HealthReport {
        let client_state = self.remote.state();
        let remote_disabled = self.remote.is_disabled();
        HealthReport {
            remote_active: !remote_disabled && client_state == ClientState::Ready,
            remote_disabled,
            client_state,
            last_error: self.remote.last_error(),
            consecutive_transport_errors: self.remote.consecutive_transport_errors(),
            cache_path: self.cache.path().map(Path::to_path_buf),
        }
    }

    /// Drop the remote connection; the next access reconnects.
    pub async fn reset_remote(&self) {
        self.remote.reset().await;
        self.observer.on_event(&SyncEvent::ClientReset);
    }

    async fn load_cached<T: Entity>(&self, descriptor: &CollectionDescriptor) -> Vec<T> {
        match self.cache.load_snapshot(descriptor.key()).await {
            Ok(loaded) => {
                if loaded.discarded {
                    self.observer.on_event(&SyncEvent::CacheReset {
                        collection: descriptor.kind,
                    });
                }
                loaded.items
            }
            Err(error) => {
                tracing::warn!("Failed to read cached {}: {}", descriptor.key(), error);
                Vec::new()
            }
        }
    }

    /// Returns the snapshot to serve and, when known, the remote baseline.
    async fn load_remote<T: Entity>(
        &self,
        descriptor: &CollectionDescriptor,
        local: Vec<T>,
    ) -> (Vec<T>, Option<Vec<T>>) {
        let Some(handle) = self.remote.handle().await else {
            let error = self
                .remote
                .last_error()
                .unwrap_or_else(|| "remote store unavailable".to_string());
            self.fall_back(descriptor.kind, error);
            return (local, None);
        };

        let remote = match SyncEngine::new(*descriptor).fetch::<T>(&handle).await {
            Ok(remote) => remote,
            Err(error) => {
                self.fall_back(descriptor.kind, error.to_string());
                return (local, None);
            }
        };

        let migration = self
            .migrations
            .run(descriptor, &handle, remote, &local)
            .await;
        if migration.outcome.ran() {
            self.observer.on_event(&SyncEvent::Migration {
                collection: descriptor.kind,
                outcome: migration.outcome.clone(),
            });
        }

        if !migration.pending.is_empty() {
            tracing::info!(
                "Keeping {} unsynced {} entries from the cache",
                migration.pending.len(),
                descriptor.key()
            );
        }
        let served = migration.served();
        if let Err(error) = self.cache.store_snapshot(descriptor.key(), &served).await {
            tracing::warn!("Failed to cache {}: {}", descriptor.key(), error);
        }

        // pending entries stay out of the baseline so the first diff pushes them
        let reread_failed = matches!(
            migration.outcome,
            MigrationOutcome::Migrated {
                reread_failed: true,
                ..
            }
        );
        let baseline = (!reread_failed).then_some(migration.snapshot);
        (served, baseline)
    }

    fn fall_back(&self, collection: CollectionKind, error: String) {
        self.observer
            .on_event(&SyncEvent::RemoteFallback { collection, error });
    }
}
