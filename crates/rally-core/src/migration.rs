//! One-time upload of pre-existing local data into an empty remote collection
//!
//! Migration runs only when the remote collection is empty, the local cache
//! holds data, and the collection's `<key>_migrated` marker is absent. The
//! marker is written after every attempt, including partial failures.

use std::collections::HashSet;

use serde::Serialize;

use crate::cache::LocalCache;
use crate::models::Entity;
use crate::registry::CollectionDescriptor;
use crate::remote::RemoteHandle;
use crate::sync::{SyncEngine, SyncOutcome};
use crate::util::is_canonical_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationSkip {
    AlreadyMigrated,
    RemoteNotEmpty,
    NothingLocal,
    /// The marker could not be read; skipping avoids a second upload
    MarkerUnreadable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationOutcome {
    Skipped(MigrationSkip),
    Migrated {
        inserted: usize,
        duplicates: usize,
        failed: usize,
        /// The post-migration re-read failed and the local rows were kept
        reread_failed: bool,
    },
}

impl MigrationOutcome {
    pub const fn ran(&self) -> bool {
        matches!(self, Self::Migrated { .. })
    }
}

/// The outcome plus the remote state the collection was loaded from
#[derive(Debug, Clone)]
pub struct Migration<T> {
    pub outcome: MigrationOutcome,
    /// What the remote holds as far as this run knows
    pub snapshot: Vec<T>,
    /// Local entries the remote does not hold yet. They are served on top
    /// of `snapshot` and pushed by the next sync.
    pub pending: Vec<T>,
}

impl<T: Entity> Migration<T> {
    /// `snapshot` followed by `pending`
    pub fn served(&self) -> Vec<T> {
        self.snapshot
            .iter()
            .chain(&self.pending)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct MigrationManager {
    cache: LocalCache,
}

impl MigrationManager {
    pub const fn new(cache: LocalCache) -> Self {
        Self { cache }
    }

    /// Migrate `local` into the remote collection if every gate condition holds.
    ///
    /// `remote` is the collection as just loaded from the remote store; it is
    /// returned unchanged when migration is skipped. Cached entries with local
    /// ids that never reached the remote come back as `pending` either way.
    pub async fn run<T: Entity>(
        &self,
        descriptor: &CollectionDescriptor,
        handle: &RemoteHandle,
        remote: Vec<T>,
        local: &[T],
    ) -> Migration<T> {
        let skip = |reason| Migration {
            outcome: MigrationOutcome::Skipped(reason),
            pending: never_synced(local, &remote),
            snapshot: remote.clone(),
        };

        if !remote.is_empty() {
            return skip(MigrationSkip::RemoteNotEmpty);
        }
        if local.is_empty() {
            return skip(MigrationSkip::NothingLocal);
        }
        match self.cache.is_migrated(descriptor).await {
            Ok(true) => return skip(MigrationSkip::AlreadyMigrated),
            Ok(false) => {}
            Err(error) => {
                tracing::warn!(
                    "Cannot read migration marker for {}: {}",
                    descriptor.key(),
                    error
                );
                return skip(MigrationSkip::MarkerUnreadable);
            }
        }

        tracing::info!(
            "Migrating {} local {} into the empty remote collection",
            local.len(),
            descriptor.key()
        );
        let engine = SyncEngine::new(*descriptor);
        let pushed = engine.apply(&[], local, handle).await;

        if let Err(error) = self.cache.mark_migrated(descriptor).await {
            tracing::warn!(
                "Failed to persist migration marker for {}: {}",
                descriptor.key(),
                error
            );
        }

        let pending = not_migrated(local, &pushed);
        let (snapshot, reread_failed) = match engine.fetch::<T>(handle).await {
            Ok(snapshot) => (snapshot, false),
            Err(error) => {
                tracing::warn!(
                    "Re-reading {} after migration failed, keeping local rows: {}",
                    descriptor.key(),
                    error
                );
                (pushed.baseline, true)
            }
        };
        let present = ids(&snapshot);
        let pending = pending
            .into_iter()
            .filter(|item| !present.contains(item.id()))
            .collect();

        let report = pushed.report;
        let outcome = MigrationOutcome::Migrated {
            inserted: report.inserted,
            duplicates: report.duplicates,
            failed: report.failures.len(),
            reread_failed,
        };
        tracing::info!("Migration of {} finished: {:?}", descriptor.key(), outcome);
        Migration {
            outcome,
            snapshot,
            pending,
        }
    }
}

fn ids<T: Entity>(items: &[T]) -> HashSet<String> {
    items.iter().map(|item| item.id().to_string()).collect()
}

/// Local-id entries absent from the remote collection.
fn never_synced<T: Entity>(local: &[T], remote: &[T]) -> Vec<T> {
    let present = ids(remote);
    local
        .iter()
        .filter(|item| !is_canonical_id(item.id()) && !present.contains(item.id()))
        .cloned()
        .collect()
}

/// Entries whose migration insert failed.
fn not_migrated<T: Entity>(local: &[T], pushed: &SyncOutcome<T>) -> Vec<T> {
    let carried = ids(&pushed.baseline);
    let remapped: HashSet<&str> = pushed
        .report
        .remaps
        .iter()
        .map(|remap| remap.local.as_str())
        .collect();
    local
        .iter()
        .filter(|item| !carried.contains(item.id()) && !remapped.contains(item.id()))
        .cloned()
        .collect()
}
