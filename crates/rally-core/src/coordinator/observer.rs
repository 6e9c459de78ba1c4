//! Injectable sink for sync diagnostics

use serde::Serialize;

use crate::migration::MigrationOutcome;
use crate::registry::CollectionKind;
use crate::sync::SyncReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A queued write finished its remote mirror attempt
    SyncApplied(SyncReport),
    /// The remote could not be used; the collection runs on the cache
    RemoteFallback {
        collection: CollectionKind,
        error: String,
    },
    /// A corrupt cache entry was discarded
    CacheReset { collection: CollectionKind },
    Migration {
        collection: CollectionKind,
        outcome: MigrationOutcome,
    },
    ClientReset,
}

/// Receives every diagnostic event the coordinator produces.
pub trait SyncObserver: Send + Sync {
    fn on_event(&self, event: &SyncEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn on_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::SyncApplied(report) if report.is_clean() => {
                tracing::debug!("{} sync applied: {:?}", report.collection, report);
            }
            SyncEvent::SyncApplied(report) => {
                tracing::warn!(
                    "{} sync incomplete ({} failures, skipped: {:?})",
                    report.collection,
                    report.failures.len(),
                    report.skipped
                );
            }
            SyncEvent::RemoteFallback { collection, error } => {
                tracing::warn!("{} using local cache only: {}", collection, error);
            }
            SyncEvent::CacheReset { collection } => {
                tracing::warn!("{} cache entry was malformed and has been reset", collection);
            }
            SyncEvent::Migration {
                collection,
                outcome,
            } => {
                tracing::info!("{} migration: {:?}", collection, outcome);
            }
            SyncEvent::ClientReset => tracing::info!("Remote client reset"),
        }
    }
}
