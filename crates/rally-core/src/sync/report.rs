//! Result values of a sync run

use serde::Serialize;

use crate::registry::CollectionKind;
use crate::remote::RemoteError;

/// Remote operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOp {
    Fetch,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub op: SyncOp,
    /// Affected entity, `None` for a failed bulk call
    pub id: Option<String>,
    pub message: String,
    pub transport: bool,
}

impl SyncFailure {
    pub fn new(op: SyncOp, id: Option<String>, error: &RemoteError) -> Self {
        Self {
            op,
            id,
            message: error.to_string(),
            transport: error.is_transport(),
        }
    }
}

/// A local id replaced by the canonical id the remote assigned or matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdRemap {
    pub local: String,
    pub canonical: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No usable remote handle; the local commit stands alone
    RemoteUnavailable,
    NotRemoteCapable,
}

/// Outcome of mirroring one snapshot transition to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub collection: CollectionKind,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Inserts rejected as already present
    pub duplicates: usize,
    pub remaps: Vec<IdRemap>,
    pub failures: Vec<SyncFailure>,
    pub skipped: Option<SkipReason>,
}

impl SyncReport {
    pub const fn new(collection: CollectionKind) -> Self {
        Self {
            collection,
            inserted: 0,
            updated: 0,
            deleted: 0,
            duplicates: 0,
            remaps: Vec::new(),
            failures: Vec::new(),
            skipped: None,
        }
    }

    pub const fn skipped(collection: CollectionKind, reason: SkipReason) -> Self {
        let mut report = Self::new(collection);
        report.skipped = Some(reason);
        report
    }

    /// Nothing was attempted.
    pub fn is_noop(&self) -> bool {
        self.skipped.is_none()
            && self.inserted == 0
            && self.updated == 0
            && self.deleted == 0
            && self.duplicates == 0
            && self.failures.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_none() && self.failures.is_empty()
    }

    pub(crate) fn fail(&mut self, op: SyncOp, id: Option<String>, error: &RemoteError) {
        tracing::warn!(
            "{} {:?} failed for {}: {}",
            self.collection,
            op,
            id.as_deref().unwrap_or("batch"),
            error
        );
        self.failures.push(SyncFailure::new(op, id, error));
    }

    pub(crate) fn remap(&mut self, local: &str, canonical: &str) {
        if local != canonical {
            self.remaps.push(IdRemap {
                local: local.to_string(),
                canonical: canonical.to_string(),
            });
        }
    }
}
