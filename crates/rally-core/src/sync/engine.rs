//! Applying a snapshot transition to the remote store
//!
//! Inserts go out in bulk, updates one at a time, deletes in bulk by id.
//! Every call is caught on its own; a failure is recorded in the report and
//! reverted in the returned baseline so the next diff tries it again.

use std::collections::HashSet;

use serde_json::Value;

use super::diff::{self, Update};
use super::report::{SyncOp, SyncReport};
use crate::models::Entity;
use crate::registry::{CollectionDescriptor, Lifecycle};
use crate::remote::{Query, RemoteHandle, RemoteResult, Row};
use crate::transform::EntityTransformer;
use crate::util::is_canonical_id;

/// Report plus the snapshot the remote now mirrors
#[derive(Debug, Clone)]
pub struct SyncOutcome<T> {
    pub report: SyncReport,
    pub baseline: Vec<T>,
}

#[derive(Debug, Clone, Copy)]
pub struct SyncEngine {
    descriptor: CollectionDescriptor,
}

impl SyncEngine {
    pub const fn new(descriptor: CollectionDescriptor) -> Self {
        Self { descriptor }
    }

    pub const fn descriptor(&self) -> &CollectionDescriptor {
        &self.descriptor
    }

    /// Load the whole remote collection in its configured order.
    pub async fn fetch<T: Entity>(&self, handle: &RemoteHandle) -> RemoteResult<Vec<T>> {
        let query = Query::new().order_by(self.descriptor.order_by, true);
        let rows = handle.select(self.descriptor.table, &query).await?;
        let transformer = EntityTransformer::for_batch(self.descriptor.kind, handle).await;
        Ok(transformer.to_local(&rows))
    }

    /// Mirror the transition `baseline -> next` to the remote store.
    ///
    /// An unchanged snapshot returns without any remote call.
    pub async fn apply<T: Entity>(
        &self,
        baseline: &[T],
        next: &[T],
        handle: &RemoteHandle,
    ) -> SyncOutcome<T> {
        let mut report = SyncReport::new(self.descriptor.kind);
        let diff = diff::compute(baseline, next);
        if diff.is_empty() {
            return SyncOutcome {
                report,
                baseline: next.to_vec(),
            };
        }

        tracing::debug!(
            "Syncing {}: {} inserts, {} updates, {} deletes",
            self.descriptor.key(),
            diff.inserts.len(),
            diff.updates.len(),
            diff.deletes.len()
        );

        let transformer = if diff.inserts.is_empty() && diff.updates.is_empty() {
            EntityTransformer::default()
        } else {
            EntityTransformer::for_batch(self.descriptor.kind, handle).await
        };

        let mut batch = Batch {
            descriptor: &self.descriptor,
            handle,
            transformer: &transformer,
            report: &mut report,
            reverts: Vec::new(),
            taken: next
                .iter()
                .map(|item| item.id().to_string())
                .filter(|id| is_canonical_id(id))
                .collect(),
        };

        batch.insert_all(diff.inserts).await;
        for update in diff.updates {
            batch.update_one(update).await;
        }
        batch.delete_all(diff.deletes).await;

        let reverts = batch.reverts;
        let baseline = resolve_baseline(next, reverts, &report);

        tracing::info!(
            "Synced {}: {} inserted, {} updated, {} deleted, {} duplicates, {} failed",
            self.descriptor.key(),
            report.inserted,
            report.updated,
            report.deleted,
            report.duplicates,
            report.failures.len()
        );
        SyncOutcome { report, baseline }
    }
}

/// How to undo an operation in the baseline when it fails
enum Revert<T> {
    /// Never reached the remote
    Drop(String),
    /// Remote still holds the previous version
    Restore(T),
    /// Remote still holds the deleted item
    Readd(T),
}

struct Batch<'a, T> {
    descriptor: &'a CollectionDescriptor,
    handle: &'a RemoteHandle,
    transformer: &'a EntityTransformer,
    report: &'a mut SyncReport,
    reverts: Vec<Revert<T>>,
    // canonical ids already owned by some local item
    taken: HashSet<String>,
}

impl<T: Entity> Batch<'_, T> {
    async fn insert_all(&mut self, items: Vec<T>) {
        let (items, closing) = self.split_closing(items);
        if let Some(lifecycle) = self.descriptor.lifecycle {
            for item in closing {
                let id = item.id().to_string();
                self.close_predecessor(&lifecycle, item, Revert::Drop(id))
                    .await;
            }
        }

        let (with_ids, without_ids): (Vec<T>, Vec<T>) = items
            .into_iter()
            .partition(|item| is_canonical_id(item.id()));
        self.insert_group(with_ids).await;
        self.insert_group(without_ids).await;
    }

    async fn insert_group(&mut self, items: Vec<T>) {
        if items.is_empty() {
            return;
        }
        let rows = items
            .iter()
            .map(|item| self.transformer.insert_row(item))
            .collect();

        match self.handle.insert(self.descriptor.table, rows).await {
            Ok(stored) => {
                self.report.inserted += items.len();
                if stored.len() != items.len() {
                    tracing::warn!(
                        "{} insert returned {} rows for {} items",
                        self.descriptor.key(),
                        stored.len(),
                        items.len()
                    );
                }
                for (item, row) in items.iter().zip(&stored) {
                    self.record_assigned_id(item.id(), row);
                }
            }
            Err(error) if error.is_duplicate_key() => {
                tracing::debug!(
                    "Bulk insert into {} hit a duplicate, retrying row by row",
                    self.descriptor.table
                );
                for item in items {
                    let id = item.id().to_string();
                    self.insert_one(&item, Revert::Drop(id)).await;
                }
            }
            Err(error) => {
                for item in items {
                    self.report
                        .fail(SyncOp::Insert, Some(item.id().to_string()), &error);
                    self.reverts.push(Revert::Drop(item.id().to_string()));
                }
            }
        }
    }

    async fn insert_one(&mut self, item: &T, on_failure: Revert<T>) {
        let row = self.transformer.insert_row(item);
        match self.handle.insert(self.descriptor.table, vec![row]).await {
            Ok(stored) => {
                self.report.inserted += 1;
                if let Some(row) = stored.first() {
                    self.record_assigned_id(item.id(), row);
                }
            }
            Err(error) if error.is_duplicate_key() => {
                tracing::debug!("{} {} already synced", self.descriptor.key(), item.id());
                self.report.duplicates += 1;
            }
            Err(error) => {
                self.report
                    .fail(SyncOp::Insert, Some(item.id().to_string()), &error);
                self.reverts.push(on_failure);
            }
        }
    }

    async fn update_one(&mut self, update: Update<T>) {
        let Update { previous, next } = update;
        let id = next.id().to_string();

        if is_canonical_id(&id) {
            match self.handle.update(self.descriptor.table, &id, self.update_row(&next)).await {
                Ok(Some(_)) => self.report.updated += 1,
                Ok(None) => {
                    tracing::debug!("{} {} missing remotely, re-inserting", self.descriptor.key(), id);
                    self.insert_one(&next, Revert::Restore(previous)).await;
                }
                Err(error) => {
                    self.report.fail(SyncOp::Update, Some(id), &error);
                    self.reverts.push(Revert::Restore(previous));
                }
            }
            return;
        }

        let Some(lifecycle) = self.descriptor.lifecycle else {
            self.insert_one(&next, Revert::Restore(previous)).await;
            return;
        };
        self.close_predecessor(&lifecycle, next, Revert::Restore(previous))
            .await;
    }

    /// Closed lifecycle items with local ids; they may finish a row the
    /// remote already holds open.
    fn split_closing(&self, items: Vec<T>) -> (Vec<T>, Vec<T>) {
        let Some(lifecycle) = self.descriptor.lifecycle else {
            return (items, Vec::new());
        };
        let (closing, rest): (Vec<T>, Vec<T>) = items.into_iter().partition(|item| {
            if is_canonical_id(item.id()) {
                return false;
            }
            let row = self.transformer.to_remote(item);
            lifecycle
                .closed_columns
                .iter()
                .any(|column| row.get(*column).is_some_and(|value| !value.is_null()))
        });
        (rest, closing)
    }

    /// Write `item` over the oldest open remote row in its slot, inserting
    /// it when there is none.
    async fn close_predecessor(&mut self, lifecycle: &Lifecycle, item: T, on_failure: Revert<T>) {
        let id = item.id().to_string();
        match self.find_open_predecessor(lifecycle, &item).await {
            Ok(Some(target)) => {
                match self
                    .handle
                    .update(self.descriptor.table, &target, self.update_row(&item))
                    .await
                {
                    Ok(Some(_)) => {
                        tracing::debug!(
                            "{} {} matched open remote row {}",
                            self.descriptor.key(),
                            id,
                            target
                        );
                        self.report.updated += 1;
                        self.report.remap(&id, &target);
                        self.taken.insert(target);
                    }
                    Ok(None) => self.insert_one(&item, on_failure).await,
                    Err(error) => {
                        self.report.fail(SyncOp::Update, Some(id), &error);
                        self.reverts.push(on_failure);
                    }
                }
            }
            Ok(None) => self.insert_one(&item, on_failure).await,
            Err(error) => {
                self.report.fail(SyncOp::Fetch, Some(id), &error);
                self.reverts.push(on_failure);
            }
        }
    }

    async fn delete_all(&mut self, items: Vec<T>) {
        let (remote, local_only): (Vec<T>, Vec<T>) = items
            .into_iter()
            .partition(|item| is_canonical_id(item.id()));
        if !local_only.is_empty() {
            tracing::debug!(
                "Dropping {} never-synced {} without a remote delete",
                local_only.len(),
                self.descriptor.key()
            );
        }
        if remote.is_empty() {
            return;
        }

        let ids = remote
            .iter()
            .map(|item| item.id().to_string())
            .collect::<Vec<_>>();
        match self.handle.delete(self.descriptor.table, &ids).await {
            Ok(()) => self.report.deleted += ids.len(),
            Err(error) => {
                self.report.fail(SyncOp::Delete, None, &error);
                self.reverts.extend(remote.into_iter().map(Revert::Readd));
            }
        }
    }

    /// Oldest still-open remote row in the same slot as `item`.
    async fn find_open_predecessor(
        &self,
        lifecycle: &Lifecycle,
        item: &T,
    ) -> RemoteResult<Option<String>> {
        let row = self.transformer.to_remote(item);
        let mut query = Query::new();
        for column in lifecycle.slot_columns {
            match row.get(*column) {
                Some(value) if !value.is_null() => query = query.eq(*column, value.clone()),
                _ => return Ok(None),
            }
        }
        for column in lifecycle.closed_columns {
            query = query.is_null(*column);
        }
        let query = query.order_by(lifecycle.start_column, true);

        let candidates = self.handle.select(self.descriptor.table, &query).await?;
        Ok(candidates
            .iter()
            .filter_map(|candidate| candidate.get("id").and_then(Value::as_str))
            .find(|id| !self.taken.contains(*id))
            .map(str::to_string))
    }

    fn update_row(&self, item: &T) -> Row {
        let mut row = self.transformer.to_remote(item);
        row.remove("id");
        row
    }

    fn record_assigned_id(&mut self, local: &str, stored: &Row) {
        if let Some(canonical) = stored.get("id").and_then(Value::as_str) {
            self.report.remap(local, canonical);
            self.taken.insert(canonical.to_string());
        }
    }
}

fn resolve_baseline<T: Entity>(next: &[T], reverts: Vec<Revert<T>>, report: &SyncReport) -> Vec<T> {
    let mut baseline = next.to_vec();
    for revert in reverts {
        match revert {
            Revert::Drop(id) => baseline.retain(|item| item.id() != id),
            Revert::Restore(previous) => {
                if let Some(slot) = baseline.iter_mut().find(|item| item.id() == previous.id()) {
                    *slot = previous;
                }
            }
            Revert::Readd(previous) => baseline.push(previous),
        }
    }
    for remap in &report.remaps {
        if let Some(item) = baseline.iter_mut().find(|item| item.id() == remap.local) {
            item.set_id(remap.canonical.clone());
        }
    }
    baseline
}
