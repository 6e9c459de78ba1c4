//! Per-collection in-memory snapshot with a serialized remote mirror
//!
//! A write commits the new snapshot in memory and persists it to the cache
//! before returning. The remote mirror runs on a dedicated worker task that
//! processes jobs strictly in submission order, so every diff is computed
//! against the baseline left by the previous job.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex as SyncMutex, RwLock};
use tokio::sync::{mpsc, oneshot, Mutex};

use super::observer::{SyncEvent, SyncObserver};
use crate::cache::LocalCache;
use crate::models::Entity;
use crate::registry::{CollectionDescriptor, CollectionKind};
use crate::remote::RemoteClient;
use crate::sync::{SkipReason, SyncEngine, SyncOp, SyncReport};

/// A change to a collection snapshot.
pub enum WriteOp<T> {
    /// Replace the whole collection
    Replace(Vec<T>),
    /// Derive the next snapshot from the current one
    Update(Box<dyn FnOnce(&[T]) -> Vec<T> + Send>),
}

impl<T> WriteOp<T> {
    pub fn update(apply: impl FnOnce(&[T]) -> Vec<T> + Send + 'static) -> Self {
        Self::Update(Box::new(apply))
    }

    fn apply(self, current: &[T]) -> Vec<T> {
        match self {
            Self::Replace(items) => items,
            Self::Update(apply) => apply(current),
        }
    }
}

impl<T> fmt::Debug for WriteOp<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace(items) => write!(formatter, "Replace({} items)", items.len()),
            Self::Update(_) => formatter.write_str("Update(..)"),
        }
    }
}

/// Returned by every committed write.
#[derive(Debug)]
pub struct WriteReceipt {
    /// The snapshot reached the local cache
    pub cached: bool,
    sync: Option<oneshot::Receiver<SyncReport>>,
}

impl WriteReceipt {
    /// Whether a remote mirror job was queued for this write
    pub const fn is_queued(&self) -> bool {
        self.sync.is_some()
    }

    /// Wait for the remote mirror attempt of this write.
    pub async fn synced(self) -> Option<SyncReport> {
        self.sync?.await.ok()
    }
}

enum Job<T> {
    Sync {
        next: Vec<T>,
        reply: oneshot::Sender<SyncReport>,
    },
    Resync {
        reply: oneshot::Sender<SyncReport>,
    },
}

struct Shared<T> {
    descriptor: CollectionDescriptor,
    snapshot: RwLock<Vec<T>>,
    /// Orders snapshot commits, cache writes and enqueueing
    write_gate: Mutex<()>,
    /// Local id to remote-assigned id
    aliases: SyncMutex<HashMap<String, String>>,
    cache: LocalCache,
}

impl<T: Entity> Shared<T> {
    fn resolve(&self, id: &str) -> String {
        self.aliases
            .lock()
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    async fn persist(&self, items: &[T]) -> bool {
        match self
            .cache
            .store_snapshot(self.descriptor.key(), items)
            .await
        {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!("Failed to cache {}: {}", self.descriptor.key(), error);
                false
            }
        }
    }

    /// Swap local ids in the snapshot for their remote-assigned ids.
    async fn adopt_canonical_ids(&self) {
        let _gate = self.write_gate.lock().await;
        let aliases = self.aliases.lock().clone();
        let rewritten = {
            let mut snapshot = self.snapshot.write();
            if !snapshot.iter().any(|item| aliases.contains_key(item.id())) {
                return;
            }
            let items = std::mem::take(&mut *snapshot);
            *snapshot = canonicalize(items, &aliases);
            snapshot.clone()
        };
        self.persist(&rewritten).await;
    }
}

/// Rewrite aliased ids, keeping the first entry when two ids collapse.
fn canonicalize<T: Entity>(items: Vec<T>, aliases: &HashMap<String, String>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter_map(|mut item| {
            if let Some(canonical) = aliases.get(item.id()) {
                item.set_id(canonical.clone());
            }
            seen.insert(item.id().to_string()).then_some(item)
        })
        .collect()
}

/// Handle to one mirrored collection. Clones share the same snapshot.
pub struct Collection<T> {
    shared: Arc<Shared<T>>,
    jobs: Option<mpsc::UnboundedSender<Job<T>>>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            jobs: self.jobs.clone(),
        }
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Collection")
            .field("collection", &self.shared.descriptor.kind)
            .field("mirrored", &self.jobs.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Entity> Collection<T> {
    /// Start a collection; remote-capable ones get a sync worker.
    ///
    /// `baseline` is the remote state the snapshot was loaded from, or `None`
    /// when it is unknown and must be fetched before the first diff.
    pub(super) fn start(
        descriptor: CollectionDescriptor,
        snapshot: Vec<T>,
        baseline: Option<Vec<T>>,
        cache: LocalCache,
        remote: RemoteClient,
        observer: Arc<dyn SyncObserver>,
    ) -> Self {
        let known_ids: HashSet<String> = snapshot
            .iter()
            .chain(baseline.iter().flatten())
            .map(|item| item.id().to_string())
            .collect();
        let shared = Arc::new(Shared {
            descriptor,
            snapshot: RwLock::new(snapshot),
            write_gate: Mutex::new(()),
            aliases: SyncMutex::new(HashMap::new()),
            cache,
        });

        let jobs = descriptor.remote_capable.then(|| {
            let (sender, receiver) = mpsc::unbounded_channel();
            let worker = Worker {
                shared: Arc::clone(&shared),
                engine: SyncEngine::new(descriptor),
                remote,
                observer,
                baseline,
                known_ids,
                offline: false,
            };
            tokio::spawn(worker.run(receiver));
            sender
        });

        Self { shared, jobs }
    }

    pub fn kind(&self) -> CollectionKind {
        self.shared.descriptor.kind
    }

    /// Current snapshot. Never blocks on the remote.
    pub fn read(&self) -> Vec<T> {
        self.shared.snapshot.read().clone()
    }

    pub fn len(&self) -> usize {
        self.shared.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.snapshot.read().is_empty()
    }

    /// Look up an entry by id; local ids resolve after the remote assigned one.
    pub fn get(&self, id: &str) -> Option<T> {
        let id = self.shared.resolve(id);
        self.shared
            .snapshot
            .read()
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    pub async fn write(&self, op: WriteOp<T>) -> WriteReceipt {
        let receipt = self.commit(|current| Some(op.apply(current))).await;
        receipt.unwrap_or(WriteReceipt {
            cached: false,
            sync: None,
        })
    }

    pub async fn replace(&self, items: Vec<T>) -> WriteReceipt {
        self.write(WriteOp::Replace(items)).await
    }

    pub async fn update(
        &self,
        apply: impl FnOnce(&[T]) -> Vec<T> + Send + 'static,
    ) -> WriteReceipt {
        self.write(WriteOp::update(apply)).await
    }

    /// Append `item`, replacing any entry with the same id.
    pub async fn insert(&self, item: T) -> WriteReceipt {
        self.update(move |current| {
            let mut next = current.to_vec();
            match next.iter().position(|existing| existing.id() == item.id()) {
                Some(index) => next[index] = item,
                None => next.push(item),
            }
            next
        })
        .await
    }

    /// Edit one entry in place. Returns `None` when no entry has `id`.
    pub async fn patch(
        &self,
        id: &str,
        edit: impl FnOnce(&mut T) + Send,
    ) -> Option<WriteReceipt> {
        self.commit(|current| {
            let id = self.shared.resolve(id);
            let index = current.iter().position(|item| item.id() == id)?;
            let mut next = current.to_vec();
            edit(&mut next[index]);
            Some(next)
        })
        .await
    }

    /// Drop one entry. Returns `None` when no entry has `id`.
    pub async fn remove(&self, id: &str) -> Option<WriteReceipt> {
        self.commit(|current| {
            let id = self.shared.resolve(id);
            current.iter().any(|item| item.id() == id).then(|| {
                current
                    .iter()
                    .filter(|item| item.id() != id)
                    .cloned()
                    .collect()
            })
        })
        .await
    }

    /// Re-read the remote baseline and push the current snapshot against it.
    ///
    /// Returns `None` for collections without a sync worker.
    pub async fn resync(&self) -> Option<SyncReport> {
        let receiver = self.enqueue(|reply| Job::Resync { reply })?;
        receiver.await.ok()
    }

    async fn commit(
        &self,
        change: impl FnOnce(&[T]) -> Option<Vec<T>> + Send,
    ) -> Option<WriteReceipt> {
        let _gate = self.shared.write_gate.lock().await;
        let next = {
            let current = self.shared.snapshot.read();
            change(current.as_slice())?
        };
        *self.shared.snapshot.write() = next.clone();

        let cached = self.shared.persist(&next).await;
        let sync = self.enqueue(|reply| Job::Sync { next, reply });
        Some(WriteReceipt { cached, sync })
    }

    fn enqueue(
        &self,
        job: impl FnOnce(oneshot::Sender<SyncReport>) -> Job<T>,
    ) -> Option<oneshot::Receiver<SyncReport>> {
        let jobs = self.jobs.as_ref()?;
        let (reply, receiver) = oneshot::channel();
        if jobs.send(job(reply)).is_err() {
            tracing::warn!(
                "Sync worker for {} has stopped",
                self.shared.descriptor.key()
            );
            return None;
        }
        Some(receiver)
    }
}

struct Worker<T> {
    shared: Arc<Shared<T>>,
    engine: SyncEngine,
    remote: RemoteClient,
    observer: Arc<dyn SyncObserver>,
    baseline: Option<Vec<T>>,
    /// Every id this process has held locally
    known_ids: HashSet<String>,
    offline: bool,
}

impl<T: Entity> Worker<T> {
    async fn run(mut self, mut jobs: mpsc::UnboundedReceiver<Job<T>>) {
        while let Some(job) = jobs.recv().await {
            let (report, reply) = match job {
                Job::Sync { next, reply } => (self.sync(next, false).await, reply),
                Job::Resync { reply } => {
                    let next = self.shared.snapshot.read().clone();
                    (self.sync(next, true).await, reply)
                }
            };
            self.observer
                .on_event(&SyncEvent::SyncApplied(report.clone()));
            // The writer may not be waiting for the report.
            let _ = reply.send(report);
        }
        tracing::debug!("Sync worker for {} stopped", self.shared.descriptor.key());
    }

    async fn sync(&mut self, next: Vec<T>, refetch: bool) -> SyncReport {
        let kind = self.shared.descriptor.kind;
        let next = {
            let aliases = self.shared.aliases.lock();
            canonicalize(next, &aliases)
        };
        self.known_ids
            .extend(next.iter().map(|item| item.id().to_string()));

        let Some(handle) = self.remote.handle().await else {
            if !self.offline {
                self.offline = true;
                let error = self
                    .remote
                    .last_error()
                    .unwrap_or_else(|| "remote store unavailable".to_string());
                self.observer.on_event(&SyncEvent::RemoteFallback {
                    collection: kind,
                    error,
                });
            }
            return SyncReport::skipped(kind, SkipReason::RemoteUnavailable);
        };
        self.offline = false;

        if refetch {
            self.baseline = None;
        }
        let baseline = match self.baseline.take() {
            Some(baseline) => baseline,
            None => match self.engine.fetch::<T>(&handle).await {
                // Rows this process never held were created elsewhere and
                // must not turn into deletes.
                Ok(remote) => remote
                    .into_iter()
                    .filter(|item| self.known_ids.contains(item.id()))
                    .collect(),
                Err(error) => {
                    let mut report = SyncReport::new(kind);
                    report.fail(SyncOp::Fetch, None, &error);
                    return report;
                }
            },
        };

        let outcome = self.engine.apply(&baseline, &next, &handle).await;
        self.baseline = Some(outcome.baseline);

        if !outcome.report.remaps.is_empty() {
            {
                let mut aliases = self.shared.aliases.lock();
                for remap in &outcome.report.remaps {
                    aliases.insert(remap.local.clone(), remap.canonical.clone());
                    self.known_ids.insert(remap.canonical.clone());
                }
            }
            self.shared.adopt_canonical_ids().await;
        }
        outcome.report
    }
}
