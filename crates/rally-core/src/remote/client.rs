//! Remote client lifecycle
//!
//! ```text
//! Uninitialized -> Connecting -> Ready -> Stale -> Uninitialized -> ...
//!                      |
//!                      +-> Uninitialized (missing configuration: permanent until reset)
//! ```
//!
//! Connecting is single-flight: the slot mutex is held across the connect
//! call, so concurrent callers wait for the one in-flight attempt.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use super::{Query, RemoteError, RemoteResult, RemoteStore, Row};
use crate::config::ClientSettings;

/// Lifecycle state of the remote client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientState {
    Uninitialized,
    Connecting,
    Ready,
    Stale,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uninitialized => "uninitialized",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Stale => "stale",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// Credentials or endpoint missing; no automatic retry
    #[error("remote store is not configured: {0}")]
    Configuration(String),
    /// Temporary failure; the next access tries again
    #[error("remote connection failed: {0}")]
    Transport(String),
}

/// Produces connected store handles.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn RemoteStore>, ConnectError>;
}

struct Slot {
    store: Option<Arc<dyn RemoteStore>>,
    connected_at: Option<Instant>,
}

struct Status {
    state: ClientState,
    disabled: bool,
    last_error: Option<String>,
}

struct Shared {
    connector: Arc<dyn Connector>,
    settings: ClientSettings,
    slot: Mutex<Slot>,
    status: parking_lot::Mutex<Status>,
    generation: AtomicU64,
    transport_errors: AtomicU32,
    stale: AtomicBool,
}

impl Shared {
    fn set_state(&self, state: ClientState) {
        let mut status = self.status.lock();
        if status.state != state {
            tracing::debug!("Remote client {} -> {}", status.state, state);
            status.state = state;
        }
    }

    fn record_error(&self, error: &str) {
        self.status.lock().last_error = Some(error.to_string());
    }

    fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
        let mut status = self.status.lock();
        if status.state == ClientState::Ready {
            status.state = ClientState::Stale;
        }
    }
}

/// Lazily connected, shareable handle provider for the remote store.
#[derive(Clone)]
pub struct RemoteClient {
    shared: Arc<Shared>,
}

impl fmt::Debug for RemoteClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RemoteClient")
            .field("state", &self.state())
            .field("generation", &self.shared.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    pub fn new(connector: Arc<dyn Connector>, settings: ClientSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                connector,
                settings,
                slot: Mutex::new(Slot {
                    store: None,
                    connected_at: None,
                }),
                status: parking_lot::Mutex::new(Status {
                    state: ClientState::Uninitialized,
                    disabled: false,
                    last_error: None,
                }),
                generation: AtomicU64::new(0),
                transport_errors: AtomicU32::new(0),
                stale: AtomicBool::new(false),
            }),
        }
    }

    pub fn state(&self) -> ClientState {
        self.shared.status.lock().state
    }

    /// Whether a configuration error disabled the client until `reset`.
    pub fn is_disabled(&self) -> bool {
        self.shared.status.lock().disabled
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.status.lock().last_error.clone()
    }

    pub fn consecutive_transport_errors(&self) -> u32 {
        self.shared.transport_errors.load(Ordering::SeqCst)
    }

    /// Get a usable handle, connecting if needed.
    ///
    /// Returns `None` when the store is not configured or cannot be reached;
    /// callers fall back to the local cache.
    pub async fn handle(&self) -> Option<RemoteHandle> {
        let shared = &self.shared;
        let mut slot = shared.slot.lock().await;

        if shared.status.lock().disabled {
            return None;
        }

        if let Some(store) = slot.store.clone() {
            let expired = slot
                .connected_at
                .is_some_and(|at| at.elapsed() >= shared.settings.max_client_age);
            if expired {
                tracing::debug!("Remote client exceeded its maximum age");
                shared.mark_stale();
            }

            if !shared.stale.load(Ordering::SeqCst) {
                return Some(self.make_handle(store));
            }

            tracing::info!("Dropping stale remote client and reconnecting");
            slot.store = None;
            slot.connected_at = None;
            shared.generation.fetch_add(1, Ordering::SeqCst);
            shared.set_state(ClientState::Uninitialized);
        }

        shared.set_state(ClientState::Connecting);
        match shared.connector.connect().await {
            Ok(store) => {
                slot.store = Some(Arc::clone(&store));
                slot.connected_at = Some(Instant::now());
                shared.stale.store(false, Ordering::SeqCst);
                shared.transport_errors.store(0, Ordering::SeqCst);
                shared.set_state(ClientState::Ready);
                tracing::info!("Remote client ready");
                Some(self.make_handle(store))
            }
            Err(ConnectError::Configuration(message)) => {
                tracing::warn!("Remote store disabled, using local cache only: {}", message);
                {
                    let mut status = shared.status.lock();
                    status.disabled = true;
                    status.last_error = Some(message);
                }
                shared.set_state(ClientState::Uninitialized);
                None
            }
            Err(ConnectError::Transport(message)) => {
                tracing::warn!("Remote connection failed: {}", message);
                shared.record_error(&message);
                shared.set_state(ClientState::Uninitialized);
                None
            }
        }
    }

    /// Drop the current connection and clear any permanent failure.
    ///
    /// Handles obtained before the reset fail with `RemoteError::Unavailable`.
    pub async fn reset(&self) {
        let shared = &self.shared;
        let mut slot = shared.slot.lock().await;
        slot.store = None;
        slot.connected_at = None;
        shared.generation.fetch_add(1, Ordering::SeqCst);
        shared.stale.store(false, Ordering::SeqCst);
        shared.transport_errors.store(0, Ordering::SeqCst);
        {
            let mut status = shared.status.lock();
            status.disabled = false;
            status.last_error = None;
        }
        shared.set_state(ClientState::Uninitialized);
        tracing::info!("Remote client reset");
    }

    fn make_handle(&self, store: Arc<dyn RemoteStore>) -> RemoteHandle {
        RemoteHandle {
            store,
            generation: self.shared.generation.load(Ordering::SeqCst),
            shared: Arc::clone(&self.shared),
        }
    }
}

/// A connected store bound to one client generation.
///
/// Every call reports its outcome back to the client so that runs of
/// transport failures can mark the client stale.
#[derive(Clone)]
pub struct RemoteHandle {
    store: Arc<dyn RemoteStore>,
    generation: u64,
    shared: Arc<Shared>,
}

impl fmt::Debug for RemoteHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RemoteHandle")
            .field("generation", &self.generation)
            .field("current", &self.is_current())
            .finish_non_exhaustive()
    }
}

impl RemoteHandle {
    /// False once the owning client was reset or reconnected.
    pub fn is_current(&self) -> bool {
        self.shared.generation.load(Ordering::SeqCst) == self.generation
    }

    pub async fn select(&self, table: &str, query: &Query) -> RemoteResult<Vec<Row>> {
        self.ensure_current()?;
        let result = self.store.select(table, query).await;
        self.observe(result)
    }

    pub async fn insert(&self, table: &str, rows: Vec<Row>) -> RemoteResult<Vec<Row>> {
        self.ensure_current()?;
        let result = self.store.insert(table, rows).await;
        self.observe(result)
    }

    pub async fn update(&self, table: &str, id: &str, row: Row) -> RemoteResult<Option<Row>> {
        self.ensure_current()?;
        let result = self.store.update(table, id, row).await;
        self.observe(result)
    }

    pub async fn delete(&self, table: &str, ids: &[String]) -> RemoteResult<()> {
        self.ensure_current()?;
        let result = self.store.delete(table, ids).await;
        self.observe(result)
    }

    fn ensure_current(&self) -> RemoteResult<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(RemoteError::Unavailable)
        }
    }

    fn observe<T>(&self, result: RemoteResult<T>) -> RemoteResult<T> {
        match &result {
            Ok(_) | Err(RemoteError::Constraint(_)) => {
                self.shared.transport_errors.store(0, Ordering::SeqCst);
            }
            Err(error) if error.is_transport() => {
                let count = self.shared.transport_errors.fetch_add(1, Ordering::SeqCst) + 1;
                self.shared.record_error(&error.to_string());
                if count >= self.shared.settings.transport_error_threshold && self.is_current() {
                    tracing::warn!(
                        "{} consecutive transport failures, marking remote client stale",
                        count
                    );
                    self.shared.mark_stale();
                }
            }
            Err(error) => {
                self.shared.transport_errors.store(0, Ordering::SeqCst);
                self.shared.record_error(&error.to_string());
            }
        }
        result
    }
}
