//! Remote relational store seam.
//!
//! The remote store is an external asynchronous service. This module defines
//! the narrow interface the sync engine needs (`RemoteStore`), the error
//! taxonomy of remote calls, and the lifecycle-managed `RemoteClient` that
//! hands out usable handles.

mod client;
#[cfg(test)]
pub mod memory;
mod query;
mod rest;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use client::{ClientState, ConnectError, Connector, RemoteClient, RemoteHandle};
pub use query::{Filter, Order, Query};
pub use rest::{RestConnector, RestStore};

/// A flat remote row: column name to JSON value
pub type Row = Map<String, Value>;

/// Errors returned by remote store calls
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network, TLS/certificate, or timeout failure
    #[error("transport failure: {0}")]
    Transport(String),
    /// Unique or primary key violation
    #[error("constraint violation: {0}")]
    Constraint(String),
    /// Any other error status reported by the service
    #[error("remote API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Response body did not have the expected shape
    #[error("invalid remote payload: {0}")]
    Decode(String),
    /// No usable client handle, or the handle was invalidated by a reset
    #[error("remote store unavailable")]
    Unavailable,
}

impl RemoteError {
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub const fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::Constraint(_))
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Operations the sync engine issues against the remote store.
///
/// `insert` returns the stored rows in input order, including any columns the
/// store filled in (notably remote-assigned ids). `update` returns `None` when
/// no row matched `id`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> RemoteResult<Vec<Row>>;

    async fn insert(&self, table: &str, rows: Vec<Row>) -> RemoteResult<Vec<Row>>;

    async fn update(&self, table: &str, id: &str, row: Row) -> RemoteResult<Option<Row>>;

    async fn delete(&self, table: &str, ids: &[String]) -> RemoteResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(RemoteError::Transport("certificate expired".into()).is_transport());
        assert!(!RemoteError::Unavailable.is_transport());
        assert!(RemoteError::Constraint("duplicate key".into()).is_duplicate_key());
        assert!(!RemoteError::Api {
            status: 400,
            message: "bad".into()
        }
        .is_duplicate_key());
    }
}
