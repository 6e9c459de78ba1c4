//! Local snapshot cache
//!
//! A durable string-keyed store backed by a local libSQL file. Each
//! collection is persisted as one serialized snapshot under its key, next to
//! a `<key>_migrated` marker once the one-time migration has run.

mod migrations;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use libsql::{params, Builder, Connection, Database as LibSqlDatabase};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::registry::CollectionDescriptor;

const MARKER_SET: &str = "true";

struct CacheDb {
    _db: LibSqlDatabase,
    conn: Connection,
}

/// A cached snapshot as read at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSnapshot<T> {
    pub items: Vec<T>,
    /// A malformed entry was found and removed
    pub discarded: bool,
}

/// Thread-safe handle to the cache database.
#[derive(Clone)]
pub struct LocalCache {
    inner: Arc<Mutex<CacheDb>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LocalCache")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl LocalCache {
    /// Open the cache at `path`, creating the file and parent directories.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let db = Builder::new_local(path.to_string_lossy().to_string())
            .build()
            .await?;
        let cache = Self::from_database(db, Some(path.clone())).await?;
        tracing::debug!("Opened local cache at {}", path.display());
        Ok(cache)
    }

    /// Open an in-memory cache (tests and throwaway sessions).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::from_database(db, None).await
    }

    async fn from_database(db: LibSqlDatabase, path: Option<PathBuf>) -> Result<Self> {
        let conn = db.connect()?;
        if path.is_some() {
            conn.execute("PRAGMA journal_mode = WAL;", ()).await.ok();
            conn.execute("PRAGMA synchronous = NORMAL;", ()).await.ok();
        }
        migrations::run(&conn).await?;

        Ok(Self {
            inner: Arc::new(Mutex::new(CacheDb { _db: db, conn })),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn load_raw(&self, key: &str) -> Result<Option<String>> {
        let inner = self.inner.lock().await;
        let mut rows = inner
            .conn
            .query("SELECT value FROM cache_entries WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<String>(0)?)),
            None => Ok(None),
        }
    }

    pub async fn store_raw(&self, key: &str, value: &str) -> Result<()> {
        let inner = self.inner.lock().await;
        inner
            .conn
            .execute(
                "INSERT INTO cache_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().timestamp_millis()],
            )
            .await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        let inner = self.inner.lock().await;
        inner
            .conn
            .execute("DELETE FROM cache_entries WHERE key = ?", [key])
            .await?;
        Ok(())
    }

    /// Stored keys in lexical order.
    #[cfg(test)]
    pub async fn keys(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock().await;
        let mut rows = inner
            .conn
            .query("SELECT key FROM cache_entries ORDER BY key", ())
            .await?;

        let mut keys = Vec::new();
        while let Some(row) = rows.next().await? {
            keys.push(row.get::<String>(0)?);
        }
        Ok(keys)
    }

    /// Decode the snapshot stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing is stored and
    /// `Err(Error::MalformedCache)` when the entry does not decode.
    pub async fn try_load_snapshot<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Vec<T>>> {
        let Some(raw) = self.load_raw(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|error| Error::MalformedCache {
                key: key.to_string(),
                reason: error.to_string(),
            })
    }

    /// Decode the snapshot under `key`, treating corrupt data as empty.
    ///
    /// A malformed entry is logged and deleted so it is not read again.
    pub async fn load_snapshot<T: DeserializeOwned>(&self, key: &str) -> Result<LoadedSnapshot<T>> {
        match self.try_load_snapshot(key).await {
            Ok(snapshot) => Ok(LoadedSnapshot {
                items: snapshot.unwrap_or_default(),
                discarded: false,
            }),
            Err(Error::MalformedCache { key, reason }) => {
                tracing::warn!("Discarding malformed cache entry '{}': {}", key, reason);
                if let Err(error) = self.remove(&key).await {
                    tracing::warn!("Failed to remove cache entry '{}': {}", key, error);
                }
                Ok(LoadedSnapshot {
                    items: Vec::new(),
                    discarded: true,
                })
            }
            Err(error) => Err(error),
        }
    }

    pub async fn store_snapshot<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        self.store_raw(key, &raw).await
    }

    pub async fn is_migrated(&self, descriptor: &CollectionDescriptor) -> Result<bool> {
        Ok(self
            .load_raw(&descriptor.migrated_marker_key())
            .await?
            .is_some_and(|value| value == MARKER_SET))
    }

    pub async fn mark_migrated(&self, descriptor: &CollectionDescriptor) -> Result<()> {
        self.store_raw(&descriptor.migrated_marker_key(), MARKER_SET)
            .await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::models::Player;
    use crate::registry::CollectionKind;

    #[tokio::test(flavor = "multi_thread")]
    async fn snapshot_round_trips_through_cache() {
        let cache = LocalCache::open_in_memory().await.unwrap();
        let players = vec![Player::new("Ana"), Player::new("Ben")];

        cache.store_snapshot("players", &players).await.unwrap();
        let loaded = cache.load_snapshot::<Player>("players").await.unwrap();
        assert_eq!(loaded.items, players);
        assert!(!loaded.discarded);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_snapshot_is_empty() {
        let cache = LocalCache::open_in_memory().await.unwrap();
        let loaded = cache.load_snapshot::<Player>("players").await.unwrap();
        assert!(loaded.items.is_empty());
        assert!(!loaded.discarded);
        assert!(cache
            .try_load_snapshot::<Player>("players")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_snapshot_resets_to_empty() {
        let cache = LocalCache::open_in_memory().await.unwrap();
        cache.store_raw("players", "{not json").await.unwrap();

        assert!(matches!(
            cache.try_load_snapshot::<Player>("players").await,
            Err(Error::MalformedCache { .. })
        ));
        let loaded = cache.load_snapshot::<Player>("players").await.unwrap();
        assert!(loaded.items.is_empty());
        assert!(loaded.discarded);
        assert_eq!(cache.load_raw("players").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn migrated_marker_is_per_collection() {
        let cache = LocalCache::open_in_memory().await.unwrap();
        let players = CollectionKind::Players.descriptor();
        let matches = CollectionKind::Matches.descriptor();

        assert!(!cache.is_migrated(&players).await.unwrap());
        cache.mark_migrated(&players).await.unwrap();
        assert!(cache.is_migrated(&players).await.unwrap());
        assert!(!cache.is_migrated(&matches).await.unwrap());
        assert_eq!(
            cache.keys().await.unwrap(),
            vec!["players_migrated".to_string()]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cache_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("rally-cache.db");

        {
            let cache = LocalCache::open(&path).await.unwrap();
            cache.store_raw("sessions", "[]").await.unwrap();
        }

        let cache = LocalCache::open(&path).await.unwrap();
        assert_eq!(cache.load_raw("sessions").await.unwrap().as_deref(), Some("[]"));
        assert_eq!(cache.path(), Some(path.as_path()));
    }
}
