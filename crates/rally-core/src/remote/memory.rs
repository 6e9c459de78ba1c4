//! In-process remote store.
//!
//! Behaves like the relational service for the operations the sync engine
//! uses: remote-assigned uuid ids, primary-key conflicts, PATCH-style merges,
//! filtered and ordered selects. Offline mode and one-shot failures can be
//! injected, and every call is logged for assertions.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::client::{ConnectError, Connector};
use super::query::value_text;
use super::{Query, RemoteError, RemoteResult, RemoteStore, Row};

/// Kind of store call, as recorded in the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Select,
    Insert,
    Update,
    Delete,
}

/// One logged store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub table: String,
}

#[derive(Debug)]
struct InjectedFailure {
    op: StoreOp,
    table: String,
    /// Matching calls to let through first
    skip: usize,
    error: RemoteError,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    calls: Mutex<Vec<StoreCall>>,
    failures: Mutex<Vec<InjectedFailure>>,
    offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents of `table`, assigning ids to rows without one.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Row>) {
        let rows = rows.into_iter().map(with_assigned_id).collect();
        self.tables.lock().insert(table.to_string(), rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }

    pub fn clear(&self, table: &str) {
        self.tables.lock().remove(table);
    }

    /// Every call issued so far, oldest first.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_of(&self, op: StoreOp) -> usize {
        self.calls.lock().iter().filter(|call| call.op == op).count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    /// While offline every call fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next `op` against `table` with `error`.
    pub fn fail_next(&self, op: StoreOp, table: &str, error: RemoteError) {
        self.fail_after(op, table, 0, error);
    }

    /// Let `skip` matching calls succeed, then fail the one after.
    pub fn fail_after(&self, op: StoreOp, table: &str, skip: usize, error: RemoteError) {
        self.failures.lock().push(InjectedFailure {
            op,
            table: table.to_string(),
            skip,
            error,
        });
    }

    fn begin(&self, op: StoreOp, table: &str) -> RemoteResult<()> {
        self.calls.lock().push(StoreCall {
            op,
            table: table.to_string(),
        });

        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("connection refused".into()));
        }

        let mut failures = self.failures.lock();
        let Some(index) = failures
            .iter()
            .position(|failure| failure.op == op && failure.table == table)
        else {
            return Ok(());
        };
        if failures[index].skip > 0 {
            failures[index].skip -= 1;
            return Ok(());
        }
        Err(failures.remove(index).error)
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn select(&self, table: &str, query: &Query) -> RemoteResult<Vec<Row>> {
        self.begin(StoreOp::Select, table)?;

        let tables = self.tables.lock();
        let mut rows = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.matches(row))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        drop(tables);

        if let Some(order) = &query.order {
            rows.sort_by(|left, right| {
                let ordering = compare_values(left.get(&order.column), right.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> RemoteResult<Vec<Row>> {
        self.begin(StoreOp::Insert, table)?;

        let rows = rows.into_iter().map(with_assigned_id).collect::<Vec<_>>();
        let mut tables = self.tables.lock();
        let existing = tables.entry(table.to_string()).or_default();

        for (index, row) in rows.iter().enumerate() {
            let id = row_id(row);
            let seen_before = existing.iter().any(|other| row_id(other) == id)
                || rows[..index].iter().any(|other| row_id(other) == id);
            if seen_before {
                return Err(RemoteError::Constraint(format!(
                    "duplicate key value violates unique constraint \"{table}_pkey\" (id={id})"
                )));
            }
        }

        existing.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn update(&self, table: &str, id: &str, row: Row) -> RemoteResult<Option<Row>> {
        self.begin(StoreOp::Update, table)?;

        let mut tables = self.tables.lock();
        let Some(target) = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|candidate| row_id(candidate) == id))
        else {
            return Ok(None);
        };

        for (column, value) in row {
            if column != "id" {
                target.insert(column, value);
            }
        }
        Ok(Some(target.clone()))
    }

    async fn delete(&self, table: &str, ids: &[String]) -> RemoteResult<()> {
        self.begin(StoreOp::Delete, table)?;

        if let Some(rows) = self.tables.lock().get_mut(table) {
            rows.retain(|row| !ids.iter().any(|id| *id == row_id(row)));
        }
        Ok(())
    }
}

/// Connector that always hands out the same in-process store.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: Arc<InMemoryStore>,
}

impl MemoryConnector {
    pub const fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Arc<dyn RemoteStore>, ConnectError> {
        let store: Arc<dyn RemoteStore> = self.store.clone();
        Ok(store)
    }
}

fn row_id(row: &Row) -> String {
    row.get("id").map(value_text).unwrap_or_default()
}

fn with_assigned_id(mut row: Row) -> Row {
    let missing = row.get("id").map_or(true, Value::is_null);
    if missing {
        row.insert(
            "id".to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
    }
    row
}

// Nulls sort last; numbers numerically; everything else by text.
fn compare_values(left: Option<&Value>, right: Option<&Value>) -> CmpOrdering {
    let left = left.filter(|value| !value.is_null());
    let right = right.filter(|value| !value.is_null());
    match (left, right) {
        (None, None) => CmpOrdering::Equal,
        (None, Some(_)) => CmpOrdering::Greater,
        (Some(_), None) => CmpOrdering::Less,
        (Some(left), Some(right)) => match (left.as_f64(), right.as_f64()) {
            (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(CmpOrdering::Equal),
            _ => value_text(left).cmp(&value_text(right)),
        },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::util::is_canonical_id;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_assigns_canonical_ids() {
        let store = InMemoryStore::new();
        let inserted = store
            .insert("players", vec![row(json!({"name": "Ana"}))])
            .await
            .unwrap();
        let id = inserted[0]["id"].as_str().unwrap();
        assert!(is_canonical_id(id));
        assert_eq!(store.rows("players").len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_rejects_duplicate_ids_atomically() {
        let store = InMemoryStore::new();
        store.seed("players", [row(json!({"id": "p1", "name": "Ana"}))]);

        let error = store
            .insert(
                "players",
                vec![
                    row(json!({"id": "p2", "name": "Ben"})),
                    row(json!({"id": "p1", "name": "Ana again"})),
                ],
            )
            .await
            .unwrap_err();
        assert!(error.is_duplicate_key());
        assert_eq!(store.rows("players").len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_merges_columns() {
        let store = InMemoryStore::new();
        store.seed("players", [row(json!({"id": "p1", "name": "Ana", "wins": 1}))]);

        let updated = store
            .update("players", "p1", row(json!({"wins": 2})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated, row(json!({"id": "p1", "name": "Ana", "wins": 2})));
        assert_eq!(
            store.update("players", "missing", Row::new()).await.unwrap(),
            None
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn select_filters_orders_and_limits() {
        let store = InMemoryStore::new();
        store.seed(
            "matches",
            [
                row(json!({"id": "m1", "court_number": 1, "started_at": "2024-01-01T10:05:00Z"})),
                row(json!({"id": "m2", "court_number": 1, "started_at": "2024-01-01T10:00:00Z"})),
                row(json!({"id": "m3", "court_number": 2, "started_at": "2024-01-01T09:00:00Z"})),
            ],
        );

        let rows = store
            .select(
                "matches",
                &Query::new()
                    .eq("court_number", 1)
                    .order_by("started_at", true)
                    .limit(1),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "m2");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_and_injected_failures() {
        let store = InMemoryStore::new();
        store.set_offline(true);
        assert!(store
            .select("players", &Query::new())
            .await
            .unwrap_err()
            .is_transport());
        store.set_offline(false);

        store.fail_next(
            StoreOp::Delete,
            "players",
            RemoteError::Api {
                status: 500,
                message: "boom".into(),
            },
        );
        assert!(store.delete("players", &["p1".into()]).await.is_err());
        assert!(store.delete("players", &["p1".into()]).await.is_ok());
        assert_eq!(store.calls_of(StoreOp::Delete), 2);
        assert_eq!(store.call_count(), 3);

        store.fail_after(StoreOp::Select, "players", 1, RemoteError::Unavailable);
        assert!(store.select("players", &Query::new()).await.is_ok());
        assert!(store.select("players", &Query::new()).await.is_err());
        assert!(store.select("players", &Query::new()).await.is_ok());
    }
}
