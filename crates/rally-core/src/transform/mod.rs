//! Remote row <-> local entity mapping
//!
//! Remote rows are flat and reference players by id. Local entities carry
//! resolved display names and nested values. Both directions are total:
//! missing columns take defaults and unresolvable references become
//! [`UNKNOWN_PLAYER`].

mod entities;
mod lookup;
mod row;

pub use lookup::{Lookup, UNKNOWN_PLAYER};
pub use row::{opt_timestamp_value, timestamp_value, RowReader};

use crate::models::Entity;
use crate::registry::CollectionKind;
use crate::remote::{RemoteHandle, Row};
use crate::util::is_canonical_id;

/// Conversion between a local record and its remote row.
pub trait RemoteShape: Sized {
    fn from_row(row: &Row, lookup: &Lookup) -> Self;

    fn to_row(&self, lookup: &Lookup) -> Row;
}

/// Batch transformer holding the lookup for one sync or load operation.
#[derive(Debug, Clone, Default)]
pub struct EntityTransformer {
    lookup: Lookup,
}

impl EntityTransformer {
    pub const fn new(lookup: Lookup) -> Self {
        Self { lookup }
    }

    /// Fetch whatever lookup data `kind` needs, once for the whole batch.
    pub async fn for_batch(kind: CollectionKind, handle: &RemoteHandle) -> Self {
        if kind.needs_player_lookup() {
            Self::new(Lookup::fetch(handle).await)
        } else {
            Self::default()
        }
    }

    pub const fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    pub fn to_local<T: RemoteShape>(&self, rows: &[Row]) -> Vec<T> {
        rows.iter()
            .map(|row| T::from_row(row, &self.lookup))
            .collect()
    }

    pub fn to_remote<T: RemoteShape>(&self, item: &T) -> Row {
        item.to_row(&self.lookup)
    }

    /// Row for an insert. A non-canonical id is left out so the remote
    /// assigns one.
    pub fn insert_row<T: Entity>(&self, item: &T) -> Row {
        let mut row = self.to_remote(item);
        if !is_canonical_id(item.id()) {
            row.remove("id");
        }
        row
    }
}
