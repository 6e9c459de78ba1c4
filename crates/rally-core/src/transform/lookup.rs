//! Player id/name resolution for relationship collections

use std::collections::HashMap;

use crate::remote::{Query, RemoteHandle, Row};
use crate::transform::RowReader;
use crate::util::is_canonical_id;

/// Display name used when a referenced player cannot be resolved
pub const UNKNOWN_PLAYER: &str = "Unknown Player";

const PLAYERS_TABLE: &str = "players";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup {
    names_by_id: HashMap<String, String>,
    ids_by_name: HashMap<String, String>,
}

impl Lookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from remote `players` rows.
    pub fn from_rows(rows: &[Row]) -> Self {
        let mut lookup = Self::new();
        for row in rows {
            let reader = RowReader::new(row);
            if let (Some(id), Some(name)) = (reader.non_empty("id"), reader.non_empty("name")) {
                lookup.insert(id, name);
            }
        }
        lookup
    }

    /// Fetch the player table once for a batch.
    ///
    /// A failed fetch yields an empty lookup: names degrade to the sentinel
    /// and ids pass through unchanged.
    pub async fn fetch(handle: &RemoteHandle) -> Self {
        match handle.select(PLAYERS_TABLE, &Query::new()).await {
            Ok(rows) => {
                let lookup = Self::from_rows(&rows);
                tracing::debug!("Loaded player lookup with {} entries", lookup.len());
                lookup
            }
            Err(error) => {
                tracing::warn!("Player lookup unavailable, names will be unresolved: {}", error);
                Self::new()
            }
        }
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        let id = id.into();
        let name = name.into();
        self.ids_by_name.insert(name_key(&name), id.clone());
        self.names_by_id.insert(id, name);
    }

    pub fn len(&self) -> usize {
        self.names_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names_by_id.is_empty()
    }

    /// Name of the player with `id`, or `UNKNOWN_PLAYER`.
    pub fn player_name(&self, id: &str) -> String {
        self.names_by_id
            .get(id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_PLAYER.to_string())
    }

    /// Remote player id for a local reference.
    ///
    /// Canonical ids are kept. A local placeholder is replaced by the id of
    /// the player with the same name when one is known.
    pub fn resolve_player_id(&self, id: &str, name: &str) -> String {
        if is_canonical_id(id) || name == UNKNOWN_PLAYER {
            return id.to_string();
        }
        self.ids_by_name
            .get(&name_key(name))
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const ANA: &str = "0b8c6c3e-4f3a-4d1e-9a55-2f0f6b3a9c11";

    fn lookup() -> Lookup {
        let rows = vec![json!({"id": ANA, "name": "Ana"})
            .as_object()
            .cloned()
            .unwrap()];
        Lookup::from_rows(&rows)
    }

    #[test]
    fn unknown_ids_resolve_to_sentinel() {
        let lookup = lookup();
        assert_eq!(lookup.player_name(ANA), "Ana");
        assert_eq!(lookup.player_name("orphan"), UNKNOWN_PLAYER);
    }

    #[test]
    fn local_ids_resolve_by_name() {
        let lookup = lookup();
        assert_eq!(lookup.resolve_player_id("local-1", " ana "), ANA);
        assert_eq!(lookup.resolve_player_id("local-2", "Ben"), "local-2");
        assert_eq!(lookup.resolve_player_id(ANA, "Someone else"), ANA);
    }
}
