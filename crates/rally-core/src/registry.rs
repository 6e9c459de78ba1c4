//! Collection registry
//!
//! A closed table mapping each logical collection to its remote table, load
//! ordering, and lifecycle rules. Selection happens by matching on
//! `CollectionKind`, never on free-form strings.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Every collection mirrored between the local cache and the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Players,
    Sessions,
    SessionPlayers,
    Matches,
    EloHistory,
    Courts,
    MatchEvents,
    SessionSettings,
}

impl CollectionKind {
    pub const ALL: [Self; 8] = [
        Self::Players,
        Self::Sessions,
        Self::SessionPlayers,
        Self::Matches,
        Self::EloHistory,
        Self::Courts,
        Self::MatchEvents,
        Self::SessionSettings,
    ];

    /// Cache key of the collection snapshot
    pub const fn key(self) -> &'static str {
        match self {
            Self::Players => "players",
            Self::Sessions => "sessions",
            Self::SessionPlayers => "session_players",
            Self::Matches => "matches",
            Self::EloHistory => "elo_history",
            Self::Courts => "courts",
            Self::MatchEvents => "match_events",
            Self::SessionSettings => "session_settings",
        }
    }

    /// Whether local rows carry player names that must be resolved
    pub const fn needs_player_lookup(self) -> bool {
        matches!(
            self,
            Self::SessionPlayers | Self::Matches | Self::EloHistory
        )
    }

    pub const fn descriptor(self) -> CollectionDescriptor {
        match self {
            Self::Players => CollectionDescriptor::new(self, "players", "created_at"),
            Self::Sessions => CollectionDescriptor::new(self, "sessions", "created_at"),
            Self::SessionPlayers => CollectionDescriptor::new(self, "session_players", "joined_at")
                .with_lifecycle(Lifecycle {
                    slot_columns: &["session_id", "player_id"],
                    closed_columns: &["left_at"],
                    start_column: "joined_at",
                }),
            Self::Matches => CollectionDescriptor::new(self, "matches", "started_at")
                .with_lifecycle(Lifecycle {
                    slot_columns: &["session_id", "court_number"],
                    closed_columns: &["completed_at", "cancelled_at"],
                    start_column: "started_at",
                }),
            Self::EloHistory => CollectionDescriptor::new(self, "elo_history", "created_at"),
            Self::Courts => CollectionDescriptor::new(self, "courts", "court_number"),
            Self::MatchEvents => CollectionDescriptor::new(self, "match_events", "created_at"),
            Self::SessionSettings => CollectionDescriptor::new(self, "session_settings", "key"),
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CollectionKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == wanted)
            .ok_or_else(|| Error::InvalidInput(format!("unknown collection: {s}")))
    }
}

/// Open/closed lifecycle encoded by nullable timestamp columns.
///
/// A row is open while every `closed_columns` value is null. At most one open
/// row is expected per combination of `slot_columns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    pub slot_columns: &'static [&'static str],
    pub closed_columns: &'static [&'static str],
    /// Earliest value wins when several open rows share a slot
    pub start_column: &'static str,
}

/// Static properties of one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionDescriptor {
    pub kind: CollectionKind,
    pub table: &'static str,
    pub order_by: &'static str,
    pub remote_capable: bool,
    pub lifecycle: Option<Lifecycle>,
}

impl CollectionDescriptor {
    const fn new(kind: CollectionKind, table: &'static str, order_by: &'static str) -> Self {
        Self {
            kind,
            table,
            order_by,
            remote_capable: true,
            lifecycle: None,
        }
    }

    const fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub const fn key(&self) -> &'static str {
        self.kind.key()
    }

    /// Cache key of the one-time migration marker
    pub fn migrated_marker_key(&self) -> String {
        format!("{}_migrated", self.key())
    }
}

/// The validated set of collection descriptors.
#[derive(Debug, Clone)]
pub struct Registry {
    descriptors: Vec<CollectionDescriptor>,
}

impl Registry {
    /// Build the registry from every `CollectionKind`, validating it.
    pub fn standard() -> Result<Self> {
        Self::from_descriptors(CollectionKind::ALL.iter().map(|kind| kind.descriptor()).collect())
    }

    /// The standard registry with `local_only` collections kept off the remote.
    pub fn with_local_only(local_only: &[CollectionKind]) -> Result<Self> {
        Self::from_descriptors(
            CollectionKind::ALL
                .iter()
                .map(|kind| {
                    let mut descriptor = kind.descriptor();
                    descriptor.remote_capable = !local_only.contains(kind);
                    descriptor
                })
                .collect(),
        )
    }

    pub fn from_descriptors(descriptors: Vec<CollectionDescriptor>) -> Result<Self> {
        let registry = Self { descriptors };
        registry.validate()?;
        Ok(registry)
    }

    /// Reject duplicate keys or tables and incomplete lifecycle rules.
    pub fn validate(&self) -> Result<()> {
        let mut keys = HashSet::new();
        let mut tables = HashSet::new();

        for descriptor in &self.descriptors {
            if !keys.insert(descriptor.key()) {
                return Err(Error::Configuration(format!(
                    "collection '{}' registered twice",
                    descriptor.key()
                )));
            }
            if descriptor.table.trim().is_empty() || !tables.insert(descriptor.table) {
                return Err(Error::Configuration(format!(
                    "collection '{}' has an empty or shared table name '{}'",
                    descriptor.key(),
                    descriptor.table
                )));
            }
            if descriptor.order_by.trim().is_empty() {
                return Err(Error::Configuration(format!(
                    "collection '{}' has no order column",
                    descriptor.key()
                )));
            }
            if let Some(lifecycle) = descriptor.lifecycle {
                if lifecycle.slot_columns.is_empty() || lifecycle.closed_columns.is_empty() {
                    return Err(Error::Configuration(format!(
                        "collection '{}' has an incomplete lifecycle rule",
                        descriptor.key()
                    )));
                }
            }
        }

        for kind in CollectionKind::ALL {
            if !keys.contains(kind.key()) {
                return Err(Error::Configuration(format!(
                    "collection '{kind}' is not registered"
                )));
            }
        }

        Ok(())
    }

    pub fn get(&self, kind: CollectionKind) -> CollectionDescriptor {
        self.descriptors
            .iter()
            .copied()
            .find(|descriptor| descriptor.kind == kind)
            .unwrap_or_else(|| kind.descriptor())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollectionDescriptor> {
        self.descriptors.iter()
    }
}
