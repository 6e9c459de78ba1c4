//! Data models for Rally
//!
//! Every collection mirrored between the local cache and the remote store has
//! an explicit record type here. Optional fields carry serde defaults so that
//! a partially populated cache entry still decodes into a complete record.

mod court;
mod elo_history;
mod match_event;
mod match_record;
mod player;
mod session;
mod session_player;
mod session_setting;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::registry::CollectionKind;
use crate::transform::RemoteShape;

pub use court::Court;
pub use elo_history::EloHistoryRecord;
pub use match_event::MatchEvent;
pub use match_record::{Match, Team, TeamSide};
pub use player::{Player, PlayerStats, Rating, INITIAL_RATING};
pub use session::Session;
pub use session_player::{SessionPlayer, SessionRating, SessionStats};
pub use session_setting::SessionSetting;

/// A record that belongs to exactly one mirrored collection.
pub trait Entity: RemoteShape + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The collection this record type is stored in
    const KIND: CollectionKind;

    /// Stable identifier, canonical once the remote has assigned one
    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);
}

macro_rules! impl_entity {
    ($ty:ty, $kind:expr) => {
        impl Entity for $ty {
            const KIND: CollectionKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        }
    };
}

impl_entity!(Player, CollectionKind::Players);
impl_entity!(Session, CollectionKind::Sessions);
impl_entity!(SessionPlayer, CollectionKind::SessionPlayers);
impl_entity!(Match, CollectionKind::Matches);
impl_entity!(EloHistoryRecord, CollectionKind::EloHistory);
impl_entity!(Court, CollectionKind::Courts);
impl_entity!(MatchEvent, CollectionKind::MatchEvents);
impl_entity!(SessionSetting, CollectionKind::SessionSettings);

pub(crate) const fn default_true() -> bool {
    true
}
