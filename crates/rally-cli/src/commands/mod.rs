/// Run `$body` with `$entity` bound to the record type of `$kind`.
macro_rules! with_entity {
    ($kind:expr, $entity:ident => $body:expr) => {
        match $kind {
            rally_core::CollectionKind::Players => {
                type $entity = rally_core::models::Player;
                $body
            }
            rally_core::CollectionKind::Sessions => {
                type $entity = rally_core::models::Session;
                $body
            }
            rally_core::CollectionKind::SessionPlayers => {
                type $entity = rally_core::models::SessionPlayer;
                $body
            }
            rally_core::CollectionKind::Matches => {
                type $entity = rally_core::models::Match;
                $body
            }
            rally_core::CollectionKind::EloHistory => {
                type $entity = rally_core::models::EloHistoryRecord;
                $body
            }
            rally_core::CollectionKind::Courts => {
                type $entity = rally_core::models::Court;
                $body
            }
            rally_core::CollectionKind::MatchEvents => {
                type $entity = rally_core::models::MatchEvent;
                $body
            }
            rally_core::CollectionKind::SessionSettings => {
                type $entity = rally_core::models::SessionSetting;
                $body
            }
        }
    };
}

pub mod common;
pub mod completions;
pub mod list;
pub mod player;
pub mod resync;
pub mod session;
pub mod status;
