use serde_json::{json, Value};

use super::row::{opt_timestamp_value, timestamp_value};
use super::{Lookup, RemoteShape, RowReader};
use crate::models::{
    Court, EloHistoryRecord, Match, MatchEvent, Player, PlayerStats, Rating, Session,
    SessionPlayer, SessionRating, SessionSetting, SessionStats, Team, TeamSide, INITIAL_RATING,
};
use crate::remote::Row;

fn into_row(value: Value) -> Row {
    match value {
        Value::Object(row) => row,
        _ => Row::new(),
    }
}

// Lookup first, then a denormalized name column if the row has one.
fn player_name(reader: &RowReader<'_>, lookup: &Lookup, id: &str, name_column: &str) -> String {
    let resolved = lookup.player_name(id);
    if resolved != super::UNKNOWN_PLAYER {
        return resolved;
    }
    reader.non_empty(name_column).unwrap_or(resolved)
}

impl RemoteShape for Player {
    fn from_row(row: &Row, _lookup: &Lookup) -> Self {
        let r = RowReader::new(row);
        Self {
            id: r.string("id"),
            name: r.string("name"),
            email: r.opt_string("email"),
            stats: PlayerStats {
                total_matches: r.u32("total_matches"),
                wins: r.u32("wins"),
                losses: r.u32("losses"),
            },
            rating: Rating {
                current: r.f64_or("current_rating", INITIAL_RATING),
                highest: r.f64_or("highest_rating", INITIAL_RATING),
                lowest: r.f64_or("lowest_rating", INITIAL_RATING),
            },
            is_active: r.bool_or("is_active", true),
            last_active_at: r.opt_timestamp("last_active_at"),
            created_at: r.timestamp("created_at"),
        }
    }

    fn to_row(&self, _lookup: &Lookup) -> Row {
        into_row(json!({
            "id": self.id,
            "name": self.name,
            "email": self.email,
            "total_matches": self.stats.total_matches,
            "wins": self.stats.wins,
            "losses": self.stats.losses,
            "current_rating": self.rating.current,
            "highest_rating": self.rating.highest,
            "lowest_rating": self.rating.lowest,
            "is_active": self.is_active,
            "last_active_at": opt_timestamp_value(self.last_active_at),
            "created_at": timestamp_value(self.created_at),
        }))
    }
}

impl RemoteShape for Session {
    fn from_row(row: &Row, _lookup: &Lookup) -> Self {
        let r = RowReader::new(row);
        Self {
            id: r.string("id"),
            name: r.string("name"),
            description: r.opt_string("description"),
            created_at: r.timestamp("created_at"),
            ended_at: r.opt_timestamp("ended_at"),
            court_count: r.u32_or("court_count", 1),
            is_active: r.bool_or("is_active", true),
        }
    }

    fn to_row(&self, _lookup: &Lookup) -> Row {
        into_row(json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "created_at": timestamp_value(self.created_at),
            "ended_at": opt_timestamp_value(self.ended_at),
            "court_count": self.court_count,
            "is_active": self.is_active,
        }))
    }
}

impl RemoteShape for SessionPlayer {
    fn from_row(row: &Row, lookup: &Lookup) -> Self {
        let r = RowReader::new(row);
        let player_id = r.string("player_id");
        Self {
            id: r.string("id"),
            session_id: r.string("session_id"),
            player_name: player_name(&r, lookup, &player_id, "player_name"),
            player_id,
            joined_at: r.timestamp("joined_at"),
            left_at: r.opt_timestamp("left_at"),
            stats: SessionStats {
                matches_played: r.u32("matches_played"),
                wins: r.u32("wins"),
                losses: r.u32("losses"),
            },
            rating: SessionRating {
                start: r.f64_or("start_rating", INITIAL_RATING),
                current: r.f64_or("current_rating", INITIAL_RATING),
                peak: r.f64_or("peak_rating", INITIAL_RATING),
            },
            is_active: r.bool_or("is_active", true),
        }
    }

    fn to_row(&self, lookup: &Lookup) -> Row {
        into_row(json!({
            "id": self.id,
            "session_id": self.session_id,
            "player_id": lookup.resolve_player_id(&self.player_id, &self.player_name),
            "joined_at": timestamp_value(self.joined_at),
            "left_at": opt_timestamp_value(self.left_at),
            "matches_played": self.stats.matches_played,
            "wins": self.stats.wins,
            "losses": self.stats.losses,
            "start_rating": self.rating.start,
            "current_rating": self.rating.current,
            "peak_rating": self.rating.peak,
            "is_active": self.is_active,
        }))
    }
}

fn read_team(r: &RowReader<'_>, lookup: &Lookup, prefix: &str) -> Team {
    let first = r.string(&format!("{prefix}_player1_id"));
    let second = r.string(&format!("{prefix}_player2_id"));
    Team {
        player_names: [
            player_name(r, lookup, &first, &format!("{prefix}_player1_name")),
            player_name(r, lookup, &second, &format!("{prefix}_player2_name")),
        ],
        player_ids: [first, second],
        score: r.opt_u32(&format!("{prefix}_score")),
    }
}

fn read_winner(r: &RowReader<'_>) -> Option<TeamSide> {
    match r.opt_string("winning_team")?.as_str() {
        "1" | "team1" => Some(TeamSide::One),
        "2" | "team2" => Some(TeamSide::Two),
        _ => None,
    }
}

impl RemoteShape for Match {
    fn from_row(row: &Row, lookup: &Lookup) -> Self {
        let r = RowReader::new(row);
        Self {
            id: r.string("id"),
            session_id: r.string("session_id"),
            court_number: r.u32("court_number"),
            started_at: r.timestamp("started_at"),
            completed_at: r.opt_timestamp("completed_at"),
            cancelled_at: r.opt_timestamp("cancelled_at"),
            team1: read_team(&r, lookup, "team1"),
            team2: read_team(&r, lookup, "team2"),
            winning_team: read_winner(&r),
            duration_minutes: r.opt_u32("duration_minutes"),
            match_type: r
                .non_empty("match_type")
                .unwrap_or_else(|| "doubles".to_string()),
            notes: r.opt_string("notes"),
        }
    }

    fn to_row(&self, lookup: &Lookup) -> Row {
        let resolve = |team: &Team, index: usize| {
            lookup.resolve_player_id(&team.player_ids[index], &team.player_names[index])
        };
        into_row(json!({
            "id": self.id,
            "session_id": self.session_id,
            "court_number": self.court_number,
            "started_at": timestamp_value(self.started_at),
            "completed_at": opt_timestamp_value(self.completed_at),
            "cancelled_at": opt_timestamp_value(self.cancelled_at),
            "team1_player1_id": resolve(&self.team1, 0),
            "team1_player2_id": resolve(&self.team1, 1),
            "team2_player1_id": resolve(&self.team2, 0),
            "team2_player2_id": resolve(&self.team2, 1),
            "team1_score": self.team1.score,
            "team2_score": self.team2.score,
            "winning_team": self.winning_team.map(TeamSide::number),
            "duration_minutes": self.duration_minutes,
            "match_type": self.match_type,
            "notes": self.notes,
        }))
    }
}

impl RemoteShape for EloHistoryRecord {
    fn from_row(row: &Row, lookup: &Lookup) -> Self {
        let r = RowReader::new(row);
        let player_id = r.string("player_id");
        let rating_before = r.f64_or("rating_before", INITIAL_RATING);
        let rating_after = r.f64_or("rating_after", rating_before);
        Self {
            id: r.string("id"),
            player_name: player_name(&r, lookup, &player_id, "player_name"),
            player_id,
            match_id: r.string("match_id"),
            session_id: r.string("session_id"),
            rating_before,
            rating_after,
            rating_change: r.f64_or("rating_change", rating_after - rating_before),
            was_winner: r.bool_or("was_winner", false),
            opponent_rating: r.opt_f64("opponent_rating"),
            created_at: r.timestamp("created_at"),
        }
    }

    fn to_row(&self, lookup: &Lookup) -> Row {
        into_row(json!({
            "id": self.id,
            "player_id": lookup.resolve_player_id(&self.player_id, &self.player_name),
            "match_id": self.match_id,
            "session_id": self.session_id,
            "rating_before": self.rating_before,
            "rating_after": self.rating_after,
            "rating_change": self.rating_change,
            "was_winner": self.was_winner,
            "opponent_rating": self.opponent_rating,
            "created_at": timestamp_value(self.created_at),
        }))
    }
}

impl RemoteShape for Court {
    fn from_row(row: &Row, _lookup: &Lookup) -> Self {
        let r = RowReader::new(row);
        Self {
            id: r.string("id"),
            session_id: r.string("session_id"),
            court_number: r.u32("court_number"),
            name: r.opt_string("name"),
            is_available: r.bool_or("is_available", true),
        }
    }

    fn to_row(&self, _lookup: &Lookup) -> Row {
        into_row(json!({
            "id": self.id,
            "session_id": self.session_id,
            "court_number": self.court_number,
            "name": self.name,
            "is_available": self.is_available,
        }))
    }
}

impl RemoteShape for MatchEvent {
    fn from_row(row: &Row, _lookup: &Lookup) -> Self {
        let r = RowReader::new(row);
        Self {
            id: r.string("id"),
            match_id: r.string("match_id"),
            event_type: r.string("event_type"),
            payload: r.json("payload"),
            created_at: r.timestamp("created_at"),
        }
    }

    fn to_row(&self, _lookup: &Lookup) -> Row {
        into_row(json!({
            "id": self.id,
            "match_id": self.match_id,
            "event_type": self.event_type,
            "payload": self.payload,
            "created_at": timestamp_value(self.created_at),
        }))
    }
}

impl RemoteShape for SessionSetting {
    fn from_row(row: &Row, _lookup: &Lookup) -> Self {
        let r = RowReader::new(row);
        Self {
            id: r.string("id"),
            session_id: r.string("session_id"),
            key: r.string("key"),
            value: r.json("value"),
        }
    }

    fn to_row(&self, _lookup: &Lookup) -> Row {
        into_row(json!({
            "id": self.id,
            "session_id": self.session_id,
            "key": self.key,
            "value": self.value,
        }))
    }
}
