//! Session membership model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{default_true, Player, INITIAL_RATING};
use crate::util::local_id;

/// Match counters scoped to one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    #[serde(default)]
    pub matches_played: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
}

/// Rating trajectory within one session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionRating {
    #[serde(default = "initial_rating")]
    pub start: f64,
    #[serde(default = "initial_rating")]
    pub current: f64,
    #[serde(default = "initial_rating")]
    pub peak: f64,
}

impl SessionRating {
    pub const fn starting_at(rating: f64) -> Self {
        Self {
            start: rating,
            current: rating,
            peak: rating,
        }
    }
}

impl Default for SessionRating {
    fn default() -> Self {
        Self::starting_at(INITIAL_RATING)
    }
}

/// A player's participation in a session
///
/// At most one open membership exists per (session, player); leaving closes
/// the membership through `left_at` instead of removing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlayer {
    pub id: String,
    pub session_id: String,
    pub player_id: String,
    /// Display name resolved from the players collection
    #[serde(default)]
    pub player_name: String,
    #[serde(default = "Utc::now")]
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub left_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: SessionStats,
    #[serde(default)]
    pub rating: SessionRating,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl SessionPlayer {
    #[must_use]
    pub fn join(session_id: impl Into<String>, player: &Player) -> Self {
        Self {
            id: local_id(),
            session_id: session_id.into(),
            player_id: player.id.clone(),
            player_name: player.name.clone(),
            joined_at: Utc::now(),
            left_at: None,
            stats: SessionStats::default(),
            rating: SessionRating::starting_at(player.rating.current),
            is_active: true,
        }
    }

    pub fn leave(&mut self, at: DateTime<Utc>) {
        if self.left_at.is_none() {
            self.left_at = Some(at);
        }
        self.is_active = false;
    }

    pub const fn is_open(&self) -> bool {
        self.left_at.is_none()
    }

    pub fn record_result(&mut self, won: bool, new_rating: f64) {
        self.stats.matches_played += 1;
        if won {
            self.stats.wins += 1;
        } else {
            self.stats.losses += 1;
        }
        self.rating.current = new_rating;
        self.rating.peak = self.rating.peak.max(new_rating);
    }
}

const fn initial_rating() -> f64 {
    INITIAL_RATING
}
