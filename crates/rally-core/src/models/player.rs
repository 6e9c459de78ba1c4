//! Player model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::default_true;
use crate::util::local_id;

/// Rating every player starts from
pub const INITIAL_RATING: f64 = 1500.0;

/// Lifetime match counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    #[serde(default)]
    pub total_matches: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
}

/// Current rating together with its historical extremes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(default = "initial_rating")]
    pub current: f64,
    #[serde(default = "initial_rating")]
    pub highest: f64,
    #[serde(default = "initial_rating")]
    pub lowest: f64,
}

impl Rating {
    pub const fn initial() -> Self {
        Self {
            current: INITIAL_RATING,
            highest: INITIAL_RATING,
            lowest: INITIAL_RATING,
        }
    }

    /// Move to `rating`, widening the recorded extremes if needed.
    #[must_use]
    pub fn moved_to(self, rating: f64) -> Self {
        Self {
            current: rating,
            highest: self.highest.max(rating),
            lowest: self.lowest.min(rating),
        }
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self::initial()
    }
}

/// A player in the system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub stats: PlayerStats,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub last_active_at: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Player {
    /// Create a new player with a local id and the initial rating
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: local_id(),
            name: name.into(),
            email: None,
            stats: PlayerStats::default(),
            rating: Rating::initial(),
            is_active: true,
            last_active_at: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Record a finished match and the rating it produced.
    pub fn record_result(&mut self, won: bool, new_rating: f64, at: DateTime<Utc>) {
        self.stats.total_matches += 1;
        if won {
            self.stats.wins += 1;
        } else {
            self.stats.losses += 1;
        }
        self.rating = self.rating.moved_to(new_rating);
        self.last_active_at = Some(at);
    }
}

const fn initial_rating() -> f64 {
    INITIAL_RATING
}
