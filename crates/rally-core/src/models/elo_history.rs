//! Rating history model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::local_id;

/// One rating change caused by one match. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EloHistoryRecord {
    pub id: String,
    pub player_id: String,
    /// Display name resolved from the players collection
    #[serde(default)]
    pub player_name: String,
    pub match_id: String,
    pub session_id: String,
    pub rating_before: f64,
    pub rating_after: f64,
    #[serde(default)]
    pub rating_change: f64,
    #[serde(default)]
    pub was_winner: bool,
    #[serde(default)]
    pub opponent_rating: Option<f64>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl EloHistoryRecord {
    #[must_use]
    pub fn new(
        player_id: impl Into<String>,
        match_id: impl Into<String>,
        session_id: impl Into<String>,
        rating_before: f64,
        rating_after: f64,
        was_winner: bool,
    ) -> Self {
        Self {
            id: local_id(),
            player_id: player_id.into(),
            player_name: String::new(),
            match_id: match_id.into(),
            session_id: session_id.into(),
            rating_before,
            rating_after,
            rating_change: rating_after - rating_before,
            was_winner,
            opponent_rating: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn against(mut self, opponent_rating: f64) -> Self {
        self.opponent_rating = Some(opponent_rating);
        self
    }
}
