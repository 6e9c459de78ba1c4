//! Match model

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::local_id;

/// Which of the two teams a value refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSide {
    #[serde(rename = "team1")]
    One,
    #[serde(rename = "team2")]
    Two,
}

impl TeamSide {
    /// Remote encoding: `1` or `2`
    pub const fn number(self) -> i64 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    pub const fn from_number(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            _ => None,
        }
    }
}

/// Two players on one side of a match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub player_ids: [String; 2],
    /// Display names resolved from the players collection
    #[serde(default)]
    pub player_names: [String; 2],
    #[serde(default)]
    pub score: Option<u32>,
}

impl Team {
    pub fn of(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            player_ids: [first.into(), second.into()],
            player_names: [String::new(), String::new()],
            score: None,
        }
    }
}

/// A doubles match played on one court of a session
///
/// Lifecycle is encoded by timestamps: a match is open until either
/// `completed_at` or `cancelled_at` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub session_id: String,
    pub court_number: u32,
    #[serde(default = "Utc::now")]
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub team1: Team,
    pub team2: Team,
    #[serde(default)]
    pub winning_team: Option<TeamSide>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default = "default_match_type")]
    pub match_type: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Match {
    /// Start a match. The four player ids must be distinct.
    pub fn new(
        session_id: impl Into<String>,
        court_number: u32,
        team1: Team,
        team2: Team,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for id in team1.player_ids.iter().chain(team2.player_ids.iter()) {
            if id.trim().is_empty() {
                return Err(Error::InvalidInput("match player id must not be empty".into()));
            }
            if !seen.insert(id.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "player {id} appears more than once in the match"
                )));
            }
        }

        Ok(Self {
            id: local_id(),
            session_id: session_id.into(),
            court_number,
            started_at: Utc::now(),
            completed_at: None,
            cancelled_at: None,
            team1,
            team2,
            winning_team: None,
            duration_minutes: None,
            match_type: default_match_type(),
            notes: None,
        })
    }

    pub const fn is_open(&self) -> bool {
        self.completed_at.is_none() && self.cancelled_at.is_none()
    }

    /// All four player ids, team one first.
    pub fn player_ids(&self) -> impl Iterator<Item = &str> {
        self.team1
            .player_ids
            .iter()
            .chain(self.team2.player_ids.iter())
            .map(String::as_str)
    }

    pub fn complete(&mut self, winner: TeamSide, scores: (u32, u32), at: DateTime<Utc>) {
        self.winning_team = Some(winner);
        self.team1.score = Some(scores.0);
        self.team2.score = Some(scores.1);
        self.completed_at = Some(at);
        let minutes = (at - self.started_at).num_minutes().max(0);
        self.duration_minutes = u32::try_from(minutes).ok();
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) {
        if self.is_open() {
            self.cancelled_at = Some(at);
        }
    }
}

fn default_match_type() -> String {
    "doubles".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teams() -> (Team, Team) {
        (Team::of("a", "b"), Team::of("c", "d"))
    }

    #[test]
    fn test_match_requires_four_distinct_players() {
        let (team1, _) = teams();
        let error = Match::new("s1", 1, team1, Team::of("a", "d")).unwrap_err();
        assert!(error.to_string().contains("more than once"));

        let (team1, team2) = teams();
        let game = Match::new("s1", 1, team1, team2).unwrap();
        assert_eq!(game.player_ids().collect::<Vec<_>>(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_complete_closes_match() {
        let (team1, team2) = teams();
        let mut game = Match::new("s1", 2, team1, team2).unwrap();
        assert!(game.is_open());

        let finished = game.started_at + chrono::Duration::minutes(14);
        game.complete(TeamSide::Two, (18, 21), finished);

        assert!(!game.is_open());
        assert_eq!(game.winning_team, Some(TeamSide::Two));
        assert_eq!(game.team2.score, Some(21));
        assert_eq!(game.duration_minutes, Some(14));
    }

    #[test]
    fn test_cancel_after_completion_is_ignored() {
        let (team1, team2) = teams();
        let mut game = Match::new("s1", 2, team1, team2).unwrap();
        let now = Utc::now();
        game.complete(TeamSide::One, (21, 10), now);
        game.cancel(now);
        assert_eq!(game.cancelled_at, None);
    }

    #[test]
    fn test_team_side_numbers() {
        assert_eq!(TeamSide::from_number(TeamSide::One.number()), Some(TeamSide::One));
        assert_eq!(TeamSide::from_number(2), Some(TeamSide::Two));
        assert_eq!(TeamSide::from_number(0), None);
    }
}
