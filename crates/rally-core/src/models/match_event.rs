//! Match event model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::util::local_id;

/// Free-form event attached to a match (substitution, timeout, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub id: String,
    pub match_id: String,
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl MatchEvent {
    #[must_use]
    pub fn new(match_id: impl Into<String>, event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            id: local_id(),
            match_id: match_id.into(),
            event_type: event_type.into(),
            payload,
            created_at: Utc::now(),
        }
    }
}
