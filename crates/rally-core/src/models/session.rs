//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::default_true;
use crate::util::local_id;

/// A play session spanning one or more courts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default = "default_court_count")]
    pub court_count: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Session {
    #[must_use]
    pub fn new(name: impl Into<String>, court_count: u32) -> Self {
        Self {
            id: local_id(),
            name: name.into(),
            description: None,
            created_at: Utc::now(),
            ended_at: None,
            court_count: court_count.max(1),
            is_active: true,
        }
    }

    /// Close the session. Ending is a state change, never a removal.
    pub fn end(&mut self, at: DateTime<Utc>) {
        if self.ended_at.is_none() {
            self.ended_at = Some(at);
        }
        self.is_active = false;
    }

    pub const fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

const fn default_court_count() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new_clamps_courts() {
        let session = Session::new("Tuesday", 0);
        assert_eq!(session.court_count, 1);
        assert!(session.is_open());
    }

    #[test]
    fn test_end_keeps_first_timestamp() {
        let mut session = Session::new("Tuesday", 2);
        let first = Utc::now();
        session.end(first);
        session.end(first + chrono::Duration::minutes(5));
        assert_eq!(session.ended_at, Some(first));
        assert!(!session.is_active);
    }
}
