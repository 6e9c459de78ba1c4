//! Court model

use serde::{Deserialize, Serialize};

use super::default_true;
use crate::util::local_id;

/// A numbered court available to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Court {
    pub id: String,
    pub session_id: String,
    pub court_number: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

impl Court {
    #[must_use]
    pub fn new(session_id: impl Into<String>, court_number: u32) -> Self {
        Self {
            id: local_id(),
            session_id: session_id.into(),
            court_number,
            name: None,
            is_available: true,
        }
    }
}
