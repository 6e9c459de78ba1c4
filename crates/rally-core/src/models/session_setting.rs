//! Session setting model

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::util::local_id;

/// A keyed setting scoped to one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSetting {
    pub id: String,
    pub session_id: String,
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

impl SessionSetting {
    #[must_use]
    pub fn new(session_id: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            id: local_id(),
            session_id: session_id.into(),
            key: key.into(),
            value,
        }
    }
}
