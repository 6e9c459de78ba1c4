use std::path::PathBuf;

use serde::Serialize;

use crate::remote::ClientState;

/// Coarse diagnostic signal of the storage stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// A connected remote client is in use
    pub remote_active: bool,
    /// Missing configuration switched the remote off until reset
    pub remote_disabled: bool,
    pub client_state: ClientState,
    pub last_error: Option<String>,
    pub consecutive_transport_errors: u32,
    pub cache_path: Option<PathBuf>,
}
