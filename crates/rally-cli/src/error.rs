use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] rally_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Player name cannot be empty")]
    EmptyPlayerName,
    #[error("Session name cannot be empty")]
    EmptySessionName,
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Session {0} has already ended")]
    SessionAlreadyEnded(String),
}
