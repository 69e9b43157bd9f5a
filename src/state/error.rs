//! Error types.
//!
//! Nothing here is fatal to the host: configuration errors fall back to
//! defaults, admin errors become a message to the invoking admin, host
//! errors are logged and the current step moves on to the next player.

use std::path::PathBuf;
use thiserror::Error;

/// Persisted configuration could not be read or written.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// An administrative operation was rejected. No state was changed.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Session {0} does not exist")]
    UnknownSession(String),

    #[error("Session {session_id} has no pillar {pillar_id}")]
    UnknownPillar {
        session_id: String,
        pillar_id: String,
    },

    #[error("Session {0} already has a round in progress")]
    RoundInProgress(String),

    #[error("Not enough players to start (current: {current}, required: {required})")]
    NotEnoughPlayers { current: usize, required: usize },

    #[error("Session {0} has no pillars")]
    NoPillars(String),

    #[error("Sender has no position in the world")]
    NoPosition,

    #[error("Failed to persist configuration: {0}")]
    Config(#[from] ConfigError),
}

/// A call into the host server failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("Player {0} is offline")]
    PlayerOffline(String),

    #[error("Host call failed: {0}")]
    Failed(String),
}

pub type HostResult<T = ()> = Result<T, HostError>;

/// A command line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Unknown subcommand: {0}")]
    Unknown(String),
}
