//! Review client error types

use thiserror::Error;

/// A failed call to the analysis service. Cancellation is not a variant:
/// aborted requests never surface as errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Response decode error: {0}")]
    Decode(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("No game loaded")]
    NoSession,

    #[error("Cannot explore an alternate line before the first move")]
    BranchFromStart,

    #[error("Not exploring an alternate line")]
    NotInAlternate,

    #[error("Ply {ply} is past the end of the game (last ply {last})")]
    PlyOutOfRange { ply: usize, last: usize },
}

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("Request was cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}
