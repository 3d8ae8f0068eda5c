//! Error taxonomy for the session core

use thiserror::Error;

/// Errors raised by catalog lookups and session state machines
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("word not found: {0}")]
    NotFound(String),
    #[error("session has no words")]
    EmptySession,
    #[error("cursor {index} out of range for session of {len} words")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid review quality {0} (expected 0, 1 or 2)")]
    InvalidQuality(u8),
    #[error("unknown proficiency level: {0}")]
    UnknownLevel(String),
    #[error("duplicate word id in catalog: {0}")]
    DuplicateId(String),
    #[error("invalid catalog entry {id}: {reason}")]
    InvalidEntry { id: String, reason: String },
    #[error("no practice or quiz session is active")]
    NoActiveSession,
    #[error("catalog JSON is malformed: {0}")]
    Catalog(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
