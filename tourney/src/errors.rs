//! Error classification shared by every domain module.
//!
//! Each module keeps its own `thiserror` enum; this module only defines the
//! coarse taxonomy the HTTP layer (and any other caller) needs in order to
//! decide how to surface a rejected operation.

use serde::Serialize;

/// Coarse error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input rejected before anything was persisted
    Validation,
    /// Referenced tournament, match, participant or profile does not exist
    NotFound,
    /// Operation conflicts with the current state (or lost a race)
    Conflict,
    /// Caller is not allowed to perform the operation
    Authorization,
    /// Storage or infrastructure failure
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Implemented by every domain error so callers can classify it uniformly.
pub trait Classify: std::error::Error {
    /// Error category
    fn kind(&self) -> ErrorKind;

    /// Client-safe message; internal failures never leak storage details.
    fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}
