//! Authentication error types.

use thiserror::Error;

use crate::errors::{Classify, ErrorKind};

/// Token verification errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token supplied
    #[error("Missing access token")]
    MissingToken,

    /// Token expired
    #[error("Access token expired")]
    Expired,

    /// Signature, format or claim validation failed
    #[error("Invalid access token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    /// Token could not be signed
    #[error("Failed to issue token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidToken(err),
        }
    }
}

impl Classify for AuthError {
    fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Signing(_) => ErrorKind::Internal,
            _ => ErrorKind::Authorization,
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
