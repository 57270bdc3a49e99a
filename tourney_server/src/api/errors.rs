//! HTTP error mapping.
//!
//! Every domain error classifies itself; this module turns the class into a
//! status code and a JSON body. Authentication failures are kept apart so
//! they surface as `401` rather than `403`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tourney::errors::{Classify, ErrorKind};

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Error returned by every handler
#[derive(Debug)]
pub enum ApiError {
    /// No or unusable credentials
    Unauthenticated(String),
    /// Malformed request that never reached a manager
    BadRequest(String),
    /// Classified domain error
    Domain { kind: ErrorKind, message: String },
}

impl ApiError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Domain {
            kind: ErrorKind::Authorization,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain { kind, .. } => status_for(*kind),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::BadRequest(_) => "validation",
            ApiError::Domain { kind, .. } => match kind {
                ErrorKind::Validation => "validation",
                ErrorKind::NotFound => "not_found",
                ErrorKind::Conflict => "conflict",
                ErrorKind::Authorization => "forbidden",
                ErrorKind::Internal => "internal",
            },
        }
    }
}

/// Status code for an error class
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl<E: Classify> From<E> for ApiError {
    fn from(err: E) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::Internal {
            tracing::error!(error = %err, "Request failed");
        }
        ApiError::Domain {
            kind,
            message: err.client_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let error = match self {
            ApiError::Unauthenticated(message)
            | ApiError::BadRequest(message)
            | ApiError::Domain { message, .. } => message,
        };
        (status, Json(ErrorResponse { error, code })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourney::matches::MatchError;
    use tourney::tournament::TournamentError;

    #[test]
    fn test_kinds_map_to_status_codes() {
        assert_eq!(
            ApiError::from(MatchError::TieNotAllowed).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(MatchError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TournamentError::PrizesAlreadyDistributed).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(MatchError::NotParticipant).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::unauthenticated("missing token").status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_store_details_are_not_leaked() {
        let err = ApiError::from(TournamentError::Store(tourney::db::StoreError::InvalidData(
            "column status held 'ongoing'".to_string(),
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            ApiError::Domain { message, .. } => assert!(!message.contains("ongoing")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
