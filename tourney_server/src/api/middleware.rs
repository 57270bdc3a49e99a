//! Bearer-token authentication for protected endpoints.
//!
//! Handlers that need an authenticated player take a [`Caller`] argument.
//! The extractor reads `Authorization: Bearer <token>`, verifies it with the
//! shared [`TokenVerifier`](tourney::auth::TokenVerifier) and yields the
//! player id from the `sub` claim.
//!
//! ```rust,no_run
//! use axum::Json;
//! use tourney_server::api::middleware::Caller;
//!
//! async fn whoami(Caller(player_id): Caller) -> Json<uuid::Uuid> {
//!     Json(player_id)
//! }
//! # let _ = whoami;
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tourney::auth::{AccessTokenClaims, AuthError, TokenVerifier};
use tourney::profile::PlayerId;

use super::{AppState, errors::ApiError};
use crate::logging::log_security_event;

/// Authenticated player making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub PlayerId);

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthenticated("Missing bearer token"))?;

        authenticate(state, |verifier| verifier.verify_header(header))
    }
}

/// Verify a raw token, e.g. from a WebSocket query string
pub fn authenticate_token(state: &AppState, token: &str) -> Result<Caller, ApiError> {
    authenticate(state, |verifier| verifier.verify(token))
}

fn authenticate(
    state: &AppState,
    verify: impl FnOnce(&TokenVerifier) -> Result<AccessTokenClaims, AuthError>,
) -> Result<Caller, ApiError> {
    match verify(state.verifier.as_ref()) {
        Ok(claims) => Ok(Caller(claims.sub)),
        Err(err) => {
            let event = match err {
                AuthError::MissingToken => "missing_token",
                AuthError::Expired => "expired_token",
                _ => "invalid_token",
            };
            log_security_event(event, None, &err.to_string());
            Err(ApiError::unauthenticated(err.to_string()))
        }
    }
}
