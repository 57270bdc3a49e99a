//! HS256 access token verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::errors::{AuthError, AuthResult};
use super::models::AccessTokenClaims;
use crate::profile::models::PlayerId;

/// Verifies bearer tokens issued by the identity provider.
///
/// The service never runs logins itself; [`TokenVerifier::issue`] exists for
/// tooling and tests that need a token signed with the shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    audience: Option<String>,
}

impl TokenVerifier {
    /// Create a verifier for `secret`; `audience` is only checked when set.
    pub fn new(secret: &str, audience: Option<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match &audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            audience,
        }
    }

    /// Verify an access token
    pub fn verify(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        let token_data = decode::<AccessTokenClaims>(token, &self.decoding, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Verify an `Authorization` header value (`Bearer <token>`)
    pub fn verify_header(&self, header: &str) -> AuthResult<AccessTokenClaims> {
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or(AuthError::MissingToken)?;
        self.verify(token)
    }

    /// Sign a token for `player_id` valid for `ttl`
    pub fn issue(&self, player_id: PlayerId, ttl: Duration) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: player_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            aud: self.audience.clone(),
            role: Some("authenticated".to_string()),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::Signing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const SECRET: &str = "an-adequately-long-test-secret-value";

    #[test]
    fn test_issue_and_verify() {
        let verifier = TokenVerifier::new(SECRET, None);
        let player = Uuid::new_v4();
        let token = verifier.issue(player, Duration::minutes(5)).unwrap();

        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, player);
        assert_eq!(
            verifier
                .verify_header(&format!("Bearer {token}"))
                .unwrap()
                .sub,
            player
        );
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = TokenVerifier::new(SECRET, None)
            .issue(Uuid::new_v4(), Duration::minutes(5))
            .unwrap();
        let other = TokenVerifier::new("a-completely-different-secret-value", None);
        assert!(matches!(
            other.verify(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        let verifier = TokenVerifier::new(SECRET, None);
        let token = verifier.issue(Uuid::new_v4(), Duration::hours(-2)).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn test_audience_is_checked_when_configured() {
        let issuer = TokenVerifier::new(SECRET, Some("other".to_string()));
        let token = issuer.issue(Uuid::new_v4(), Duration::minutes(5)).unwrap();

        let verifier = TokenVerifier::new(SECRET, Some("authenticated".to_string()));
        assert!(verifier.verify(&token).is_err());
        assert!(issuer.verify(&token).is_ok());
    }

    #[test]
    fn test_missing_bearer_prefix() {
        let verifier = TokenVerifier::new(SECRET, None);
        assert!(matches!(
            verifier.verify_header("Token abc"),
            Err(AuthError::MissingToken)
        ));
    }
}
