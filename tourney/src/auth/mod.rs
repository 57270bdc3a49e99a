//! Bearer-token verification.
//!
//! Accounts, logins and sessions live with the external identity provider;
//! this module only checks the HS256 access tokens it issues and extracts
//! the player id from the `sub` claim.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{AuthError, AuthResult};
pub use manager::TokenVerifier;
pub use models::AccessTokenClaims;
