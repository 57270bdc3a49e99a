//! Player profiles: identity, in-game id, skill rating and admin flag.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{ProfileError, ProfileResult};
pub use manager::{ProfileManager, validate_username};
pub use models::{PlayerId, Profile, ProfileUpdate, RegisterProfile};
