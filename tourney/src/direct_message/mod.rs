//! Player-to-player direct messages.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{DirectMessageError, DirectMessageResult};
pub use manager::DirectMessageManager;
pub use models::{DirectMessage, DirectMessageId, NewDirectMessage};
