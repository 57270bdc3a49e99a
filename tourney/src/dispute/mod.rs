//! Match disputes and their message threads.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{DisputeError, DisputeResult};
pub use manager::DisputeManager;
pub use models::{
    Dispute, DisputeId, DisputeKind, DisputeMessage, DisputeStatus, NewDispute, Resolution,
    ResolutionType,
};
