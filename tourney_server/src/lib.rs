//! HTTP and WebSocket server for the tourney tournament platform.
//!
//! The binary in `main.rs` wires these modules together; they are exposed as
//! a library so integration tests can build the router in-process.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
