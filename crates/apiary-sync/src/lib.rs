//! Apiary Sync - Live Fleet Updates
//!
//! The push-channel side of the console:
//! - Shared fleet state fed by full refreshes and incremental deltas
//! - The three-state connection machine with constant-interval
//!   reconnect and an idempotent connect guard
//! - The channel transport seam and its WebSocket implementation

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod channel;
pub mod fleet;
pub mod message;

// Re-exports for convenience
pub use channel::{ChannelError, ChannelTransport, ConnectionState, LiveNodeSync, MessageStream, WsTransport};
pub use fleet::FleetState;
pub use message::PushMessage;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
