//! Apiary Client - Session and REST Access
//!
//! Everything that talks to the fleet backend over request/response:
//! - The session store owning the bearer credential pair
//! - The transport seam and its reqwest implementation
//! - The typed client over the full REST surface
//! - The optimistic-concurrency edit protocol for versioned entities

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod client;
pub mod occ;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use client::ApiClient;
pub use occ::{EditError, EditSession, Versioned};
pub use session::{FileStorage, MemoryStorage, SessionState, SessionStorage, SessionStore};
pub use transport::{ApiRequest, ApiResponse, ApiTransport, HttpTransport, Method, RequestBody};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
