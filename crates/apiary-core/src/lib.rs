//! Apiary Core - Console Domain Model
//!
//! Foundational types shared by every console crate:
//! - Entity types mirroring the fleet backend's wire format
//! - The capability model derived from role/permission data
//! - The console error taxonomy
//! - Console configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use apiary_core::{CapabilitySet, UserProfile};
//!
//! let profile: UserProfile = fetch_profile()?;
//! let caps = CapabilitySet::from_profile(&profile);
//! assert!(caps.allows(None));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod capability;
pub mod config;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use capability::{CapabilitySet, SUPER_ADMIN_CODE};
pub use config::ConsoleConfig;
pub use error::{ApiError, ConfigError};
pub use types::{
    AttackLog, ChartBundle, LogQuery, NamedCount, Node, NodeCreate, NodeDelta, NodeHistory,
    NodeStatus, Permission, RegisterRequest, Role, RoleCreate, RoleUpdate, StatsSummary, Token,
    TrafficPoint, UserCreate, UserPage, UserProfile, UserStatus, UserUpdate,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the console core
    pub use crate::{
        ApiError, CapabilitySet, ConsoleConfig, Node, NodeDelta, NodeStatus, Permission, Role,
        Token, UserProfile,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
