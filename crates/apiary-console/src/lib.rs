//! Apiary Console - View Orchestration
//!
//! The session- and permission-scoped engine behind the admin console:
//! - The static view table and its capability gates
//! - The epoch-guarded view router
//! - The per-view result memo
//! - The session context tying store, client, fleet, and channel
//!   together for one signed-in user
//!
//! # Example
//!
//! ```rust,ignore
//! use apiary_console::{ConsoleBuilder, ViewId};
//! use apiary_core::ConsoleConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (session, mut notices) = ConsoleBuilder::new(ConsoleConfig::new())
//!     .login("admin", "secret", true)
//!     .await?;
//!
//! session.navigate(ViewId::Monitor).await?;
//! println!("{} nodes known", session.fleet().len());
//! session.logout().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod cache;
pub mod context;
pub mod notify;
pub mod router;
pub mod views;

// Re-exports for convenience
pub use cache::{CacheKey, DataCache};
pub use context::{ConsoleBuilder, ConsoleSession};
pub use notify::{Notice, NoticeLevel, NoticeReceiver, NoticeSender};
pub use router::{LoadState, NavigateError, Navigation, NavigationTicket, ViewRouter};
pub use views::{navigable, spec, DashboardData, RolesData, ViewData, ViewId, ViewSpec, VIEWS};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the console
    pub use crate::{
        ConsoleBuilder, ConsoleSession, LoadState, Navigation, Notice, ViewData, ViewId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
