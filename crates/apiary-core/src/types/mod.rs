//! Wire types for the fleet backend
//!
//! Field names and casing follow the backend's JSON contract exactly;
//! every type derives serde both ways so the fake backend in the test
//! utilities can speak the same protocol.

mod attack;
mod node;
mod role;
mod stats;
mod user;

pub use attack::{AttackLog, LogQuery};
pub use node::{Node, NodeCreate, NodeDelta, NodeHistory, NodeStatus};
pub use role::{Permission, Role, RoleCreate, RoleUpdate};
pub use stats::{ChartBundle, NamedCount, StatsSummary, TrafficPoint};
pub use user::{RegisterRequest, Token, UserCreate, UserPage, UserProfile, UserStatus, UserUpdate};
