//! The static view table
//!
//! Exactly the functional views of the console, each gated by at most
//! one required permission code. A `None` gate means the view is open
//! to any authenticated user.

use apiary_core::types::{
    ChartBundle, Node, Permission, Role, TrafficPoint, UserPage, UserProfile,
};
use apiary_core::CapabilitySet;

/// Identifier of one functional view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewId {
    Dashboard,
    Users,
    Roles,
    Monitor,
    Stats,
    Traffic,
    Settings,
}

impl ViewId {
    /// All views in sidebar order
    #[inline]
    #[must_use]
    pub fn all() -> &'static [ViewId] {
        &[
            ViewId::Dashboard,
            ViewId::Users,
            ViewId::Roles,
            ViewId::Monitor,
            ViewId::Stats,
            ViewId::Traffic,
            ViewId::Settings,
        ]
    }

    /// Stable slug, as used by navigation bindings
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            ViewId::Dashboard => "view-dashboard",
            ViewId::Users => "view-users",
            ViewId::Roles => "view-roles",
            ViewId::Monitor => "view-monitor",
            ViewId::Stats => "view-stats",
            ViewId::Traffic => "view-traffic",
            ViewId::Settings => "view-settings",
        }
    }
}

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Static description of one view
#[derive(Debug, Clone, Copy)]
pub struct ViewSpec {
    pub id: ViewId,
    pub title: &'static str,
    pub required_permission: Option<&'static str>,
}

/// The configured view set.
///
/// Settings deliberately carries no permission gate; it is open to any
/// authenticated user, like the dashboard.
pub const VIEWS: &[ViewSpec] = &[
    ViewSpec {
        id: ViewId::Dashboard,
        title: "Dashboard",
        required_permission: None,
    },
    ViewSpec {
        id: ViewId::Users,
        title: "User Management",
        required_permission: Some("user:list"),
    },
    ViewSpec {
        id: ViewId::Roles,
        title: "Roles & Permissions",
        required_permission: Some("role:list"),
    },
    ViewSpec {
        id: ViewId::Monitor,
        title: "System Monitor",
        required_permission: Some("system:monitor"),
    },
    ViewSpec {
        id: ViewId::Stats,
        title: "Statistics",
        required_permission: Some("data:stats"),
    },
    ViewSpec {
        id: ViewId::Traffic,
        title: "Traffic Analysis",
        required_permission: Some("data:stats"),
    },
    ViewSpec {
        id: ViewId::Settings,
        title: "Settings",
        required_permission: None,
    },
];

/// Look up the static spec for a view
#[must_use]
pub fn spec(id: ViewId) -> &'static ViewSpec {
    VIEWS
        .iter()
        .find(|view| view.id == id)
        .unwrap_or(&VIEWS[0])
}

/// Views the given capability set may enter, in sidebar order
#[must_use]
pub fn navigable(caps: &CapabilitySet) -> Vec<&'static ViewSpec> {
    VIEWS
        .iter()
        .filter(|view| caps.allows(view.required_permission))
        .collect()
}

/// Headline figures for the dashboard view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardData {
    pub total_users: u64,
    pub total_nodes: usize,
    pub online_nodes: usize,
    pub total_attacks: u64,
}

/// Roles view payload: the roles plus the grantable catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolesData {
    pub roles: Vec<Role>,
    pub catalog: Vec<Permission>,
}

/// Loader result applied to a view's content slot
#[derive(Debug, Clone, PartialEq)]
pub enum ViewData {
    Dashboard(DashboardData),
    Users(UserPage),
    Roles(RolesData),
    Monitor(Vec<Node>),
    Stats(ChartBundle),
    Traffic(Vec<TrafficPoint>),
    Settings(UserProfile),
}
