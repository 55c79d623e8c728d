//! Roles and grantable permissions

use serde::{Deserialize, Serialize};

/// One grantable action, identified by a unique code such as `user:list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub code: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A named bundle of permissions.
///
/// The code `super_admin` is a distinguished sentinel; see the
/// capability module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// Payload for `POST /roles/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleCreate {
    pub name: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permission_ids: Vec<i64>,
}

impl RoleCreate {
    /// New role payload without permissions
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            description: None,
            permission_ids: Vec::new(),
        }
    }

    /// With a description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// With permission grants
    #[inline]
    #[must_use]
    pub fn with_permissions(mut self, permission_ids: Vec<i64>) -> Self {
        self.permission_ids = permission_ids;
        self
    }
}

/// Payload for `PUT /roles/{id}`.
///
/// Roles carry no version field, so role updates run unguarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_ids: Option<Vec<i64>>,
}

impl RoleUpdate {
    /// Empty update payload
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename the role
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the permission grants
    #[inline]
    #[must_use]
    pub fn with_permissions(mut self, permission_ids: Vec<i64>) -> Self {
        self.permission_ids = Some(permission_ids);
        self
    }
}
