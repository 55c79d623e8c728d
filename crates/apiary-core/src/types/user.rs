//! User profile and account management payloads

use crate::types::role::Role;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Pending,
    Disabled,
    /// Forward compatibility with statuses this build does not know
    #[serde(other)]
    Unknown,
}

/// Authenticated user profile as returned by the backend.
///
/// `version` is owned by the server; it increases by exactly one per
/// accepted update and is never set by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub status: UserStatus,
    pub version: i64,
    #[serde(default)]
    pub deleted: bool,
    pub create_time: NaiveDateTime,
    pub update_time: NaiveDateTime,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// One page of the user listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPage {
    pub total: u64,
    pub items: Vec<UserProfile>,
}

/// Payload for `POST /users/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role_ids: Vec<i64>,
}

impl UserCreate {
    /// New account payload with default status and no roles
    #[inline]
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            status: None,
            role_ids: Vec::new(),
        }
    }

    /// With an explicit status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// With role assignments
    #[inline]
    #[must_use]
    pub fn with_roles(mut self, role_ids: Vec<i64>) -> Self {
        self.role_ids = role_ids;
        self
    }
}

/// Payload for `PUT /users/{id}`.
///
/// `version` carries the baseline observed at fetch time; the edit
/// session stamps it on submission, the server compares it against
/// stored state and answers 409 on mismatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_ids: Option<Vec<i64>>,
    pub version: i64,
}

impl UserUpdate {
    /// Empty update payload
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the email address
    #[inline]
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Change the account status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Replace the role assignments
    #[inline]
    #[must_use]
    pub fn with_roles(mut self, role_ids: Vec<i64>) -> Self {
        self.role_ids = Some(role_ids);
        self
    }
}

/// Payload for `POST /auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Credential pair returned by `POST /auth/login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}
