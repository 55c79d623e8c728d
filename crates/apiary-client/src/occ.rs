//! Optimistic-concurrency edit protocol
//!
//! A version-stamped read-modify-write cycle for entities carrying a
//! server-owned `version` counter. The edit session snapshots the
//! entity at fetch time; submission carries that baseline version and
//! the server rejects it with 409 when stored state has moved on.
//!
//! A rejected edit is surfaced as [`EditError::Stale`] and is never
//! retried with a refreshed version: replaying old field values over a
//! concurrent editor's change would be a silent last-write-wins.

use crate::client::ApiClient;
use apiary_core::types::{UserProfile, UserUpdate};
use apiary_core::ApiError;

/// Entities protected by a server-owned version counter
pub trait Versioned {
    /// Server-assigned identity
    fn entity_id(&self) -> i64;
    /// Version observed at fetch time
    fn version(&self) -> i64;
}

impl Versioned for UserProfile {
    #[inline]
    fn entity_id(&self) -> i64 {
        self.id
    }

    #[inline]
    fn version(&self) -> i64 {
        self.version
    }
}

/// Errors of the edit cycle
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// The baseline no longer matches stored state; the caller must
    /// re-fetch and reapply its changes by hand.
    #[error("stale edit: {0}; re-fetch and reapply")]
    Stale(String),

    /// Any other backend failure
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl EditError {
    /// Whether the edit lost a version race
    #[inline]
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

/// Snapshot of one entity taken when an edit begins
#[derive(Debug, Clone)]
pub struct EditSession<T: Versioned + Clone> {
    baseline: T,
    version_at_fetch: i64,
}

impl<T: Versioned + Clone> EditSession<T> {
    /// Begin an edit by snapshotting the entity as fetched
    #[inline]
    #[must_use]
    pub fn begin(entity: &T) -> Self {
        Self {
            baseline: entity.clone(),
            version_at_fetch: entity.version(),
        }
    }

    /// The snapshot taken at fetch time
    #[inline]
    #[must_use]
    pub fn baseline(&self) -> &T {
        &self.baseline
    }

    /// The version the submission will carry
    #[inline]
    #[must_use]
    pub fn version_at_fetch(&self) -> i64 {
        self.version_at_fetch
    }

    /// Identity of the entity under edit
    #[inline]
    #[must_use]
    pub fn entity_id(&self) -> i64 {
        self.baseline.entity_id()
    }
}

impl ApiClient {
    /// Submit a user edit under optimistic concurrency control.
    ///
    /// The payload's version is always stamped from the edit session;
    /// whatever the caller left in `update.version` is overwritten.
    ///
    /// # Errors
    /// - `EditError::Stale` when the server's stored version moved on
    /// - `EditError::Api` for every other failure
    pub async fn submit_user_edit(
        &self,
        edit: &EditSession<UserProfile>,
        mut update: UserUpdate,
    ) -> Result<UserProfile, EditError> {
        update.version = edit.version_at_fetch();
        self.update_user(edit.entity_id(), &update)
            .await
            .map_err(|err| match err {
                ApiError::Conflict(detail) => EditError::Stale(detail),
                other => EditError::Api(other),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiary_core::types::UserStatus;

    fn profile(version: i64) -> UserProfile {
        let t = chrono::NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        UserProfile {
            id: 7,
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            status: UserStatus::Active,
            version,
            deleted: false,
            create_time: t,
            update_time: t,
            roles: Vec::new(),
        }
    }

    #[test]
    fn session_snapshots_version_at_fetch() {
        let fetched = profile(3);
        let edit = EditSession::begin(&fetched);
        assert_eq!(edit.version_at_fetch(), 3);
        assert_eq!(edit.entity_id(), 7);
        assert_eq!(edit.baseline().username, "carol");
    }

    #[test]
    fn stale_classification() {
        let stale = EditError::Stale("modified by another user".to_string());
        assert!(stale.is_stale());
        assert!(!EditError::from(ApiError::AuthExpired).is_stale());
    }
}
