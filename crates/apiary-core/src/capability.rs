//! Effective capability set derived from role/permission data
//!
//! The set is a pure function of a profile; it is recomputed whole each
//! time a fresh profile is fetched and never patched incrementally, so
//! server-side role changes cannot leave a stale grant behind.

use crate::types::UserProfile;
use std::collections::HashSet;

/// Role code granting every capability unconditionally
pub const SUPER_ADMIN_CODE: &str = "super_admin";

/// Effective capability set for one authenticated profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    is_super_admin: bool,
    granted: HashSet<String>,
}

impl CapabilitySet {
    /// Compute the set from a profile's roles.
    #[must_use]
    pub fn from_profile(profile: &UserProfile) -> Self {
        let mut is_super_admin = false;
        let mut granted = HashSet::new();

        for role in &profile.roles {
            if role.code == SUPER_ADMIN_CODE {
                is_super_admin = true;
            }
            for permission in &role.permissions {
                granted.insert(permission.code.clone());
            }
        }

        Self {
            is_super_admin,
            granted,
        }
    }

    /// Evaluate a required permission code.
    ///
    /// `None` means the operation is open to any authenticated user.
    #[inline]
    #[must_use]
    pub fn allows(&self, required: Option<&str>) -> bool {
        match required {
            None => true,
            Some(code) => self.is_super_admin || self.granted.contains(code),
        }
    }

    /// Whether a super-admin role is present
    #[inline]
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.is_super_admin
    }

    /// Codes granted through roles (exclusive of the super-admin bypass)
    #[inline]
    #[must_use]
    pub fn granted_codes(&self) -> &HashSet<String> {
        &self.granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Permission, Role};

    fn role(code: &str, permissions: &[&str]) -> Role {
        Role {
            id: 1,
            name: code.to_string(),
            code: code.to_string(),
            description: None,
            permissions: permissions
                .iter()
                .enumerate()
                .map(|(i, p)| Permission {
                    id: i as i64 + 1,
                    code: (*p).to_string(),
                    resource_type: None,
                    description: None,
                })
                .collect(),
        }
    }

    fn profile(roles: Vec<Role>) -> UserProfile {
        let t = chrono::NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        UserProfile {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            status: crate::types::UserStatus::Active,
            version: 1,
            deleted: false,
            create_time: t,
            update_time: t,
            roles,
        }
    }

    #[test]
    fn null_code_is_open_to_any_session() {
        let caps = CapabilitySet::from_profile(&profile(vec![]));
        assert!(caps.allows(None));
        assert!(!caps.allows(Some("user:list")));
    }

    #[test]
    fn super_admin_bypasses_code_checks() {
        let caps = CapabilitySet::from_profile(&profile(vec![role(SUPER_ADMIN_CODE, &[])]));
        assert!(caps.is_super_admin());
        assert!(caps.allows(Some("user:list")));
        assert!(caps.allows(Some("anything:at:all")));
    }

    #[test]
    fn grants_union_across_roles() {
        let caps = CapabilitySet::from_profile(&profile(vec![
            role("auditor", &["data:stats"]),
            role("operator", &["user:list", "system:monitor"]),
        ]));
        assert!(caps.allows(Some("data:stats")));
        assert!(caps.allows(Some("user:list")));
        assert!(caps.allows(Some("system:monitor")));
        assert!(!caps.allows(Some("role:list")));
        assert!(!caps.is_super_admin());
    }

    #[test]
    fn recompute_replaces_rather_than_accumulates() {
        let before = CapabilitySet::from_profile(&profile(vec![role("operator", &["user:list"])]));
        assert!(before.allows(Some("user:list")));

        // The same user after a server-side role downgrade
        let after = CapabilitySet::from_profile(&profile(vec![role("viewer", &["data:stats"])]));
        assert!(!after.allows(Some("user:list")));
        assert!(after.allows(Some("data:stats")));
    }
}
