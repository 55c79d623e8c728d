//! Honeypot attack-log records and query filters

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One captured attack event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackLog {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub target_port: Option<u16>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub connection_status: Option<String>,
    #[serde(default)]
    pub sensor_name: Option<String>,
    #[serde(default)]
    pub raw_log: Option<String>,
    #[serde(default)]
    pub attack_type: Option<String>,
}

/// Filter parameters for `GET /data/logs`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogQuery {
    pub skip: u64,
    pub limit: u64,
    pub source_ip: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub attack_type: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

impl LogQuery {
    /// Query for the first `limit` records, unfiltered
    #[inline]
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// With a pagination offset
    #[inline]
    #[must_use]
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Filter by source address
    #[inline]
    #[must_use]
    pub fn with_source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.source_ip = Some(source_ip.into());
        self
    }

    /// Filter by attack classification
    #[inline]
    #[must_use]
    pub fn with_attack_type(mut self, attack_type: impl Into<String>) -> Self {
        self.attack_type = Some(attack_type.into());
        self
    }

    /// Filter by time window
    #[inline]
    #[must_use]
    pub fn with_window(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Render the filter as URL query pairs; unset fields are omitted.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("skip".to_string(), self.skip.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(ip) = &self.source_ip {
            pairs.push(("source_ip".to_string(), ip.clone()));
        }
        if let Some(username) = &self.username {
            pairs.push(("username".to_string(), username.clone()));
        }
        if let Some(password) = &self.password {
            pairs.push(("password".to_string(), password.clone()));
        }
        if let Some(attack_type) = &self.attack_type {
            pairs.push(("attack_type".to_string(), attack_type.clone()));
        }
        if let Some(start) = self.start_time {
            pairs.push(("start_time".to_string(), start.format("%Y-%m-%dT%H:%M:%S").to_string()));
        }
        if let Some(end) = self.end_time {
            pairs.push(("end_time".to_string(), end.format("%Y-%m-%dT%H:%M:%S").to_string()));
        }
        pairs
    }

    /// Stable fingerprint of the filter, used as a cache-key component.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        self.query_pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn query_pairs_omit_unset_filters() {
        let query = LogQuery::new(50).with_source_ip("203.0.113.9");
        let pairs = query.query_pairs();
        assert!(pairs.contains(&("limit".to_string(), "50".to_string())));
        assert!(pairs.contains(&("source_ip".to_string(), "203.0.113.9".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "attack_type"));
    }

    #[test]
    fn window_renders_iso_timestamps() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let pairs = LogQuery::new(10).with_window(start, end).query_pairs();
        assert!(pairs.contains(&("start_time".to_string(), "2026-03-01T00:00:00".to_string())));
        assert!(pairs.contains(&("end_time".to_string(), "2026-03-02T00:00:00".to_string())));
    }

    #[test]
    fn fingerprint_is_stable_for_equal_filters() {
        let a = LogQuery::new(25).with_attack_type("ssh-bruteforce");
        let b = LogQuery::new(25).with_attack_type("ssh-bruteforce");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), LogQuery::new(25).fingerprint());
    }
}
