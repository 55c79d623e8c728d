//! Fleet node records and the push-channel delta shape

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Node liveness as reported by the backend monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
    Warning,
    #[serde(other)]
    Unknown,
}

/// One honeypot node in the fleet; identity key is `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    pub name: String,
    pub ip_address: String,
    pub port: u16,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub status: NodeStatus,
    pub cpu_usage: f64,
    #[serde(default)]
    pub cpu_usage_detail: Option<String>,
    #[serde(default)]
    pub last_seen: Option<NaiveDateTime>,
    pub create_time: NaiveDateTime,
    pub update_time: NaiveDateTime,
}

fn default_group() -> String {
    "default".to_string()
}

fn default_active() -> bool {
    true
}

/// Incremental update pushed over the live channel.
///
/// Deltas carry only the fields the monitor refreshed; absent fields
/// leave the local record untouched. The channel never introduces new
/// nodes, so an unmatched `node_id` is dropped by the merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDelta {
    pub node_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<NaiveDateTime>,
}

impl NodeDelta {
    /// Delta touching nothing
    #[inline]
    #[must_use]
    pub fn new(node_id: i64) -> Self {
        Self {
            node_id,
            status: None,
            cpu_usage: None,
            cpu_usage_detail: None,
            last_seen: None,
        }
    }

    /// With a status change
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// With a CPU usage reading
    #[inline]
    #[must_use]
    pub fn with_cpu_usage(mut self, cpu_usage: f64) -> Self {
        self.cpu_usage = Some(cpu_usage);
        self
    }

    /// With a heartbeat timestamp
    #[inline]
    #[must_use]
    pub fn with_last_seen(mut self, last_seen: NaiveDateTime) -> Self {
        self.last_seen = Some(last_seen);
        self
    }
}

/// Payload for `POST /nodes/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCreate {
    pub name: String,
    pub ip_address: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub is_active: bool,
}

impl NodeCreate {
    /// New node registration on the default group
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, ip_address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            ip_address: ip_address.into(),
            port,
            description: None,
            group: None,
            is_active: true,
        }
    }

    /// With a fleet group
    #[inline]
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// One historical status row for a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeHistory {
    pub id: i64,
    pub node_id: i64,
    pub status: NodeStatus,
    pub cpu_usage: f64,
    #[serde(default)]
    pub details: Option<String>,
    pub timestamp: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_decodes_with_absent_fields() {
        let delta: NodeDelta = serde_json::from_str(r#"{"node_id": 5, "cpu_usage": 91.0}"#).unwrap();
        assert_eq!(delta.node_id, 5);
        assert_eq!(delta.cpu_usage, Some(91.0));
        assert!(delta.status.is_none());
        assert!(delta.last_seen.is_none());
    }

    #[test]
    fn node_decodes_backend_defaults() {
        let raw = r#"{
            "id": 1,
            "name": "hive-a",
            "ip_address": "10.0.0.4",
            "port": 2222,
            "status": "online",
            "cpu_usage": 12.5,
            "create_time": "2026-02-01T00:00:00",
            "update_time": "2026-02-01T00:00:00"
        }"#;
        let node: Node = serde_json::from_str(raw).unwrap();
        assert_eq!(node.group, "default");
        assert!(node.is_active);
        assert_eq!(node.status, NodeStatus::Online);
    }
}
