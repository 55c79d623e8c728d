//! Shared fleet state
//!
//! One map of node records written from two directions: wholesale
//! replacement by the REST full refresh (the only way nodes enter the
//! set) and field-level merges from the push channel. Both writers go
//! through the same lock, so a merge can never interleave with a
//! partially applied replace.

use apiary_core::types::{Node, NodeDelta, NodeStatus};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Node records keyed by id
#[derive(Debug, Default)]
pub struct FleetState {
    nodes: RwLock<HashMap<i64, Node>>,
}

impl FleetState {
    /// Empty fleet
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole set with a fresh full-list fetch
    pub fn replace_all(&self, nodes: Vec<Node>) {
        let mut map = self.nodes.write();
        map.clear();
        for node in nodes {
            map.insert(node.id, node);
        }
    }

    /// Shallow-merge a delta into the matching record.
    ///
    /// Absent delta fields leave the record untouched. Returns false
    /// for an unknown id: the channel never introduces nodes, so the
    /// delta is dropped.
    pub fn apply(&self, delta: &NodeDelta) -> bool {
        let mut map = self.nodes.write();
        let Some(node) = map.get_mut(&delta.node_id) else {
            tracing::debug!(node_id = delta.node_id, "delta for unknown node dropped");
            return false;
        };
        if let Some(status) = delta.status {
            node.status = status;
        }
        if let Some(cpu_usage) = delta.cpu_usage {
            node.cpu_usage = cpu_usage;
        }
        if let Some(detail) = &delta.cpu_usage_detail {
            node.cpu_usage_detail = Some(detail.clone());
        }
        if let Some(last_seen) = delta.last_seen {
            node.last_seen = Some(last_seen);
        }
        true
    }

    /// Copy of one record
    #[inline]
    #[must_use]
    pub fn get(&self, id: i64) -> Option<Node> {
        self.nodes.read().get(&id).cloned()
    }

    /// Copy of the whole set, ordered by id
    #[must_use]
    pub fn snapshot(&self) -> Vec<Node> {
        let map = self.nodes.read();
        let mut nodes: Vec<Node> = map.values().cloned().collect();
        nodes.sort_by_key(|node| node.id);
        nodes
    }

    /// Number of nodes currently known
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// Whether no nodes are known yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Count of nodes currently reported online
    #[must_use]
    pub fn online_count(&self) -> usize {
        self.nodes
            .read()
            .values()
            .filter(|node| node.status == NodeStatus::Online)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(id: i64, name: &str, cpu: f64) -> Node {
        let t = chrono::NaiveDate::from_ymd_opt(2026, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Node {
            id,
            name: name.to_string(),
            ip_address: format!("10.0.0.{id}"),
            port: 2222,
            description: None,
            group: "default".to_string(),
            is_active: true,
            status: NodeStatus::Online,
            cpu_usage: cpu,
            cpu_usage_detail: None,
            last_seen: None,
            create_time: t,
            update_time: t,
        }
    }

    #[test]
    fn merge_touches_only_present_fields() {
        let fleet = FleetState::new();
        fleet.replace_all(vec![node(5, "hive-e", 10.0)]);

        let applied = fleet.apply(&NodeDelta::new(5).with_cpu_usage(91.0));
        assert!(applied);

        let merged = fleet.get(5).unwrap();
        assert_eq!(merged.cpu_usage, 91.0);
        // Everything the delta did not carry is untouched
        assert_eq!(merged.name, "hive-e");
        assert_eq!(merged.ip_address, "10.0.0.5");
        assert_eq!(merged.group, "default");
        assert_eq!(merged.status, NodeStatus::Online);
    }

    #[test]
    fn unknown_node_is_ignored_not_inserted() {
        let fleet = FleetState::new();
        fleet.replace_all(vec![node(1, "hive-a", 5.0)]);

        let applied = fleet.apply(&NodeDelta::new(99).with_cpu_usage(50.0));
        assert!(!applied);
        assert_eq!(fleet.len(), 1);
        assert!(fleet.get(99).is_none());
    }

    #[test]
    fn replace_all_is_wholesale() {
        let fleet = FleetState::new();
        fleet.replace_all(vec![node(1, "hive-a", 5.0), node(2, "hive-b", 7.0)]);
        assert_eq!(fleet.len(), 2);

        // A refresh that no longer lists node 1 removes it
        fleet.replace_all(vec![node(2, "hive-b", 8.0), node(3, "hive-c", 1.0)]);
        assert_eq!(fleet.len(), 2);
        assert!(fleet.get(1).is_none());
        assert_eq!(fleet.get(2).unwrap().cpu_usage, 8.0);
    }

    #[test]
    fn status_merge_updates_online_count() {
        let fleet = FleetState::new();
        fleet.replace_all(vec![node(1, "hive-a", 5.0), node(2, "hive-b", 7.0)]);
        assert_eq!(fleet.online_count(), 2);

        fleet.apply(&NodeDelta::new(2).with_status(NodeStatus::Offline));
        assert_eq!(fleet.online_count(), 1);
    }

    #[test]
    fn snapshot_is_ordered_by_id() {
        let fleet = FleetState::new();
        fleet.replace_all(vec![node(3, "c", 0.0), node(1, "a", 0.0), node(2, "b", 0.0)]);
        let ids: Vec<i64> = fleet.snapshot().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
