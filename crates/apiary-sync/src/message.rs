//! Push-channel message kinds

use apiary_core::types::NodeDelta;
use serde::{Deserialize, Serialize};

/// One inbound frame from the node push channel.
///
/// The channel carries deltas and alerts only; initial discovery always
/// goes through the REST full refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PushMessage {
    /// Field-level update for one known node
    Update(NodeDelta),
    /// Operator-facing notification; never touches node state
    Alert { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiary_core::types::NodeStatus;

    #[test]
    fn update_frame_decodes() {
        let raw = r#"{"type": "update", "node_id": 3, "status": "warning", "cpu_usage": 88.5}"#;
        let message: PushMessage = serde_json::from_str(raw).unwrap();
        match message {
            PushMessage::Update(delta) => {
                assert_eq!(delta.node_id, 3);
                assert_eq!(delta.status, Some(NodeStatus::Warning));
                assert_eq!(delta.cpu_usage, Some(88.5));
            }
            PushMessage::Alert { .. } => panic!("expected update"),
        }
    }

    #[test]
    fn alert_frame_decodes() {
        let raw = r#"{"type": "alert", "message": "node hive-a unreachable"}"#;
        let message: PushMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(
            message,
            PushMessage::Alert {
                message: "node hive-a unreachable".to_string()
            }
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let raw = r#"{"type": "discovery", "node_id": 9}"#;
        assert!(serde_json::from_str::<PushMessage>(raw).is_err());
    }
}
