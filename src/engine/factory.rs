//! # engine::factory
//!
//! Building blocks for new graph elements: [`create_node`] and
//! [`create_edge_between_nodes`].

use serde_json::Value;
use tracing::warn;

use crate::models::{Edge, EdgeId, Node, NodeData, NodeId, NodeKind, XY};

/// Build a node of `kind` whose payload is the kind's defaults with
/// `initial_data` laid over them key by key.
///
/// Overrides that don't fit the payload shape are dropped and the defaults are
/// used as-is.
pub fn create_node(
    kind:         NodeKind,
    id:           NodeId,
    position:     XY,
    initial_data: Option<Value>,
) -> Node {
    let defaults = NodeData::defaults(kind);

    let data = match initial_data {
        None | Some(Value::Null) => defaults,
        Some(Value::Object(overrides)) => {
            let mut merged = defaults.to_value();
            if let Value::Object(base) = &mut merged {
                base.extend(overrides);
            }
            NodeData::from_value(kind, merged).unwrap_or_else(|e| {
                warn!(%id, %kind, error = %e, "initial data rejected — using defaults");
                NodeData::defaults(kind)
            })
        }
        Some(other) => {
            warn!(%id, %kind, ?other, "initial data is not an object — using defaults");
            defaults
        }
    };

    Node { id, position, data }
}

/// Edge with the deterministic id `e-<source>-<target>`, always animated.
pub fn create_edge_between_nodes(source: &NodeId, target: &NodeId, edge_type: Option<&str>) -> Edge {
    Edge {
        id:            EdgeId(format!("e-{source}-{target}")),
        source:        source.clone(),
        target:        target.clone(),
        edge_type:     edge_type.unwrap_or("default").to_string(),
        animated:      true,
        source_handle: None,
        target_handle: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::graph::{ActionType, StartData};
    use serde_json::json;

    #[test]
    fn test_defaults_without_overrides() {
        let node = create_node(NodeKind::End, NodeId::from("end-1"), XY::new(5.0, 6.0), None);
        assert_eq!(node.kind(), NodeKind::End);
        assert_eq!(node.position, XY::new(5.0, 6.0));
        assert_eq!(node.data, NodeData::defaults(NodeKind::End));
    }

    #[test]
    fn test_overrides_merge_over_defaults() {
        let node = create_node(
            NodeKind::Start,
            NodeId::from("start-1"),
            XY::default(),
            Some(json!({ "symbol": "BANKNIFTY", "timeframe": "15m" })),
        );
        match node.data {
            NodeData::Start(StartData { symbol, timeframe, exchange, label, .. }) => {
                assert_eq!(symbol, "BANKNIFTY");
                assert_eq!(timeframe, "15m");
                // untouched keys keep their defaults
                assert_eq!(exchange, "NSE");
                assert_eq!(label, "Start");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_bad_overrides_fall_back_silently() {
        let node = create_node(
            NodeKind::Action,
            NodeId::from("a1"),
            XY::default(),
            Some(json!({ "actionType": "teleport" })),
        );
        assert_eq!(node.data, NodeData::defaults(NodeKind::Action));

        let node = create_node(NodeKind::Action, NodeId::from("a2"), XY::default(), Some(json!(42)));
        match node.data {
            NodeData::Action(a) => assert_eq!(a.action_type, ActionType::Entry),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_edge_id_is_deterministic() {
        let edge = create_edge_between_nodes(&NodeId::from("a"), &NodeId::from("b"), None);
        assert_eq!(edge.id, EdgeId::from("e-a-b"));
        assert_eq!(edge.edge_type, "default");
        assert!(edge.animated);

        let typed = create_edge_between_nodes(&NodeId::from("a"), &NodeId::from("b"), Some("smoothstep"));
        assert_eq!(typed.edge_type, "smoothstep");
    }
}
