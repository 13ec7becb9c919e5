//! # engine::mutation
//!
//! Structural deletes.  Both functions are pure: they take the current graph
//! and return the next one, leaving the caller to decide when to commit it
//! (and when to push a history entry).

use crate::error::FlowError;
use crate::models::{Edge, EdgeId, GraphSnapshot, NodeId, NodeKind};

/// Remove `node_id` and exactly the edges that start or end at it.
///
/// The last remaining node of a graph is protected when it is a start node:
/// deleting it would leave a strategy with no entry point at all.
pub fn delete_node(graph: &GraphSnapshot, node_id: &NodeId) -> Result<GraphSnapshot, FlowError> {
    let node = graph
        .node(node_id)
        .ok_or_else(|| FlowError::NodeNotFound(node_id.clone()))?;

    if graph.nodes.len() == 1 && node.kind() == NodeKind::Start {
        return Err(FlowError::SoleStartNode);
    }

    Ok(GraphSnapshot {
        nodes: graph.nodes.iter().filter(|n| &n.id != node_id).cloned().collect(),
        edges: graph.edges.iter().filter(|e| !e.touches(node_id)).cloned().collect(),
    })
}

/// Drop the edge with `edge_id`.  Unknown ids leave the list unchanged.
pub fn delete_edge(edges: &[Edge], edge_id: &EdgeId) -> Vec<Edge> {
    edges.iter().filter(|e| &e.id != edge_id).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::factory::{create_edge_between_nodes, create_node};
    use crate::models::{Node, XY};

    fn node(id: &str, kind: NodeKind) -> Node {
        create_node(kind, NodeId::from(id), XY::default(), None)
    }

    fn edge(a: &str, b: &str) -> Edge {
        create_edge_between_nodes(&NodeId::from(a), &NodeId::from(b), None)
    }

    fn sample() -> GraphSnapshot {
        GraphSnapshot::new(
            vec![
                node("s", NodeKind::Start),
                node("sig", NodeKind::Signal),
                node("act", NodeKind::Action),
                node("end", NodeKind::End),
            ],
            vec![edge("s", "sig"), edge("sig", "act"), edge("act", "end"), edge("s", "act")],
        )
    }

    #[test]
    fn test_delete_node_removes_only_touching_edges() {
        let g = sample();
        let next = delete_node(&g, &NodeId::from("sig")).unwrap();

        assert_eq!(next.nodes.len(), 3);
        assert!(next.node(&NodeId::from("sig")).is_none());
        let ids: Vec<_> = next.edges.iter().map(|e| e.id.0.as_str()).collect();
        assert_eq!(ids, vec!["e-act-end", "e-s-act"]);
    }

    #[test]
    fn test_sole_start_node_is_protected() {
        let g = GraphSnapshot::new(vec![node("s", NodeKind::Start)], vec![]);
        assert_eq!(delete_node(&g, &NodeId::from("s")), Err(FlowError::SoleStartNode));
    }

    #[test]
    fn test_start_node_deletable_when_not_alone() {
        let g = sample();
        let next = delete_node(&g, &NodeId::from("s")).unwrap();
        assert_eq!(next.edges.len(), 2);
    }

    #[test]
    fn test_sole_non_start_node_is_deletable() {
        let g = GraphSnapshot::new(vec![node("sig", NodeKind::Signal)], vec![]);
        assert!(delete_node(&g, &NodeId::from("sig")).unwrap().nodes.is_empty());
    }

    #[test]
    fn test_unknown_node() {
        let g = sample();
        assert!(matches!(delete_node(&g, &NodeId::from("ghost")), Err(FlowError::NodeNotFound(_))));
    }

    #[test]
    fn test_delete_edge_filters_by_id() {
        let g = sample();
        let edges = delete_edge(&g.edges, &EdgeId::from("e-sig-act"));
        assert_eq!(edges.len(), 3);
        assert!(edges.iter().all(|e| e.id != EdgeId::from("e-sig-act")));

        assert_eq!(delete_edge(&g.edges, &EdgeId::from("nope")), g.edges);
    }
}
