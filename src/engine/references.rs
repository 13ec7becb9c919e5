//! # engine::references
//!
//! Exit, modify and retry nodes point at other nodes and positions by id.
//! After a delete (or an import of an older graph) those pointers can go
//! stale; they are cleared here instead of being reported as errors.

use std::collections::HashSet;

use tracing::debug;

use crate::models::{Node, NodeData, NodeId, Position};

/// Clear every reference to a node or position that no longer exists.
/// Returns how many fields were cleared.
pub fn prune_dangling_references(nodes: &mut [Node]) -> usize {
    let node_ids: HashSet<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
    let positions: Vec<(NodeId, Position)> = nodes
        .iter()
        .flat_map(|n| n.data.positions().iter().map(move |p| (n.id.clone(), p.clone())))
        .collect();

    // Does any position (optionally restricted to `owner`) answer to `label`?
    let position_exists = |label: &str, owner: Option<&NodeId>| {
        positions
            .iter()
            .filter(|(node_id, _)| owner.map_or(true, |o| o == node_id))
            .any(|(_, p)| p.answers_to(label))
    };

    let mut cleared = 0;
    for node in nodes.iter_mut() {
        match &mut node.data {
            NodeData::Modify(m) => {
                if m.target_node_id.as_ref().is_some_and(|id| !node_ids.contains(id)) {
                    m.target_node_id = None;
                    cleared += 1;
                }
                if let Some(pos) = m.target_position_id.as_deref() {
                    if !position_exists(pos, m.target_node_id.as_ref()) {
                        m.target_position_id = None;
                        cleared += 1;
                    }
                }
            }
            NodeData::Exit(x) => {
                if x.target_node_id.as_ref().is_some_and(|id| !node_ids.contains(id)) {
                    x.target_node_id = None;
                    cleared += 1;
                }
                if let Some(vpi) = x.target_position_vpi.as_deref() {
                    if !position_exists(vpi, x.target_node_id.as_ref()) {
                        x.target_position_vpi = None;
                        cleared += 1;
                    }
                }
            }
            NodeData::Retry(r) => {
                if r.target_node_id.as_ref().is_some_and(|id| !node_ids.contains(id)) {
                    r.target_node_id = None;
                    cleared += 1;
                }
            }
            _ => {}
        }
    }

    if cleared > 0 {
        debug!(cleared, "🧹 cleared dangling node/position references");
    }
    cleared
}
