//! # engine::connection
//!
//! Connection rules for the strategy graph:
//!
//! 1. End / force-end nodes have no outgoing edges.
//! 2. Start nodes have no incoming edges.
//!
//! Everything else is accepted, including cycles, self-loops and duplicate
//! edges between the same pair of nodes.

use crate::error::FlowError;
use crate::events::{Notice, Notifier};
use crate::models::{Connection, Node, NodeId, NodeKind};

/// Pure rule check; `Err` carries the user-facing reason.
pub fn check_connection(connection: &Connection, nodes: &[Node]) -> Result<(), FlowError> {
    let kind_of = |id: &NodeId| nodes.iter().find(|n| &n.id == id).map(Node::kind);

    if let Some(kind) = kind_of(&connection.source) {
        if kind.is_terminal() {
            return Err(FlowError::InvalidConnection(
                "End nodes cannot have outgoing connections".into(),
            ));
        }
    }

    if kind_of(&connection.target) == Some(NodeKind::Start) {
        return Err(FlowError::InvalidConnection(
            "Start nodes cannot have incoming connections".into(),
        ));
    }

    Ok(())
}

/// [`check_connection`] plus a warning notice when the connection is refused.
pub fn validate_connection(
    connection: &Connection,
    nodes:      &[Node],
    notifier:   &dyn Notifier,
) -> bool {
    match check_connection(connection, nodes) {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(
                source = %connection.source,
                target = %connection.target,
                "connection rejected: {err}"
            );
            let reason = match err {
                FlowError::InvalidConnection(reason) => reason,
                other => other.to_string(),
            };
            notifier.notify(Notice::warning(reason));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::factory::create_node;
    use crate::events::testing::RecordingNotifier;
    use crate::events::NoticeLevel;
    use crate::models::XY;

    fn graph() -> Vec<Node> {
        [
            ("s", NodeKind::Start),
            ("sig", NodeKind::Signal),
            ("act", NodeKind::Action),
            ("end", NodeKind::End),
            ("fend", NodeKind::ForceEnd),
        ]
        .into_iter()
        .map(|(id, kind)| create_node(kind, NodeId::from(id), XY::default(), None))
        .collect()
    }

    #[test]
    fn test_ordinary_connections_accepted() {
        let nodes = graph();
        let rec = RecordingNotifier::default();
        assert!(validate_connection(&Connection::new("s", "sig"), &nodes, &rec));
        assert!(validate_connection(&Connection::new("sig", "act"), &nodes, &rec));
        assert!(validate_connection(&Connection::new("act", "end"), &nodes, &rec));
        // loop-back is permitted
        assert!(validate_connection(&Connection::new("act", "sig"), &nodes, &rec));
        assert!(rec.taken().is_empty());
    }

    #[test]
    fn test_terminal_sources_rejected() {
        let nodes = graph();
        let rec = RecordingNotifier::default();
        assert!(!validate_connection(&Connection::new("end", "sig"), &nodes, &rec));
        assert!(!validate_connection(&Connection::new("fend", "act"), &nodes, &rec));

        let notices = rec.taken();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.level == NoticeLevel::Warning));
    }

    #[test]
    fn test_start_target_rejected() {
        let nodes = graph();
        let rec = RecordingNotifier::default();
        assert!(!validate_connection(&Connection::new("sig", "s"), &nodes, &rec));
        assert_eq!(rec.taken()[0].message, "Start nodes cannot have incoming connections");
    }

    #[test]
    fn test_every_kind_pair_follows_the_two_rules() {
        let nodes: Vec<Node> = NodeKind::ALL
            .into_iter()
            .map(|k| create_node(k, NodeId::new(k.as_str()), XY::default(), None))
            .collect();

        for src in NodeKind::ALL {
            for dst in NodeKind::ALL {
                let conn = Connection::new(src.as_str(), dst.as_str());
                let expected = !src.is_terminal() && dst != NodeKind::Start;
                assert_eq!(check_connection(&conn, &nodes).is_ok(), expected, "{src} -> {dst}");
            }
        }
    }
}
