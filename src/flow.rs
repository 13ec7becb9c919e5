//! # flow — Editor session
//!
//! [`FlowEditor`] is the state container behind one open strategy editor:
//! the live graph, its undo/redo [`HistoryStore`], placement settings and the
//! [`Notifier`] that turns rejected edits into toasts.  It is created when the
//! user opens a strategy and dropped when they navigate away; nothing here is
//! process-global.
//!
//! ## Re-entrancy
//! Rapid UI events (double-clicked delete buttons, key repeat) can fire the
//! same structural mutation twice.  Every mutating method therefore needs a
//! [`MutationTicket`] from the editor's [`MutationGate`]:
//!
//! ```text
//!   let ticket = editor.begin(MutationKind::DeleteNode)?;   // 409 if taken
//!   editor.delete_node(&ticket, &node_id)?;
//!   store.save(...).await?;                                 // still held
//!   drop(ticket);                                           // released
//! ```
//!
//! The ticket is released when it is dropped, i.e. exactly when the caller's
//! operation completes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::{
    check_connection, create_edge_between_nodes, create_node, delete_edge, delete_node,
    find_empty_position, prune_dangling_references, validate_connection, PlacementConfig,
};
use crate::error::FlowError;
use crate::events::{FlowEvent, Notice, Notifier};
use crate::history::{HistoryStore, DEFAULT_HISTORY_LIMIT};
use crate::models::{
    Connection, Edge, EdgeId, GraphSnapshot, Node, NodeData, NodeId, NodeKind, XY,
};

// ─── Mutation gate ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationKind {
    AddNode,
    Connect,
    DeleteNode,
    DeleteEdge,
    UpdateNode,
    History,
    Import,
    Reset,
    Save,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::AddNode    => "add-node",
            MutationKind::Connect    => "connect",
            MutationKind::DeleteNode => "delete-node",
            MutationKind::DeleteEdge => "delete-edge",
            MutationKind::UpdateNode => "update-node",
            MutationKind::History    => "undo/redo",
            MutationKind::Import     => "import",
            MutationKind::Reset      => "reset",
            MutationKind::Save       => "save",
        };
        f.write_str(name)
    }
}

type InFlight = Arc<Mutex<HashSet<MutationKind>>>;

/// Hands out at most one live [`MutationTicket`] per [`MutationKind`].
#[derive(Debug, Clone, Default)]
pub struct MutationGate {
    in_flight: InFlight,
}

impl MutationGate {
    pub fn try_begin(&self, kind: MutationKind) -> Result<MutationTicket, FlowError> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(kind) {
            debug!(%kind, "mutation already in flight");
            return Err(FlowError::MutationInFlight(kind));
        }
        Ok(MutationTicket { kind, in_flight: Arc::clone(&self.in_flight) })
    }

    pub fn is_busy(&self, kind: MutationKind) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&kind)
    }
}

/// Proof that the holder owns the `kind` slot of a gate.  Dropping it frees
/// the slot.
#[derive(Debug)]
pub struct MutationTicket {
    kind:      MutationKind,
    in_flight: InFlight,
}

impl MutationTicket {
    pub fn kind(&self) -> MutationKind {
        self.kind
    }
}

impl Drop for MutationTicket {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.kind);
    }
}

// ─── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorConfig {
    pub history_limit: usize,
    pub placement:     PlacementConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self { history_limit: DEFAULT_HISTORY_LIMIT, placement: PlacementConfig::default() }
    }
}

/// "Add node" click from the palette or from a node's `+` handle.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNodeRequest {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Option<XY>,
    #[serde(default)]
    pub data: Option<Value>,
    /// Parent node to connect the new node from.
    #[serde(default)]
    pub connect_from: Option<NodeId>,
}

impl AddNodeRequest {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind, position: None, data: None, connect_from: None }
    }
}

/// Serializable view of an editor for the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct EditorView {
    pub strategy_id: Uuid,
    pub nodes:       Vec<Node>,
    pub edges:       Vec<Edge>,
    pub can_undo:    bool,
    pub can_redo:    bool,
    pub history_len: usize,
    pub warnings:    Vec<String>,
}

// ─── FlowEditor ───────────────────────────────────────────────────────────────

pub struct FlowEditor {
    strategy_id: Uuid,
    nodes:       Vec<Node>,
    edges:       Vec<Edge>,
    history:     HistoryStore,
    placement:   PlacementConfig,
    gate:        MutationGate,
    notifier:    Arc<dyn Notifier>,
}

impl fmt::Debug for FlowEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowEditor")
            .field("strategy_id", &self.strategy_id)
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("history", &self.history.len())
            .finish()
    }
}

impl FlowEditor {
    /// Open an editor on `graph`.  The loaded graph is the first history entry.
    pub fn open(
        strategy_id: Uuid,
        graph:       GraphSnapshot,
        config:      EditorConfig,
        notifier:    Arc<dyn Notifier>,
    ) -> Self {
        let mut editor = Self {
            strategy_id,
            nodes:     graph.nodes,
            edges:     graph.edges,
            history:   HistoryStore::with_limit(config.history_limit),
            placement: config.placement,
            gate:      MutationGate::default(),
            notifier,
        };
        prune_dangling_references(&mut editor.nodes);
        editor.commit();
        info!(%strategy_id, nodes = editor.nodes.len(), "📝 editor opened");
        editor
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn strategy_id(&self) -> Uuid {
        self.strategy_id
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::new(self.nodes.clone(), self.edges.clone())
    }

    pub fn gate(&self) -> &MutationGate {
        &self.gate
    }

    pub fn begin(&self, kind: MutationKind) -> Result<MutationTicket, FlowError> {
        self.gate.try_begin(kind)
    }

    pub fn view(&self) -> EditorView {
        EditorView {
            strategy_id: self.strategy_id,
            nodes:       self.nodes.clone(),
            edges:       self.edges.clone(),
            can_undo:    self.history.can_undo(),
            can_redo:    self.history.can_redo(),
            history_len: self.history.len(),
            warnings:    self.start_node_warnings(),
        }
    }

    pub fn graph_changed_event(&self) -> FlowEvent {
        FlowEvent::GraphChanged {
            strategy_id: self.strategy_id,
            nodes:       self.nodes.clone(),
            edges:       self.edges.clone(),
            can_undo:    self.history.can_undo(),
            can_redo:    self.history.can_redo(),
        }
    }

    // ── Connections ───────────────────────────────────────────────────────────

    /// Hover-time check while a connection is being dragged.
    pub fn is_valid_connection(&self, connection: &Connection) -> bool {
        validate_connection(connection, &self.nodes, self.notifier.as_ref())
    }

    /// Commit a dragged connection as a new edge with a random id.
    pub fn connect(&mut self, ticket: &MutationTicket, connection: Connection) -> Result<Edge, FlowError> {
        self.check_ticket(ticket, MutationKind::Connect);

        for end in [&connection.source, &connection.target] {
            if self.node(end).is_none() {
                return Err(FlowError::NodeNotFound(end.clone()));
            }
        }
        self.guard_connection(&connection)?;

        let edge = Edge {
            id:            EdgeId(Uuid::new_v4().to_string()),
            source:        connection.source,
            target:        connection.target,
            edge_type:     "default".into(),
            animated:      true,
            source_handle: connection.source_handle,
            target_handle: connection.target_handle,
        };
        debug!(edge = %edge.id, source = %edge.source, target = %edge.target, "🔗 connected");
        self.edges.push(edge.clone());
        self.commit();
        Ok(edge)
    }

    // ── Nodes ─────────────────────────────────────────────────────────────────

    /// Drop a new node on the canvas, optionally wired from `connect_from`.
    pub fn add_node(&mut self, ticket: &MutationTicket, request: AddNodeRequest) -> Result<Node, FlowError> {
        self.check_ticket(ticket, MutationKind::AddNode);

        let parent = match &request.connect_from {
            Some(parent_id) => Some(
                self.node(parent_id)
                    .cloned()
                    .ok_or_else(|| FlowError::NodeNotFound(parent_id.clone()))?,
            ),
            None => None,
        };

        let id = NodeId(format!(
            "{}-{}",
            request.kind.as_str().trim_end_matches("Node"),
            Uuid::new_v4().simple()
        ));

        if let Some(parent) = &parent {
            let candidate = Connection::new(parent.id.as_str(), id.as_str());
            let pair = [parent.clone(), create_node(request.kind, id.clone(), XY::default(), None)];
            self.guard_connection_in(&candidate, &pair)?;
        }

        if let Some(position) = request.position {
            ensure_on_canvas(position)?;
        }
        let desired = request.position.unwrap_or_else(|| match &parent {
            Some(p) => XY::new(p.position.x, p.position.y + self.placement.node_height + self.placement.padding),
            None => XY::default(),
        });
        let position = find_empty_position(&self.nodes, desired, &self.placement, &mut rand::thread_rng());

        let mut node = create_node(request.kind, id, position, request.data);
        self.adopt_positions(&mut node)?;

        if let Some(parent) = &parent {
            self.edges.push(create_edge_between_nodes(&parent.id, &node.id, None));
        }
        info!(strategy_id = %self.strategy_id, node_id = %node.id, kind = %node.kind(), "➕ node added");
        self.nodes.push(node.clone());
        self.commit();
        Ok(node)
    }

    /// Delete a node and every edge touching it.
    pub fn delete_node(&mut self, ticket: &MutationTicket, node_id: &NodeId) -> Result<(), FlowError> {
        self.check_ticket(ticket, MutationKind::DeleteNode);

        let mut next = match delete_node(&self.snapshot(), node_id) {
            Ok(next) => next,
            Err(err) => {
                if err == FlowError::SoleStartNode {
                    self.notifier.notify(Notice::error(err.to_string()));
                }
                return Err(err);
            }
        };
        prune_dangling_references(&mut next.nodes);

        info!(strategy_id = %self.strategy_id, %node_id, "🗑️ node deleted");
        self.apply(next);
        self.commit();
        Ok(())
    }

    pub fn delete_edge(&mut self, ticket: &MutationTicket, edge_id: &EdgeId) -> Result<(), FlowError> {
        self.check_ticket(ticket, MutationKind::DeleteEdge);

        if !self.edges.iter().any(|e| &e.id == edge_id) {
            return Err(FlowError::EdgeNotFound(edge_id.clone()));
        }
        self.edges = delete_edge(&self.edges, edge_id);
        debug!(strategy_id = %self.strategy_id, %edge_id, "✂️ edge deleted");
        self.commit();
        Ok(())
    }

    /// Merge `patch` over the node's current payload.
    pub fn update_node_data(
        &mut self,
        ticket:  &MutationTicket,
        node_id: &NodeId,
        patch:   Value,
    ) -> Result<Node, FlowError> {
        self.patch_node(ticket, node_id, Some(patch), None)
    }

    /// Drag-stop.
    pub fn move_node(&mut self, ticket: &MutationTicket, node_id: &NodeId, position: XY) -> Result<Node, FlowError> {
        self.patch_node(ticket, node_id, None, Some(position))
    }

    /// Data merge and/or move, applied together or not at all.
    ///
    /// Not a structural edit: the change is folded into the current history
    /// entry rather than pushed, so undo skips over it but undo → redo
    /// brings it back.
    pub fn patch_node(
        &mut self,
        ticket:   &MutationTicket,
        node_id:  &NodeId,
        data:     Option<Value>,
        position: Option<XY>,
    ) -> Result<Node, FlowError> {
        self.check_ticket(ticket, MutationKind::UpdateNode);

        let idx = self.index_of(node_id)?;
        let mut node = self.nodes[idx].clone();

        if let Some(position) = position {
            ensure_on_canvas(position)?;
            node.position = position;
        }

        if let Some(patch) = data {
            let extra = match patch {
                Value::Object(extra) => extra,
                other => {
                    return Err(FlowError::InvalidNodeData {
                        id:     node_id.clone(),
                        reason: format!("data patch must be a JSON object, got {other}"),
                    })
                }
            };
            let mut merged = node.data.to_value();
            if let Value::Object(base) = &mut merged {
                base.extend(extra);
            }
            node.data = NodeData::from_value(node.kind(), merged).map_err(|e| FlowError::InvalidNodeData {
                id:     node_id.clone(),
                reason: e.to_string(),
            })?;
            self.adopt_positions(&mut node)?;
            prune_dangling_references(std::slice::from_mut(&mut node));
        }

        self.nodes[idx] = node.clone();
        self.amend();
        Ok(node)
    }

    // ── History ───────────────────────────────────────────────────────────────

    /// Restore the previous snapshot.  `false` when there is nothing to undo.
    pub fn undo(&mut self, ticket: &MutationTicket) -> bool {
        self.check_ticket(ticket, MutationKind::History);
        match self.history.undo().cloned() {
            Some(snapshot) => {
                self.apply(snapshot);
                true
            }
            None => false,
        }
    }

    /// Re-apply the next snapshot.  `false` at the tail.
    pub fn redo(&mut self, ticket: &MutationTicket) -> bool {
        self.check_ticket(ticket, MutationKind::History);
        match self.history.redo().cloned() {
            Some(snapshot) => {
                self.apply(snapshot);
                true
            }
            None => false,
        }
    }

    /// Replace the whole graph (file import, template load).
    pub fn import(&mut self, ticket: &MutationTicket, mut graph: GraphSnapshot) -> Result<(), FlowError> {
        self.check_ticket(ticket, MutationKind::Import);
        for node in &graph.nodes {
            ensure_on_canvas(node.position)?;
        }
        prune_dangling_references(&mut graph.nodes);
        info!(strategy_id = %self.strategy_id, nodes = graph.nodes.len(), edges = graph.edges.len(), "📥 graph imported");
        self.apply(graph);
        self.commit();
        Ok(())
    }

    /// Empty the canvas and forget all history.
    pub fn reset(&mut self, ticket: &MutationTicket) {
        self.check_ticket(ticket, MutationKind::Reset);
        self.nodes.clear();
        self.edges.clear();
        self.history.reset_history();
        info!(strategy_id = %self.strategy_id, "🔄 strategy reset");
    }

    // ── Diagnostics ───────────────────────────────────────────────────────────

    /// One start node is expected per connected part of the graph.
    pub fn start_node_warnings(&self) -> Vec<String> {
        let mut adjacency: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
        for edge in &self.edges {
            adjacency.entry(&edge.source).or_default().push(&edge.target);
            adjacency.entry(&edge.target).or_default().push(&edge.source);
        }

        let mut seen: HashSet<&NodeId> = HashSet::new();
        let mut warnings = Vec::new();

        for node in &self.nodes {
            if !seen.insert(&node.id) {
                continue;
            }
            // BFS over one component.
            let mut component = vec![node];
            let mut queue = VecDeque::from([&node.id]);
            while let Some(current) = queue.pop_front() {
                for next in adjacency.get(current).into_iter().flatten() {
                    if seen.insert(*next) {
                        queue.push_back(*next);
                        if let Some(n) = self.node(next) {
                            component.push(n);
                        }
                    }
                }
            }

            let starts = component.iter().filter(|n| n.kind() == NodeKind::Start).count();
            match starts {
                0 => warnings.push(format!(
                    "No start node reaches '{}' ({} node(s))",
                    node.id,
                    component.len()
                )),
                1 => {}
                n => warnings.push(format!(
                    "{n} start nodes in the part of the graph containing '{}'",
                    node.id
                )),
            }
        }
        warnings
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    fn index_of(&self, id: &NodeId) -> Result<usize, FlowError> {
        self.nodes
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| FlowError::NodeNotFound(id.clone()))
    }

    fn apply(&mut self, snapshot: GraphSnapshot) {
        self.nodes = snapshot.nodes;
        self.edges = snapshot.edges;
    }

    fn commit(&mut self) {
        self.history.add_history_item(self.snapshot());
    }

    fn amend(&mut self) {
        self.history.replace_current(self.snapshot());
    }

    fn check_ticket(&self, ticket: &MutationTicket, expected: MutationKind) {
        debug_assert_eq!(ticket.kind(), expected, "ticket kind mismatch");
        debug_assert!(Arc::ptr_eq(&ticket.in_flight, &self.gate.in_flight), "ticket from another editor");
    }

    fn guard_connection(&self, connection: &Connection) -> Result<(), FlowError> {
        self.guard_connection_in(connection, &self.nodes)
    }

    fn guard_connection_in(&self, connection: &Connection, nodes: &[Node]) -> Result<(), FlowError> {
        check_connection(connection, nodes).map_err(|err| {
            if let FlowError::InvalidConnection(reason) = &err {
                self.notifier.notify(Notice::warning(reason.clone()));
            }
            err
        })
    }

    /// Validate the node's positions and stamp them with their owner.
    fn adopt_positions(&self, node: &mut Node) -> Result<(), FlowError> {
        let owner = node.id.clone();
        if let Some(positions) = node.data.positions_mut() {
            for position in positions.iter_mut() {
                if let Err(err) = position.validate() {
                    self.notifier.notify(Notice::error(err.to_string()));
                    return Err(err);
                }
                if position.source_node_id.as_ref() != Some(&owner) {
                    position.source_node_id = Some(owner.clone());
                    position.touch();
                }
            }
        }
        Ok(())
    }
}

fn ensure_on_canvas(p: XY) -> Result<(), FlowError> {
    if p.is_on_canvas() {
        Ok(())
    } else {
        Err(FlowError::OffCanvas { x: p.x, y: p.y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::testing::RecordingNotifier;
    use crate::events::NoticeLevel;
    use serde_json::json;

    fn editor() -> (FlowEditor, Arc<RecordingNotifier>) {
        let rec = Arc::new(RecordingNotifier::default());
        let ed = FlowEditor::open(Uuid::new_v4(), GraphSnapshot::default(), EditorConfig::default(), rec.clone());
        (ed, rec)
    }

    fn add(ed: &mut FlowEditor, req: AddNodeRequest) -> Node {
        let t = ed.begin(MutationKind::AddNode).unwrap();
        ed.add_node(&t, req).unwrap()
    }

    #[test]
    fn test_open_seeds_history() {
        let (ed, _) = editor();
        assert_eq!(ed.history().len(), 1);
        assert!(!ed.history().can_undo());
    }

    #[test]
    fn test_gate_blocks_same_kind_until_drop() {
        let (ed, _) = editor();
        let t = ed.begin(MutationKind::DeleteNode).unwrap();
        assert_eq!(
            ed.begin(MutationKind::DeleteNode).unwrap_err(),
            FlowError::MutationInFlight(MutationKind::DeleteNode)
        );
        // other kinds are independent
        assert!(ed.begin(MutationKind::Connect).is_ok());

        drop(t);
        assert!(!ed.gate().is_busy(MutationKind::DeleteNode));
        assert!(ed.begin(MutationKind::DeleteNode).is_ok());
    }

    #[test]
    fn test_add_node_with_parent_wires_edge_and_avoids_overlap() {
        let (mut ed, _) = editor();
        let start = add(&mut ed, AddNodeRequest::new(NodeKind::Start));
        let signal = add(&mut ed, AddNodeRequest {
            connect_from: Some(start.id.clone()),
            ..AddNodeRequest::new(NodeKind::Signal)
        });

        assert!(signal.id.as_str().starts_with("signal-"));
        assert_eq!(ed.edges().len(), 1);
        assert_eq!(ed.edges()[0].id.0, format!("e-{}-{}", start.id, signal.id));

        let cfg = PlacementConfig::default();
        let ring = cfg.occupied_cells(std::slice::from_ref(&start));
        assert!(!ring.contains(&cfg.cell_of(signal.position)));
        assert_eq!(ed.history().len(), 3);
    }

    #[test]
    fn test_add_from_end_node_is_rejected() {
        let (mut ed, rec) = editor();
        let end = add(&mut ed, AddNodeRequest::new(NodeKind::End));
        let t = ed.begin(MutationKind::AddNode).unwrap();
        let err = ed
            .add_node(&t, AddNodeRequest { connect_from: Some(end.id), ..AddNodeRequest::new(NodeKind::Alert) })
            .unwrap_err();

        assert!(matches!(err, FlowError::InvalidConnection(_)));
        assert_eq!(ed.nodes().len(), 1);
        assert_eq!(rec.taken()[0].level, NoticeLevel::Warning);
    }

    #[test]
    fn test_connect_rules_and_unknown_nodes() {
        let (mut ed, rec) = editor();
        let start = add(&mut ed, AddNodeRequest::new(NodeKind::Start));
        let sig = add(&mut ed, AddNodeRequest::new(NodeKind::Signal));

        let t = ed.begin(MutationKind::Connect).unwrap();
        let edge = ed.connect(&t, Connection::new(start.id.as_str(), sig.id.as_str())).unwrap();
        assert!(Uuid::parse_str(&edge.id.0).is_ok());
        assert!(edge.animated);

        let err = ed.connect(&t, Connection::new(sig.id.as_str(), start.id.as_str())).unwrap_err();
        assert!(matches!(err, FlowError::InvalidConnection(_)));
        assert_eq!(rec.taken().len(), 1);

        let err = ed.connect(&t, Connection::new("ghost", sig.id.as_str())).unwrap_err();
        assert_eq!(err, FlowError::NodeNotFound(NodeId::from("ghost")));
        assert_eq!(ed.edges().len(), 1);
    }

    #[test]
    fn test_is_valid_connection_notifies() {
        let (mut ed, rec) = editor();
        let start = add(&mut ed, AddNodeRequest::new(NodeKind::Start));
        let end = add(&mut ed, AddNodeRequest::new(NodeKind::ForceEnd));
        assert!(ed.is_valid_connection(&Connection::new(start.id.as_str(), end.id.as_str())));
        assert!(!ed.is_valid_connection(&Connection::new(end.id.as_str(), start.id.as_str())));
        assert_eq!(rec.taken().len(), 1);
    }

    #[test]
    fn test_delete_node_undo_redo() {
        let (mut ed, _) = editor();
        let start = add(&mut ed, AddNodeRequest::new(NodeKind::Start));
        let sig = add(&mut ed, AddNodeRequest { connect_from: Some(start.id.clone()), ..AddNodeRequest::new(NodeKind::Signal) });
        let before = ed.snapshot();

        let t = ed.begin(MutationKind::DeleteNode).unwrap();
        ed.delete_node(&t, &sig.id).unwrap();
        assert_eq!(ed.nodes().len(), 1);
        assert!(ed.edges().is_empty());
        let after = ed.snapshot();

        let h = ed.begin(MutationKind::History).unwrap();
        assert!(ed.undo(&h));
        assert_eq!(ed.snapshot(), before);
        assert!(ed.redo(&h));
        assert_eq!(ed.snapshot(), after);
        assert!(!ed.redo(&h));
    }

    #[test]
    fn test_sole_start_node_delete_leaves_state_untouched() {
        let (mut ed, rec) = editor();
        let start = add(&mut ed, AddNodeRequest::new(NodeKind::Start));
        let before = ed.snapshot();
        let history_len = ed.history().len();

        let t = ed.begin(MutationKind::DeleteNode).unwrap();
        assert_eq!(ed.delete_node(&t, &start.id), Err(FlowError::SoleStartNode));
        assert_eq!(ed.snapshot(), before);
        assert_eq!(ed.history().len(), history_len);
        assert_eq!(rec.taken()[0].level, NoticeLevel::Error);
    }

    #[test]
    fn test_delete_edge() {
        let (mut ed, _) = editor();
        let start = add(&mut ed, AddNodeRequest::new(NodeKind::Start));
        add(&mut ed, AddNodeRequest { connect_from: Some(start.id), ..AddNodeRequest::new(NodeKind::Signal) });
        let edge_id = ed.edges()[0].id.clone();

        let t = ed.begin(MutationKind::DeleteEdge).unwrap();
        ed.delete_edge(&t, &edge_id).unwrap();
        assert!(ed.edges().is_empty());
        assert_eq!(ed.delete_edge(&t, &edge_id), Err(FlowError::EdgeNotFound(edge_id)));
    }

    #[test]
    fn test_update_node_data_stamps_positions() {
        let (mut ed, _) = editor();
        let entry = add(&mut ed, AddNodeRequest::new(NodeKind::Entry));
        let history_len = ed.history().len();

        let t = ed.begin(MutationKind::UpdateNode).unwrap();
        let node = ed
            .update_node_data(&t, &entry.id, json!({ "positions": [{ "id": "p1", "vpi": "long-1", "lots": 2 }] }))
            .unwrap();

        let p = &node.data.positions()[0];
        assert_eq!(p.source_node_id.as_ref(), Some(&entry.id));
        assert_eq!(p.lots, Some(2));
        assert_eq!(ed.history().len(), history_len);

        let err = ed.update_node_data(&t, &entry.id, json!([1, 2])).unwrap_err();
        assert!(matches!(err, FlowError::InvalidNodeData { .. }));

        let err = ed
            .update_node_data(&t, &entry.id, json!({ "positions": [{ "id": "p2", "orderType": "limit" }] }))
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidPosition { .. }));
    }

    #[test]
    fn test_failed_patch_leaves_node_in_place() {
        let (mut ed, _) = editor();
        let entry = add(&mut ed, AddNodeRequest::new(NodeKind::Entry));
        let t = ed.begin(MutationKind::UpdateNode).unwrap();
        ed.move_node(&t, &entry.id, XY::new(777.0, 777.0)).unwrap();
        let before = ed.snapshot();

        let err = ed
            .patch_node(
                &t,
                &entry.id,
                Some(json!({ "positions": [{ "id": "p1", "orderType": "limit" }] })),
                Some(XY::new(10.0, 10.0)),
            )
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidPosition { .. }));
        assert_eq!(ed.snapshot(), before);

        let err = ed.move_node(&t, &entry.id, XY::new(1.0e300, 0.0)).unwrap_err();
        assert!(matches!(err, FlowError::OffCanvas { .. }));
        assert_eq!(ed.snapshot(), before);
    }

    #[test]
    fn test_edits_survive_undo_redo() {
        let (mut ed, _) = editor();
        add(&mut ed, AddNodeRequest::new(NodeKind::Start));
        let sig = add(&mut ed, AddNodeRequest::new(NodeKind::Signal));
        let history_len = ed.history().len();

        let t = ed.begin(MutationKind::UpdateNode).unwrap();
        ed.move_node(&t, &sig.id, XY::new(900.0, 900.0)).unwrap();
        ed.update_node_data(&t, &sig.id, json!({ "label": "RSI" })).unwrap();
        assert_eq!(ed.history().len(), history_len);
        let edited = ed.snapshot();

        let h = ed.begin(MutationKind::History).unwrap();
        assert!(ed.undo(&h));
        assert!(ed.snapshot().node(&sig.id).is_none());
        assert!(ed.redo(&h));
        assert_eq!(ed.snapshot(), edited);

        let node = ed.snapshot().node(&sig.id).cloned().unwrap();
        assert_eq!(node.position, XY::new(900.0, 900.0));
        assert_eq!(node.data.to_value()["label"], "RSI");
    }

    #[test]
    fn test_off_canvas_positions_rejected() {
        let (mut ed, _) = editor();
        let t = ed.begin(MutationKind::AddNode).unwrap();
        let err = ed
            .add_node(&t, AddNodeRequest { position: Some(XY::new(0.0, -1.0e300)), ..AddNodeRequest::new(NodeKind::Start) })
            .unwrap_err();
        assert!(matches!(err, FlowError::OffCanvas { .. }));

        let graph = GraphSnapshot::new(
            vec![create_node(NodeKind::Start, NodeId::from("s"), XY::new(1.0e300, 0.0), None)],
            vec![],
        );
        let i = ed.begin(MutationKind::Import).unwrap();
        assert!(matches!(ed.import(&i, graph), Err(FlowError::OffCanvas { .. })));
        assert!(ed.nodes().is_empty());
    }

    #[test]
    fn test_delete_clears_modify_reference() {
        let (mut ed, _) = editor();
        let entry = add(&mut ed, AddNodeRequest {
            data: Some(json!({ "positions": [{ "id": "p1" }] })),
            ..AddNodeRequest::new(NodeKind::Entry)
        });
        let modify = add(&mut ed, AddNodeRequest {
            data: Some(json!({ "targetNodeId": entry.id, "targetPositionId": "p1" })),
            ..AddNodeRequest::new(NodeKind::Modify)
        });

        let t = ed.begin(MutationKind::DeleteNode).unwrap();
        ed.delete_node(&t, &entry.id).unwrap();

        let m = ed.nodes().iter().find(|n| n.id == modify.id).unwrap();
        match &m.data {
            NodeData::Modify(d) => {
                assert!(d.target_node_id.is_none());
                assert!(d.target_position_id.is_none());
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_import_and_reset() {
        let (mut ed, _) = editor();
        let graph = GraphSnapshot::new(
            vec![create_node(NodeKind::Start, NodeId::from("s"), XY::default(), None)],
            vec![],
        );

        let t = ed.begin(MutationKind::Import).unwrap();
        ed.import(&t, graph.clone()).unwrap();
        assert_eq!(ed.snapshot(), graph);
        assert!(ed.history().can_undo());

        let r = ed.begin(MutationKind::Reset).unwrap();
        ed.reset(&r);
        assert!(ed.nodes().is_empty());
        assert!(ed.history().is_empty());
        assert_eq!(ed.history().cursor(), None);
    }

    #[test]
    fn test_start_node_warnings() {
        let (mut ed, _) = editor();
        assert!(ed.start_node_warnings().is_empty());

        let s1 = add(&mut ed, AddNodeRequest::new(NodeKind::Start));
        add(&mut ed, AddNodeRequest { connect_from: Some(s1.id.clone()), ..AddNodeRequest::new(NodeKind::Signal) });
        assert!(ed.start_node_warnings().is_empty());

        // orphan signal with no start
        add(&mut ed, AddNodeRequest::new(NodeKind::Signal));
        assert_eq!(ed.start_node_warnings().len(), 1);

        // second start joined to the first component
        let s2 = add(&mut ed, AddNodeRequest::new(NodeKind::Start));
        let sig = ed.nodes()[1].id.clone();
        let t = ed.begin(MutationKind::Connect).unwrap();
        ed.connect(&t, Connection::new(s2.id.as_str(), sig.as_str())).unwrap();

        let warnings = ed.start_node_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.starts_with("2 start nodes")));
    }
}
