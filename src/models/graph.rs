//! # models::graph
//!
//! The strategy graph as the browser flow editor sees it: [`Node`]s joined by
//! directed [`Edge`]s.
//!
//! On the wire a node is `{ id, type, position, data }` — exactly the React
//! Flow shape, so stored graphs round-trip with the front-end unchanged.  In
//! Rust the `type`/`data` pair becomes the [`NodeData`] sum type: every node
//! kind carries its own typed payload instead of an untyped bag.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::position::{OrderType, Position};

// ─── Ids & Coordinates ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Canvas coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct XY {
    pub x: f64,
    pub y: f64,
}

/// Largest coordinate magnitude accepted from clients.
pub const MAX_COORDINATE: f64 = 1.0e9;

impl XY {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Finite and within ±[`MAX_COORDINATE`] on both axes.
    pub fn is_on_canvas(&self) -> bool {
        [self.x, self.y]
            .iter()
            .all(|v| v.is_finite() && v.abs() <= MAX_COORDINATE)
    }
}

// ─── NodeKind ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    #[serde(rename = "startNode")]
    Start,
    #[serde(rename = "signalNode")]
    Signal,
    #[serde(rename = "entrySignalNode")]
    EntrySignal,
    #[serde(rename = "exitSignalNode")]
    ExitSignal,
    #[serde(rename = "actionNode")]
    Action,
    #[serde(rename = "entryNode")]
    Entry,
    #[serde(rename = "exitNode")]
    Exit,
    #[serde(rename = "modifyNode")]
    Modify,
    #[serde(rename = "alertNode")]
    Alert,
    #[serde(rename = "endNode")]
    End,
    #[serde(rename = "forceEndNode")]
    ForceEnd,
    #[serde(rename = "retryNode")]
    Retry,
}

impl NodeKind {
    pub const ALL: [NodeKind; 12] = [
        NodeKind::Start,
        NodeKind::Signal,
        NodeKind::EntrySignal,
        NodeKind::ExitSignal,
        NodeKind::Action,
        NodeKind::Entry,
        NodeKind::Exit,
        NodeKind::Modify,
        NodeKind::Alert,
        NodeKind::End,
        NodeKind::ForceEnd,
        NodeKind::Retry,
    ];

    /// The React Flow `type` string.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Start       => "startNode",
            NodeKind::Signal      => "signalNode",
            NodeKind::EntrySignal => "entrySignalNode",
            NodeKind::ExitSignal  => "exitSignalNode",
            NodeKind::Action      => "actionNode",
            NodeKind::Entry       => "entryNode",
            NodeKind::Exit        => "exitNode",
            NodeKind::Modify      => "modifyNode",
            NodeKind::Alert       => "alertNode",
            NodeKind::End         => "endNode",
            NodeKind::ForceEnd    => "forceEndNode",
            NodeKind::Retry       => "retryNode",
        }
    }

    /// Terminal nodes may not have outgoing edges.
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeKind::End | NodeKind::ForceEnd)
    }

    fn default_label(self) -> &'static str {
        match self {
            NodeKind::Start       => "Start",
            NodeKind::Signal      => "Signal",
            NodeKind::EntrySignal => "Entry Signal",
            NodeKind::ExitSignal  => "Exit Signal",
            NodeKind::Action      => "Action",
            NodeKind::Entry       => "Entry",
            NodeKind::Exit        => "Exit",
            NodeKind::Modify      => "Modify Position",
            NodeKind::Alert       => "Alert",
            NodeKind::End         => "End",
            NodeKind::ForceEnd    => "Force End",
            NodeKind::Retry       => "Re-Entry",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown node type '{s}'"))
    }
}

// ─── Payloads ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    #[default]
    Stock,
    Futures,
    Options,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradingInstrument {
    #[serde(rename = "type")]
    pub instrument_type: InstrumentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underlying_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub name: String,
    pub parameters: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartData {
    pub label: String,
    pub symbol: String,
    pub exchange: String,
    pub timeframe: String,
    pub trading_instrument: TradingInstrument,
    pub indicators: Vec<IndicatorConfig>,
}

impl Default for StartData {
    fn default() -> Self {
        Self {
            label:              NodeKind::Start.default_label().into(),
            symbol:             String::new(),
            exchange:           "NSE".into(),
            timeframe:          "5m".into(),
            trading_instrument: TradingInstrument::default(),
            indicators:         Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceField {
    Open,
    High,
    Low,
    #[default]
    Close,
    Volume,
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Operand {
    Indicator { name: String },
    Price { field: PriceField },
    Constant { value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Comparison {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Equals,
    CrossesAbove,
    CrossesBelow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub lhs: Operand,
    pub operator: Comparison,
    pub rhs: Operand,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupLogic {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionGroup {
    pub logic: GroupLogic,
    pub conditions: Vec<Condition>,
}

/// Shared by signal, entry-signal and exit-signal nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignalData {
    pub label: String,
    pub conditions: Vec<ConditionGroup>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    #[default]
    Entry,
    Exit,
    Alert,
    Modify,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionData {
    pub label: String,
    pub action_type: ActionType,
    pub positions: Vec<Position>,
    pub requires_confirmation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryData {
    pub label: String,
    pub positions: Vec<Position>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ExitQuantity {
    #[default]
    All,
    Partial { percent: f64 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReEntryConfig {
    pub enabled: bool,
    pub group_number: u32,
    pub max_re_entries: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExitData {
    pub label: String,
    pub exit_order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_position_vpi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_node_id: Option<NodeId>,
    pub quantity: ExitQuantity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub re_entry: Option<ReEntryConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lots: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_type: Option<OrderType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModifyData {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_position_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_node_id: Option<NodeId>,
    pub modifications: PositionPatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertChannel {
    InApp,
    Email,
    Sms,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertData {
    pub label: String,
    pub message: String,
    pub channels: Vec<AlertChannel>,
}

impl Default for AlertData {
    fn default() -> Self {
        Self {
            label:    NodeKind::Alert.default_label().into(),
            message:  String::new(),
            channels: vec![AlertChannel::InApp],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndData {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForceEndData {
    pub label: String,
    pub close_all_positions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Default for ForceEndData {
    fn default() -> Self {
        Self {
            label:               NodeKind::ForceEnd.default_label().into(),
            close_all_positions: true,
            message:             None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryData {
    pub label: String,
    pub group_number: u32,
    pub max_re_entries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_node_id: Option<NodeId>,
}

impl Default for RetryData {
    fn default() -> Self {
        Self {
            label:          NodeKind::Retry.default_label().into(),
            group_number:   1,
            max_re_entries: 1,
            target_node_id: None,
        }
    }
}

// ─── NodeData ─────────────────────────────────────────────────────────────────

/// Node payload keyed by node kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Start(StartData),
    Signal(SignalData),
    EntrySignal(SignalData),
    ExitSignal(SignalData),
    Action(ActionData),
    Entry(EntryData),
    Exit(ExitData),
    Modify(ModifyData),
    Alert(AlertData),
    End(EndData),
    ForceEnd(ForceEndData),
    Retry(RetryData),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Start(_)       => NodeKind::Start,
            NodeData::Signal(_)      => NodeKind::Signal,
            NodeData::EntrySignal(_) => NodeKind::EntrySignal,
            NodeData::ExitSignal(_)  => NodeKind::ExitSignal,
            NodeData::Action(_)      => NodeKind::Action,
            NodeData::Entry(_)       => NodeKind::Entry,
            NodeData::Exit(_)        => NodeKind::Exit,
            NodeData::Modify(_)      => NodeKind::Modify,
            NodeData::Alert(_)       => NodeKind::Alert,
            NodeData::End(_)         => NodeKind::End,
            NodeData::ForceEnd(_)    => NodeKind::ForceEnd,
            NodeData::Retry(_)       => NodeKind::Retry,
        }
    }

    /// Default payload for a freshly dropped node of `kind`.
    pub fn defaults(kind: NodeKind) -> Self {
        let label = kind.default_label().to_string();
        match kind {
            NodeKind::Start       => NodeData::Start(StartData::default()),
            NodeKind::Signal      => NodeData::Signal(SignalData { label, conditions: Vec::new() }),
            NodeKind::EntrySignal => NodeData::EntrySignal(SignalData { label, conditions: Vec::new() }),
            NodeKind::ExitSignal  => NodeData::ExitSignal(SignalData { label, conditions: Vec::new() }),
            NodeKind::Action      => NodeData::Action(ActionData { label, ..Default::default() }),
            NodeKind::Entry       => NodeData::Entry(EntryData { label, ..Default::default() }),
            NodeKind::Exit        => NodeData::Exit(ExitData { label, ..Default::default() }),
            NodeKind::Modify      => NodeData::Modify(ModifyData { label, ..Default::default() }),
            NodeKind::Alert       => NodeData::Alert(AlertData::default()),
            NodeKind::End         => NodeData::End(EndData { label }),
            NodeKind::ForceEnd    => NodeData::ForceEnd(ForceEndData::default()),
            NodeKind::Retry       => NodeData::Retry(RetryData::default()),
        }
    }

    /// Decode a `data` object for `kind`.  Missing fields take the kind's
    /// defaults; `null` yields the defaults outright.
    pub fn from_value(kind: NodeKind, value: Value) -> Result<Self, serde_json::Error> {
        let value = match value {
            Value::Null => return Ok(Self::defaults(kind)),
            Value::Object(fields) => {
                let mut merged = Self::defaults(kind).to_value();
                if let Value::Object(base) = &mut merged {
                    base.extend(fields);
                }
                merged
            }
            other => other,
        };
        Ok(match kind {
            NodeKind::Start       => NodeData::Start(serde_json::from_value(value)?),
            NodeKind::Signal      => NodeData::Signal(serde_json::from_value(value)?),
            NodeKind::EntrySignal => NodeData::EntrySignal(serde_json::from_value(value)?),
            NodeKind::ExitSignal  => NodeData::ExitSignal(serde_json::from_value(value)?),
            NodeKind::Action      => NodeData::Action(serde_json::from_value(value)?),
            NodeKind::Entry       => NodeData::Entry(serde_json::from_value(value)?),
            NodeKind::Exit        => NodeData::Exit(serde_json::from_value(value)?),
            NodeKind::Modify      => NodeData::Modify(serde_json::from_value(value)?),
            NodeKind::Alert       => NodeData::Alert(serde_json::from_value(value)?),
            NodeKind::End         => NodeData::End(serde_json::from_value(value)?),
            NodeKind::ForceEnd    => NodeData::ForceEnd(serde_json::from_value(value)?),
            NodeKind::Retry       => NodeData::Retry(serde_json::from_value(value)?),
        })
    }

    pub fn to_value(&self) -> Value {
        let encoded = match self {
            NodeData::Start(d) => serde_json::to_value(d),
            NodeData::Signal(d) | NodeData::EntrySignal(d) | NodeData::ExitSignal(d) => {
                serde_json::to_value(d)
            }
            NodeData::Action(d)   => serde_json::to_value(d),
            NodeData::Entry(d)    => serde_json::to_value(d),
            NodeData::Exit(d)     => serde_json::to_value(d),
            NodeData::Modify(d)   => serde_json::to_value(d),
            NodeData::Alert(d)    => serde_json::to_value(d),
            NodeData::End(d)      => serde_json::to_value(d),
            NodeData::ForceEnd(d) => serde_json::to_value(d),
            NodeData::Retry(d)    => serde_json::to_value(d),
        };
        // Payloads are plain structs with string keys; encoding cannot fail.
        encoded.unwrap_or(Value::Null)
    }

    /// Positions declared by this node (entry and action nodes only).
    pub fn positions(&self) -> &[Position] {
        match self {
            NodeData::Action(d) => &d.positions,
            NodeData::Entry(d)  => &d.positions,
            _ => &[],
        }
    }

    pub fn positions_mut(&mut self) -> Option<&mut Vec<Position>> {
        match self {
            NodeData::Action(d) => Some(&mut d.positions),
            NodeData::Entry(d)  => Some(&mut d.positions),
            _ => None,
        }
    }
}

// ─── Node ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct Node {
    pub id: NodeId,
    pub position: XY,
    pub data: NodeData,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }
}

/// Wire form of [`Node`].
#[derive(Serialize, Deserialize)]
struct RawNode {
    id: NodeId,
    #[serde(rename = "type")]
    kind: NodeKind,
    #[serde(default)]
    position: XY,
    #[serde(default)]
    data: Value,
}

impl TryFrom<RawNode> for Node {
    type Error = serde_json::Error;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        Ok(Node {
            data:     NodeData::from_value(raw.kind, raw.data)?,
            id:       raw.id,
            position: raw.position,
        })
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        RawNode {
            kind:     node.kind(),
            data:     node.data.to_value(),
            id:       node.id,
            position: node.position,
        }
    }
}

// ─── Edge ─────────────────────────────────────────────────────────────────────

fn default_edge_type() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "type", default = "default_edge_type")]
    pub edge_type: String,
    #[serde(default)]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }
}

/// A connection request coming from the editor's drag gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
}

impl Connection {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source:        NodeId::new(source),
            target:        NodeId::new(target),
            source_handle: None,
            target_handle: None,
        }
    }
}

// ─── GraphSnapshot ────────────────────────────────────────────────────────────

/// The full `{ nodes, edges }` graph.  Used both as the history entry and as
/// the import/export payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}
