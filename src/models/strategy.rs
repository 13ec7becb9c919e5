//! # models::strategy
//!
//! [`Strategy`] is the top-level aggregate the user saves: a named graph plus
//! timestamps.  [`StrategyRow`] is the same thing in the shape the managed
//! database stores it (`snake_case` columns, graph as JSON, owning `user_id`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::graph::{Edge, GraphSnapshot, Node};

// ─── Strategy ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Strategy {
    /// "New Strategy": empty graph, fresh id.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id:          Uuid::new_v4(),
            name:        name.into(),
            description: description.into(),
            nodes:       Vec::new(),
            edges:       Vec::new(),
            created:     now,
            updated:     now,
        }
    }

    pub fn graph(&self) -> GraphSnapshot {
        GraphSnapshot::new(self.nodes.clone(), self.edges.clone())
    }

    pub fn set_graph(&mut self, graph: GraphSnapshot) {
        self.nodes   = graph.nodes;
        self.edges   = graph.edges;
        self.updated = Utc::now();
    }

    pub fn into_row(self, user_id: Uuid) -> StrategyRow {
        StrategyRow {
            id:          self.id,
            name:        self.name,
            description: self.description,
            nodes:       serde_json::to_value(&self.nodes).unwrap_or(Value::Array(Vec::new())),
            edges:       serde_json::to_value(&self.edges).unwrap_or(Value::Array(Vec::new())),
            created_at:  self.created,
            updated_at:  self.updated,
            user_id,
        }
    }
}

// ─── StrategyRow ──────────────────────────────────────────────────────────────

/// A `strategies` table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRow {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Value,
    #[serde(default)]
    pub edges: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Uuid,
}

impl TryFrom<StrategyRow> for Strategy {
    type Error = serde_json::Error;

    fn try_from(row: StrategyRow) -> Result<Self, Self::Error> {
        // A never-saved graph column may come back as NULL.
        let decode_list = |v: Value| if v.is_null() { Value::Array(Vec::new()) } else { v };

        Ok(Strategy {
            id:          row.id,
            name:        row.name,
            description: row.description,
            nodes:       serde_json::from_value(decode_list(row.nodes))?,
            edges:       serde_json::from_value(decode_list(row.edges))?,
            created:     row.created_at,
            updated:     row.updated_at,
        })
    }
}

// ─── Request payloads ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NewStrategy {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub graph: Option<GraphSnapshot>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrategyUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub graph: Option<GraphSnapshot>,
}

impl StrategyUpdate {
    pub fn apply(self, strategy: &mut Strategy) {
        if let Some(name) = self.name {
            strategy.name = name;
        }
        if let Some(description) = self.description {
            strategy.description = description;
        }
        if let Some(graph) = self.graph {
            strategy.nodes = graph.nodes;
            strategy.edges = graph.edges;
        }
        strategy.updated = Utc::now();
    }
}
