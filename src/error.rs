//! # error
//!
//! Two layers of errors:
//!
//! - [`FlowError`] — graph-editing failures (rejected connection, protected
//!   start node, stale ids, a mutation already in flight).  These never leave
//!   the graph in a half-mutated state.
//! - [`AppError`] — what every Axum handler returns.  Its `IntoResponse` impl
//!   turns failures into the `{ "ok": false, "error": ... }` body the editor
//!   front-end expects.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::flow::MutationKind;
use crate::models::{EdgeId, NodeId};

// ─── FlowError ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    /// Connection refused by the graph rules (terminal source / start target).
    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    /// The last remaining node is a start node and may not be deleted.
    #[error("Cannot delete the only start node of the strategy")]
    SoleStartNode,

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// Another mutation of the same kind has not completed yet.
    #[error("A {0} operation is already in progress")]
    MutationInFlight(MutationKind),

    #[error("Invalid position {id}: {reason}")]
    InvalidPosition { id: String, reason: String },

    #[error("Invalid data for node {id}: {reason}")]
    InvalidNodeData { id: NodeId, reason: String },

    /// Non-finite or beyond `MAX_COORDINATE`.
    #[error("Position ({x}, {y}) is outside the canvas")]
    OffCanvas { x: f64, y: f64 },
}

// ─── AppError ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AppError {
    /// The request payload was syntactically correct but semantically invalid.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or unknown session token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource (strategy, editor session, node) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request collides with an in-flight mutation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Supabase or the registration API answered with an error.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Catch-all for unexpected failures.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<FlowError> for AppError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::NodeNotFound(_) | FlowError::EdgeNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            FlowError::MutationInFlight(_) => AppError::Conflict(err.to_string()),
            FlowError::InvalidConnection(_)
            | FlowError::SoleStartNode
            | FlowError::InvalidPosition { .. }
            | FlowError::InvalidNodeData { .. }
            | FlowError::OffCanvas { .. } => AppError::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg)   => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::NotFound(msg)     => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg)     => (StatusCode::CONFLICT, msg.clone()),
            AppError::Upstream(msg)     => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {err}"),
            ),
        };

        let body = Json(json!({
            "ok":    false,
            "error": message,
        }));

        (status, body).into_response()
    }
}
