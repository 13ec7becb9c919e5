//! # routes::editor
//!
//! HTTP surface of [`FlowEditor`](crate::flow::FlowEditor) sessions.
//!
//! | Method | Path                                  | Ticket        |
//! |--------|---------------------------------------|---------------|
//! | POST   | `/api/editor/:id/open`                | —             |
//! | GET    | `/api/editor/:id`                     | —             |
//! | DELETE | `/api/editor/:id`                     | —             |
//! | POST   | `/api/editor/:id/nodes`               | `add-node`    |
//! | PATCH  | `/api/editor/:id/nodes/:node_id`      | `update-node` |
//! | DELETE | `/api/editor/:id/nodes/:node_id`      | `delete-node` |
//! | POST   | `/api/editor/:id/edges`               | `connect`     |
//! | POST   | `/api/editor/:id/edges/validate`      | —             |
//! | DELETE | `/api/editor/:id/edges/:edge_id`      | `delete-edge` |
//! | POST   | `/api/editor/:id/undo` · `/redo`      | `undo/redo`   |
//! | POST   | `/api/editor/:id/import`              | `import`      |
//! | POST   | `/api/editor/:id/reset`               | `reset`       |
//! | POST   | `/api/editor/:id/save`                | `save`        |
//!
//! Every structural change is followed by a `GRAPH_CHANGED` broadcast.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    auth::Session,
    error::AppError,
    events::{FlowEvent, Notice, Notifier},
    flow::{AddNodeRequest, FlowEditor, MutationKind},
    models::{Connection, EdgeId, GraphSnapshot, NodeId, StrategyUpdate, XY},
    state::SharedState,
};

fn announce(state: &SharedState, editor: &FlowEditor) {
    state.broadcast(&editor.graph_changed_event());
}

// ─── Lifecycle ────────────────────────────────────────────────────────────────

/// POST /api/editor/:id/open — load the saved graph into a fresh session.
pub async fn open_editor(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let strategy = state
        .store
        .get(&session, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Strategy {id}")))?;

    let entry = state.open_editor(&session, id, strategy.graph()).await;
    let view = entry.editor.lock().await.view();
    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "editor": view }))))
}

/// GET /api/editor/:id
pub async fn get_editor(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state.editor(&session, id).await?;
    let view = entry.editor.lock().await.view();
    Ok(Json(json!({ "ok": true, "editor": view })))
}

/// DELETE /api/editor/:id — discard the session (unsaved edits are lost).
pub async fn close_editor(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.close_editor(&session, id).await {
        return Err(AppError::NotFound(format!("No open editor for strategy {id}")));
    }
    state.broadcast(&FlowEvent::EditorClosed { strategy_id: id });
    info!(strategy_id = %id, "📕 editor closed");
    Ok(Json(json!({ "ok": true })))
}

// ─── Nodes ────────────────────────────────────────────────────────────────────

/// POST /api/editor/:id/nodes
pub async fn add_node(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
    Json(request):      Json<AddNodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state.editor(&session, id).await?;
    let ticket = entry.begin(MutationKind::AddNode)?;

    let mut editor = entry.editor.lock().await;
    let node = editor.add_node(&ticket, request)?;
    announce(&state, &editor);

    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "node": node, "edges": editor.edges() }))))
}

#[derive(Debug, Deserialize)]
pub struct NodePatch {
    #[serde(default)]
    pub data:     Option<Value>,
    #[serde(default)]
    pub position: Option<XY>,
}

/// PATCH /api/editor/:id/nodes/:node_id — data merge and/or drag-stop move.
pub async fn update_node(
    State(state):           State<SharedState>,
    Extension(session):     Extension<Session>,
    Path((id, node_id)):    Path<(Uuid, String)>,
    Json(patch):            Json<NodePatch>,
) -> Result<impl IntoResponse, AppError> {
    if patch.data.is_none() && patch.position.is_none() {
        return Err(AppError::BadRequest("Nothing to update: send `data` and/or `position`".into()));
    }
    let node_id = NodeId::new(node_id);
    let entry = state.editor(&session, id).await?;
    let ticket = entry.begin(MutationKind::UpdateNode)?;

    let mut editor = entry.editor.lock().await;
    let node = editor.patch_node(&ticket, &node_id, patch.data, patch.position)?;
    announce(&state, &editor);

    Ok(Json(json!({ "ok": true, "node": node })))
}

/// DELETE /api/editor/:id/nodes/:node_id
pub async fn delete_node(
    State(state):        State<SharedState>,
    Extension(session):  Extension<Session>,
    Path((id, node_id)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state.editor(&session, id).await?;
    let ticket = entry.begin(MutationKind::DeleteNode)?;

    let mut editor = entry.editor.lock().await;
    editor.delete_node(&ticket, &NodeId::new(node_id))?;
    announce(&state, &editor);

    Ok(Json(json!({ "ok": true, "editor": editor.view() })))
}

// ─── Edges ────────────────────────────────────────────────────────────────────

/// POST /api/editor/:id/edges
pub async fn connect(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
    Json(connection):   Json<Connection>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state.editor(&session, id).await?;
    let ticket = entry.begin(MutationKind::Connect)?;

    let mut editor = entry.editor.lock().await;
    let edge = editor.connect(&ticket, connection)?;
    announce(&state, &editor);

    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "edge": edge }))))
}

/// POST /api/editor/:id/edges/validate — hover check while dragging.
pub async fn validate_edge(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
    Json(connection):   Json<Connection>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state.editor(&session, id).await?;
    let valid = entry.editor.lock().await.is_valid_connection(&connection);
    Ok(Json(json!({ "ok": true, "valid": valid })))
}

/// DELETE /api/editor/:id/edges/:edge_id
pub async fn delete_edge(
    State(state):        State<SharedState>,
    Extension(session):  Extension<Session>,
    Path((id, edge_id)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state.editor(&session, id).await?;
    let ticket = entry.begin(MutationKind::DeleteEdge)?;

    let mut editor = entry.editor.lock().await;
    editor.delete_edge(&ticket, &EdgeId(edge_id))?;
    announce(&state, &editor);

    Ok(Json(json!({ "ok": true, "edges": editor.edges() })))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// POST /api/editor/:id/undo
pub async fn undo(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    step(state, session, id, true).await
}

/// POST /api/editor/:id/redo
pub async fn redo(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    step(state, session, id, false).await
}

async fn step(state: SharedState, session: Session, id: Uuid, back: bool) -> Result<Json<Value>, AppError> {
    let entry = state.editor(&session, id).await?;
    let ticket = entry.begin(MutationKind::History)?;

    let mut editor = entry.editor.lock().await;
    let applied = if back { editor.undo(&ticket) } else { editor.redo(&ticket) };
    if applied {
        announce(&state, &editor);
    }
    Ok(Json(json!({ "ok": true, "applied": applied, "editor": editor.view() })))
}

/// POST /api/editor/:id/import — replace the graph with the posted one.
pub async fn import_graph(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
    Json(graph):        Json<GraphSnapshot>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state.editor(&session, id).await?;
    let ticket = entry.begin(MutationKind::Import)?;

    let mut editor = entry.editor.lock().await;
    editor.import(&ticket, graph)?;
    announce(&state, &editor);

    Ok(Json(json!({ "ok": true, "editor": editor.view() })))
}

/// POST /api/editor/:id/reset — empty canvas, history cleared.
pub async fn reset(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state.editor(&session, id).await?;
    let ticket = entry.begin(MutationKind::Reset)?;

    let mut editor = entry.editor.lock().await;
    editor.reset(&ticket);
    announce(&state, &editor);

    Ok(Json(json!({ "ok": true, "editor": editor.view() })))
}

// ─── Persistence ──────────────────────────────────────────────────────────────

/// POST /api/editor/:id/save — write the live graph to the store.
///
/// The `save` ticket is held across the store call so a double-click can't
/// issue two writes; the editor itself stays unlocked meanwhile.
pub async fn save(
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Path(id):           Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state.editor(&session, id).await?;
    let _ticket = entry.begin(MutationKind::Save)?;

    let graph = entry.editor.lock().await.snapshot();
    let notifier = state.notifier_for(id);
    let update = StrategyUpdate { graph: Some(graph), ..Default::default() };

    match state.store.update(&session, id, update).await {
        Ok(Some(strategy)) => {
            notifier.notify(Notice::success("Strategy saved"));
            state.broadcast(&FlowEvent::StrategySaved { strategy_id: id });
            info!(strategy_id = %id, nodes = strategy.nodes.len(), "💾 strategy saved");
            Ok(Json(json!({ "ok": true, "strategy": strategy })))
        }
        Ok(None) => Err(AppError::NotFound(format!("Strategy {id}"))),
        Err(err) => {
            error!(strategy_id = %id, error = %err, "❌ save failed");
            notifier.notify(Notice::error("Failed to save strategy"));
            Err(AppError::Internal(err))
        }
    }
}
