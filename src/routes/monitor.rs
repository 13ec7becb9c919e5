//! # routes::monitor
//!
//! `GET /ws/editor?strategy=<uuid>&access_token=<token>` — live event stream
//! for the editor front-end (notices, graph changes, saves).
//!
//! Without `strategy` the client receives every event for the strategies it
//! has open.  With it, only that strategy's events plus global notices, and
//! the current graph is sent as the first frame.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{auth::Session, state::SharedState};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub strategy: Option<Uuid>,
}

pub async fn ws_editor(
    ws:                 WebSocketUpgrade,
    State(state):       State<SharedState>,
    Extension(session): Extension<Session>,
    Query(params):      Query<WsParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, session, params.strategy))
}

/// Does an event (pre-serialized JSON) belong on this connection?
fn wanted(json: &str, filter: Option<Uuid>, owned: &[Uuid]) -> bool {
    let Ok(v) = serde_json::from_str::<Value>(json) else {
        return false;
    };
    let id = v
        .get("strategy_id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok());
    match (id, filter) {
        (None, _) => true,
        (Some(id), Some(f)) => id == f && owned.contains(&id),
        (Some(id), None) => owned.contains(&id),
    }
}

/// Strategy ids with an editor open by this user.
async fn owned_editors(state: &SharedState, session: &Session) -> Vec<Uuid> {
    state
        .editors
        .read()
        .await
        .iter()
        .filter(|(_, e)| e.owner == session.user.id)
        .map(|(id, _)| *id)
        .collect()
}

async fn handle_socket(socket: WebSocket, state: SharedState, session: Session, filter: Option<Uuid>) {
    let mut rx = state.broadcast_tx.subscribe();
    let (mut sender, mut receiver) = socket.split();

    info!(user_id = %session.user.id, ?filter, "🔌 WebSocket client connected");

    // ── Initial snapshot ──────────────────────────────────────────────────────
    if let Some(strategy_id) = filter {
        if let Ok(entry) = state.editor(&session, strategy_id).await {
            let snapshot = entry.editor.lock().await.graph_changed_event().to_json();
            if sender.send(Message::Text(snapshot.into())).await.is_err() {
                return;
            }
        }
    }

    // ── Event Loop ────────────────────────────────────────────────────────────
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(json_str) => {
                        // Editors open and close while connected; look up on each event.
                        let owned = owned_editors(&state, &session).await;
                        if !wanted(&json_str, filter, &owned) && !closed_event_for_owner(&json_str, filter) {
                            continue;
                        }
                        if sender.send(Message::Text(json_str.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!("WS client lagged, skipped {n} events");
                    }
                    Err(_) => break,
                }
            }

            result = receiver.next() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    _ => {}
                }
            }
        }
    }

    info!(user_id = %session.user.id, "🔌 WebSocket client disconnected");
}

/// `EDITOR_CLOSED` / `STRATEGY_DELETED` arrive after the session is gone, so
/// they can't be matched against open editors; a filtered client still gets
/// them for its own strategy.
fn closed_event_for_owner(json: &str, filter: Option<Uuid>) -> bool {
    let Some(filter) = filter else {
        return false;
    };
    let Ok(v) = serde_json::from_str::<Value>(json) else {
        return false;
    };
    matches!(v.get("event").and_then(Value::as_str), Some("EDITOR_CLOSED" | "STRATEGY_DELETED"))
        && v.get("strategy_id").and_then(Value::as_str) == Some(filter.to_string().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{FlowEvent, NoticeLevel};

    #[test]
    fn test_event_filtering() {
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();
        let saved = |id| FlowEvent::StrategySaved { strategy_id: id }.to_json();
        let global = FlowEvent::Notice { strategy_id: None, level: NoticeLevel::Info, message: "hi".into() }.to_json();

        assert!(wanted(&saved(mine), None, &[mine]));
        assert!(!wanted(&saved(theirs), None, &[mine]));
        assert!(!wanted(&saved(mine), Some(theirs), &[mine, theirs]));
        assert!(wanted(&global, Some(mine), &[]));
    }

    #[test]
    fn test_closed_events_reach_filtered_client() {
        let id = Uuid::new_v4();
        let closed = FlowEvent::EditorClosed { strategy_id: id }.to_json();
        assert!(closed_event_for_owner(&closed, Some(id)));
        assert!(!closed_event_for_owner(&closed, None));
        assert!(!closed_event_for_owner(&closed, Some(Uuid::new_v4())));
    }
}
