//! # Stratflow — strategy-graph editor backend
//!
//! ```text
//!  ┌─────────────┐  REST /api/editor/:id/*   ┌──────────────────────────────┐
//!  │ Flow editor │ ────────────────────────▶ │ AppState                     │
//!  │ (browser)   │                           │ ├─ editors  FlowEditor + hist │
//!  └─────────────┘  ws://host/ws/editor ◀─── │ ├─ broadcast_tx  ─────────────┤
//!         │                                  │ ├─ store  ──▶ Supabase REST   │
//!         │  /api/auth/*  /api/strategies    │ ├─ auth   ──▶ GoTrue / mock   │
//!         └────────────────────────────────▶ │ └─ registration ──▶ reg. API  │
//!                                            └──────────────────────────────┘
//! ```
//!
//! The graph editing core (`models`, `engine`, `history`, `flow`) is plain
//! synchronous Rust; everything async lives behind `routes`, `store`, `auth`
//! and `registration`.

pub mod analytics;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod flow;
pub mod history;
pub mod models;
pub mod registration;
pub mod routes;
pub mod state;
pub mod store;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use auth::require_session;
use routes::{
    analytics::strategy_analytics,
    auth::{current_session, register, sign_in, sign_out, sign_up},
    editor::{
        add_node, close_editor, connect, delete_edge, delete_node, get_editor, import_graph,
        open_editor, redo, reset, save, undo, update_node, validate_edge,
    },
    health_check,
    monitor::ws_editor,
    strategies::{create_strategy, delete_strategy, get_strategy, list_strategies, update_strategy},
};
use state::SharedState;

/// Full application router with auth, tracing and CORS layers.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health",                           get(health_check))
        // ── Auth ──────────────────────────────────────────────────────────────
        .route("/api/auth/signin",                  post(sign_in))
        .route("/api/auth/signup",                  post(sign_up))
        .route("/api/auth/signout",                 post(sign_out))
        .route("/api/auth/session",                 get(current_session))
        .route("/api/auth/register",                post(register))
        // ── Strategies ────────────────────────────────────────────────────────
        .route("/api/strategies",                   get(list_strategies).post(create_strategy))
        .route("/api/strategies/:id",               get(get_strategy).put(update_strategy).delete(delete_strategy))
        .route("/api/strategies/:id/analytics",     post(strategy_analytics))
        // ── Editor sessions ───────────────────────────────────────────────────
        .route("/api/editor/:id/open",              post(open_editor))
        .route("/api/editor/:id",                   get(get_editor).delete(close_editor))
        .route("/api/editor/:id/nodes",             post(add_node))
        .route("/api/editor/:id/nodes/:node_id",    axum::routing::patch(update_node).delete(delete_node))
        .route("/api/editor/:id/edges",             post(connect))
        .route("/api/editor/:id/edges/validate",    post(validate_edge))
        .route("/api/editor/:id/edges/:edge_id",    axum::routing::delete(delete_edge))
        .route("/api/editor/:id/undo",              post(undo))
        .route("/api/editor/:id/redo",              post(redo))
        .route("/api/editor/:id/reset",             post(reset))
        .route("/api/editor/:id/import",            post(import_graph))
        .route("/api/editor/:id/save",              post(save))
        // ── Live events ───────────────────────────────────────────────────────
        .route("/ws/editor",                        get(ws_editor))
        // ── Middleware ────────────────────────────────────────────────────────
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_session))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::MOCK_USER_KEY;
    use crate::config::AppConfig;
    use crate::state::build_state;

    struct Harness {
        app: Router,
    }

    impl Harness {
        fn new() -> Self {
            Self { app: build_router(build_state(AppConfig::default())) }
        }

        async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let mut req = Request::builder()
                .method(method)
                .uri(uri)
                .header("Authorization", format!("Bearer {MOCK_USER_KEY}"));
            let body = match body {
                Some(v) => {
                    req = req.header("content-type", "application/json");
                    Body::from(v.to_string())
                }
                None => Body::empty(),
            };
            let resp = self.app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
            let status = resp.status();
            let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, value)
        }

        async fn signed_in(self) -> Self {
            let (status, _) = self
                .call(Method::POST, "/api/auth/signin", Some(json!({ "email": "t@x.io", "password": "pw" })))
                .await;
            assert_eq!(status, StatusCode::OK);
            self
        }

        /// Create a strategy and open its editor; returns the strategy id.
        async fn open_strategy(&self) -> String {
            let (status, body) = self.call(Method::POST, "/api/strategies", Some(json!({ "name": "ORB" }))).await;
            assert_eq!(status, StatusCode::CREATED);
            let id = body["strategy"]["id"].as_str().unwrap().to_string();

            let (status, _) = self.call(Method::POST, &format!("/api/editor/{id}/open"), None).await;
            assert_eq!(status, StatusCode::CREATED);
            id
        }
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = build_router(build_state(AppConfig::default()));
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_routes_need_session() {
        let h = Harness::new();
        // mock token is only valid once the mock user has signed in
        let (status, body) = h.call(Method::GET, "/api/strategies", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["ok"], false);

        let h = h.signed_in().await;
        let (status, body) = h.call(Method::GET, "/api/auth/session", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mock"], true);
    }

    #[tokio::test]
    async fn test_editor_flow_end_to_end() {
        let h = Harness::new().signed_in().await;
        let id = h.open_strategy().await;

        let (status, body) = h
            .call(Method::POST, &format!("/api/editor/{id}/nodes"), Some(json!({ "type": "startNode" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let start_id = body["node"]["id"].as_str().unwrap().to_string();

        let (status, body) = h
            .call(
                Method::POST,
                &format!("/api/editor/{id}/nodes"),
                Some(json!({ "type": "endNode", "connectFrom": start_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let end_id = body["node"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["edges"].as_array().unwrap().len(), 1);

        // end → start is rejected
        let (status, body) = h
            .call(Method::POST, &format!("/api/editor/{id}/edges"), Some(json!({ "source": end_id, "target": start_id })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);

        let (_, body) = h
            .call(
                Method::POST,
                &format!("/api/editor/{id}/edges/validate"),
                Some(json!({ "source": start_id, "target": end_id })),
            )
            .await;
        assert_eq!(body["valid"], true);

        let (_, body) = h.call(Method::POST, &format!("/api/editor/{id}/undo"), None).await;
        assert_eq!(body["applied"], true);
        assert_eq!(body["editor"]["nodes"].as_array().unwrap().len(), 1);

        let (status, _) = h.call(Method::POST, &format!("/api/editor/{id}/redo"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = h.call(Method::POST, &format!("/api/editor/{id}/save"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["strategy"]["nodes"].as_array().unwrap().len(), 2);

        let (_, body) = h.call(Method::GET, &format!("/api/strategies/{id}"), None).await;
        assert_eq!(body["strategy"]["edges"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sole_start_delete_is_bad_request() {
        let h = Harness::new().signed_in().await;
        let id = h.open_strategy().await;
        let (_, body) = h
            .call(Method::POST, &format!("/api/editor/{id}/nodes"), Some(json!({ "type": "startNode" })))
            .await;
        let start_id = body["node"]["id"].as_str().unwrap().to_string();

        let (status, _) = h
            .call(Method::DELETE, &format!("/api/editor/{id}/nodes/{start_id}"), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = h.call(Method::GET, &format!("/api/editor/{id}"), None).await;
        assert_eq!(body["editor"]["nodes"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_patch_changes_nothing() {
        let h = Harness::new().signed_in().await;
        let id = h.open_strategy().await;
        let (_, body) = h
            .call(Method::POST, &format!("/api/editor/{id}/nodes"), Some(json!({ "type": "entryNode" })))
            .await;
        let node_id = body["node"]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/editor/{id}/nodes/{node_id}");

        let (status, _) = h.call(Method::PATCH, &uri, Some(json!({ "position": { "x": 777.0, "y": 777.0 } }))).await;
        assert_eq!(status, StatusCode::OK);
        let (_, before) = h.call(Method::GET, &format!("/api/editor/{id}"), None).await;

        let (status, _) = h
            .call(
                Method::PATCH,
                &uri,
                Some(json!({
                    "position": { "x": 5.0, "y": 5.0 },
                    "data": { "positions": [{ "id": "p1", "orderType": "limit" }] }
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = h.call(Method::PATCH, &uri, Some(json!({ "position": { "x": 1.0e300, "y": 0.0 } }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, after) = h.call(Method::GET, &format!("/api/editor/{id}"), None).await;
        assert_eq!(after["editor"]["nodes"], before["editor"]["nodes"]);
    }

    #[tokio::test]
    async fn test_unknown_editor_is_not_found() {
        let h = Harness::new().signed_in().await;
        let (status, _) = h
            .call(Method::POST, &format!("/api/editor/{}/undo", uuid::Uuid::new_v4()), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_analytics_for_saved_strategy() {
        let h = Harness::new().signed_in().await;
        let (_, body) = h.call(Method::POST, "/api/strategies", Some(json!({ "name": "Mean revert" }))).await;
        let id = body["strategy"]["id"].as_str().unwrap().to_string();

        let (status, body) = h
            .call(Method::POST, &format!("/api/strategies/{id}/analytics"), Some(json!({ "seed": 3, "days": 10 })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["report"]["seed"], 3);
        assert_eq!(body["report"]["mock"], true);
    }
}
