//! # state
//!
//! Shared application state injected into every Axum handler.
//!
//! ```text
//!  AppState
//!  ├─ config          (read-only, from env)
//!  ├─ store           StrategyStore: Supabase or in-memory
//!  ├─ auth            GoTrue client + mock user
//!  ├─ registration    registration API client
//!  ├─ editors         strategy id → EditorSession
//!  │                    ├─ gate    (MutationGate, lock-free to acquire)
//!  │                    └─ editor  (tokio Mutex<FlowEditor>)
//!  └─ broadcast_tx ─────────────────────────────▶ /ws/editor subscribers
//! ```
//!
//! A handler first takes a ticket from the session's gate (409 if the same
//! kind of mutation is running), then locks the editor for the in-memory
//! edit.  The editor lock is never held across a store call.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};
use uuid::Uuid;

use crate::auth::{AuthClient, Session};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::events::{BroadcastNotifier, FlowEvent};
use crate::flow::{FlowEditor, MutationGate, MutationKind, MutationTicket};
use crate::models::GraphSnapshot;
use crate::registration::RegistrationClient;
use crate::store::{build_store, DynStore};

/// Capacity of the WebSocket broadcast channel.
const BROADCAST_CAPACITY: usize = 256;

// ─── EditorSession ────────────────────────────────────────────────────────────

/// One open editor, owned by the user who opened it.
pub struct EditorSession {
    pub owner:  Uuid,
    pub gate:   MutationGate,
    pub editor: Mutex<FlowEditor>,
}

impl EditorSession {
    pub fn begin(&self, kind: MutationKind) -> Result<MutationTicket, AppError> {
        Ok(self.gate.try_begin(kind)?)
    }
}

// ─── AppState ─────────────────────────────────────────────────────────────────

pub struct AppState {
    pub config:       AppConfig,
    pub store:        DynStore,
    pub auth:         AuthClient,
    pub registration: RegistrationClient,

    /// Open editor sessions keyed by strategy id.
    pub editors: RwLock<HashMap<Uuid, Arc<EditorSession>>>,

    /// Pre-serialized [`FlowEvent`] JSON for WebSocket clients.
    pub broadcast_tx: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let http_client = reqwest::Client::new();
        let store = build_store(&config, http_client.clone());
        Self::with_store(config, store, http_client)
    }

    pub fn with_store(config: AppConfig, store: DynStore, http_client: reqwest::Client) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            auth:         AuthClient::new(http_client.clone(), config.supabase.clone(), config.environment),
            registration: RegistrationClient::new(http_client, config.registration.clone(), config.environment),
            store,
            editors:      RwLock::new(HashMap::new()),
            broadcast_tx,
            config,
        }
    }

    // ── Helper Methods ────────────────────────────────────────────────────────

    /// Send to every WebSocket client.  No listener is not an error.
    pub fn broadcast(&self, event: &FlowEvent) {
        let _ = self.broadcast_tx.send(event.to_json());
    }

    pub fn notifier_for(&self, strategy_id: Uuid) -> Arc<BroadcastNotifier> {
        Arc::new(BroadcastNotifier::new(Some(strategy_id), self.broadcast_tx.clone()))
    }

    /// Open (or replace) the editor session for `strategy_id`.
    pub async fn open_editor(&self, session: &Session, strategy_id: Uuid, graph: GraphSnapshot) -> Arc<EditorSession> {
        let editor = FlowEditor::open(strategy_id, graph, self.config.editor, self.notifier_for(strategy_id));
        let entry = Arc::new(EditorSession {
            owner:  session.user.id,
            gate:   editor.gate().clone(),
            editor: Mutex::new(editor),
        });
        self.editors.write().await.insert(strategy_id, Arc::clone(&entry));
        entry
    }

    /// The caller's session for `strategy_id`.  Someone else's session is
    /// reported as not found.
    pub async fn editor(&self, session: &Session, strategy_id: Uuid) -> Result<Arc<EditorSession>, AppError> {
        self.editors
            .read()
            .await
            .get(&strategy_id)
            .filter(|e| e.owner == session.user.id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No open editor for strategy {strategy_id}")))
    }

    pub async fn close_editor(&self, session: &Session, strategy_id: Uuid) -> bool {
        let mut editors = self.editors.write().await;
        let owned = editors.get(&strategy_id).is_some_and(|e| e.owner == session.user.id);
        if owned {
            editors.remove(&strategy_id);
        }
        owned
    }
}

pub type SharedState = Arc<AppState>;

pub fn build_state(config: AppConfig) -> SharedState {
    Arc::new(AppState::new(config))
}
