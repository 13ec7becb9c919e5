//! # events
//!
//! Defines [`FlowEvent`] — everything the backend pushes to the editor over
//! `/ws/editor` — and the [`Notifier`] seam the graph code uses to raise
//! user-facing notices (the toasts the front-end shows on a rejected
//! connection or a protected delete).
//!
//! Events travel through a `tokio::sync::broadcast::Sender<String>` as
//! pre-serialized JSON, so subscribers never need `Clone` on the payloads.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{Edge, Node};

// ─── Notice ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Sink for [`Notice`]s raised while editing a graph.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Drops every notice.  Used where no editor is listening (imports at startup,
/// unit tests that don't care).
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Notifier for Silent {
    fn notify(&self, _notice: Notice) {}
}

// ─── FlowEvent ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowEvent {
    /// A toast for the editor of `strategy_id` (or every editor when `None`).
    Notice {
        strategy_id: Option<Uuid>,
        level:       NoticeLevel,
        message:     String,
    },

    /// The live graph of an editor session changed.
    GraphChanged {
        strategy_id: Uuid,
        nodes:       Vec<Node>,
        edges:       Vec<Edge>,
        can_undo:    bool,
        can_redo:    bool,
    },

    /// The editor's graph was written to the store.
    StrategySaved {
        strategy_id: Uuid,
    },

    StrategyDeleted {
        strategy_id: Uuid,
    },

    EditorClosed {
        strategy_id: Uuid,
    },
}

impl FlowEvent {
    #[inline]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"event":"SERIALIZATION_ERROR"}"#.to_string())
    }
}

// ─── Broadcast notifier ───────────────────────────────────────────────────────

/// Publishes notices of one editor session onto the shared broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    strategy_id: Option<Uuid>,
    tx:          broadcast::Sender<String>,
}

impl BroadcastNotifier {
    pub fn new(strategy_id: Option<Uuid>, tx: broadcast::Sender<String>) -> Self {
        Self { strategy_id, tx }
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notice: Notice) {
        tracing::debug!(level = ?notice.level, message = %notice.message, "📣 notice");
        // Err only means no subscriber is connected.
        let _ = self.tx.send(
            FlowEvent::Notice {
                strategy_id: self.strategy_id,
                level:       notice.level,
                message:     notice.message,
            }
            .to_json(),
        );
    }
}
