//! # history — Undo / Redo
//!
//! A linear list of [`GraphSnapshot`]s with a cursor:
//!
//! ```text
//!   entries:  [ s0 ][ s1 ][ s2 ][ s3 ]
//!                         ▲
//!                       cursor          undo → s1 · redo → s3
//! ```
//!
//! Pushing while the cursor is not at the tail discards the redo branch.
//! An empty store has no cursor (`None`), the equivalent of index `-1`.

use crate::models::GraphSnapshot;

/// Default number of snapshots kept before the oldest is dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: Vec<GraphSnapshot>,
    cursor:  Option<usize>,
    limit:   usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryStore {
    /// `limit` of 0 is treated as 1; the current snapshot is always kept.
    pub fn with_limit(limit: usize) -> Self {
        Self { entries: Vec::new(), cursor: None, limit: limit.max(1) }
    }

    /// Truncate the redo branch, append `snapshot`, move the cursor onto it.
    pub fn add_history_item(&mut self, snapshot: GraphSnapshot) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);
        self.entries.push(snapshot);

        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Step back one entry.  `None` at the first entry (or when empty).
    pub fn undo(&mut self) -> Option<&GraphSnapshot> {
        match self.cursor {
            Some(c) if c > 0 => {
                self.cursor = Some(c - 1);
                self.entries.get(c - 1)
            }
            _ => None,
        }
    }

    /// Step forward one entry.  `None` at the tail.
    pub fn redo(&mut self) -> Option<&GraphSnapshot> {
        match self.cursor {
            Some(c) if c + 1 < self.entries.len() => {
                self.cursor = Some(c + 1);
                self.entries.get(c + 1)
            }
            _ => None,
        }
    }

    /// Overwrite the entry under the cursor, leaving the redo branch alone.
    /// Pushes when the store is empty.
    pub fn replace_current(&mut self, snapshot: GraphSnapshot) {
        match self.cursor.and_then(|c| self.entries.get_mut(c)) {
            Some(entry) => *entry = snapshot,
            None => self.add_history_item(snapshot),
        }
    }

    pub fn reset_history(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    pub fn current(&self) -> Option<&GraphSnapshot> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(c) if c + 1 < self.entries.len())
    }
}
