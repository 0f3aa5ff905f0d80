//! Bounded undo history.
//!
//! Each applied ball, wicket or retirement records the state it started from.
//! Snapshots are stored behind `Arc`, so cloning a `Match` (which the reducer
//! does once per delivery) copies pointers rather than fifty full matches.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::Match;

/// Oldest snapshots are evicted past this depth.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    snapshots: VecDeque<Arc<Match>>,
}

impl History {
    /// Push `before` (its own history dropped) and evict past the limit.
    pub fn record(&mut self, before: &Match) {
        self.snapshots.push_back(Arc::new(before.without_history()));
        while self.snapshots.len() > HISTORY_LIMIT {
            self.snapshots.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<Arc<Match>> {
        self.snapshots.pop_back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn last(&self) -> Option<&Match> {
        self.snapshots.back().map(Arc::as_ref)
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.snapshots.iter().map(Arc::as_ref)
    }
}

/// Restore the state from immediately before the last applied action.
///
/// Returns `None` when there is nothing to undo. The restored state carries the
/// remaining history, so repeated calls keep walking backward.
pub fn undo(current: &Match) -> Option<Match> {
    let mut history = current.history.clone();
    let snapshot = history.pop()?;
    let mut restored = Arc::try_unwrap(snapshot).unwrap_or_else(|shared| (*shared).clone());
    restored.history = history;
    tracing::debug!(
        score = restored.score,
        wickets = restored.wickets,
        balls = restored.total_balls,
        remaining = restored.history.len(),
        "undo restored snapshot"
    );
    Some(restored)
}
