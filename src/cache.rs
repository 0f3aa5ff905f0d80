//! Durable local cache of the live match, so a restart resumes mid-innings.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use crate::types::Match;

/// Storage port for the single "current match" snapshot.
pub trait SnapshotCache: Send + Sync {
    fn get(&self) -> Option<Match>;
    fn set(&self, m: &Match);
    fn clear(&self);
}

/// JSON file on local disk. Read and write failures are logged, never raised.
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotCache for FileCache {
    fn get(&self) -> Option<Match> {
        if !self.path.exists() {
            return None;
        }
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(m) => Some(m),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), "failed to parse cached match: {e}");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "failed to read cached match: {e}");
                None
            }
        }
    }

    fn set(&self, m: &Match) {
        match serde_json::to_string(m) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    tracing::warn!(path = %self.path.display(), "failed to write cached match: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to serialize match for cache: {e}"),
        }
    }

    fn clear(&self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), "failed to remove cached match: {e}");
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryCache {
    slot: Mutex<Option<Match>>,
}

impl SnapshotCache for MemoryCache {
    fn get(&self) -> Option<Match> {
        self.slot.lock().unwrap().clone()
    }

    fn set(&self, m: &Match) {
        *self.slot.lock().unwrap() = Some(m.clone());
    }

    fn clear(&self) {
        *self.slot.lock().unwrap() = None;
    }
}

/// Writes the latest published state after it has been quiet for `debounce`.
/// `None` clears the cache. The pending write is flushed when the sender drops.
pub fn spawn_writer(
    cache: Arc<dyn SnapshotCache>,
    mut rx: watch::Receiver<Option<Match>>,
    debounce: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut dirty = false;
        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    dirty = true;
                }
                _ = tokio::time::sleep(debounce), if dirty => {
                    flush(cache.as_ref(), &rx);
                    dirty = false;
                }
            }
        }
        if dirty {
            flush(cache.as_ref(), &rx);
        }
        tracing::debug!("cache writer stopped");
    })
}

fn flush(cache: &dyn SnapshotCache, rx: &watch::Receiver<Option<Match>>) {
    let latest = rx.borrow().clone();
    match latest {
        Some(m) => cache.set(&m),
        None => cache.clear(),
    }
}
