//! Change ingestion loop
//!
//! Single consumer of the watcher channel. Events are applied to the store
//! one at a time in arrival order, so the store is never mutated by two
//! ingestion events at once; each individual call is protected by the
//! store's own lock.

use super::events::ChangeEvent;
use crate::error::Result;
use crate::store::{DocumentStore, ReloadOutcome};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error};

/// What a single event did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Filtered out (unrecognized extension, hidden file, directory, ...)
    Ignored,
    Reloaded(ReloadOutcome),
    /// Number of documents removed
    Removed(usize),
    Renamed {
        removed: usize,
        reloaded: Option<ReloadOutcome>,
    },
}

/// Counters returned when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub applied: usize,
    pub ignored: usize,
    pub failed: usize,
}

/// Translates change events into store mutations
#[derive(Debug, Clone)]
pub struct IngestionLoop {
    store: Arc<DocumentStore>,
}

impl IngestionLoop {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Apply one event synchronously
    pub fn apply(&self, event: &ChangeEvent) -> Result<Applied> {
        apply_event(&self.store, event)
    }

    /// Consume events until the channel closes or shutdown is signalled.
    ///
    /// A failing event is logged and dropped; it never stops the loop and
    /// is not retried. The store keeps the last good version.
    pub async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<ChangeEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> IngestStats {
        let mut stats = IngestStats::default();

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let store = Arc::clone(&self.store);
            let job = event.clone();
            let result = tokio::task::spawn_blocking(move || apply_event(&store, &job)).await;

            match result {
                Ok(Ok(Applied::Ignored)) => stats.ignored += 1,
                Ok(Ok(applied)) => {
                    stats.applied += 1;
                    debug!(
                        kind = event.kind(),
                        path = %event.path().display(),
                        ?applied,
                        "applied change"
                    );
                }
                Ok(Err(err)) => {
                    stats.failed += 1;
                    error!(
                        kind = event.kind(),
                        path = %event.path().display(),
                        error = %err,
                        "failed to apply change, keeping previous version"
                    );
                }
                Err(join_err) => {
                    stats.failed += 1;
                    error!(
                        path = %event.path().display(),
                        error = %join_err,
                        "ingestion task panicked"
                    );
                }
            }
        }

        debug!(?stats, "ingestion loop stopped");
        stats
    }
}

fn apply_event(store: &DocumentStore, event: &ChangeEvent) -> Result<Applied> {
    match event {
        ChangeEvent::Created(path) | ChangeEvent::Modified(path) => {
            if !store.is_recognized(path) || path.is_dir() {
                return Ok(Applied::Ignored);
            }
            reload_or_remove(store, path)
        }
        ChangeEvent::Removed(path) => {
            if !store.is_recognized(path) {
                return Ok(Applied::Ignored);
            }
            Ok(Applied::Removed(store.remove_file(path)))
        }
        ChangeEvent::Renamed { from, to } => {
            let from_known = store.is_recognized(from);
            let to = to.as_deref().filter(|p| store.is_recognized(p) && !p.is_dir());
            if !from_known && to.is_none() {
                return Ok(Applied::Ignored);
            }

            let removed = if from_known {
                store.remove_file(from)
            } else {
                0
            };
            let reloaded = match to {
                Some(to) => match reload_or_remove(store, to)? {
                    Applied::Reloaded(outcome) => Some(outcome),
                    _ => None,
                },
                None => None,
            };
            Ok(Applied::Renamed { removed, reloaded })
        }
    }
}

/// Reload a file; a file that vanished before we could read it is removed
fn reload_or_remove(store: &DocumentStore, path: &Path) -> Result<Applied> {
    match store.reload(path) {
        Ok(outcome) => Ok(Applied::Reloaded(outcome)),
        Err(err) if err.is_missing_file() => Ok(Applied::Removed(store.remove_file(path))),
        Err(err) => Err(err),
    }
}
