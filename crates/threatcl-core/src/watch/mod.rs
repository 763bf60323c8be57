//! Live filesystem ingestion
//!
//! The watcher feeds an unbounded channel; a single tokio task drains it
//! and applies each event to the store.

mod events;
mod ingest;
mod watcher;

pub use events::{translate, ChangeEvent};
pub use ingest::{Applied, IngestStats, IngestionLoop};
pub use watcher::DocumentWatcher;

use crate::error::Result;
use crate::store::DocumentStore;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A watcher that is already recording changes whose events are not yet
/// applied. Changes made while the store loads queue up here.
pub struct PendingWatch {
    store: Arc<DocumentStore>,
    watcher: DocumentWatcher,
    events: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl PendingWatch {
    /// Start the ingestion task; queued events are applied first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> WatchHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(IngestionLoop::new(self.store).run(self.events, shutdown_rx));

        info!(root = %self.watcher.root().display(), "watching for changes");
        WatchHandle {
            watcher: self.watcher,
            shutdown,
            task,
        }
    }
}

/// A running watcher plus its ingestion task
pub struct WatchHandle {
    watcher: DocumentWatcher,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<IngestStats>,
}

impl WatchHandle {
    /// Register the watcher on the store's root without applying anything.
    ///
    /// Attach before the initial `load_all` so edits made during the load
    /// are replayed afterwards instead of lost.
    pub fn attach(store: Arc<DocumentStore>) -> Result<PendingWatch> {
        let (tx, events) = mpsc::unbounded_channel();
        let watcher = DocumentWatcher::start(store.root(), tx)?;
        Ok(PendingWatch {
            store,
            watcher,
            events,
        })
    }

    /// Attach and start in one step, for stores that are already loaded.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<DocumentStore>) -> Result<Self> {
        Ok(Self::attach(store)?.start())
    }

    /// Stop the watcher first, then the ingestion task.
    ///
    /// Events already dequeued finish applying; anything still queued is
    /// discarded.
    pub async fn stop(self) -> IngestStats {
        let Self {
            watcher,
            shutdown,
            task,
        } = self;
        drop(watcher);
        let _ = shutdown.send(true);

        match task.await {
            Ok(stats) => {
                info!(
                    applied = stats.applied,
                    ignored = stats.ignored,
                    failed = stats.failed,
                    "stopped watching"
                );
                stats
            }
            Err(error) => {
                warn!(%error, "ingestion task did not finish cleanly");
                IngestStats::default()
            }
        }
    }
}
