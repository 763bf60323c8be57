//! notify-backed filesystem watcher

use super::events::{translate, ChangeEvent};
use crate::error::{Result, ThreatclError};
use notify::{recommended_watcher, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

/// Recursive watcher on a root directory.
///
/// The notify callback never touches the store: it only translates events
/// and pushes them into the ingestion channel. Dropping the watcher stops
/// delivery and closes its side of the channel.
pub struct DocumentWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl DocumentWatcher {
    pub fn start(root: &Path, events: UnboundedSender<ChangeEvent>) -> Result<Self> {
        let mut watcher =
            recommended_watcher(move |event_result: notify::Result<Event>| match event_result {
                Ok(event) => {
                    for change in translate(event) {
                        if events.send(change).is_err() {
                            break;
                        }
                    }
                }
                Err(error) => {
                    warn!(%error, "filesystem watcher error");
                }
            })
            .map_err(|error| {
                ThreatclError::Watch(format!(
                    "failed to create filesystem watcher for {}: {error}",
                    root.display()
                ))
            })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|error| {
                ThreatclError::Watch(format!("failed to watch {}: {error}", root.display()))
            })?;

        Ok(Self {
            _watcher: watcher,
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
