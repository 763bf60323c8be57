//! Typed filesystem change events

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use std::path::{Path, PathBuf};

/// One filesystem change, as consumed by the ingestion loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
    /// `to` is `None` when the file moved somewhere we cannot see
    Renamed { from: PathBuf, to: Option<PathBuf> },
}

impl ChangeEvent {
    /// Path the event is primarily about
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(p) | Self::Modified(p) | Self::Removed(p) => p,
            Self::Renamed { from, .. } => from,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Modified(_) => "modified",
            Self::Removed(_) => "removed",
            Self::Renamed { .. } => "renamed",
        }
    }
}

/// Translate a notify event into zero or more change events.
///
/// Access events are dropped. Ambiguous kinds are resolved by checking
/// whether the path still exists.
pub fn translate(event: Event) -> Vec<ChangeEvent> {
    let Event { kind, paths, .. } = event;

    match kind {
        EventKind::Access(_) => Vec::new(),
        EventKind::Create(_) => paths.into_iter().map(ChangeEvent::Created).collect(),
        EventKind::Remove(_) => paths.into_iter().map(ChangeEvent::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => paths
            .into_iter()
            .map(|from| ChangeEvent::Renamed { from, to: None })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.into_iter().map(ChangeEvent::Created).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            let mut paths = paths.into_iter();
            match (paths.next(), paths.next()) {
                (Some(from), Some(to)) => vec![ChangeEvent::Renamed { from, to: Some(to) }],
                _ => Vec::new(),
            }
        }
        EventKind::Modify(ModifyKind::Name(_)) | EventKind::Any | EventKind::Other => {
            paths.into_iter().map(by_existence).collect()
        }
        EventKind::Modify(_) => paths.into_iter().map(ChangeEvent::Modified).collect(),
    }
}

fn by_existence(path: PathBuf) -> ChangeEvent {
    if path.exists() {
        ChangeEvent::Modified(path)
    } else {
        ChangeEvent::Removed(path)
    }
}
