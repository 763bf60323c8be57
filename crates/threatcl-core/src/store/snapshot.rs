//! Read-locked view of the store

use super::StoreIndex;
use crate::model::ThreatModel;
use parking_lot::RwLockReadGuard;
use std::path::PathBuf;
use std::sync::Arc;

/// A consistent view of the store.
///
/// Holds the shared lock until dropped, so every read made through one
/// snapshot sees the same version of both maps. Writers wait for it.
pub struct Snapshot<'a> {
    guard: RwLockReadGuard<'a, StoreIndex>,
}

impl<'a> Snapshot<'a> {
    pub(super) fn new(guard: RwLockReadGuard<'a, StoreIndex>) -> Self {
        Self { guard }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ThreatModel>> {
        self.guard.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.guard.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.by_name.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.guard.by_file.len()
    }

    /// Documents in name order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ThreatModel>> {
        self.guard.by_name.values()
    }

    /// Contributing files in path order
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.guard.by_file.keys().cloned().collect();
        files.sort();
        files
    }
}
