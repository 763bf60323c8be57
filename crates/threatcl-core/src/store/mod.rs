//! In-memory document store
//!
//! Holds every parsed threat model keyed by its canonical name, plus a
//! secondary index of which names each source file contributed. Both maps
//! live behind one readers-writer lock so the cross-map invariant is always
//! observed as a unit:
//!
//! - every name in `by_file[f]` maps to a model whose `source_file == f`
//! - every model appears in exactly one `by_file` bucket
//!
//! Writers parse files before taking the lock and only hold it for the map
//! swap, so readers are blocked for the shortest possible time.

mod snapshot;

pub use snapshot::Snapshot;

use crate::error::{Result, ThreatclError};
use crate::index::{scan_files, ScanOptions};
use crate::model::ThreatModel;
use crate::parser::{DocumentParser, ThreatModelParser};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a successful bulk load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub files: usize,
    pub documents: usize,
}

/// Names affected by a single-file reload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReloadOutcome {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

impl ReloadOutcome {
    fn diff(previous: &BTreeSet<String>, current: &[Arc<ThreatModel>]) -> Self {
        let current_names: BTreeSet<&str> = current.iter().map(|d| d.name.as_str()).collect();
        let mut outcome = Self::default();
        for name in &current_names {
            if previous.contains(*name) {
                outcome.updated.push(name.to_string());
            } else {
                outcome.added.push(name.to_string());
            }
        }
        outcome.removed = previous
            .iter()
            .filter(|name| !current_names.contains(name.as_str()))
            .cloned()
            .collect();
        outcome
    }
}

/// The two coupled maps guarded as one unit
#[derive(Debug, Default)]
pub(crate) struct StoreIndex {
    pub(crate) by_name: BTreeMap<String, Arc<ThreatModel>>,
    pub(crate) by_file: HashMap<PathBuf, BTreeSet<String>>,
}

impl StoreIndex {
    /// Reject documents whose names are owned by another file, or repeated
    fn check_conflicts(&self, path: &Path, docs: &[Arc<ThreatModel>]) -> Result<()> {
        let mut seen = BTreeSet::new();
        for doc in docs {
            if !seen.insert(doc.name.as_str()) {
                return Err(ThreatclError::parse(
                    path,
                    format!("threatmodel {:?} is defined more than once", doc.name),
                ));
            }
            if let Some(existing) = self.by_name.get(&doc.name) {
                if existing.source_file != path {
                    return Err(ThreatclError::NameConflict {
                        name: doc.name.clone(),
                        existing: existing.source_file.clone(),
                        incoming: path.to_path_buf(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Drop everything `path` contributed, returning the names removed
    fn remove_file(&mut self, path: &Path) -> BTreeSet<String> {
        let names = self.by_file.remove(path).unwrap_or_default();
        for name in &names {
            self.by_name.remove(name);
        }
        names
    }

    fn insert_file(&mut self, path: PathBuf, docs: Vec<Arc<ThreatModel>>) {
        if docs.is_empty() {
            return;
        }
        let names = docs.iter().map(|d| d.name.clone()).collect();
        for doc in docs {
            self.by_name.insert(doc.name.clone(), doc);
        }
        self.by_file.insert(path, names);
    }

    /// Check the bidirectional name/file invariant
    pub(crate) fn is_consistent(&self) -> bool {
        let bucketed: usize = self.by_file.values().map(|names| names.len()).sum();
        if bucketed != self.by_name.len() {
            return false;
        }
        self.by_file.iter().all(|(file, names)| {
            !names.is_empty()
                && names.iter().all(|name| {
                    self.by_name
                        .get(name)
                        .is_some_and(|doc| doc.source_file == *file)
                })
        })
    }
}

/// Live, lock-protected index of threat models under one root directory
pub struct DocumentStore {
    root: PathBuf,
    parser: Arc<dyn DocumentParser>,
    scan: ScanOptions,
    index: RwLock<StoreIndex>,
}

impl DocumentStore {
    /// Create an empty store bound to `root` using the default parser
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::new(root, Arc::new(ThreatModelParser::new()))
    }

    /// Create an empty store bound to `root` with a custom parser
    pub fn new(root: impl Into<PathBuf>, parser: Arc<dyn DocumentParser>) -> Self {
        let root = root.into();
        let root = std::fs::canonicalize(&root).unwrap_or(root);
        let scan = ScanOptions::with_extensions(parser.extensions());
        Self {
            root,
            parser,
            scan,
            index: RwLock::new(StoreIndex::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Replace the whole index with a fresh parse of the root directory.
    ///
    /// All-or-nothing: any parse failure or name conflict leaves the prior
    /// state untouched.
    pub fn load_all(&self) -> Result<LoadSummary> {
        if !self.root.is_dir() {
            return Err(ThreatclError::InvalidRoot(self.root.clone()));
        }

        let files = scan_files(&self.root, &self.scan)?;
        let mut fresh = StoreIndex::default();
        for file in &files {
            let path = self.resolve(&file.path);
            let docs = self.parse(&path)?;
            fresh.check_conflicts(&path, &docs)?;
            fresh.insert_file(path, docs);
        }

        let summary = LoadSummary {
            files: files.len(),
            documents: fresh.by_name.len(),
        };
        *self.index.write() = fresh;

        info!(
            root = %self.root.display(),
            files = summary.files,
            documents = summary.documents,
            "loaded threat models"
        );
        Ok(summary)
    }

    /// Point lookup by canonical name
    pub fn get(&self, name: &str) -> Result<Arc<ThreatModel>> {
        self.index
            .read()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| ThreatclError::DocumentNotFound(name.to_string()))
    }

    /// Number of indexed documents (not files)
    pub fn count(&self) -> usize {
        self.index.read().by_name.len()
    }

    /// Number of files currently contributing documents
    pub fn file_count(&self) -> usize {
        self.index.read().by_file.len()
    }

    /// Names contributed by one file, in name order
    pub fn names_for_file(&self, path: &Path) -> Vec<String> {
        let path = self.resolve(path);
        self.index
            .read()
            .by_file
            .get(&path)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Re-parse one file and atomically replace everything it contributed.
    ///
    /// On parse failure or a name conflict nothing changes and the previous
    /// version of the file's documents stays visible.
    pub fn reload(&self, path: &Path) -> Result<ReloadOutcome> {
        let path = self.resolve(path);
        let docs = self.parse(&path)?;

        let mut index = self.index.write();
        index.check_conflicts(&path, &docs)?;
        let previous = index.remove_file(&path);
        let outcome = ReloadOutcome::diff(&previous, &docs);
        index.insert_file(path.clone(), docs);
        drop(index);

        debug!(
            path = %path.display(),
            added = outcome.added.len(),
            updated = outcome.updated.len(),
            removed = outcome.removed.len(),
            "reloaded file"
        );
        Ok(outcome)
    }

    /// Remove every document attributed to `path`; a no-op for unknown paths
    pub fn remove_file(&self, path: &Path) -> usize {
        let path = self.resolve(path);
        let removed = self.index.write().remove_file(&path).len();
        if removed > 0 {
            debug!(path = %path.display(), removed, "removed file");
        }
        removed
    }

    /// Consistent read view held until dropped
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot::new(self.index.read())
    }

    /// Whether a path falls under the same rules the bulk loader applies
    pub fn is_recognized(&self, path: &Path) -> bool {
        let path = self.resolve(path);
        self.scan.accepts(&self.root, &path) && self.parser.recognizes(&path)
    }

    /// Resolve a possibly relative path against the root.
    ///
    /// The parent directory is canonicalized when it exists so that watcher
    /// paths, scanned paths, and caller paths agree on one key per file even
    /// after the file itself is gone.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => std::fs::canonicalize(parent)
                .map(|p| p.join(name))
                .unwrap_or(path),
            _ => path,
        }
    }

    /// Parse a file and pin every document to that file
    fn parse(&self, path: &Path) -> Result<Vec<Arc<ThreatModel>>> {
        let docs = self.parser.parse_file(path)?;
        Ok(docs
            .into_iter()
            .map(|mut doc| {
                doc.source_file = path.to_path_buf();
                Arc::new(doc)
            })
            .collect())
    }

    /// Verify the name/file invariant against the current state
    pub fn is_consistent(&self) -> bool {
        self.index.read().is_consistent()
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("root", &self.root)
            .field("documents", &self.count())
            .finish()
    }
}
