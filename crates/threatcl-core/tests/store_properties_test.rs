//! Integration tests for document store consistency guarantees

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use threatcl_core::{DocumentStore, ThreatclError};

fn models(names: &[&str], author: &str) -> String {
    names
        .iter()
        .map(|name| format!("threatmodel \"{name}\" {{\n  author = \"{author}\"\n}}\n"))
        .collect()
}

fn write(dir: &Path, file: &str, content: &str) {
    let path = dir.join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn visible_names(store: &DocumentStore) -> BTreeSet<String> {
    store.snapshot().iter().map(|m| m.name.clone()).collect()
}

#[test]
fn test_load_completeness() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.hcl", &models(&["A1", "A2"], "x"));
    write(dir.path(), "nested/deeper/b.hcl", &models(&["B"], "y"));
    write(
        dir.path(),
        "c.json",
        r#"{"threatmodel": [{"name": "C", "author": "z"}]}"#,
    );
    write(dir.path(), "README.md", "# not a model");
    write(dir.path(), ".hidden/d.hcl", &models(&["Hidden"], "x"));

    let store = DocumentStore::open(dir.path());
    let summary = store.load_all().unwrap();

    assert_eq!(summary.files, 3);
    assert_eq!(summary.documents, 4);
    for name in ["A1", "A2", "B", "C"] {
        let doc = store.get(name).unwrap();
        assert!(doc.source_file.starts_with(store.root()));
    }
    assert!(store.get("Hidden").is_err());
    assert!(store.is_consistent());
}

#[test]
fn test_reload_atomicity_under_concurrent_readers() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("f.hcl");
    fs::write(&file, models(&["A", "B"], "x")).unwrap();

    let store = Arc::new(DocumentStore::open(dir.path()));
    store.load_all().unwrap();

    let before: BTreeSet<String> = ["A", "B"].iter().map(|s| s.to_string()).collect();
    let after: BTreeSet<String> = ["A", "C"].iter().map(|s| s.to_string()).collect();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            let (before, after) = (before.clone(), after.clone());
            thread::spawn(move || {
                let mut observed = 0usize;
                while !done.load(Ordering::Acquire) {
                    let snapshot = store.snapshot();
                    let names: BTreeSet<String> =
                        snapshot.iter().map(|m| m.name.clone()).collect();
                    assert!(
                        names == before || names == after,
                        "torn read: {names:?}"
                    );
                    observed += 1;
                }
                observed
            })
        })
        .collect();

    for i in 0..200 {
        let names: &[&str] = if i % 2 == 0 { &["A", "C"] } else { &["A", "B"] };
        fs::write(&file, models(names, "x")).unwrap();
        store.reload(&file).unwrap();
    }
    fs::write(&file, models(&["A", "C"], "x")).unwrap();
    store.reload(&file).unwrap();
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(visible_names(&store), after);
    assert!(store.is_consistent());
}

#[test]
fn test_reload_failure_isolation() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.hcl", &models(&["Alpha"], "x"));
    write(dir.path(), "b.hcl", &models(&["Beta"], "y"));

    let store = DocumentStore::open(dir.path());
    store.load_all().unwrap();

    write(dir.path(), "a.hcl", "threatmodel \"Alpha\" {\n  author = \n");
    let err = store.reload(Path::new("a.hcl")).unwrap_err();
    assert!(matches!(err, ThreatclError::Parse { .. }));

    assert_eq!(store.get("Alpha").unwrap().author, "x");
    assert_eq!(store.get("Beta").unwrap().author, "y");
    assert_eq!(store.count(), 2);
}

#[test]
fn test_schema_violation_is_isolated_too() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.hcl", &models(&["Alpha"], "x"));
    let store = DocumentStore::open(dir.path());
    store.load_all().unwrap();

    write(
        dir.path(),
        "a.hcl",
        "threatmodel \"Alpha\" {\n  author = \"x\"\n  colour = \"red\"\n}\n",
    );
    assert!(store.reload(Path::new("a.hcl")).is_err());
    assert!(store.get("Alpha").is_ok());
}

#[test]
fn test_removal_completeness_and_idempotence() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.hcl", &models(&["A1", "A2", "A3"], "x"));
    write(dir.path(), "b.hcl", &models(&["B"], "y"));

    let store = DocumentStore::open(dir.path());
    store.load_all().unwrap();

    let a = dir.path().join("a.hcl");
    assert_eq!(store.remove_file(&a), 3);
    for name in ["A1", "A2", "A3"] {
        assert!(matches!(
            store.get(name),
            Err(ThreatclError::DocumentNotFound(_))
        ));
    }
    assert!(store.names_for_file(&a).is_empty());

    let once = visible_names(&store);
    assert_eq!(store.remove_file(&a), 0);
    assert_eq!(visible_names(&store), once);
    assert_eq!(store.count(), 1);
    assert!(store.is_consistent());
}

#[test]
fn test_concurrent_reads_see_stable_values() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.hcl", &models(&["Alpha"], "x"));
    let store = Arc::new(DocumentStore::open(dir.path()));
    store.load_all().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..500 {
                    assert_eq!(store.get("Alpha").unwrap().author, "x");
                    assert_eq!(store.count(), 1);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_get_returns_shared_immutable_handle() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.hcl", &models(&["Alpha"], "x"));
    let store = DocumentStore::open(dir.path());
    store.load_all().unwrap();

    let held = store.get("Alpha").unwrap();
    write(dir.path(), "a.hcl", &models(&["Alpha"], "changed"));
    store.reload(Path::new("a.hcl")).unwrap();

    assert_eq!(held.author, "x");
    assert_eq!(store.get("Alpha").unwrap().author, "changed");
}

#[derive(Debug, Clone)]
enum Op {
    Write { file: usize, names: Vec<usize> },
    Corrupt { file: usize },
    Remove { file: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..3usize, prop::collection::vec(0..6usize, 0..4))
            .prop_map(|(file, names)| Op::Write { file, names }),
        1 => (0..3usize).prop_map(|file| Op::Corrupt { file }),
        2 => (0..3usize).prop_map(|file| Op::Remove { file }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_index_stays_consistent(ops in prop::collection::vec(op_strategy(), 1..24)) {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path());
        store.load_all().unwrap();

        for op in ops {
            match op {
                Op::Write { file, names } => {
                    let names: BTreeSet<String> =
                        names.into_iter().map(|n| format!("M{n}")).collect();
                    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
                    let path = dir.path().join(format!("f{file}.hcl"));
                    fs::write(&path, models(&refs, "x")).unwrap();

                    let before = visible_names(&store);
                    let owned_elsewhere = names.iter().any(|n| {
                        store
                            .get(n)
                            .map(|d| d.source_file != store.resolve(&path))
                            .unwrap_or(false)
                    });
                    match store.reload(&path) {
                        Ok(_) => {
                            prop_assert!(!owned_elsewhere);
                            let mine: BTreeSet<String> =
                                store.names_for_file(&path).into_iter().collect();
                            prop_assert_eq!(mine, names);
                        }
                        Err(ThreatclError::NameConflict { .. }) => {
                            prop_assert!(owned_elsewhere);
                            prop_assert_eq!(visible_names(&store), before);
                        }
                        Err(other) => prop_assert!(false, "unexpected error {other}"),
                    }
                }
                Op::Corrupt { file } => {
                    let path = dir.path().join(format!("f{file}.hcl"));
                    fs::write(&path, "threatmodel {").unwrap();
                    let before = visible_names(&store);
                    prop_assert!(store.reload(&path).is_err());
                    prop_assert_eq!(visible_names(&store), before);
                }
                Op::Remove { file } => {
                    let path = dir.path().join(format!("f{file}.hcl"));
                    let expected = store.names_for_file(&path).len();
                    let _ = fs::remove_file(&path);
                    prop_assert_eq!(store.remove_file(&path), expected);
                    prop_assert!(store.names_for_file(&path).is_empty());
                }
            }
            prop_assert!(store.is_consistent());
        }
    }
}
