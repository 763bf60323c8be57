//! Integration tests for the change ingestion loop and live watcher

use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use threatcl_core::{ChangeEvent, DocumentStore, IngestStats, IngestionLoop, WatchHandle};
use tokio::sync::{mpsc, watch};

fn models(names: &[&str], author: &str) -> String {
    names
        .iter()
        .map(|name| format!("threatmodel \"{name}\" {{\n  author = \"{author}\"\n}}\n"))
        .collect()
}

/// Poll until `check` holds or the deadline passes
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}

#[tokio::test]
async fn test_removal_scenario_through_loop() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.hcl");
    let b = dir.path().join("b.hcl");
    fs::write(&a, models(&["Alpha"], "x")).unwrap();
    fs::write(&b, models(&["Beta"], "y")).unwrap();

    let store = Arc::new(DocumentStore::open(dir.path()));
    store.load_all().unwrap();
    assert_eq!(store.count(), 2);

    let (tx, rx) = mpsc::unbounded_channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    fs::remove_file(&a).unwrap();
    tx.send(ChangeEvent::Removed(a.clone())).unwrap();
    drop(tx);

    let stats = IngestionLoop::new(Arc::clone(&store))
        .run(rx, shutdown_rx)
        .await;

    assert_eq!(
        stats,
        IngestStats {
            applied: 1,
            ignored: 0,
            failed: 0
        }
    );
    assert!(store.get("Alpha").is_err());
    assert!(store.get("Beta").is_ok());
    assert_eq!(store.count(), 1);
}

#[tokio::test]
async fn test_events_apply_in_arrival_order() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.hcl");
    fs::write(&a, models(&["Alpha"], "x")).unwrap();

    let store = Arc::new(DocumentStore::open(dir.path()));
    store.load_all().unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    // Remove then recreate: the final state must reflect the create
    tx.send(ChangeEvent::Removed(a.clone())).unwrap();
    fs::write(&a, models(&["Alpha"], "z")).unwrap();
    tx.send(ChangeEvent::Created(a.clone())).unwrap();
    drop(tx);

    let stats = IngestionLoop::new(Arc::clone(&store))
        .run(rx, shutdown_rx)
        .await;
    assert_eq!(stats.applied, 2);
    assert_eq!(store.get("Alpha").unwrap().author, "z");
}

#[tokio::test]
async fn test_conflicting_create_is_logged_not_fatal() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.hcl"), models(&["Alpha"], "x")).unwrap();

    let store = Arc::new(DocumentStore::open(dir.path()));
    store.load_all().unwrap();

    let dup = dir.path().join("dup.hcl");
    fs::write(&dup, models(&["Alpha"], "intruder")).unwrap();
    let ok = dir.path().join("ok.hcl");
    fs::write(&ok, models(&["Omega"], "y")).unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    tx.send(ChangeEvent::Created(dup)).unwrap();
    tx.send(ChangeEvent::Created(ok)).unwrap();
    drop(tx);

    let stats = IngestionLoop::new(Arc::clone(&store))
        .run(rx, shutdown_rx)
        .await;
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.applied, 1);
    assert_eq!(store.get("Alpha").unwrap().author, "x");
    assert!(store.get("Omega").is_ok());
    assert!(store.is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watcher_keeps_store_live() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.hcl"), models(&["Alpha"], "x")).unwrap();
    fs::write(dir.path().join("b.hcl"), models(&["Beta"], "y")).unwrap();

    let store = Arc::new(DocumentStore::open(dir.path()));
    store.load_all().unwrap();
    let handle = WatchHandle::spawn(Arc::clone(&store)).unwrap();

    // Give the backend a moment to register its watches
    tokio::time::sleep(Duration::from_millis(200)).await;

    fs::write(dir.path().join("c.hcl"), models(&["Gamma"], "z")).unwrap();
    assert!(eventually(|| store.get("Gamma").is_ok()).await);

    fs::write(dir.path().join("a.hcl"), models(&["Alpha"], "updated")).unwrap();
    assert!(
        eventually(|| store
            .get("Alpha")
            .map(|d| d.author == "updated")
            .unwrap_or(false))
        .await
    );

    fs::remove_file(dir.path().join("b.hcl")).unwrap();
    assert!(eventually(|| store.get("Beta").is_err()).await);

    let stats = handle.stop().await;
    assert!(stats.applied >= 3);
    assert!(store.is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_changes_during_initial_load_are_replayed() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.hcl"), models(&["Alpha"], "x")).unwrap();
    fs::write(dir.path().join("b.hcl"), models(&["Beta"], "y")).unwrap();

    let store = Arc::new(DocumentStore::open(dir.path()));
    let pending = WatchHandle::attach(Arc::clone(&store)).unwrap();
    store.load_all().unwrap();

    // Nothing consumes events yet: these land between the load and the loop
    fs::write(dir.path().join("late.hcl"), models(&["Late"], "z")).unwrap();
    fs::write(dir.path().join("a.hcl"), models(&["Alpha"], "edited")).unwrap();
    fs::remove_file(dir.path().join("b.hcl")).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(store.get("Late").is_err());
    assert!(store.get("Beta").is_ok());

    let handle = pending.start();
    assert!(eventually(|| store.get("Late").is_ok()).await);
    assert!(
        eventually(|| store
            .get("Alpha")
            .map(|d| d.author == "edited")
            .unwrap_or(false))
        .await
    );
    assert!(eventually(|| store.get("Beta").is_err()).await);

    handle.stop().await;
    assert!(store.is_consistent());
}
