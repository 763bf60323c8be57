//! Integration tests for the query engine over a loaded store

use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use threatcl_core::{DocumentStore, QueryEngine, QueryRequest};

fn engine_with(files: &[(&str, &str)]) -> (TempDir, QueryEngine) {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    let store = Arc::new(DocumentStore::open(dir.path()));
    store.load_all().unwrap();
    (dir, QueryEngine::new(store))
}

#[test]
fn test_per_author_stats() {
    let (_dir, engine) = engine_with(&[
        (
            "one.hcl",
            "threatmodel \"A\" {\n  author = \"x\"\n}\nthreatmodel \"B\" {\n  author = \"x\"\n}\n",
        ),
        (
            "two.json",
            r#"{"threatmodel": [{"name": "C", "author": "y"}]}"#,
        ),
    ]);

    let response = engine.execute(&QueryRequest::new(
        "{ stats { totalThreatModels totalFiles byAuthor { author count } } }",
    ));
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.data.unwrap(),
        json!({
            "stats": {
                "totalThreatModels": 3,
                "totalFiles": 2,
                "byAuthor": [
                    {"author": "x", "count": 2},
                    {"author": "y", "count": 1}
                ]
            }
        })
    );
}

#[test]
fn test_non_matching_filter_versus_malformed_filter() {
    let (_dir, engine) = engine_with(&[(
        "m.hcl",
        "threatmodel \"A\" {\n  author = \"x\"\n}\n",
    )]);

    let empty = engine.execute(&QueryRequest::new(
        "{ threatModels(author: \"nobody\") { name } }",
    ));
    assert!(empty.is_ok());
    assert_eq!(empty.data.unwrap(), json!({"threatModels": []}));

    let malformed = engine.execute(&QueryRequest::new(
        "{ threatModels(limit: \"ten\") { name } }",
    ));
    assert!(!malformed.is_ok());
    assert_eq!(malformed.data.unwrap()["threatModels"], Value::Null);
    assert!(malformed.errors[0].message.contains("limit"));
}

#[test]
fn test_results_ordered_by_name_then_paged() {
    let files: Vec<(String, String)> = ["delta", "alpha", "charlie", "bravo"]
        .iter()
        .map(|n| {
            (
                format!("{n}.hcl"),
                format!("threatmodel \"{n}\" {{\n  author = \"x\"\n}}\n"),
            )
        })
        .collect();
    let refs: Vec<(&str, &str)> = files
        .iter()
        .map(|(f, c)| (f.as_str(), c.as_str()))
        .collect();
    let (_dir, engine) = engine_with(&refs);

    let response = engine.execute(&QueryRequest::new(
        "{ threatModels(offset: 1, limit: 2) { name } }",
    ));
    assert_eq!(
        response.data.unwrap(),
        json!({"threatModels": [{"name": "bravo"}, {"name": "charlie"}]})
    );
}

#[test]
fn test_queries_see_reloads() {
    let (dir, engine) = engine_with(&[("m.hcl", "threatmodel \"A\" {\n  author = \"x\"\n}\n")]);
    let count = |engine: &QueryEngine| {
        engine
            .execute(&QueryRequest::new("{ stats { totalThreatModels } }"))
            .data
            .unwrap()["stats"]["totalThreatModels"]
            .clone()
    };
    assert_eq!(count(&engine), json!(1));

    let extra = dir.path().join("n.hcl");
    fs::write(&extra, "threatmodel \"B\" {\n  author = \"y\"\n}\n").unwrap();
    engine.store().reload(&extra).unwrap();
    assert_eq!(count(&engine), json!(2));

    engine.store().remove_file(&extra);
    assert_eq!(count(&engine), json!(1));
}

#[test]
fn test_hostile_queries_come_back_as_errors() {
    let (_dir, engine) = engine_with(&[("m.hcl", "threatmodel \"A\" {\n  author = \"x\"\n}\n")]);
    let rejected = |query: String| {
        let response = engine.execute(&QueryRequest::new(query));
        assert!(!response.is_ok());
        assert!(response.data.is_none());
        response.errors[0].message.clone()
    };

    let deep_list = format!(
        "{{ threatModels(search: {}\"x\"{}) {{ name }} }}",
        "[".repeat(200_000),
        "]".repeat(200_000)
    );
    assert!(rejected(deep_list).contains("nested too deeply"));

    let deep_object = format!(
        "{{ threatModels(search: {}1{}) {{ name }} }}",
        "{a: ".repeat(50_000),
        "}".repeat(50_000)
    );
    assert!(rejected(deep_object).contains("nested too deeply"));

    let deep_selection = format!("{}{}", "{ a ".repeat(50_000), "}".repeat(50_000));
    assert!(rejected(deep_selection).contains("nested too deeply"));

    let unterminated = format!(
        "{{ threatModels(search: \"\"\"{}) {{ name }} }}",
        "x".repeat(1 << 20)
    );
    assert!(rejected(unterminated).contains("Unterminated string"));

    let oversized_int = format!(
        "{{ threatModels(limit: {}) {{ name }} }}",
        "9".repeat(10_000)
    );
    assert!(rejected(oversized_int).contains("Invalid number"));

    // A long but well-formed literal is an ordinary, non-matching filter
    let response = engine.execute(&QueryRequest::new(format!(
        "{{ threatModels(search: \"{}\") {{ name }} }}",
        "y".repeat(1 << 20)
    )));
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(response.data.unwrap(), json!({"threatModels": []}));
}
