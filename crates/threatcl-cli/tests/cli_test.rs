//! End-to-end tests for the threatcl binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const PAYMENTS: &str = r#"
threatmodel "Payments" {
  author = "alice"
  status = "draft"

  threat "card skimming" {
    description = "attacker reads card data"
    stride      = ["Info Disclosure"]

    control "tokenization" {
      implemented = true
    }
  }
}
"#;

const LEDGER: &str = r#"{"threatmodel": [{"name": "Ledger", "author": "bob"}]}"#;

fn corpus() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("payments.hcl"), PAYMENTS).unwrap();
    fs::write(dir.path().join("ledger.json"), LEDGER).unwrap();
    dir
}

fn threatcl(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("threatcl").unwrap();
    cmd.env("THREATCL_CONFIG", dir.path().join("no-config.yml"))
        .arg("--dir")
        .arg(dir.path());
    cmd
}

#[test]
fn test_query_success() {
    let dir = corpus();
    threatcl(&dir)
        .args(["query", "{ threatModels { name author } }"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Ledger\""))
        .stdout(predicate::str::contains("\"Payments\""))
        .stdout(predicate::str::contains("errors").not());
}

#[test]
fn test_query_with_variables_and_compact_output() {
    let dir = corpus();
    threatcl(&dir)
        .args([
            "query",
            "query One($n: String!) { threatModel(name: $n) { author } }",
            "--vars",
            r#"{"n": "Payments"}"#,
            "--output",
            "compact",
        ])
        .assert()
        .success()
        .stdout("{\"data\":{\"threatModel\":{\"author\":\"alice\"}}}\n");
}

#[test]
fn test_query_yaml_output() {
    let dir = corpus();
    threatcl(&dir)
        .args(["query", "{ stats { totalFiles } }", "-o", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("totalFiles: 2"));
}

#[test]
fn test_query_reads_file_and_stdin() {
    let dir = corpus();
    let query_file = dir.path().join("q.graphql");
    fs::write(&query_file, "{ stats { totalThreatModels } }").unwrap();

    threatcl(&dir)
        .args(["query", "--file"])
        .arg(&query_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"totalThreatModels\": 2"));

    threatcl(&dir)
        .arg("query")
        .write_stdin("{ stats { totalFiles } }")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"totalFiles\": 2"));
}

#[test]
fn test_query_errors_exit_one_with_envelope() {
    let dir = corpus();
    threatcl(&dir)
        .args(["query", "{ threatModel(name: \"Nope\") { name } }"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"errors\""))
        .stdout(predicate::str::contains("not found"));

    threatcl(&dir)
        .args(["query", "{ threatModels { nope } }"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"data\"").not());
}

#[test]
fn test_query_usage_errors() {
    let dir = corpus();
    let query_file = dir.path().join("q.graphql");
    fs::write(&query_file, "{ stats { totalFiles } }").unwrap();

    threatcl(&dir)
        .args(["query", "{ stats { totalFiles } }", "--file"])
        .arg(&query_file)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not both"));

    threatcl(&dir)
        .args(["query", "{ stats { totalFiles } }", "--vars", "[1, 2]"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("JSON object"));

    threatcl(&dir)
        .args(["query", "   "])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("query is empty"));
}

#[test]
fn test_bad_root_is_fatal() {
    let dir = TempDir::new().unwrap();
    Command::cargo_bin("threatcl")
        .unwrap()
        .env("THREATCL_CONFIG", dir.path().join("no-config.yml"))
        .arg("--dir")
        .arg(dir.path().join("missing"))
        .args(["query", "{ stats { totalFiles } }"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::starts_with("Error:"));
}

#[test]
fn test_broken_file_fails_initial_load() {
    let dir = corpus();
    fs::write(dir.path().join("broken.hcl"), "threatmodel \"X\" {").unwrap();
    threatcl(&dir)
        .args(["query", "{ stats { totalFiles } }"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("broken.hcl"));
}

#[test]
fn test_list_table_and_json() {
    let dir = corpus();
    threatcl(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("NAME"))
        .stdout(predicate::str::contains("payments.hcl"));

    let output = threatcl(&dir)
        .args(["ls", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let models: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(models[0]["name"], "Ledger");
    assert_eq!(models[1]["name"], "Payments");
    assert_eq!(models[1]["threats"], 1);
    assert_eq!(models[1]["controls"], 1);
}

#[test]
fn test_view() {
    let dir = corpus();
    threatcl(&dir)
        .args(["view", "Payments"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Author:      alice"))
        .stdout(predicate::str::contains("[x] tokenization"));

    threatcl(&dir)
        .args(["view", "Nope"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Nope"));
}

#[test]
fn test_validate_reports_failures() {
    let dir = corpus();
    threatcl(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("OK     payments.hcl (1 models)"));

    fs::write(dir.path().join("broken.hcl"), "threatmodel \"X\" {").unwrap();
    fs::write(
        dir.path().join("dupe.json"),
        r#"{"threatmodel": [{"name": "Payments", "author": "eve"}]}"#,
    )
    .unwrap();
    threatcl(&dir)
        .arg("validate")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("ERROR  broken.hcl"))
        .stdout(predicate::str::contains("CONFLICT  \"Payments\""));
}

#[test]
fn test_stats() {
    let dir = corpus();
    let output = threatcl(&dir)
        .args(["stats", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["totalThreatModels"], 2);
    assert_eq!(stats["implementedControls"], 1);
    assert_eq!(stats["byAuthor"]["alice"], 1);

    threatcl(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Threat models:   2"));
}

#[test]
fn test_validate_shows_paths_relative_to_root() {
    let dir = corpus();
    fs::create_dir(dir.path().join("team")).unwrap();
    fs::write(
        dir.path().join("team").join("infra.json"),
        r#"{"threatmodel": [{"name": "Infra", "author": "carol"}]}"#,
    )
    .unwrap();

    let output = threatcl(&dir)
        .args(["validate", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let files: Vec<&str> = report["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["file"].as_str().unwrap())
        .collect();
    assert_eq!(files, ["ledger.json", "payments.hcl", "team/infra.json"]);
    assert_eq!(report["valid"], true);
}

#[cfg(unix)]
#[test]
fn test_serve_stops_on_sigterm() {
    use std::io::{BufRead, BufReader};
    use std::process::{Command as StdCommand, Stdio};
    use std::time::{Duration, Instant};

    let dir = corpus();
    let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin("threatcl"))
        .env("THREATCL_CONFIG", dir.path().join("no-config.yml"))
        .arg("--dir")
        .arg(dir.path())
        .args(["serve", "--addr", "127.0.0.1:0"])
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // Keep the pipe open until the child exits
    let mut stderr = BufReader::new(child.stderr.take().unwrap()).lines();
    let banner = stderr
        .by_ref()
        .map(|line| line.unwrap())
        .find(|line| line.starts_with("Serving"))
        .unwrap();
    assert!(banner.contains("Serving 2 threat models"));

    let status = StdCommand::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break exit;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("serve did not exit after SIGTERM");
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    assert!(exit.success());
    drop(stderr);
}
