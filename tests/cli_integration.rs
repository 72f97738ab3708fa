mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn corpus() -> TempDir {
    let dir = TempDir::new().unwrap();
    common::write_snapshot_dir(&dir.path().join("data"));
    dir
}

fn versekeep(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("versekeep").unwrap();
    cmd.current_dir(dir)
        .env_remove("SUPABASE_URL")
        .env_remove("SUPABASE_API_KEY")
        .arg("--local-only")
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

#[test]
fn test_query_text_output() {
    let dir = corpus();
    versekeep(dir.path())
        .args(["query", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 3 verses with '1'"))
        .stdout(predicate::str::contains("[1:1] In the name of GOD"));
}

#[test]
fn test_corrupt_snapshot_does_not_fail_queries() {
    let dir = corpus();
    fs::write(dir.path().join("data/ws-quran-word-by-word.json"), "{not json").unwrap();
    versekeep(dir.path())
        .args(["query", "1:1-4294967295", "-p", "include_word_by_word=true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 3 verses with '1:1-4294967295'"));
}

#[test]
fn test_query_json_output() {
    let dir = corpus();
    let output = versekeep(dir.path())
        .args(["query", "messenger", "-p", "search_strategy=exact", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["request"]["type"], "search");
    assert_eq!(value["request"]["parsed_options"]["search_strategy"], "exact");
    assert_eq!(value["response"]["data"].as_array().unwrap().len(), 2);
}

#[test]
fn test_short_search_is_a_user_error() {
    let dir = corpus();
    versekeep(dir.path())
        .args(["query", "ab"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("at least 3 characters"));
}

#[test]
fn test_parse_prints_request() {
    let dir = corpus();
    versekeep(dir.path())
        .args(["parse", "9:1-5", "-p", "sort_results=true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"verse_range\""))
        .stdout(predicate::str::contains("\"standard_url\": \"/?chapter=9&verse=1&verse_end=5\""))
        .stdout(predicate::str::contains("\"sort_results\": true"));
}

#[test]
fn test_export() {
    let dir = corpus();
    let output = versekeep(dir.path())
        .args(["export", "quran", "--preview"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.len(), 9);
    assert_eq!(rows[0]["verse_id"], "1:1");

    let out = dir.path().join("chapters.json");
    versekeep(dir.path())
        .args(["export", "quran-chapters", "--out"])
        .arg(&out)
        .assert()
        .success();
    let rows: Vec<serde_json::Value> = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(rows.len(), 4);

    versekeep(dir.path())
        .args(["export", "hadith"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown data type: \"hadith\""));
}

#[test]
fn test_today_uses_configured_daily_dir() {
    let dir = corpus();
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        format!(
            "[data]\nsnapshot_dir = {:?}\ndaily_dir = {:?}\n",
            dir.path().join("data"),
            dir.path().join("daily"),
        ),
    )
    .unwrap();

    versekeep(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("today")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 verse with"));
    assert!(dir.path().join("daily/ws-verse-of-the-day.json").exists());
}

#[test]
fn test_shell_session() {
    let dir = corpus();
    versekeep(dir.path())
        .arg("shell")
        .write_stdin("24:35\nlight?search_apply_highlight=true\nab\n:metrics\n:quit\n9\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[24:35] GOD is the light"))
        .stdout(predicate::str::contains("at least 3 characters"))
        .stdout(predicate::str::contains("queries_served 2"))
        .stdout(predicate::str::contains("Ultimatum").not());
}

#[test]
fn test_completions() {
    Command::cargo_bin("versekeep")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("versekeep"));
}
