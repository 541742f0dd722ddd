//! CLI Integration Tests
//!
//! These tests verify that the CLI commands work correctly end-to-end.
//! They test the actual binary behavior, not just the library.
//!
//! Run with:
//! ```bash
//! cargo test --test cli_integration
//! ```

use image::{Rgb, RgbImage};
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Run corpus command and return (stdout, stderr, success)
fn run_corpus(args: &[&str], root: &Path) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_corpus"))
        .args(["-r", root.to_str().unwrap(), "-f", "json"])
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute corpus");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn parse(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout.trim()).expect("stdout should be JSON")
}

fn write_document(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path.to_str().unwrap().to_string()
}

// ============================================================================
// Document Commands
// ============================================================================

#[test]
fn test_cli_show_document() {
    let dir = tempdir().unwrap();
    let doc = write_document(
        dir.path(),
        "photo_0.json",
        r#"{"ingredients": "a, b ,c", "confidence": "0.87", "alterations": {"crop": {"notes": "n"}}}"#,
    );

    let (stdout, _stderr, success) = run_corpus(&["show", &doc], dir.path());
    assert!(success, "show should succeed");

    let value = parse(&stdout);
    assert_eq!(value["file_name"], "photo_0");
    assert_eq!(value["ingredients"], serde_json::json!(["a", "b", "c"]));
    assert_eq!(value["confidence"], 0.87);
    assert!(value["tags"].is_null());
    assert_eq!(value["alterations"][0]["name"], "crop");
    assert_eq!(value["alterations"][0]["notes"], "n");
    assert!(value["alterations"][0]["confidence"].is_null());
}

#[test]
fn test_cli_set_confidence_writes_back() {
    let dir = tempdir().unwrap();
    let doc = write_document(dir.path(), "t.json", r#"{"alterations": {"crop": {}}}"#);

    let (_, _, success) = run_corpus(&["set-confidence", &doc, "0.5"], dir.path());
    assert!(success);
    let (_, _, success) = run_corpus(&["set-confidence", &doc, "0.25", "-a", "crop"], dir.path());
    assert!(success);

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&doc).unwrap()).unwrap();
    assert_eq!(stored["confidence"], "0.5");
    assert_eq!(stored["alterations"]["crop"]["confidence"], "0.25");
}

#[test]
fn test_cli_set_text_unknown_alteration_fails() {
    let dir = tempdir().unwrap();
    let body = r#"{"alterations": {"crop": {}}}"#;
    let doc = write_document(dir.path(), "t.json", body);

    let (_, stderr, success) = run_corpus(&["set-text", &doc, "TEXT", "-a", "gray"], dir.path());
    assert!(!success, "unknown alteration should fail");
    assert!(stderr.contains("gray"));
    assert_eq!(std::fs::read_to_string(&doc).unwrap(), body);
}

#[test]
fn test_cli_list_corpus() {
    let dir = tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    std::fs::create_dir_all(&corpus).unwrap();
    write_document(&corpus, "b.json", r#"{"confidence": "0.1"}"#);
    write_document(&corpus, "a.json", r#"{"alterations": {"crop": {}}}"#);

    let (stdout, _, success) = run_corpus(&["list", corpus.to_str().unwrap()], dir.path());
    assert!(success);

    let value = parse(&stdout);
    assert_eq!(value["count"], 2);
    assert_eq!(value["tests"][0]["file_name"], "a");
    assert_eq!(value["tests"][0]["alterations"], serde_json::json!(["crop"]));
    assert_eq!(value["tests"][1]["confidence"], 0.1);
}

// ============================================================================
// Image Commands
// ============================================================================

#[test]
fn test_cli_image_round_trip() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("storage");
    let source = dir.path().join("source.png");
    let expected = RgbImage::from_pixel(6, 2, Rgb([12, 34, 56]));
    expected.save(&source).unwrap();

    let (stdout, _, success) = run_corpus(&["exists", "tests", "photo.png"], &root);
    assert!(success);
    assert_eq!(parse(&stdout)["exists"], false);

    let (stdout, _, success) = run_corpus(
        &["save-image", "tests", "photo.png", source.to_str().unwrap()],
        &root,
    );
    assert!(success, "save-image should succeed");
    assert_eq!(parse(&stdout)["status"], "ok");

    let (stdout, _, success) = run_corpus(&["exists", "tests", "photo.png"], &root);
    assert!(success);
    assert_eq!(parse(&stdout)["exists"], true);

    let out = dir.path().join("out.png");
    let (stdout, _, success) = run_corpus(
        &["load-image", "tests", "photo.png", out.to_str().unwrap()],
        &root,
    );
    assert!(success, "load-image should succeed");
    assert_eq!(parse(&stdout)["width"], 6);
    assert_eq!(image::open(&out).unwrap().to_rgb8(), expected);
}

#[test]
fn test_cli_load_missing_image_fails() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out.png");

    let (_, stderr, success) = run_corpus(
        &["load-image", "tests", "missing.png", out.to_str().unwrap()],
        dir.path(),
    );
    assert!(!success);
    assert!(stderr.contains("No stored image"));
    assert!(!out.exists());
}
