use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cadv_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cadv");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let docs_dir = root.join("docs");
    fs::create_dir_all(docs_dir.join("daily")).unwrap();
    fs::write(
        docs_dir.join("daily").join("site-log.txt"),
        "Day 41: concrete pour postponed, rebar inspection failed.\nDay 42: crane unavailable.",
    )
    .unwrap();
    fs::write(docs_dir.join("rates.csv"), "item,rate\nrebar,1200").unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/claims.sqlite"

[chunking]
max_tokens = 300
overlap_tokens = 60

[retrieval]
top_k = 3

[secrets]
openai_api_key = "sk-test-not-used"
"#,
        root.display()
    );

    let config_path = config_dir.join("cadv.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_cadv(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_cadv_with_log(config_path, args, None)
}

fn run_cadv_with_log(
    config_path: &Path,
    args: &[&str],
    rust_log: Option<&str>,
) -> (String, String, bool) {
    let binary = cadv_binary();
    let mut command = Command::new(&binary);
    command
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG");
    if let Some(filter) = rust_log {
        command.env("RUST_LOG", filter);
    }
    let output = command
        .output()
        .unwrap_or_else(|e| panic!("Failed to run cadv binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cadv(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully."));
    assert!(tmp.path().join("data").join("claims.sqlite").exists());
}

#[test]
fn test_init_is_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_cadv(&config_path, &["init"]);
    assert!(success, "first init failed: {}", stderr);
    let (_, stderr, success) = run_cadv(&config_path, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_extract_prints_text() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("docs").join("daily").join("site-log.txt");

    let (stdout, stderr, success) = run_cadv(&config_path, &["extract", file.to_str().unwrap()]);
    assert!(success, "extract failed: {}", stderr);
    assert!(stdout.contains("concrete pour postponed"));
    assert!(stdout.contains("Day 42: crane unavailable."));
}

#[test]
fn test_extract_unsupported_is_inline_marker() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("docs").join("rates.csv");

    let (stdout, stderr, success) = run_cadv(&config_path, &["extract", file.to_str().unwrap()]);
    assert!(success, "extract should not fail: {}", stderr);
    assert_eq!(stdout.trim(), "[unsupported file type: .csv]");
}

#[test]
fn test_search_without_collection_returns_no_results() {
    let (_tmp, config_path) = setup_test_env();

    run_cadv(&config_path, &["init"]);
    let (stdout, stderr, success) = run_cadv(&config_path, &["search", "delay notice"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_empty_query_returns_no_results() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_cadv(&config_path, &["search", "   "]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_analyze_without_documents_fails() {
    let (tmp, config_path) = setup_test_env();
    let empty = tmp.path().join("empty");
    fs::create_dir_all(&empty).unwrap();

    let (_, stderr, success) =
        run_cadv(&config_path, &["analyze", "--input", empty.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("No documents found"), "stderr: {}", stderr);
}

#[test]
fn test_analyze_rejects_bad_file_argument() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_cadv(&config_path, &["analyze", "--file", "invoice=a.pdf"]);
    assert!(!success);
    assert!(stderr.contains("Unknown category"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_config_is_rejected() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config").join("bad.toml");
    fs::write(&bad, "[chunking]\nmax_tokens = 10\noverlap_tokens = 10\n").unwrap();

    let (_, stderr, success) = run_cadv(&bad, &["init"]);
    assert!(!success);
    assert!(stderr.contains("overlap_tokens"), "stderr: {}", stderr);
}

#[test]
fn test_rust_log_enables_debug_output() {
    let (tmp, _) = setup_test_env();
    let missing = tmp.path().join("config").join("missing.toml");

    let (_, stderr, success) = run_cadv_with_log(&missing, &["search", " "], None);
    assert!(success, "search failed: {}", stderr);
    assert!(!stderr.contains("config file not found"), "stderr: {}", stderr);

    let (_, stderr, success) =
        run_cadv_with_log(&missing, &["search", " "], Some("claim_advisor=debug"));
    assert!(success, "search failed: {}", stderr);
    assert!(stderr.contains("config file not found"), "stderr: {}", stderr);
}
