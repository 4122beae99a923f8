use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn prose_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("prose");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let guides_dir = root.join("guides");
    fs::create_dir_all(&guides_dir).unwrap();
    fs::write(
        guides_dir.join("voice.md"),
        "# Voice\n\nPrefer the active voice. Passive voice hides who performs the action.\n\n\
         # Procedures\n\nWrite each step as an imperative. Start with the verb.",
    )
    .unwrap();
    fs::write(
        guides_dir.join("length.txt"),
        "Keep sentences under twenty-five words.\n\nSplit long sentences at coordinating conjunctions.",
    )
    .unwrap();
    fs::write(guides_dir.join("diagram.png"), [0u8, 159, 146, 150]).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/prose.sqlite"

[embedding]
provider = "hash"
dims = 64

[generation]
provider = "disabled"

[logging]
level = "warn"
"#,
        root.display()
    );

    let config_path = config_dir.join("prose.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_prose(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = prose_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run prose binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_prose(&config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully."));
    assert!(tmp.path().join("data/prose.sqlite").exists());

    // Idempotent
    let (_, stderr, success) = run_prose(&config_path, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_ingest_reports_counts_and_skips_duplicates() {
    let (tmp, config_path) = setup_test_env();
    let guides = tmp.path().join("guides");
    let guides = guides.to_str().unwrap();

    run_prose(&config_path, &["init"]);

    let (stdout, stderr, success) = run_prose(&config_path, &["ingest", guides]);
    assert!(success, "ingest failed: {}", stderr);
    assert!(stdout.contains("documents: 2"), "unexpected output: {}", stdout);
    assert!(!stdout.contains("chunks created: 0"), "first ingest created nothing: {}", stdout);
    assert!(stdout.contains("chunks skipped: 0"));

    let (stdout, stderr, success) = run_prose(&config_path, &["ingest", guides]);
    assert!(success, "re-ingest failed: {}", stderr);
    assert!(stdout.contains("chunks created: 0"), "re-ingest was not a no-op: {}", stdout);
}

#[test]
fn test_ingest_missing_path_fails() {
    let (tmp, config_path) = setup_test_env();
    let missing = tmp.path().join("nowhere");

    let (_, stderr, success) = run_prose(&config_path, &["ingest", missing.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("does not exist"), "unexpected stderr: {}", stderr);
}

#[test]
fn test_check_lists_issues() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_prose(
        &config_path,
        &["check", "The report was written by the team. We start at noon."],
    );
    assert!(success, "check failed: {}", stderr);
    assert!(stdout.contains("passive-voice"), "unexpected output: {}", stdout);
    assert!(stdout.contains("was written"));
}

#[test]
fn test_check_clean_text() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_prose(&config_path, &["check", "We start at noon."]);
    assert!(success);
    assert!(stdout.contains("No issues found."));
}

#[test]
fn test_suggest_json_without_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_prose(
        &config_path,
        &[
            "suggest",
            "The report was written by the team.",
            "--issue",
            "passive-voice",
            "--json",
        ],
    );
    assert!(success, "suggest failed: {}", stderr);

    let value: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(value["suggestion"], "The team wrote the report.");
    assert_eq!(value["method"], "DETERMINISTIC_FALLBACK");
    assert_eq!(value["confidence"], "medium");
    assert_eq!(value["success"], true);
}

#[test]
fn test_suggest_after_ingest_falls_back_when_generation_disabled() {
    let (tmp, config_path) = setup_test_env();
    let guides = tmp.path().join("guides");

    run_prose(&config_path, &["init"]);
    run_prose(&config_path, &["ingest", guides.to_str().unwrap()]);

    let (stdout, stderr, success) = run_prose(
        &config_path,
        &["suggest", "The report was written by the team.", "--doc-type", "technical"],
    );
    assert!(success, "suggest failed: {}", stderr);
    assert!(stdout.contains("Suggestion: The team wrote the report."), "unexpected output: {}", stdout);
    assert!(stdout.contains("DETERMINISTIC_FALLBACK"));
}

#[test]
fn test_suggest_rejects_unknown_issue_kind() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_prose(&config_path, &["suggest", "Some sentence.", "--issue", "bogus"]);
    assert!(!success);
}

#[test]
fn test_suggest_accepts_writing_goals() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_prose(
        &config_path,
        &[
            "suggest",
            "The report was written by the team.",
            "--goal",
            "conciseness",
            "--goal",
            "clarity",
        ],
    );
    assert!(success, "suggest failed: {}", stderr);
    assert!(stdout.contains("Suggestion: The team wrote the report."), "unexpected output: {}", stdout);

    let (_, _, success) = run_prose(&config_path, &["suggest", "Some sentence.", "--goal", "brevity"]);
    assert!(!success);
}
