//! Integration tests for the delphi CLI
//!
//! Each test runs the binary against a throwaway review project.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const CORPUS: &str = r#"[
  {"ID": "P1", "Title": "Statins in the elderly", "Evidence": "RCT summary", "AI_Report": "Draft", "Author_Conclusion": "Benefit"},
  {"ID": "P2", "Title": "Aspirin for primary prevention", "Evidence": "Meta-analysis", "AI_Report": "Draft", "Author_Conclusion": "No benefit"}
]"#;

const ROSTER: &str = r#"[
  {"name": "Dr. Lin", "token": "tok-lin"},
  {"name": "Dr. Osei", "token": "tok-osei"}
]"#;

/// Helper to create a delphi Command isolated from the caller's environment
fn delphi() -> Command {
    let mut cmd = cargo_bin_cmd!("delphi");
    for var in [
        "DELPHI_TOKEN",
        "DELPHI_IDENTITY_MODE",
        "DELPHI_STORE_BACKEND",
        "DELPHI_STORE_DIR",
        "DELPHI_STORE_TIMEOUT_MS",
        "DELPHI_LOG",
        "DELPHI_LOG_JSON",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

/// Initialize a project and fill in the corpus and roster
fn init_review_project(dir: &TempDir) {
    delphi()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();
    fs::write(dir.path().join(".delphi/corpus.json"), CORPUS).unwrap();
    fs::write(dir.path().join(".delphi/roster.json"), ROSTER).unwrap();
}

fn submit(dir: &TempDir, token: &str, doc: &str, scores: &str) -> assert_cmd::assert::Assert {
    delphi()
        .current_dir(dir.path())
        .args(["submit", "--token", token, "--doc", doc, "--scores", scores, "--human", "7.5"])
        .assert()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_delphi_help() {
        delphi().arg("--help").assert().success();
    }

    #[test]
    fn test_delphi_version() {
        delphi().arg("--version").assert().success();
    }

    #[test]
    fn test_init_creates_structure() {
        let dir = create_temp_project();

        delphi()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized review project"));

        let delphi_dir = dir.path().join(".delphi");
        assert!(delphi_dir.join("delphi.toml").exists());
        assert!(delphi_dir.join("corpus.json").exists());
        assert!(delphi_dir.join("roster.json").exists());
        assert!(delphi_dir.join("submissions").is_dir());
        assert!(delphi_dir.join("logs").is_dir());
    }

    #[test]
    fn test_init_is_idempotent_and_keeps_files() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already initialized"));

        let corpus = fs::read_to_string(dir.path().join(".delphi/corpus.json")).unwrap();
        assert!(corpus.contains("Statins in the elderly"));
    }

    #[test]
    fn test_logs_go_to_stderr_and_daily_file() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .env("DELPHI_LOG", "info")
            .env("DELPHI_LOG_JSON", "1")
            .args(["progress", "--token", "tok-lin"])
            .assert()
            .success()
            .stderr(predicate::str::contains("\"level\":\"INFO\""))
            .stderr(predicate::str::contains("Resolved expert identity"));

        delphi()
            .current_dir(dir.path())
            .env("DELPHI_LOG", "info")
            .args(["progress", "--token", "tok-lin"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Resolved expert identity"))
            .stderr(predicate::str::contains("\"level\"").not());

        let log_files: Vec<_> = fs::read_dir(dir.path().join(".delphi/logs"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("delphi.log"))
            .collect();
        assert!(!log_files.is_empty());
    }

    #[test]
    fn test_commands_require_initialized_project() {
        let dir = create_temp_project();

        delphi()
            .current_dir(dir.path())
            .args(["progress", "--token", "tok-lin"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("delphi init"));
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod config_commands {
    use super::*;

    #[test]
    fn test_config_show_prints_sections() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[scoring]"))
            .stdout(predicate::str::contains("duplicate_policy = \"block\""));
    }

    #[test]
    fn test_config_validate_flags_empty_corpus() {
        let dir = create_temp_project();
        delphi()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success();

        delphi()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("corpus is empty"));
    }

    #[test]
    fn test_config_validate_accepts_filled_project() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_config_init_does_not_overwrite() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }
}

// =============================================================================
// Identity
// =============================================================================

mod identity {
    use super::*;

    #[test]
    fn test_missing_token_halts() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .arg("documents")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No access token"))
            .stdout(predicate::str::contains("P1").not());
    }

    #[test]
    fn test_invalid_token_halts() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .args(["documents", "--token", "tok-nobody"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not on the roster"));
    }

    #[test]
    fn test_token_from_environment() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .env("DELPHI_TOKEN", "tok-osei")
            .arg("documents")
            .assert()
            .success()
            .stdout(predicate::str::contains("Documents for Dr. Osei"));
    }

    #[test]
    fn test_debug_mode_resolves_by_name() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .env("DELPHI_IDENTITY_MODE", "debug")
            .args(["progress", "--token", "Dr. Lin"])
            .assert()
            .success()
            .stdout(predicate::str::contains("0/2"));

        // Tokens are not names in debug mode
        delphi()
            .current_dir(dir.path())
            .env("DELPHI_IDENTITY_MODE", "debug")
            .args(["progress", "--token", "tok-lin"])
            .assert()
            .failure();
    }
}

// =============================================================================
// Submission flow
// =============================================================================

mod submissions {
    use super::*;

    #[test]
    fn test_documents_show_pending_markers() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .args(["documents", "--token", "tok-lin"])
            .assert()
            .success()
            .stdout(predicate::str::contains("⏳ P1 | Statins in the elderly"))
            .stdout(predicate::str::contains("⏳ P2 | Aspirin for primary prevention"))
            .stdout(predicate::str::contains("Reviewed: 0/2"));
    }

    #[test]
    fn test_submit_updates_progress_and_markers() {
        let dir = create_temp_project();
        init_review_project(&dir);

        submit(&dir, "tok-lin", "P1", "7,8,6,7")
            .success()
            .stdout(predicate::str::contains("Recorded review of P1 by Dr. Lin"));

        delphi()
            .current_dir(dir.path())
            .args(["progress", "--token", "tok-lin"])
            .assert()
            .success()
            .stdout(predicate::str::contains("1/2"));

        delphi()
            .current_dir(dir.path())
            .args(["documents", "--token", "tok-lin"])
            .assert()
            .success()
            .stdout(predicate::str::contains("✅ P1"))
            .stdout(predicate::str::contains("⏳ P2"));

        // Another expert's progress is independent
        delphi()
            .current_dir(dir.path())
            .args(["progress", "--token", "tok-osei"])
            .assert()
            .success()
            .stdout(predicate::str::contains("0/2"));
    }

    #[test]
    fn test_duplicate_submission_is_rejected() {
        let dir = create_temp_project();
        init_review_project(&dir);

        submit(&dir, "tok-lin", "P1", "7,8,6,7").success();
        submit(&dir, "tok-lin", "P1", "5,5,5,5")
            .failure()
            .stderr(predicate::str::contains("duplicate-submission"));

        delphi()
            .current_dir(dir.path())
            .arg("export")
            .assert()
            .success()
            .stdout(predicate::function(|out: &str| out.lines().count() == 1));
    }

    #[test]
    fn test_all_zero_submission_is_rejected() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .args(["submit", "--token", "tok-lin", "--doc", "P1", "--scores", "0,0,0,0", "--human", "0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("all-zero"));
    }

    #[test]
    fn test_out_of_range_and_wrong_count_are_rejected() {
        let dir = create_temp_project();
        init_review_project(&dir);

        submit(&dir, "tok-lin", "P1", "7,8,6,11")
            .failure()
            .stderr(predicate::str::contains("score-out-of-range"));
        submit(&dir, "tok-lin", "P1", "7,8")
            .failure()
            .stderr(predicate::str::contains("score-out-of-range"));
    }

    #[test]
    fn test_unknown_document_is_rejected() {
        let dir = create_temp_project();
        init_review_project(&dir);

        submit(&dir, "tok-lin", "P9", "7,8,6,7")
            .failure()
            .stderr(predicate::str::contains("does not match any document"));
    }

    #[test]
    fn test_qualitative_fields_are_recorded() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .args([
                "submit", "--token", "tok-lin", "--doc", "P2", "--scores", "6,6,6,6", "--human", "5",
                "--field", "Strengths=clear, well sourced", "--field", "Weaknesses=none",
            ])
            .assert()
            .success();

        delphi()
            .current_dir(dir.path())
            .arg("export")
            .assert()
            .success()
            .stdout(predicate::str::contains("clear, well sourced"))
            .stdout(predicate::str::contains("\"expert_name\":\"Dr. Lin\""));
    }
}

// =============================================================================
// Storage backends and export
// =============================================================================

mod ledger {
    use super::*;

    #[test]
    fn test_jsonl_backend() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .env("DELPHI_STORE_BACKEND", "jsonl")
            .args(["submit", "--token", "tok-lin", "--doc", "P1", "--scores", "7,8,6,7", "--human", "7"])
            .assert()
            .success();

        delphi()
            .current_dir(dir.path())
            .env("DELPHI_STORE_BACKEND", "jsonl")
            .args(["progress", "--token", "tok-lin"])
            .assert()
            .success()
            .stdout(predicate::str::contains("1/2"));

        let ledgers: Vec<_> = fs::read_dir(dir.path().join(".delphi/submissions"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "jsonl"))
            .collect();
        assert_eq!(ledgers.len(), 1);
    }

    #[test]
    fn test_accumulate_policy_and_latest_export() {
        let dir = create_temp_project();
        init_review_project(&dir);
        fs::write(
            dir.path().join(".delphi/delphi.toml"),
            "[scoring]\nduplicate_policy = \"accumulate\"\n",
        )
        .unwrap();

        submit(&dir, "tok-lin", "P1", "7,8,6,7").success();
        submit(&dir, "tok-lin", "P1", "3,3,3,3").success();

        delphi()
            .current_dir(dir.path())
            .arg("export")
            .assert()
            .success()
            .stdout(predicate::function(|out: &str| out.lines().count() == 2));

        let out = dir.path().join("latest.jsonl");
        delphi()
            .current_dir(dir.path())
            .args(["export", "--latest", "--output"])
            .arg(&out)
            .assert()
            .success();

        let exported = fs::read_to_string(&out).unwrap();
        assert_eq!(exported.lines().count(), 1);
        assert!(exported.contains("[3.0,3.0,3.0,3.0]"));
    }

    #[test]
    fn test_export_empty_ledger() {
        let dir = create_temp_project();
        init_review_project(&dir);

        delphi()
            .current_dir(dir.path())
            .arg("export")
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }
}
