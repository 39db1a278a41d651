//! End-to-end runs of the engine against fixture repositories.
//!
//! Token counts use the 4-characters-per-token estimate so sizes are exact:
//! a file of 8 lines of 39 characters plus newline is 320 characters, 80
//! tokens.

use pretty_assertions::assert_eq;
use repo2context_core::select::{DecisionMode, SkipReason};
use repo2context_core::tokens::EstimateCounter;
use repo2context_core::tree::EntryStatus;
use repo2context_core::{
    ContextEngine, Diagnostic, EngineError, OutputTarget, Polarity, RunOutput, RunStatus,
};
use repo2context_config::AppConfig;
use repo2context_test_utils::{FixtureRepo, TestConfigBuilder};

async fn run(repo: &FixtureRepo, config: AppConfig) -> RunOutput {
    ContextEngine::new(repo.path(), config)
        .with_token_counter(Box::new(EstimateCounter))
        .run()
        .await
        .expect("run succeeds")
}

fn modes(output: &RunOutput) -> Vec<(&str, DecisionMode)> {
    output
        .decisions
        .iter()
        .map(|d| (d.path.as_str(), d.mode))
        .collect()
}

// ── Filtering ──────────────────────────────────────────────────

#[test_log::test(tokio::test)]
async fn ignored_log_file_is_listed_only_when_requested() {
    let repo = FixtureRepo::new()
        .file(".repo2contextignore", "*.log\n")
        .file("a.log", "noise\n")
        .file("main.py", "print('hi')\n");

    let hidden = run(&repo, TestConfigBuilder::new().build()).await;
    assert!(hidden.decisions.iter().all(|d| d.path != "a.log"));
    assert_eq!(hidden.tree.get("a.log").map(|n| n.status), Some(EntryStatus::Ignored));
    assert!(!hidden.markdown.contains("a.log"));

    let shown = run(&repo, TestConfigBuilder::new().show_ignored(true).build()).await;
    assert!(shown.decisions.iter().all(|d| d.path != "a.log"));
    assert!(shown.markdown.contains("a.log [ignored]"));
    assert!(!shown.markdown.contains("## a.log"));
}

#[test_log::test(tokio::test)]
async fn last_matching_exclude_wins_over_earlier_include() {
    let repo = FixtureRepo::new()
        .file(".repo2contextignore", "*.log\n!keep.log\n")
        .file("keep.log", "kept\n")
        .file("other.log", "dropped\n");

    let output = ContextEngine::new(repo.path(), TestConfigBuilder::new().build())
        .with_token_counter(Box::new(EstimateCounter))
        .with_overrides(vec![("keep.log".to_string(), Polarity::Exclude)])
        .run()
        .await
        .unwrap();
    assert!(output.decisions.iter().all(|d| !d.path.ends_with(".log")));
    assert_eq!(
        output.tree.get("keep.log").map(|n| n.status),
        Some(EntryStatus::Ignored)
    );
}

#[test_log::test(tokio::test)]
async fn negation_in_ignore_file_re_includes() {
    let repo = FixtureRepo::new()
        .file(".repo2contextignore", "*.log\n!keep.log\n")
        .file("keep.log", "kept\n")
        .file("other.log", "dropped\n");

    let output = run(&repo, TestConfigBuilder::new().build()).await;
    assert_eq!(
        modes(&output),
        vec![
            (".repo2contextignore", DecisionMode::Full),
            ("keep.log", DecisionMode::Full)
        ]
    );
}

#[test_log::test(tokio::test)]
async fn gitignore_is_honoured_unless_disabled() {
    let repo = FixtureRepo::new()
        .file(".gitignore", "secret.txt\n")
        .file("secret.txt", "hunter2\n")
        .file("open.txt", "hello\n");

    let honoured = run(&repo, TestConfigBuilder::new().build()).await;
    let paths: Vec<&str> = honoured.decisions.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(paths, vec![".gitignore", "open.txt"]);

    let disabled = run(&repo, TestConfigBuilder::new().respect_gitignore(false).build()).await;
    assert!(disabled.decisions.iter().any(|d| d.path == "secret.txt"));
}

#[test_log::test(tokio::test)]
async fn default_excludes_prune_vcs_and_build_dirs() {
    let repo = FixtureRepo::new()
        .file(".git/HEAD", "ref: refs/heads/main\n")
        .file("target/debug/out.txt", "artifact\n")
        .file("src/lib.rs", "pub fn f() {}\n");

    let output = run(&repo, TestConfigBuilder::new().build()).await;
    assert_eq!(modes(&output), vec![("src/lib.rs", DecisionMode::Full)]);
    assert!(output.tree.get(".git/HEAD").is_none());
    assert!(output.tree.get("target/debug/out.txt").is_none());
}

#[test_log::test(tokio::test)]
async fn only_extension_restricts_sections_to_python() {
    let repo = FixtureRepo::new()
        .file("app.py", "import os\n")
        .file("lib/util.py", "X = 1\n")
        .file("README.md", "# readme\n")
        .file("build.rs", "fn main() {}\n");

    let output = run(&repo, TestConfigBuilder::new().only_extensions(&["py"]).build()).await;
    let paths: Vec<&str> = output.decisions.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(paths, vec!["app.py", "lib/util.py"]);
    assert!(output.markdown.contains("## app.py"));
    assert!(!output.markdown.contains("## README.md"));
    assert_eq!(
        output.tree.get("README.md").map(|n| n.status),
        Some(EntryStatus::Filtered)
    );
}

#[test_log::test(tokio::test)]
async fn binary_files_are_listed_not_included() {
    let repo = FixtureRepo::new()
        .binary("logo.png", &[0x89, b'P', b'N', b'G', 0, 0, 0, 13])
        .file("main.rs", "fn main() {}\n");

    let output = run(&repo, TestConfigBuilder::new().build()).await;
    assert_eq!(modes(&output), vec![("main.rs", DecisionMode::Full)]);
    assert!(output.markdown.contains("logo.png [binary]"));
    assert_eq!(output.status(), RunStatus::Complete);
}

#[test_log::test(tokio::test)]
async fn missing_ignore_file_is_a_diagnostic() {
    let repo = FixtureRepo::new().file("a.txt", "a\n");
    let missing = repo.outside("absent.ignore");

    let output = run(&repo, TestConfigBuilder::new().ignore_file(&missing).build()).await;
    assert_eq!(
        output.diagnostics,
        vec![Diagnostic::MissingIgnoreFile { path: missing }]
    );
    assert_eq!(output.decisions.len(), 1);
}

#[test_log::test(tokio::test)]
async fn missing_root_is_fatal() {
    let repo = FixtureRepo::new();
    let err = ContextEngine::new(repo.outside("no-such-dir"), AppConfig::default())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Filesystem { .. }));
    assert!(err.to_string().contains("path does not exist"));
}

#[test_log::test(tokio::test)]
async fn config_exclude_and_size_cap_are_applied() {
    let repo = FixtureRepo::new()
        .file("notes/todo.txt", "later\n")
        .sized("data.csv", 100, 99)
        .file("main.rs", "fn main() {}\n")
        .dir("empty");

    let output = run(
        &repo,
        TestConfigBuilder::new()
            .exclude("notes/")
            .max_file_bytes(1_000)
            .build(),
    )
    .await;
    assert_eq!(modes(&output), vec![("main.rs", DecisionMode::Full)]);
    assert_eq!(output.tree.get("notes").map(|n| n.status), Some(EntryStatus::Ignored));
    assert!(output.tree.get("notes/todo.txt").is_none());
    assert_eq!(
        output.tree.get("data.csv").map(|n| n.status),
        Some(EntryStatus::TooLarge)
    );
    assert!(output.tree.get("empty").is_some());
    assert_eq!(
        output.diagnostics,
        vec![Diagnostic::FileTooLarge {
            path: "data.csv".to_string(),
            size: 10_000,
            limit: 1_000
        }]
    );
}

#[test_log::test(tokio::test)]
async fn previous_document_in_root_is_not_packed_again() {
    let repo = FixtureRepo::new().file("main.py", "print('hi')\n");
    let first = run(&repo, TestConfigBuilder::new().build()).await;
    OutputTarget::from_path(Some(repo.path()))
        .write(&first.markdown)
        .unwrap();

    let second = run(&repo, TestConfigBuilder::new().build()).await;
    assert_eq!(modes(&second), vec![("main.py", DecisionMode::Full)]);
    assert_eq!(
        second.tree.get("repocontext.md").map(|n| n.status),
        Some(EntryStatus::Ignored)
    );
    assert_eq!(first.markdown, second.markdown);
}

#[cfg(target_os = "linux")]
#[test_log::test(tokio::test)]
async fn non_utf8_names_are_reported_not_fatal() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let repo = FixtureRepo::new().file("ok.txt", "fine\n");
    std::fs::write(repo.path().join(OsStr::from_bytes(b"a\xff.txt")), "one\n").unwrap();
    std::fs::write(repo.path().join(OsStr::from_bytes(b"a\xfe.txt")), "two\n").unwrap();

    let output = run(&repo, TestConfigBuilder::new().build()).await;
    assert_eq!(modes(&output), vec![("ok.txt", DecisionMode::Full)]);
    let unreadable: Vec<&str> = output
        .diagnostics
        .iter()
        .filter_map(|d| match d {
            Diagnostic::FileRead { path, .. } => Some(path.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(unreadable, vec!["a\\xFE.txt", "a\\xFF.txt"]);
    assert!(output.markdown.contains("## ok.txt"));
}

#[cfg(unix)]
#[test_log::test(tokio::test)]
async fn unreadable_file_and_directory_become_diagnostics() {
    use std::fs::{Permissions, set_permissions};
    use std::os::unix::fs::PermissionsExt;

    let repo = FixtureRepo::new()
        .file("locked.txt", "secret\n")
        .file("private/inner.txt", "secret\n")
        .file("open.txt", "hello\n");
    let file = repo.path().join("locked.txt");
    let dir = repo.path().join("private");
    set_permissions(&file, Permissions::from_mode(0o000)).unwrap();
    set_permissions(&dir, Permissions::from_mode(0o000)).unwrap();
    if std::fs::read(&file).is_ok() {
        // Permission bits are not enforced for this user.
        set_permissions(&dir, Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let output = run(&repo, TestConfigBuilder::new().build()).await;
    set_permissions(&dir, Permissions::from_mode(0o755)).unwrap();
    set_permissions(&file, Permissions::from_mode(0o644)).unwrap();

    assert_eq!(modes(&output), vec![("open.txt", DecisionMode::Full)]);
    assert_eq!(
        output.tree.get("locked.txt").map(|n| n.status),
        Some(EntryStatus::Unreadable)
    );
    assert_eq!(
        output.tree.get("private").map(|n| n.status),
        Some(EntryStatus::Unreadable)
    );
    assert!(output.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::FileRead { path, .. } if path == "locked.txt"
    )));
    assert!(output.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::UnreadableDirectory { path, .. } if path == "private"
    )));
    assert!(output.markdown.starts_with("# Repository context: repo\n"));
}

// ── Budget ─────────────────────────────────────────────────────

#[test_log::test(tokio::test)]
async fn second_file_is_truncated_when_budget_runs_short() {
    let repo = FixtureRepo::new()
        .sized("a.txt", 8, 39)
        .sized("b.txt", 8, 39);

    let output = run(&repo, TestConfigBuilder::new().max_tokens(100).build()).await;
    assert_eq!(
        modes(&output),
        vec![("a.txt", DecisionMode::Full), ("b.txt", DecisionMode::Truncated)]
    );
    let b = &output.decisions[1];
    assert_eq!(b.kept_lines, 2);
    assert_eq!(b.original_lines, 8);
    assert_eq!(output.budget.consumed(), 100);
    assert!(output.markdown.contains("> Truncated: kept 2 of 8 lines."));
    assert_eq!(output.status(), RunStatus::Partial);
}

#[test_log::test(tokio::test)]
async fn second_file_is_skipped_without_truncation_or_summaries() {
    let repo = FixtureRepo::new()
        .sized("a.txt", 8, 39)
        .sized("b.txt", 8, 39);

    let output = run(
        &repo,
        TestConfigBuilder::new().max_tokens(100).truncate(false).build(),
    )
    .await;
    assert_eq!(
        modes(&output),
        vec![("a.txt", DecisionMode::Full), ("b.txt", DecisionMode::Skipped)]
    );
    assert_eq!(
        output.decisions[1].skip_reason,
        Some(SkipReason::OverBudget {
            tokens: 80,
            remaining: 20
        })
    );
    assert_eq!(output.budget.consumed(), 80);
    assert!(output.markdown.contains("b.txt [skipped]"));
    assert!(!output.markdown.contains("## b.txt"));
    assert!(output.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::Skipped { path, .. } if path == "b.txt"
    )));
}

#[test_log::test(tokio::test)]
async fn consumed_never_exceeds_limit() {
    let mut repo = FixtureRepo::new();
    for i in 0..12 {
        repo = repo.sized(&format!("f{i:02}.txt"), 3 + i * 2, 20 + i * 3);
    }

    let output = run(&repo, TestConfigBuilder::new().max_tokens(400).build()).await;
    let charged: usize = output.decisions.iter().map(|d| d.tokens).sum();
    assert_eq!(charged, output.budget.consumed());
    assert!(output.budget.consumed() <= 400);
    for d in output.decisions.iter().filter(|d| d.mode == DecisionMode::Truncated) {
        assert!(d.kept_lines < d.original_lines);
    }
}

#[test_log::test(tokio::test)]
async fn priority_patterns_are_selected_first() {
    let repo = FixtureRepo::new()
        .sized("a_notes.txt", 8, 39)
        .sized("src/main.rs", 8, 39);

    let output = run(
        &repo,
        TestConfigBuilder::new()
            .max_tokens(100)
            .truncate(false)
            .priority(&["src/**"])
            .build(),
    )
    .await;
    assert_eq!(
        modes(&output),
        vec![
            ("src/main.rs", DecisionMode::Full),
            ("a_notes.txt", DecisionMode::Skipped)
        ]
    );
}

#[test_log::test(tokio::test)]
async fn minimum_truncated_lines_turns_short_prefix_into_skip() {
    let repo = FixtureRepo::new()
        .sized("a.txt", 8, 39)
        .sized("b.txt", 8, 39);

    let output = run(
        &repo,
        TestConfigBuilder::new()
            .max_tokens(100)
            .min_truncated_lines(3)
            .build(),
    )
    .await;
    assert_eq!(
        modes(&output),
        vec![("a.txt", DecisionMode::Full), ("b.txt", DecisionMode::Skipped)]
    );
    assert_eq!(
        output.decisions[1].skip_reason,
        Some(SkipReason::TruncationTooShort {
            lines: 2,
            min_lines: 3
        })
    );
}

// ── Tokenizer fallback ─────────────────────────────────────────

#[test_log::test(tokio::test)]
async fn unknown_model_degrades_to_estimate_once() {
    let repo = FixtureRepo::new()
        .file("a.txt", "alpha\n")
        .file("b.txt", "beta\n")
        .file("c.txt", "gamma\n");

    let output = ContextEngine::new(
        repo.path(),
        TestConfigBuilder::new().model("no-such-model").build(),
    )
    .run()
    .await
    .unwrap();

    let degraded = output
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::DegradedEstimate { .. }))
        .count();
    assert_eq!(degraded, 1);
    assert_eq!(output.scheme, "estimate");
    assert!(output.markdown.contains("(estimate, approximate)"));
    assert_eq!(output.count(DecisionMode::Full), 3);
}

// ── Rendering and output ───────────────────────────────────────

#[test_log::test(tokio::test)]
async fn identical_inputs_render_identical_documents() {
    let repo = FixtureRepo::new()
        .file("src/lib.rs", "pub mod a;\n")
        .file("src/a.rs", "pub fn a() {}\n")
        .sized("notes.txt", 30, 60);

    let config = TestConfigBuilder::new().max_tokens(200).build();
    let first = run(&repo, config.clone()).await;
    let second = run(&repo, config).await;
    assert_eq!(first.markdown, second.markdown);
}

#[test_log::test(tokio::test)]
async fn document_is_written_to_output_directory() {
    let repo = FixtureRepo::new().file("main.py", "print('hi')\n");
    let out_dir = repo.outside("out");
    std::fs::create_dir(&out_dir).unwrap();

    let output = run(&repo, TestConfigBuilder::new().build()).await;
    let target = OutputTarget::from_path(Some(&out_dir));
    target.write(&output.markdown).unwrap();

    let written = std::fs::read_to_string(out_dir.join("repocontext.md")).unwrap();
    assert_eq!(written, output.markdown);
    assert!(written.starts_with("# Repository context: repo\n"));
}
