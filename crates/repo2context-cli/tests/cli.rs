//! Runs the `repo2context` binary against fixture repositories.

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use repo2context_test_utils::FixtureRepo;

#[allow(deprecated)]
fn repo2context() -> Command {
    let mut cmd = Command::cargo_bin("repo2context").expect("binary");
    cmd.env_remove("RUST_LOG")
        .env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY");
    cmd
}

fn small_repo() -> FixtureRepo {
    FixtureRepo::new()
        .file("main.py", "print('hello')\n")
        .file("lib/util.py", "def util():\n    return 1\n")
        .file("README.md", "# Demo\n")
}

#[test]
fn complete_run_prints_document_and_exits_zero() {
    let repo = small_repo();
    repo2context()
        .arg(repo.path())
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("# Repository context: repo\n"))
        .stdout(predicate::str::contains("## main.py"))
        .stdout(predicate::str::contains("```python"))
        .stdout(predicate::str::contains("## File tree"));
}

#[test]
fn output_flag_writes_file_and_keeps_stdout_empty() {
    let repo = small_repo();
    let out = repo.outside("context.md");
    repo2context()
        .arg(repo.path())
        .arg("-o")
        .arg(&out)
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty());

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.contains("## lib/util.py"));
}

#[test]
fn output_directory_receives_default_name() {
    let repo = small_repo();
    let dir = repo.outside("out");
    std::fs::create_dir(&dir).unwrap();
    repo2context()
        .arg(repo.path())
        .arg("--output")
        .arg(&dir)
        .assert()
        .code(0);
    assert!(dir.join("repocontext.md").is_file());
}

#[test]
fn missing_root_exits_two_and_writes_nothing() {
    let repo = FixtureRepo::new();
    let out = repo.outside("context.md");
    repo2context()
        .arg(repo.outside("does-not-exist"))
        .arg("-o")
        .arg(&out)
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("path does not exist"));
    assert!(!out.exists());
}

#[test]
fn out_of_range_budget_is_rejected() {
    let repo = small_repo();
    repo2context()
        .arg(repo.path())
        .args(["--max-tokens", "10"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("must be between"));
}

#[test]
fn unknown_flag_exits_two() {
    repo2context().arg("--no-such-flag").assert().code(2);
}

#[test]
fn truncated_run_exits_one_and_warns_about_estimate() {
    let repo = FixtureRepo::new().file("big.rs", &"let value = 12345;\n".repeat(10_000));
    repo2context()
        .arg(repo.path())
        .args(["--max-tokens", "1000", "--model", "unknown-model"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("> Truncated: kept"))
        .stdout(predicate::str::contains("(estimate, approximate)"))
        .stderr(predicate::str::contains("estimated at 4 characters per token"));
}

#[test]
fn estimate_fallback_is_reported_once() {
    let repo = small_repo();
    repo2context()
        .arg(repo.path())
        .args(["--model", "unknown-model"])
        .assert()
        .code(0)
        .stderr(predicate::str::contains("token counts").count(1));
}

#[test]
fn no_truncate_skips_and_exits_one() {
    let repo = FixtureRepo::new()
        .file("big.rs", &"let value = 12345;\n".repeat(10_000))
        .file("small.rs", "fn small() {}\n");
    repo2context()
        .arg(repo.path())
        .args(["--max-tokens", "1000", "--model", "unknown-model", "--no-truncate"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("## small.rs"))
        .stdout(predicate::str::contains("big.rs [skipped]"))
        .stderr(predicate::str::contains("big.rs skipped"));
}

#[test]
fn only_flag_limits_sections() {
    let repo = small_repo();
    repo2context()
        .arg(repo.path())
        .args(["--only", "py"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("## main.py"))
        .stdout(predicate::str::contains("## README.md").not());
}

#[test]
fn exclude_then_include_follows_command_line_order() {
    let repo = small_repo();
    repo2context()
        .arg(repo.path())
        .args(["--exclude", "*.py", "--include", "main.py"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("## main.py"))
        .stdout(predicate::str::contains("## lib/util.py").not());
}

#[test]
fn rules_file_is_applied_and_missing_one_is_reported() {
    let repo = small_repo();
    let rules = repo.outside("extra.ignore");
    std::fs::write(&rules, "README.md\n").unwrap();
    repo2context()
        .arg(repo.path())
        .arg("--rules")
        .arg(&rules)
        .arg("--rules")
        .arg(repo.outside("missing.ignore"))
        .assert()
        .code(0)
        .stdout(predicate::str::contains("## README.md").not())
        .stderr(predicate::str::contains("missing.ignore not found"));
}

#[test]
fn config_file_in_root_is_picked_up() {
    let repo = small_repo().file("repo2context.toml", "[filter]\nexclude = [\"lib/\"]\n");
    repo2context()
        .arg(repo.path())
        .assert()
        .code(0)
        .stdout(predicate::str::contains("## lib/util.py").not())
        .stdout(predicate::str::contains("## main.py"));
}

#[test]
fn invalid_config_file_exits_two() {
    let repo = small_repo();
    let config = repo.outside("bad.toml");
    std::fs::write(&config, "[summary]\ntimeout_secs = 0\n").unwrap();
    repo2context()
        .arg(repo.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("timeout_secs"));
}

#[test]
fn summary_without_key_still_produces_document() {
    let repo = FixtureRepo::new().file("big.rs", &"let value = 12345;\n".repeat(10_000));
    repo2context()
        .arg(repo.path())
        .args([
            "--max-tokens",
            "1000",
            "--model",
            "unknown-model",
            "--no-truncate",
            "--summary",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("# Repository context"))
        .stderr(predicate::str::contains("no API key found in $OPENAI_API_KEY"));
}

#[test]
fn timestamp_flag_adds_generated_line() {
    let repo = small_repo();
    let output = repo2context()
        .arg(repo.path())
        .arg("--timestamp")
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let second = stdout.lines().nth(1).unwrap_or_default();
    assert!(second.starts_with("_Generated "), "got {second:?}");
    assert!(second.ends_with(" UTC_"));
}

#[test]
fn print_config_shows_resolved_values() {
    let repo = small_repo();
    repo2context()
        .arg(repo.path())
        .args(["--print-config", "--max-tokens", "4096", "--show-ignored"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("max_tokens = 4096"))
        .stdout(predicate::str::contains("show_ignored = true"));
}

#[test]
fn version_includes_build_metadata() {
    let output = repo2context().arg("--version").output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("repo2context "));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    let metadata = stdout
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(inside, _)| inside.split(", ").count());
    assert_eq!(metadata, Some(3), "got {stdout:?}");
}

#[test]
fn repeated_runs_are_byte_identical() {
    let repo = small_repo();
    let first = repo2context().arg(repo.path()).output().unwrap().stdout;
    let second = repo2context().arg(repo.path()).output().unwrap().stdout;
    assert_eq!(first, second);
}
