//! End-to-end tests for runpad CLI commands.
//!
//! None of these reach a real code runner: they cover the static commands,
//! local validation and the unreachable-runner path.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin for tests

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::thread;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Nothing listens here; connections are refused.
const DEAD_RUNNER: &str = "http://127.0.0.1:9";

/// A temporary directory with one source file and a drafts directory.
struct Workspace {
    temp_dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    fn file(&self, name: &str, source: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, source).expect("Failed to write source");
        path
    }

    fn drafts_dir(&self) -> PathBuf {
        self.temp_dir.path().join("drafts")
    }
}

fn runpad() -> Command {
    Command::cargo_bin("runpad").unwrap()
}

/// Start `runpad scratch` with stdin left open.
fn spawn_scratch(drafts: &Path, extra: &[&str]) -> Child {
    std::process::Command::new(assert_cmd::cargo::cargo_bin("runpad"))
        .args(["scratch", "--key", "notes", "--drafts-dir"])
        .arg(drafts)
        .args(extra)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start runpad scratch")
}

/// Contents of the saved drafts.
fn saved_drafts(drafts: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(drafts) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .map(|e| fs::read_to_string(e.path()).unwrap())
        .collect()
}

#[test]
fn test_detect_reports_input_reads() {
    let ws = Workspace::new();
    let file = ws.file(
        "greet.py",
        "name = input(\"Name: \")\nage = input(\"Age: \")\nprint(name, age)\n",
    );

    runpad()
        .args(["detect", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"requires_input\": true"))
        .stdout(predicate::str::contains("\"count\": 2"))
        .stdout(predicate::str::contains("Name:"));
}

#[test]
fn test_detect_without_input() {
    let ws = Workspace::new();
    let file = ws.file("hello.js", "console.log('hi');\n");

    runpad()
        .args(["detect", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"requires_input\": false"));
}

#[test]
fn test_detect_unknown_extension_needs_language() {
    let ws = Workspace::new();
    let file = ws.file("snippet.txt", "print(1)\n");

    runpad()
        .args(["detect", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pass --language"));

    runpad()
        .args(["detect", file.to_str().unwrap(), "--language", "py"])
        .assert()
        .success();
}

#[test]
fn test_locate_python_traceback() {
    runpad()
        .args(["locate", "--language", "python"])
        .write_stdin("Traceback (most recent call last):\n  File \"main.py\", line 7, in <module>\nNameError: x\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("{\"line\":7}"));
}

#[test]
fn test_locate_with_offset_and_no_match() {
    runpad()
        .args(["locate", "--language", "java", "--line-offset", "2"])
        .write_stdin("Exception in thread \"main\" at Main.main(Main.java:9)\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("{\"line\":7}"));

    runpad()
        .args(["locate", "--language", "go"])
        .write_stdin("something went wrong\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("null"));
}

#[test]
fn test_run_empty_file_fails_locally() {
    let ws = Workspace::new();
    let file = ws.file("empty.py", "   \n");

    runpad()
        .args(["run", file.to_str().unwrap(), "--executor-url", DEAD_RUNNER])
        .assert()
        .failure()
        .stderr(predicate::str::contains("there is no code to run"))
        .stderr(predicate::str::contains("hint: write some code first"));
}

#[test]
fn test_run_rejects_non_language() {
    let ws = Workspace::new();
    let file = ws.file("main.txt", "kick the ball\n");

    runpad()
        .args(["run", file.to_str().unwrap(), "--language", "football"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a programming language"));
}

#[test]
fn test_run_accepts_known_custom_language_without_runtime() {
    let ws = Workspace::new();
    let file = ws.file("hello.cob", "DISPLAY 'HELLO'.\n");

    runpad()
        .args([
            "run",
            file.to_str().unwrap(),
            "--language",
            "cobol",
            "--executor-url",
            DEAD_RUNNER,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cobol cannot be executed"));
}

#[test]
fn test_run_input_without_prompt() {
    let ws = Workspace::new();
    let file = ws.file("double.py", "n = int(input())\nprint(n * 2)\n");

    runpad()
        .args([
            "run",
            file.to_str().unwrap(),
            "--no-prompt",
            "--executor-url",
            DEAD_RUNNER,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pass --stdin"));
}

#[test]
fn test_run_unreachable_runner() {
    let ws = Workspace::new();
    let file = ws.file("hello.py", "print(\"hi\")\n");

    runpad()
        .args([
            "run",
            file.to_str().unwrap(),
            "--json",
            "--executor-url",
            DEAD_RUNNER,
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"state\": \"failed\""))
        .stdout(predicate::str::contains("Could not reach the code runner"));
}

#[test]
fn test_draft_set_show_clear() {
    let ws = Workspace::new();
    let drafts = ws.drafts_dir();
    let drafts = drafts.to_str().unwrap();

    runpad()
        .args(["draft", "set", "code-generator", "code", "print(1)", "--drafts-dir", drafts])
        .assert()
        .success();
    runpad()
        .args(["draft", "set", "code-generator", "font_size", "14", "--drafts-dir", drafts])
        .assert()
        .success();

    runpad()
        .args(["draft", "show", "code-generator", "--drafts-dir", drafts])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"code\": \"print(1)\""))
        .stdout(predicate::str::contains("\"font_size\": 14"))
        .stdout(predicate::str::contains("\"dirty\": true"));

    runpad()
        .args(["draft", "clear", "code-generator", "--drafts-dir", drafts])
        .assert()
        .success()
        .stdout(predicate::str::contains("cleared code-generator"));

    runpad()
        .args(["draft", "clear", "code-generator", "--drafts-dir", drafts])
        .assert()
        .success()
        .stdout(predicate::str::contains("already empty"));
}

#[test]
fn test_scratch_restores_draft() {
    let ws = Workspace::new();
    let drafts = ws.drafts_dir();
    let drafts = drafts.to_str().unwrap();

    runpad()
        .args(["scratch", "--key", "notes", "--drafts-dir", drafts])
        .write_stdin(":lang rust\nfn main() {}\n:show\n:quit\ny\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("language: rust"))
        .stderr(predicate::str::contains("fn main() {}"))
        .stderr(predicate::str::contains("has content"));

    runpad()
        .args(["scratch", "--key", "notes", "--drafts-dir", drafts])
        .write_stdin(":clear\n:quit\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Restored draft notes"))
        .stderr(predicate::str::contains("draft cleared"));
}

#[test]
fn test_scratch_debounced_save_while_idle() {
    let ws = Workspace::new();
    let drafts = ws.drafts_dir();

    let mut child = spawn_scratch(&drafts, &["--debounce-ms", "200"]);
    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, "print(1)").unwrap();
    stdin.flush().unwrap();

    // No further input: the window elapses while the session waits.
    thread::sleep(Duration::from_millis(1500));
    let saved = saved_drafts(&drafts);
    assert_eq!(saved.len(), 1);
    assert!(saved[0].contains("print(1)"));

    writeln!(stdin, ":quit\ny").unwrap();
    drop(stdin);
    assert!(child.wait_with_output().unwrap().status.success());
}

#[cfg(unix)]
#[test]
fn test_scratch_interrupt_asks_and_flushes() {
    let ws = Workspace::new();
    let drafts = ws.drafts_dir();

    // The longest window: only the exit flush can save the edit in time.
    let mut child = spawn_scratch(&drafts, &["--debounce-ms", "60000"]);
    let mut stdin = child.stdin.take().unwrap();
    writeln!(stdin, "x = 1").unwrap();
    stdin.flush().unwrap();
    thread::sleep(Duration::from_millis(500));
    assert!(saved_drafts(&drafts).is_empty());

    let status = std::process::Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
    thread::sleep(Duration::from_millis(300));

    writeln!(stdin, "y").unwrap();
    drop(stdin);
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Leave anyway?"));

    let saved = saved_drafts(&drafts);
    assert_eq!(saved.len(), 1);
    assert!(saved[0].contains("x = 1"));
}

#[test]
fn test_empty_draft_key_rejected() {
    let ws = Workspace::new();
    let drafts = ws.drafts_dir();

    runpad()
        .args(["draft", "show", "", "--drafts-dir", drafts.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("draft key must not be empty"));

    runpad()
        .args(["scratch", "--key", " ", "--drafts-dir", drafts.to_str().unwrap()])
        .write_stdin(":quit\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("draft key must not be empty"));
}

#[test]
fn test_scratch_rejects_bad_language() {
    let ws = Workspace::new();
    let drafts = ws.drafts_dir();

    runpad()
        .args(["scratch", "--drafts-dir", drafts.to_str().unwrap()])
        .write_stdin(":lang pizza\n:quit\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("not a valid language name"));
}
