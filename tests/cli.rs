mod common;

use common::{path_arg, refused_base_url, StubReply, StubServer, TestEnv};
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::json;
use std::time::Duration;

#[test]
fn version_flag() {
    TestEnv::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("nuvai"));
}

#[test]
fn validate_text_line() {
    let env = TestEnv::new();
    let src = env.write_source("main.cpp", "int main() {}\n");
    env.cmd()
        .args(["validate", path_arg(&src)])
        .assert()
        .success()
        .stdout(contains("accepted\tmain.cpp\ttext/x-c++src").and(contains("(limit 1MB)")));
}

#[test]
fn text_errors_go_to_stderr_with_next_step() {
    let env = TestEnv::new();
    let src = env.write_source("report.pdf", "%PDF");
    env.cmd()
        .args(["validate", path_arg(&src)])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(contains("error[UNSUPPORTED_EXTENSION]").and(contains("next: choose a different file")));
}

#[test]
fn timeout_is_reported_in_text_mode() {
    let env = TestEnv::new();
    let server = StubServer::start(vec![
        StubReply::json(200, json!([])).delayed(Duration::from_millis(2_000))
    ]);
    let src = env.write_source("app.jsx", "<App />\n");
    env.cmd()
        .args(["scan", path_arg(&src), "--base-url", &server.base_url, "--timeout-ms", "300"])
        .assert()
        .code(1)
        .stderr(contains("error[SCAN_TIMEOUT]: Scan timed out. Please try again."));
}

#[test]
fn scan_text_lists_findings_with_badges() {
    let env = TestEnv::new();
    let server = StubServer::start(vec![StubReply::json(
        200,
        json!([
            {"level": "LOW", "type": "Naming", "message": "short name", "recommendation": "Rename."},
            {"level": "CRITICAL", "type": "SQL Injection", "message": "string concat query", "recommendation": "Use parameters."},
            {"level": "SHOUTY", "type": "Custom"}
        ]),
    )]);
    let src = env.write_source("db.py", "q = 'x' + y\n");
    env.cmd()
        .args(["scan", path_arg(&src), "--base-url", &server.base_url])
        .assert()
        .success()
        .stdout(
            contains("file: db.py")
                .and(contains("sha256: "))
                .and(contains("Scan results: 3 of 3 shown (filter: ALL)"))
                .and(contains(" 1. 🔴 [CRITICAL] SQL Injection"))
                .and(contains("Recommendation: Use parameters."))
                .and(contains("[SHOUTY] Custom"))
                .and(contains("No recommendation available.")),
        );
}

#[test]
fn scan_reports_no_findings_message() {
    let env = TestEnv::new();
    let server = StubServer::start(vec![StubReply::json(200, json!([]))]);
    let src = env.write_source("clean.html", "<p>hi</p>\n");
    env.cmd()
        .args(["scan", path_arg(&src), "--base-url", &server.base_url])
        .assert()
        .success()
        .stdout(contains("No issues found. The scan reported no findings."));
}

#[test]
fn diagnostics_show_when_empty() {
    TestEnv::new()
        .cmd()
        .args(["diagnostics", "show"])
        .assert()
        .success()
        .stdout(contains("no diagnostic record"));
}

#[test]
fn shell_session_over_stdin() {
    let env = TestEnv::new();
    let bad = env.write_source("run.exe", "MZ");
    let script = format!(
        "help\nscan {}\nfilter HIGH\nshow\nhome\nquit\n",
        path_arg(&bad)
    );
    env.cmd()
        .env("NUVAI_API_URL", refused_base_url())
        .arg("shell")
        .write_stdin(script)
        .assert()
        .success()
        .stdout(
            contains("nuvai shell (route /)")
                .and(contains("error[UNSUPPORTED_EXTENSION]"))
                .and(contains("no results yet"))
                .and(contains("home: /")),
        );
}
