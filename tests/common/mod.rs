#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[path = "../../src/testing.rs"]
mod stub;

pub use stub::{refused_base_url, StubReply, StubServer};

const NUVAI_VARS: &[&str] = &[
    "NUVAI_API_URL",
    "NUVAI_TIMEOUT_MS",
    "NUVAI_ERROR_ENDPOINT",
    "NUVAI_MODE",
    "NUVAI_CLIPBOARD_CMD",
    "NUVAI_LOG_JSON",
];

pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub work: PathBuf,
    cargo_home: PathBuf,
    rustup_home: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        let work = tmp.path().join("work");
        fs::create_dir_all(&home).expect("create isolated home");
        fs::create_dir_all(&work).expect("create work dir");

        let orig_home = std::env::var("HOME").unwrap_or_default();
        let cargo_home = PathBuf::from(&orig_home).join(".cargo");
        let rustup_home = PathBuf::from(&orig_home).join(".rustup");

        Self {
            _tmp: tmp,
            home,
            work,
            cargo_home,
            rustup_home,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("nuvai");
        for var in NUVAI_VARS {
            cmd.env_remove(var);
        }
        cmd.env("HOME", &self.home)
            .env("CARGO_HOME", &self.cargo_home)
            .env("RUSTUP_HOME", &self.rustup_home)
            .current_dir(&self.work);
        cmd
    }

    pub fn write_source(&self, name: &str, body: &str) -> PathBuf {
        let path = self.work.join(name);
        fs::write(&path, body).expect("write source file");
        path
    }

    pub fn write_config(&self, toml: &str) {
        let dir = self.config_dir();
        fs::create_dir_all(&dir).expect("create config dir");
        fs::write(dir.join("config.toml"), toml).expect("write config");
    }

    pub fn config_dir(&self) -> PathBuf {
        self.home.join(".config/nuvai")
    }

    pub fn diagnostic_slot(&self) -> PathBuf {
        self.config_dir().join("nuvai_last_error.json")
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    pub fn run_json_failure(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .failure()
            .code(1)
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json error output")
    }
}

pub fn path_arg(p: &Path) -> &str {
    p.to_str().expect("utf8 path")
}
