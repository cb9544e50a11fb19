#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;
use todo::task::Task;

/// Isolated home, config and data directories for one test.
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    /// `todo` with storage pointed at this env and no ambient config.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("todo").expect("binary");
        cmd.env("TODO_DATA_DIR", self.data_dir())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .env("XDG_DATA_HOME", self.path().join("xdg-data"))
            .env_remove("TODO_CONFIG")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run `todo --json <args>` successfully and return the parsed envelope.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json output")
    }

    /// Add a task via the CLI and return its id.
    pub fn add_task(&self, args: &[&str]) -> String {
        let mut full = vec!["add"];
        full.extend_from_slice(args);
        let value = self.json(&full);
        assert_eq!(value["data"]["changed"], Value::Bool(true), "{value}");
        value["data"]["task"]["id"]
            .as_u64()
            .expect("task id")
            .to_string()
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.path().join("todo.toml");
        fs::write(&path, contents).expect("write config");
        path
    }

    pub fn write_entry(&self, key: &str, contents: &str) {
        fs::create_dir_all(self.data_dir()).expect("create data dir");
        fs::write(self.data_dir().join(format!("{key}.json")), contents).expect("write entry");
    }

    pub fn read_tasks(&self) -> Vec<Task> {
        let path = self.data_dir().join("tasks.json");
        if !path.exists() {
            return Vec::new();
        }
        let content = fs::read_to_string(path).expect("read tasks");
        serde_json::from_str(&content).expect("parse tasks")
    }

    pub fn read_tags(&self) -> Vec<String> {
        let path = self.data_dir().join("tags.json");
        if !path.exists() {
            return Vec::new();
        }
        let content = fs::read_to_string(path).expect("read tags");
        serde_json::from_str(&content).expect("parse tags")
    }
}
