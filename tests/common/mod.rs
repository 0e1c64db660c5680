//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Test workspace context
///
/// Creates a temporary directory holding a `weave.toml` and runs the
/// `weave` binary inside it.
pub struct TestProject {
    /// Temporary directory for the test workspace
    pub dir: TempDir,
}

impl TestProject {
    /// Create an empty test workspace directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a test workspace with the given `weave.toml`
    pub fn with_workspace(content: &str) -> Self {
        let project = Self::new();
        project.create_file("weave.toml", content);
        project
    }

    /// Get the path to the test workspace directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test workspace
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test workspace
    #[allow(dead_code)]
    pub fn create_dir(&self, name: &str) {
        std::fs::create_dir_all(self.dir.path().join(name)).expect("Failed to create directory");
    }

    /// Check if a file exists in the test workspace
    #[allow(dead_code)]
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test workspace
    #[allow(dead_code)]
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Run `weave` with `args` inside the workspace
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_weave"))
            .current_dir(self.path())
            .env_remove("WEAVE_THREADS")
            .env_remove("RUST_LOG")
            .args(args)
            .output()
            .expect("Failed to execute weave")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Stdout of a finished command
#[allow(dead_code)]
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Stderr of a finished command
#[allow(dead_code)]
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Three chained modules under one aggregator; every compile execution
/// appends its artifact to `order.txt`
#[allow(dead_code)]
pub const SAMPLE_WORKSPACE: &str = r#"
[workspace]
name = "sample"

[[module]]
group = "org.sample"
artifact = "api"

[[module.execution]]
id = "compile-api"
phase = "compile"
run = "echo api >> order.txt"

[[module]]
group = "org.sample"
artifact = "core"
depends-on = ["org.sample:api"]

[[module.execution]]
id = "compile-core"
phase = "compile"
run = "echo core >> order.txt"

[[module]]
group = "org.sample"
artifact = "app"
depends-on = ["org.sample:core"]

[[module.execution]]
id = "compile-app"
phase = "compile"
run = "echo app >> order.txt"

[[module]]
group = "org.sample"
artifact = "parent"
modules = ["org.sample:api", "org.sample:core", "org.sample:app"]

[goals]
"exec:hello" = "echo hello >> goals.txt"
"#;

/// `core` fails to compile; `tools` is unrelated to it
#[allow(dead_code)]
pub const FAILING_WORKSPACE: &str = r#"
[workspace]
name = "failing"

[[module]]
group = "org.sample"
artifact = "api"

[[module.execution]]
id = "compile-api"
phase = "compile"
run = "echo api >> order.txt"

[[module]]
group = "org.sample"
artifact = "core"
depends-on = ["org.sample:api"]

[[module.execution]]
id = "compile-core"
phase = "compile"
run = "echo broken >&2; exit 3"

[[module]]
group = "org.sample"
artifact = "app"
depends-on = ["org.sample:core"]

[[module.execution]]
id = "compile-app"
phase = "compile"
run = "echo app >> order.txt"

[[module]]
group = "org.sample"
artifact = "tools"
depends-on = ["org.sample:api"]

[[module.execution]]
id = "compile-tools"
phase = "compile"
run = "echo tools >> order.txt"
"#;
