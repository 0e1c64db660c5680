//! Shell command execution sink
//!
//! Runs the command configured for an execution with `sh -c`, in the module's
//! base directory.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::config::defaults::{FAILURE_OUTPUT_LINES, RUN_KEY};
use crate::core::executor::MojoExecutor;
use crate::core::module::{Module, MojoExecution};
use crate::error::ActionError;

/// Runs executions as shell commands
///
/// The command is the execution's `run` configuration entry, or the `[goals]`
/// entry for its `plugin:goal` when invoked directly.
#[derive(Debug, Clone, Default)]
pub struct ProcessMojoExecutor {
    goals: BTreeMap<String, String>,
}

impl ProcessMojoExecutor {
    /// Create an executor with the workspace goal commands
    pub fn new(goals: BTreeMap<String, String>) -> Self {
        Self { goals }
    }

    /// Command for an execution, if one is configured
    pub fn command_for<'a>(&'a self, execution: &'a MojoExecution) -> Option<&'a str> {
        execution
            .configuration
            .get(RUN_KEY)
            .or_else(|| self.goals.get(&format!("{}:{}", execution.plugin, execution.goal)))
            .map(String::as_str)
    }
}

impl MojoExecutor for ProcessMojoExecutor {
    fn execute(&self, module: &Module, step: &str, execution: &MojoExecution) -> Result<(), ActionError> {
        let Some(script) = self.command_for(execution) else {
            return Err(ActionError::Failed {
                execution: execution.key(),
                message: format!(
                    "no '{RUN_KEY}' command configured and no [goals] entry for '{}:{}'",
                    execution.plugin, execution.goal
                ),
            });
        };

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        if let Some(dir) = module.base_dir().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        cmd.env("WEAVE_MODULE", module.id().to_string())
            .env("WEAVE_ARTIFACT", &module.id().artifact)
            .env("WEAVE_VERSION", module.version())
            .env("WEAVE_STEP", step)
            .env("WEAVE_EXECUTION", &execution.id);

        debug!("{}/{step}: sh -c {script:?}", module.id());
        let output = cmd.output().map_err(|e| ActionError::Spawn {
            execution: execution.key(),
            message: format!("{e} (in {})", module.base_dir().unwrap_or(Path::new(".")).display()),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            debug!("[{}] {line}", module.id().artifact);
        }

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ActionError::Failed {
            execution: execution.key(),
            message: format!("{}{}", output.status, tail(&stderr, FAILURE_OUTPUT_LINES)),
        })
    }
}

/// Last `n` non-empty lines of command output, indented under the status
fn tail(output: &str, n: usize) -> String {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].iter().map(|l| format!("\n    {l}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn execution(run: &str) -> MojoExecution {
        MojoExecution::new("exec", "run", "test").with_config(RUN_KEY, run)
    }

    #[test]
    fn test_successful_command() {
        let module = Module::new("g", "a", "1.0");
        assert!(ProcessMojoExecutor::default()
            .execute(&module, "compile", &execution("true"))
            .is_ok());
    }

    #[test]
    fn test_failed_command_reports_stderr() {
        let module = Module::new("g", "a", "1.0");
        let err = ProcessMojoExecutor::default()
            .execute(&module, "compile", &execution("echo broken >&2; exit 3"))
            .unwrap_err();
        let ActionError::Failed { execution, message } = err else {
            panic!("expected a failure");
        };
        assert_eq!(execution, "exec:run@test");
        assert!(message.contains("broken"));
        assert!(message.contains('3'));
    }

    #[test]
    fn test_runs_in_base_dir_with_env() {
        let dir = TempDir::new().unwrap();
        let module = Module::new("g", "a", "1.0").with_base_dir(dir.path());
        ProcessMojoExecutor::default()
            .execute(&module, "compile", &execution("echo \"$WEAVE_MODULE $WEAVE_STEP\" > out.txt"))
            .unwrap();
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written.trim(), "g:a compile");
    }

    #[test]
    fn test_goal_command_lookup() {
        let goals = BTreeMap::from([("exec:hello".to_string(), "true".to_string())]);
        let executor = ProcessMojoExecutor::new(goals);
        let goal = MojoExecution::new("exec", "hello", "default-cli");
        assert_eq!(executor.command_for(&goal), Some("true"));
        assert!(executor.execute(&Module::new("g", "a", "1.0"), "exec:hello", &goal).is_ok());

        let unknown = MojoExecution::new("exec", "other", "default-cli");
        assert!(executor.command_for(&unknown).is_none());
        assert!(executor.execute(&Module::new("g", "a", "1.0"), "exec:other", &unknown).is_err());
    }

    #[test]
    fn test_missing_base_dir_is_spawn_error() {
        let module = Module::new("g", "a", "1.0").with_base_dir("/nonexistent/weave/dir");
        let err = ProcessMojoExecutor::default()
            .execute(&module, "compile", &execution("true"))
            .unwrap_err();
        assert!(matches!(err, ActionError::Spawn { .. }));
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("a\n\nb\nc\n", 2), "\n    b\n    c");
        assert_eq!(tail("", 5), "");
    }
}
