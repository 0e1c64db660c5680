//! Build results
//!
//! Outcome of every step of an executed plan plus the per-module reactor
//! summary printed at the end of a build.

use std::fmt::{self, Write as _};
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::core::module::ModuleId;
use crate::error::ActionError;

/// Lifecycle of a step during execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Pending,
    Ready,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl StepState {
    /// Whether the step reached a final state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Final state of one step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub module: ModuleId,
    pub step: String,
    pub state: StepState,
    /// Action failure, for failed steps
    #[serde(serialize_with = "serialize_error", skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionError>,
    /// Label of the failed step that caused the skip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_because: Option<String>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl StepOutcome {
    /// `group:artifact/step`
    pub fn label(&self) -> String {
        format!("{}/{}", self.module, self.step)
    }
}

/// Reactor status of one module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModuleStatus {
    Success,
    Failure,
    Skipped,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
            Self::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Reactor summary line of one module
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSummary {
    pub module: ModuleId,
    pub version: String,
    pub status: ModuleStatus,
    /// Time spent in this module's steps
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

/// Result of executing a build plan
#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    /// Step outcomes in plan creation order
    steps: Vec<StepOutcome>,
    /// Per-module summary in plan module order
    modules: Vec<ModuleSummary>,
    #[serde(rename = "wall_time_ms", serialize_with = "serialize_millis")]
    wall_time: Duration,
}

impl BuildResult {
    pub(crate) fn new(steps: Vec<StepOutcome>, modules: Vec<(ModuleId, String)>, wall_time: Duration) -> Self {
        let modules = modules
            .into_iter()
            .map(|(module, version)| {
                let own: Vec<&StepOutcome> = steps.iter().filter(|s| s.module == module).collect();
                let status = if own.iter().any(|s| s.state == StepState::Failed) {
                    ModuleStatus::Failure
                } else if own.iter().any(|s| s.state == StepState::Skipped) {
                    ModuleStatus::Skipped
                } else {
                    ModuleStatus::Success
                };
                ModuleSummary {
                    duration: own.iter().map(|s| s.duration).sum(),
                    module,
                    version,
                    status,
                }
            })
            .collect();
        Self {
            steps,
            modules,
            wall_time,
        }
    }

    /// True when no step failed
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Every step outcome
    pub fn steps(&self) -> &[StepOutcome] {
        &self.steps
    }

    /// Failed steps
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.state == StepState::Failed)
    }

    /// Skipped steps
    pub fn skipped(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.state == StepState::Skipped)
    }

    /// Steps that were actually run
    pub fn started(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.state, StepState::Succeeded | StepState::Failed))
            .count()
    }

    /// Outcome of one step
    pub fn outcome(&self, module: &ModuleId, step: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| &s.module == module && s.step == step)
    }

    /// Reactor summary, one entry per module
    pub fn module_summaries(&self) -> &[ModuleSummary] {
        &self.modules
    }

    /// Total wall clock time of the run
    pub fn wall_time(&self) -> Duration {
        self.wall_time
    }

    /// Human readable reactor summary
    pub fn format_summary(&self) -> String {
        let mut out = String::from("Reactor Summary:\n\n");
        let width = self
            .modules
            .iter()
            .map(|m| m.module.to_string().len() + m.version.len() + 1)
            .max()
            .unwrap_or(0)
            + 2;

        for summary in &self.modules {
            let name = format!("{} {} ", summary.module, summary.version);
            let _ = write!(out, "  {name:.<width$} {}", summary.status);
            if summary.status != ModuleStatus::Skipped {
                let _ = write!(out, " [{:>7.3} s]", summary.duration.as_secs_f64());
            }
            out.push('\n');
        }

        let _ = writeln!(
            out,
            "\nBUILD {}",
            if self.is_success() { "SUCCESS" } else { "FAILURE" }
        );
        let _ = writeln!(out, "Total time: {:.3} s", self.wall_time.as_secs_f64());

        let failures: Vec<&StepOutcome> = self.failures().collect();
        if !failures.is_empty() {
            out.push_str("\nFailed steps:\n");
            for step in failures {
                let reason = step.error.as_ref().map(ToString::to_string).unwrap_or_default();
                let _ = writeln!(out, "  {}: {reason}", step.label());
            }
        }

        let skipped: Vec<&StepOutcome> = self.skipped().collect();
        if !skipped.is_empty() {
            out.push_str("\nSkipped steps:\n");
            for step in skipped {
                match &step.skipped_because {
                    Some(cause) => {
                        let _ = writeln!(out, "  {} (after failure of {cause})", step.label());
                    }
                    None => {
                        let _ = writeln!(out, "  {}", step.label());
                    }
                }
            }
        }

        out
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

fn serialize_error<S: Serializer>(error: &Option<ActionError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_str(&error.to_string()),
        None => serializer.serialize_none(),
    }
}
