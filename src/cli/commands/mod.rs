//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod lifecycles;
pub mod plan;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Subcommand};

use crate::config::defaults::THREADS_ENV;
use crate::core::creator::{BuildPlanCreator, Task};
use crate::core::executor::FailureBehavior;
use crate::core::plan::BuildPlan;
use crate::core::session::{BuildSettings, SettingsOverrides, Threads};
use crate::core::workspace::Workspace;
use crate::error::WeaveError;

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Explicit workspace descriptor
    pub file: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Phase handling flags shared by `plan` and `build`
#[derive(Args, Debug, Clone, Default)]
pub struct PhaseArgs {
    /// Fail on phases no lifecycle declares instead of planning an empty step
    #[arg(long)]
    pub strict_phases: bool,

    /// Accept Maven 3 style phase names (generate-resources, process-classes, ...)
    #[arg(long)]
    pub legacy_aliases: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the build plan of the given phases and goals
    Plan {
        /// Phases, sub-steps (before:compile), aliases or goals (plugin:goal[@id])
        #[arg(required = true)]
        tasks: Vec<String>,

        /// Output DOT graph format
        #[arg(long)]
        graph: bool,

        /// Only show steps that run executions
        #[arg(long)]
        hide_empty: bool,

        #[command(flatten)]
        phases: PhaseArgs,
    },

    /// Run the given phases and goals across the workspace
    #[command(group(ArgGroup::new("failure").args(["fail_fast", "fail_at_end", "fail_never"])))]
    Build {
        /// Phases, sub-steps (before:compile), aliases or goals (plugin:goal[@id])
        #[arg(required = true)]
        tasks: Vec<String>,

        /// Worker threads (`4`, or `1.5C` for 1.5 per CPU core)
        #[arg(short = 'T', long, env = THREADS_ENV)]
        threads: Option<Threads>,

        /// Stop at the first failure
        #[arg(long)]
        fail_fast: bool,

        /// Skip what depends on a failure, build everything else
        #[arg(long)]
        fail_at_end: bool,

        /// Keep building after failures
        #[arg(long)]
        fail_never: bool,

        #[command(flatten)]
        phases: PhaseArgs,
    },

    /// List lifecycles, their phases and aliases
    Lifecycles {
        /// Also list Maven 3 style phase names (on when the workspace enables them)
        #[arg(long)]
        legacy_aliases: bool,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(self, options: &GlobalOptions) -> Result<()> {
        match self {
            Self::Plan {
                tasks,
                graph,
                hide_empty,
                phases,
            } => {
                let overrides = phases.overrides();
                plan::execute(options, &tasks, &overrides, graph, hide_empty)
            }
            Self::Build {
                tasks,
                threads,
                fail_fast,
                fail_at_end,
                fail_never,
                phases,
            } => {
                let failure = if fail_never {
                    Some(FailureBehavior::FailNever)
                } else if fail_at_end {
                    Some(FailureBehavior::FailAtEnd)
                } else if fail_fast {
                    Some(FailureBehavior::FailFast)
                } else {
                    None
                };
                let overrides = SettingsOverrides {
                    threads,
                    failure,
                    ..phases.overrides()
                };
                build::execute(options, &tasks, &overrides).await
            }
            Self::Lifecycles { legacy_aliases } => lifecycles::execute(options, legacy_aliases),
        }
    }
}

impl PhaseArgs {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            strict_phases: self.strict_phases,
            legacy_aliases: self.legacy_aliases,
            ..SettingsOverrides::default()
        }
    }
}

/// Load the workspace named by `-f`, or discover it from the current directory
pub(crate) fn load_workspace(options: &GlobalOptions) -> Result<Workspace> {
    match &options.file {
        Some(path) => Workspace::load(path)
            .with_context(|| format!("Failed to load workspace from {}", path.display())),
        None => {
            let current_dir = std::env::current_dir()?;
            Workspace::discover(&current_dir).context("No workspace found")
        }
    }
}

/// Resolve settings and compute the plan for `tasks`
pub(crate) fn prepare_plan(
    workspace: &Workspace,
    tasks: &[String],
    overrides: &SettingsOverrides,
) -> Result<(BuildPlan, BuildSettings), WeaveError> {
    let settings = BuildSettings::resolve(&workspace.workspace, overrides)?;
    let graph = workspace.to_module_graph()?;
    let registry = settings.registry();
    let tasks: Vec<Task> = tasks.iter().map(|t| Task::parse(t)).collect();

    let plan = BuildPlanCreator::new(&registry)
        .with_unknown_phases(settings.unknown_phases)
        .calculate_mojo_executions(&graph, &tasks)?;
    Ok((plan, settings))
}
