//! Build command implementation
//!
//! Implements `weave build` to run phases and goals across the workspace.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use super::{load_workspace, prepare_plan, GlobalOptions};
use crate::cli::output::{status, OutputConfig, ProgressListener};
use crate::core::executor::BuildPlanExecutor;
use crate::core::logger::BuildPlanLogger;
use crate::core::session::SettingsOverrides;
use crate::infra::process::ProcessMojoExecutor;

/// Execute the build command
pub async fn execute(options: &GlobalOptions, tasks: &[String], overrides: &SettingsOverrides) -> Result<()> {
    let workspace = load_workspace(options)?;
    let (plan, settings) = prepare_plan(&workspace, tasks, overrides).context("Failed to compute the build plan")?;

    tracing::info!("Building {}: {}", workspace.name(), tasks.join(" "));
    BuildPlanLogger::new().write_plan(&plan);

    let progress = Arc::new(ProgressListener::new(OutputConfig::global().show_progress()));
    let executor = BuildPlanExecutor::new(Arc::new(ProcessMojoExecutor::new(workspace.goals.clone())))
        .with_threads(settings.threads.count())
        .with_failure_behavior(settings.failure)
        .with_listener(progress.clone());

    let result = executor.execute(plan).await?;
    progress.finish();

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if !options.quiet {
        println!("{}", result.format_summary());
    }

    if !result.is_success() {
        bail!("Build failed: {} step(s) failed", result.failures().count());
    }
    if !options.json && !options.quiet {
        println!("{} {} steps run", status::SUCCESS, result.started());
    }
    Ok(())
}
