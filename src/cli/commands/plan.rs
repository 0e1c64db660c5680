//! Plan command implementation
//!
//! Implements `weave plan` to show the steps a build would run.

use anyhow::{Context, Result};
use serde::Serialize;

use super::{load_workspace, prepare_plan, GlobalOptions};
use crate::core::logger::BuildPlanLogger;
use crate::core::plan::BuildPlan;
use crate::core::session::SettingsOverrides;

/// One step of the JSON plan report
#[derive(Debug, Serialize)]
struct StepReport {
    module: String,
    step: String,
    predecessors: Vec<String>,
    executions: Vec<String>,
}

fn report(plan: &BuildPlan) -> Vec<StepReport> {
    plan.all_steps()
        .map(|step| StepReport {
            module: step.module().id().to_string(),
            step: step.name().to_string(),
            predecessors: step.predecessors().map(|p| plan[p].label()).collect(),
            executions: step.executions().map(|e| e.key()).collect(),
        })
        .collect()
}

/// Execute the plan command
pub fn execute(
    options: &GlobalOptions,
    tasks: &[String],
    overrides: &SettingsOverrides,
    graph: bool,
    hide_empty: bool,
) -> Result<()> {
    let workspace = load_workspace(options)?;
    let (plan, _) = prepare_plan(&workspace, tasks, overrides).context("Failed to compute the build plan")?;
    let logger = BuildPlanLogger::new().hide_empty_steps(hide_empty);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report(&plan))?);
    } else if graph {
        print!("{}", logger.format_dot(&plan));
    } else {
        print!("{}", logger.format_plan(&plan));
    }
    Ok(())
}
