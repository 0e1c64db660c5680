//! Build plan dumps
//!
//! Renders a plan per module as an indented tree, or as a DOT graph of the
//! whole step DAG.

use std::fmt::Write as _;

use tracing::{debug, enabled, Level};

use crate::core::module::ModuleId;
use crate::core::plan::BuildPlan;
use crate::core::step::BuildStep;

/// Formats build plans for logs and the `plan` command
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildPlanLogger {
    /// Leave out steps without executions
    hide_empty: bool,
}

impl BuildPlanLogger {
    /// Create a logger showing every step
    pub fn new() -> Self {
        Self::default()
    }

    /// Only show steps that run something
    #[must_use]
    pub fn hide_empty_steps(mut self, hide: bool) -> Self {
        self.hide_empty = hide;
        self
    }

    /// Emit the plan as `debug` events, one per module
    pub fn write_plan(&self, plan: &BuildPlan) {
        if !enabled!(Level::DEBUG) {
            return;
        }
        for module in plan.modules() {
            debug!("Build plan for {}:\n{}", module.coordinate(), self.format_module(plan, module.id()));
        }
    }

    /// Whole plan, modules in plan order
    pub fn format_plan(&self, plan: &BuildPlan) -> String {
        if plan.is_empty() {
            return "Empty build plan".to_string();
        }

        let mut output = String::new();
        for module in plan.modules() {
            let _ = writeln!(output, "{}", module.coordinate());
            output.push_str(&self.format_module(plan, module.id()));
        }
        let _ = writeln!(
            output,
            "\n{} steps, {} executions, {} modules",
            plan.len(),
            plan.execution_count(),
            plan.modules().len()
        );
        output
    }

    /// Steps of one module as a tree
    ///
    /// Each step lists its predecessors from other modules and its
    /// executions in run order.
    pub fn format_module(&self, plan: &BuildPlan, module: &ModuleId) -> String {
        let steps: Vec<&BuildStep> = plan
            .steps(module)
            .filter(|s| !self.hide_empty || !s.is_empty())
            .collect();

        let mut output = String::new();
        for (i, step) in steps.iter().enumerate() {
            let is_last = i == steps.len() - 1;
            let connector = if is_last { "└── " } else { "├── " };
            let child_prefix = if is_last { "    " } else { "│   " };

            let external: Vec<String> = step
                .predecessors()
                .map(|p| &plan[p])
                .filter(|p| p.module().id() != module)
                .map(BuildStep::label)
                .collect();
            if external.is_empty() {
                let _ = writeln!(output, "{connector}{}", step.name());
            } else {
                let _ = writeln!(output, "{connector}{} (after {})", step.name(), external.join(", "));
            }

            for (priority, execution) in step.prioritized_executions() {
                let _ = writeln!(output, "{child_prefix}• {} [{priority}]", execution.key());
            }
        }
        output
    }

    /// Plan as a DOT graph, one cluster per module
    pub fn format_dot(&self, plan: &BuildPlan) -> String {
        let mut output = String::new();
        output.push_str("digraph plan {\n");
        output.push_str("    rankdir=LR;\n");
        output.push_str("    node [shape=box];\n");

        for (i, module) in plan.modules().iter().enumerate() {
            let _ = writeln!(output, "\n    subgraph cluster_{i} {{");
            let _ = writeln!(output, "        label=\"{}\";", module.coordinate());
            for step in plan.steps(module.id()) {
                let style = if step.is_empty() { "dashed" } else { "solid" };
                let _ = writeln!(
                    output,
                    "        \"{}\" [label=\"{}\", style={style}];",
                    step.label(),
                    step.name()
                );
            }
            output.push_str("    }\n");
        }
        output.push('\n');

        for step in plan.all_steps() {
            for succ in step.successors() {
                let _ = writeln!(output, "    \"{}\" -> \"{}\";", step.label(), plan[succ].label());
            }
        }

        output.push_str("}\n");
        output
    }
}
