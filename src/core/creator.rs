//! Build plan construction
//!
//! Turns a module graph and the requested phases or goals into a
//! [`BuildPlan`]. Modules are processed in build order, each module gets a
//! straight chain of steps for the requested phase, and dependencies,
//! aggregators and executions are wired on top of those chains.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::defaults::DEFAULT_CLI_EXECUTION_ID;
use crate::core::lifecycle::{after, before, LifecycleRegistry, PhaseChain, AFTER, ALL, AT, BEFORE, EACH};
use crate::core::module::{Module, ModuleId, MojoExecution};
use crate::core::plan::BuildPlan;
use crate::core::resolver::ModuleGraph;
use crate::error::{ConstructionError, WorkspaceError};

/// What to do with a phase no lifecycle declares
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownPhasePolicy {
    /// Create an empty step of that name, ordered like any other step
    #[default]
    Create,
    /// Fail plan construction
    Reject,
}

impl FromStr for UnknownPhasePolicy {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "reject" => Ok(Self::Reject),
            other => Err(WorkspaceError::InvalidValue {
                field: "unknown-phases".to_string(),
                value: other.to_string(),
                reason: "expected 'create' or 'reject'".to_string(),
            }),
        }
    }
}

impl fmt::Display for UnknownPhasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// One requested unit of a build invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// A lifecycle phase, sub-step or alias (`install`, `before:compile`, `all`)
    Lifecycle(String),
    /// A goal invoked directly (`plugin:goal[@execution-id]`)
    Goal(String),
}

impl Task {
    /// Classify a command-line task
    pub fn parse(task: &str) -> Self {
        let is_step = [BEFORE, AFTER, AT].iter().any(|p| task.starts_with(p));
        if !is_step && task.contains(':') {
            Self::Goal(task.to_string())
        } else {
            Self::Lifecycle(task.to_string())
        }
    }

    /// Task as written
    pub fn as_str(&self) -> &str {
        match self {
            Self::Lifecycle(s) | Self::Goal(s) => s,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split `plugin:goal[@id]` into its parts
fn parse_goal(task: &str) -> Result<(&str, &str, &str), ConstructionError> {
    let invalid = || ConstructionError::InvalidGoal {
        goal: task.to_string(),
    };
    let (plugin_goal, execution_id) = match task.split_once('@') {
        Some((pg, id)) if !id.is_empty() => (pg, id),
        Some(_) => return Err(invalid()),
        None => (task, DEFAULT_CLI_EXECUTION_ID),
    };
    let (plugin, goal) = plugin_goal.rsplit_once(':').ok_or_else(invalid)?;
    if plugin.is_empty() || goal.is_empty() {
        return Err(invalid());
    }
    Ok((plugin, goal, execution_id))
}

/// Computes build plans from a module graph
#[derive(Debug, Clone)]
pub struct BuildPlanCreator<'a> {
    registry: &'a LifecycleRegistry,
    unknown_phases: UnknownPhasePolicy,
}

impl<'a> BuildPlanCreator<'a> {
    /// Create a plan creator backed by a lifecycle registry
    pub fn new(registry: &'a LifecycleRegistry) -> Self {
        Self {
            registry,
            unknown_phases: UnknownPhasePolicy::default(),
        }
    }

    /// Set the policy for phases no lifecycle declares
    #[must_use]
    pub fn with_unknown_phases(mut self, policy: UnknownPhasePolicy) -> Self {
        self.unknown_phases = policy;
        self
    }

    /// Plan every task in order, chaining each task's plan after the previous one
    pub fn calculate_mojo_executions(
        &self,
        graph: &ModuleGraph,
        tasks: &[Task],
    ) -> Result<BuildPlan, ConstructionError> {
        let mut plan = BuildPlan::new();
        for task in tasks {
            let segment = match task {
                Task::Lifecycle(phase) => self.calculate_lifecycle_mappings(graph, phase)?,
                Task::Goal(goal) => self.calculate_goal(graph, goal)?,
            };
            plan.then(segment);
        }
        plan.validate()?;
        info!(
            "Build plan for [{}]: {} steps, {} executions, {} modules",
            tasks.iter().map(Task::as_str).collect::<Vec<_>>().join(", "),
            plan.len(),
            plan.execution_count(),
            plan.modules().len()
        );
        Ok(plan)
    }

    /// Plan one lifecycle phase, sub-step or alias for every module
    pub fn calculate_lifecycle_mappings(
        &self,
        graph: &ModuleGraph,
        phase: &str,
    ) -> Result<BuildPlan, ConstructionError> {
        let order = graph.topological_sort()?;
        let chain = self.resolve(phase)?;
        let (Some(first), Some(last)) = (chain.first(), chain.last()) else {
            return Ok(BuildPlan::new());
        };

        let mut plan = BuildPlan::new();

        // Straight chain of steps within each module
        for module in &order {
            let mut prev = None;
            for name in &chain.steps {
                let id = plan.required_step(module, name);
                if let Some(prev) = prev {
                    plan.execute_after(id, prev);
                }
                prev = Some(id);
            }
        }

        if chain.aggregate {
            Self::check_collection(graph, &order)?;
        }

        // A dependency finishes before its dependents start. With the
        // aggregate chain, before:all and after:all of an aggregator only
        // take the fan-out and fan-in edges, so its dependency edges attach
        // to before:each and after:each instead.
        for module in &order {
            for dep in module.dependencies() {
                let dep_module = Self::lookup(graph, module, dep)?;
                let from = if chain.aggregate && dep_module.is_aggregator() {
                    after(EACH)
                } else {
                    last.to_string()
                };
                let to = if chain.aggregate && module.is_aggregator() {
                    before(EACH)
                } else {
                    first.to_string()
                };
                let from = plan.required_step(dep_module, &from);
                let to = plan.required_step(module, &to);
                debug!("{} runs after {}", plan[to].label(), plan[from].label());
                plan.execute_after(to, from);
            }
        }

        // Aggregators open before and close after their collected modules
        if chain.aggregate {
            for module in &order {
                for child in module.collected() {
                    let child_module = Self::lookup(graph, module, child)?;
                    let parent_start = plan.required_step(module, &before(ALL));
                    let child_start = plan.required_step(child_module, &before(ALL));
                    plan.execute_after(child_start, parent_start);
                    let child_end = plan.required_step(child_module, &after(ALL));
                    let parent_end = plan.required_step(module, &after(ALL));
                    plan.execute_after(parent_end, child_end);
                }
            }
        }

        self.attach_executions(&mut plan, &order);
        plan.validate()?;

        debug!(
            "Lifecycle mappings for '{phase}' ({}): {} steps",
            if chain.lifecycle.is_empty() { "undeclared" } else { &chain.lifecycle },
            plan.len()
        );
        Ok(plan)
    }

    /// Plan a goal invoked directly, once per module, in build order
    pub fn calculate_goal(&self, graph: &ModuleGraph, task: &str) -> Result<BuildPlan, ConstructionError> {
        let (plugin, goal, execution_id) = parse_goal(task)?;
        let order = graph.topological_sort()?;

        let mut plan = BuildPlan::new();
        for module in &order {
            let id = plan.required_step(module, task);
            plan.add_mojo(id, MojoExecution::new(plugin, goal, execution_id), 0);
        }
        for module in &order {
            let to = plan.required_step(module, task);
            for dep in module.dependencies() {
                let from = plan.required_step(Self::lookup(graph, module, dep)?, task);
                plan.execute_after(to, from);
            }
        }
        Ok(plan)
    }

    fn resolve(&self, phase: &str) -> Result<PhaseChain, ConstructionError> {
        if let Some(chain) = self.registry.resolve(phase) {
            return Ok(chain);
        }
        match self.unknown_phases {
            UnknownPhasePolicy::Reject => Err(ConstructionError::UnknownPhase {
                phase: phase.to_string(),
                available: self.registry.available_phases(),
            }),
            UnknownPhasePolicy::Create => {
                warn!("Phase '{phase}' is not declared by any lifecycle, planning it as an empty step");
                Ok(PhaseChain {
                    lifecycle: String::new(),
                    steps: vec![phase.to_string()],
                    aggregate: false,
                })
            }
        }
    }

    /// Reject aggregators that end up collecting themselves
    fn check_collection(graph: &ModuleGraph, order: &[Arc<Module>]) -> Result<(), ConstructionError> {
        for module in order {
            if !graph.collected_closure(module.id()).contains(module.id()) {
                continue;
            }
            let via = module
                .collected()
                .iter()
                .find(|c| *c == module.id() || graph.collected_closure(c).contains(module.id()));
            let mut cycle = vec![module.id().to_string()];
            cycle.extend(via.filter(|c| *c != module.id()).map(ToString::to_string));
            cycle.push(module.id().to_string());
            return Err(ConstructionError::CyclicModules { cycle });
        }
        Ok(())
    }

    fn lookup<'g>(
        graph: &'g ModuleGraph,
        module: &Module,
        reference: &ModuleId,
    ) -> Result<&'g Arc<Module>, ConstructionError> {
        graph.get(reference).ok_or_else(|| ConstructionError::UnknownModule {
            module: module.id().to_string(),
            reference: reference.to_string(),
        })
    }

    /// Bind each module's executions to the matching step of the plan
    ///
    /// Executions bound to phases outside the plan are left out.
    fn attach_executions(&self, plan: &mut BuildPlan, modules: &[Arc<Module>]) {
        for module in modules {
            for execution in module.executions() {
                let Some(phase) = execution.phase.as_deref() else {
                    debug!("{}: execution {execution} has no phase, skipped", module.id());
                    continue;
                };
                let step = self.registry.binding_step(phase);
                if let Some(id) = plan.step_id(module.id(), &step) {
                    plan.add_mojo(id, execution.clone(), execution.priority);
                }
            }
        }
    }
}
