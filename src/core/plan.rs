//! Build plan
//!
//! The plan is the DAG of build steps for one run, keyed by (module, step
//! name). Steps are stored in an arena and linked by [`StepId`], so every edge
//! always points at a step owned by the same plan.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};
use std::ops::Index;
use std::sync::Arc;

use crate::core::module::{Module, ModuleId, MojoExecution};
use crate::core::step::{BuildStep, StepId};
use crate::error::ConstructionError;

/// DAG of build steps
#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    /// Step arena, in creation order
    steps: Vec<BuildStep>,
    /// Module -> step name -> step
    index: HashMap<ModuleId, BTreeMap<String, StepId>>,
    /// Modules in the order their first step was created
    modules: Vec<Arc<Module>>,
}

impl BuildPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the step `name` of `module`
    ///
    /// Repeated calls with the same key return the same step.
    pub fn required_step(&mut self, module: &Arc<Module>, name: &str) -> StepId {
        if let Some(id) = self.step_id(module.id(), name) {
            return id;
        }

        let id = StepId(self.steps.len());
        self.steps.push(BuildStep::new(id, Arc::clone(module), name));
        if !self.index.contains_key(module.id()) {
            self.modules.push(Arc::clone(module));
        }
        self.index
            .entry(module.id().clone())
            .or_default()
            .insert(name.to_string(), id);
        id
    }

    /// Look up a step handle without creating it
    pub fn step_id(&self, module: &ModuleId, name: &str) -> Option<StepId> {
        self.index.get(module).and_then(|names| names.get(name)).copied()
    }

    /// Look up a step without creating it
    pub fn step(&self, module: &ModuleId, name: &str) -> Option<&BuildStep> {
        self.step_id(module, name).map(|id| &self.steps[id.0])
    }

    /// Attach an execution to a step
    pub fn add_mojo(&mut self, id: StepId, execution: MojoExecution, priority: i32) {
        self.steps[id.0].add_mojo(execution, priority);
    }

    /// Make `step` run after `predecessor`
    pub fn execute_after(&mut self, step: StepId, predecessor: StepId) {
        debug_assert_ne!(step, predecessor, "a step cannot run after itself");
        if step == predecessor {
            return;
        }
        self.steps[step.0].predecessors.insert(predecessor);
        self.steps[predecessor.0].successors.insert(step);
    }

    /// Every step, in creation order
    pub fn all_steps(&self) -> impl Iterator<Item = &BuildStep> {
        self.steps.iter()
    }

    /// Steps of one module, in creation order
    pub fn steps<'a>(&'a self, module: &'a ModuleId) -> impl Iterator<Item = &'a BuildStep> + 'a {
        self.steps.iter().filter(move |s| s.module().id() == module)
    }

    /// Modules having at least one step, in order of appearance
    pub fn modules(&self) -> &[Arc<Module>] {
        &self.modules
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the plan is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of executions across all steps
    pub fn execution_count(&self) -> usize {
        self.steps.iter().map(|s| s.prioritized_executions().len()).sum()
    }

    /// Steps of `module` without a predecessor in the same module
    pub fn initial_steps(&self, module: &ModuleId) -> Vec<StepId> {
        self.steps(module)
            .filter(|s| s.predecessors().all(|p| self.steps[p.0].module().id() != module))
            .map(BuildStep::id)
            .collect()
    }

    /// Steps of `module` without a successor in the same module
    pub fn terminal_steps(&self, module: &ModuleId) -> Vec<StepId> {
        self.steps(module)
            .filter(|s| s.successors().all(|n| self.steps[n.0].module().id() != module))
            .map(BuildStep::id)
            .collect()
    }

    /// Append `next` to this plan
    ///
    /// For every module present in both plans, the steps of `next` that start
    /// that module's work run after this plan's last steps for the module.
    /// Steps of `next` whose key already exists here are condensed into the
    /// existing step, so the combined plan has no duplicate nodes. An existing
    /// step keeps its place: edges of `next` that would make it wait for a new
    /// step are moved to the first new steps after it.
    pub fn then(&mut self, next: BuildPlan) {
        let existed: Vec<bool> = next
            .steps
            .iter()
            .map(|s| self.step_id(s.module().id(), s.name()).is_some())
            .collect();

        let mut links: Vec<(StepId, Vec<StepId>)> = Vec::new();
        for module in &next.modules {
            if !self.index.contains_key(module.id()) {
                continue;
            }
            let lasts = self.terminal_steps(module.id());
            for first in next.initial_steps(module.id()) {
                if !existed[first.0] {
                    links.push((first, lasts.clone()));
                }
            }
        }

        let mut remap = Vec::with_capacity(next.steps.len());
        for step in &next.steps {
            let id = self.required_step(step.module(), step.name());
            self.steps[id.0].merge_mojos(step.prioritized_executions());
            remap.push(id);
        }

        for step in &next.steps {
            let to = step.id();
            for pred in step.predecessors() {
                if existed[to.0] && !existed[pred.0] {
                    for target in next.first_new_after(to, &existed) {
                        self.execute_after(remap[target.0], remap[pred.0]);
                    }
                } else {
                    self.execute_after(remap[to.0], remap[pred.0]);
                }
            }
        }

        for (first, lasts) in links {
            for last in lasts {
                self.execute_after(remap[first.0], last);
            }
        }
    }

    /// Nearest successors of `from` not marked in `existed`, looking through
    /// marked steps only
    fn first_new_after(&self, from: StepId, existed: &[bool]) -> BTreeSet<StepId> {
        let mut found = BTreeSet::new();
        let mut seen = BTreeSet::new();
        let mut stack: Vec<StepId> = self.steps[from.0].successors().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if existed[id.0] {
                stack.extend(self.steps[id.0].successors());
            } else {
                found.insert(id);
            }
        }
        found
    }

    /// Transitive predecessors of a step
    pub fn all_predecessors(&self, id: StepId) -> BTreeSet<StepId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<StepId> = self.steps[id.0].predecessors().collect();
        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend(self.steps[next.0].predecessors());
            }
        }
        seen
    }

    /// Whether `other` must complete before `step` can start
    ///
    /// Walks the whole predecessor closure; meant for validation, not for
    /// scheduling.
    pub fn is_successor_of(&self, step: StepId, other: StepId) -> bool {
        self.all_predecessors(step).contains(&other)
    }

    /// Topological order of the steps, ties broken by creation order
    pub fn sorted_steps(&self) -> Result<Vec<StepId>, ConstructionError> {
        let mut remaining: Vec<usize> = self.steps.iter().map(BuildStep::predecessor_count).collect();
        let mut ready: BinaryHeap<Reverse<StepId>> = self
            .steps
            .iter()
            .filter(|s| s.predecessor_count() == 0)
            .map(|s| Reverse(s.id()))
            .collect();

        let mut order = Vec::with_capacity(self.steps.len());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for succ in self.steps[id.0].successors() {
                remaining[succ.0] -= 1;
                if remaining[succ.0] == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }

        if order.len() == self.steps.len() {
            Ok(order)
        } else {
            Err(ConstructionError::CyclicPlan {
                steps: self
                    .steps
                    .iter()
                    .filter(|s| remaining[s.id().0] > 0)
                    .map(BuildStep::label)
                    .collect(),
            })
        }
    }

    /// Check that the plan is a DAG
    pub fn validate(&self) -> Result<(), ConstructionError> {
        self.sorted_steps().map(|_| ())
    }
}

impl Index<StepId> for BuildPlan {
    type Output = BuildStep;

    fn index(&self, id: StepId) -> &Self::Output {
        &self.steps[id.0]
    }
}
