//! Build steps
//!
//! A step is one named unit of work of one module. Steps live in the arena of
//! a [`BuildPlan`](crate::core::plan::BuildPlan) and refer to each other by
//! [`StepId`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::core::module::{Module, MojoExecution};

/// Handle of a step inside its plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub(crate) usize);

impl StepId {
    /// Position of the step in its plan's arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named unit of work scoped to one module
#[derive(Debug, Clone)]
pub struct BuildStep {
    id: StepId,
    module: Arc<Module>,
    name: String,
    /// Executions with their priority, kept sorted by priority
    mojos: Vec<(i32, MojoExecution)>,
    pub(crate) predecessors: BTreeSet<StepId>,
    pub(crate) successors: BTreeSet<StepId>,
}

impl BuildStep {
    pub(crate) fn new(id: StepId, module: Arc<Module>, name: impl Into<String>) -> Self {
        Self {
            id,
            module,
            name: name.into(),
            mojos: Vec::new(),
            predecessors: BTreeSet::new(),
            successors: BTreeSet::new(),
        }
    }

    /// Step handle
    pub fn id(&self) -> StepId {
        self.id
    }

    /// Owning module
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// Step name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `group:artifact/name`, used in logs and reports
    pub fn label(&self) -> String {
        format!("{}/{}", self.module.id(), self.name)
    }

    /// Insert an execution, keeping the list sorted by priority
    ///
    /// Executions with equal priority keep their insertion order.
    pub fn add_mojo(&mut self, execution: MojoExecution, priority: i32) {
        let pos = self.mojos.partition_point(|(p, _)| *p <= priority);
        self.mojos.insert(pos, (priority, execution));
    }

    /// Executions in run order
    pub fn executions(&self) -> impl Iterator<Item = &MojoExecution> {
        self.mojos.iter().map(|(_, execution)| execution)
    }

    /// Executions with their priorities, in run order
    pub fn prioritized_executions(&self) -> &[(i32, MojoExecution)] {
        &self.mojos
    }

    /// Whether the step has nothing to run
    pub fn is_empty(&self) -> bool {
        self.mojos.is_empty()
    }

    /// Direct predecessors
    pub fn predecessors(&self) -> impl Iterator<Item = StepId> + '_ {
        self.predecessors.iter().copied()
    }

    /// Direct successors
    pub fn successors(&self) -> impl Iterator<Item = StepId> + '_ {
        self.successors.iter().copied()
    }

    /// Number of direct predecessors
    pub fn predecessor_count(&self) -> usize {
        self.predecessors.len()
    }

    /// Merge executions of a condensed step, skipping ones already bound here
    pub(crate) fn merge_mojos(&mut self, other: &[(i32, MojoExecution)]) {
        for (priority, execution) in other {
            let duplicate = self
                .mojos
                .iter()
                .any(|(p, e)| p == priority && e.key() == execution.key());
            if !duplicate {
                self.add_mojo(execution.clone(), *priority);
            }
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> BuildStep {
        BuildStep::new(StepId(0), Arc::new(Module::new("g", "a", "1.0")), "compile")
    }

    fn ids(step: &BuildStep) -> Vec<String> {
        step.executions().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_add_mojo_sorts_by_priority() {
        let mut step = step();
        step.add_mojo(MojoExecution::new("p", "g", "late"), 10);
        step.add_mojo(MojoExecution::new("p", "g", "early"), -5);
        step.add_mojo(MojoExecution::new("p", "g", "middle"), 0);
        assert_eq!(ids(&step), vec!["early", "middle", "late"]);
    }

    #[test]
    fn test_add_mojo_is_stable_for_equal_priorities() {
        let mut step = step();
        step.add_mojo(MojoExecution::new("p", "g", "first"), 0);
        step.add_mojo(MojoExecution::new("p", "g", "second"), 0);
        step.add_mojo(MojoExecution::new("p", "g", "before"), -1);
        step.add_mojo(MojoExecution::new("p", "g", "third"), 0);
        assert_eq!(ids(&step), vec!["before", "first", "second", "third"]);
    }

    #[test]
    fn test_merge_mojos_skips_duplicates() {
        let mut a = step();
        a.add_mojo(MojoExecution::new("p", "g", "x"), 0);
        let mut b = step();
        b.add_mojo(MojoExecution::new("p", "g", "x"), 0);
        b.add_mojo(MojoExecution::new("p", "g", "y"), 1);

        a.merge_mojos(b.prioritized_executions());
        assert_eq!(ids(&a), vec!["x", "y"]);
    }

    #[test]
    fn test_label() {
        let step = step();
        assert_eq!(step.label(), "g:a/compile");
        assert!(step.is_empty());
        assert_eq!(step.predecessor_count(), 0);
    }
}
