//! Module graph resolution
//!
//! Validates module references and computes the build order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::core::module::{Module, ModuleId};
use crate::error::ResolverError;

/// Module graph of a workspace
///
/// Modules keep their declaration order, which is used to break ties in the
/// build order so that plans are reproducible.
#[derive(Debug, Default, Clone)]
pub struct ModuleGraph {
    /// Modules in declaration order
    modules: Vec<Arc<Module>>,
    /// Module key -> position in `modules`
    index: HashMap<ModuleId, usize>,
}

impl ModuleGraph {
    /// Create a new empty module graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from modules
    pub fn from_modules(modules: impl IntoIterator<Item = Module>) -> Self {
        let mut graph = Self::new();
        for module in modules {
            graph.add_module(module);
        }
        graph
    }

    /// Add a module, replacing any module with the same key
    pub fn add_module(&mut self, module: Module) -> Arc<Module> {
        let module = Arc::new(module);
        match self.index.get(module.id()) {
            Some(&pos) => self.modules[pos] = Arc::clone(&module),
            None => {
                self.index.insert(module.id().clone(), self.modules.len());
                self.modules.push(Arc::clone(&module));
            }
        }
        module
    }

    /// Look up a module
    pub fn get(&self, id: &ModuleId) -> Option<&Arc<Module>> {
        self.index.get(id).map(|&pos| &self.modules[pos])
    }

    /// All modules in declaration order
    pub fn modules(&self) -> &[Arc<Module>] {
        &self.modules
    }

    /// Number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Direct build-order dependencies of a module
    pub fn upstream(&self, id: &ModuleId) -> Vec<&Arc<Module>> {
        self.get(id)
            .map(|m| m.dependencies().iter().filter_map(|d| self.get(d)).collect())
            .unwrap_or_default()
    }

    /// Check that every dependency and collected module exists
    pub fn check_references(&self) -> Result<(), ResolverError> {
        for module in &self.modules {
            for reference in module.dependencies().iter().chain(module.collected()) {
                if !self.index.contains_key(reference) {
                    return Err(ResolverError::MissingDependency {
                        module: module.id().to_string(),
                        dependency: reference.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Compute topological sort (build order)
    ///
    /// Returns modules in order such that dependencies come before dependents.
    pub fn topological_sort(&self) -> Result<Vec<Arc<Module>>, ResolverError> {
        self.check_references()?;

        let mut visited = HashSet::new();
        let mut temp_visited = HashSet::new();
        let mut result = Vec::new();
        let mut cycle_path = Vec::new();

        for module in &self.modules {
            if !visited.contains(module.id()) {
                self.visit(
                    module.id(),
                    &mut visited,
                    &mut temp_visited,
                    &mut result,
                    &mut cycle_path,
                )?;
            }
        }

        Ok(result)
    }

    fn visit(
        &self,
        node: &ModuleId,
        visited: &mut HashSet<ModuleId>,
        temp_visited: &mut HashSet<ModuleId>,
        result: &mut Vec<Arc<Module>>,
        cycle_path: &mut Vec<ModuleId>,
    ) -> Result<(), ResolverError> {
        if temp_visited.contains(node) {
            // Report only the looping part of the path
            let start = cycle_path.iter().position(|m| m == node).unwrap_or(0);
            let mut cycle: Vec<String> = cycle_path[start..].iter().map(ToString::to_string).collect();
            cycle.push(node.to_string());
            return Err(ResolverError::CircularDependency { cycle });
        }

        if visited.contains(node) {
            return Ok(());
        }

        let Some(module) = self.get(node) else {
            return Ok(());
        };

        temp_visited.insert(node.clone());
        cycle_path.push(node.clone());

        for dep in module.dependencies() {
            self.visit(dep, visited, temp_visited, result, cycle_path)?;
        }

        cycle_path.pop();
        temp_visited.remove(node);
        visited.insert(node.clone());
        result.push(Arc::clone(module));

        Ok(())
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        matches!(
            self.topological_sort(),
            Err(ResolverError::CircularDependency { .. })
        )
    }

    /// Every module collected by `id`, directly or through nested aggregators
    pub fn collected_closure(&self, id: &ModuleId) -> HashSet<ModuleId> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&ModuleId> = self
            .get(id)
            .map(|m| m.collected().iter().collect())
            .unwrap_or_default();
        while let Some(next) = stack.pop() {
            if seen.insert(next.clone()) {
                if let Some(module) = self.get(next) {
                    stack.extend(module.collected());
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(artifact: &str) -> ModuleId {
        ModuleId::new("g", artifact)
    }

    #[test]
    fn test_simple_dependency_order() {
        let graph = ModuleGraph::from_modules([
            Module::new("g", "app", "1.0").depends_on(id("lib")),
            Module::new("g", "lib", "1.0"),
        ]);

        let order: Vec<String> = graph
            .topological_sort()
            .unwrap()
            .iter()
            .map(|m| m.id().artifact.clone())
            .collect();

        assert_eq!(order, vec!["lib", "app"], "lib should be built before app");
    }

    #[test]
    fn test_order_is_declaration_order_for_independent_modules() {
        let graph = ModuleGraph::from_modules([
            Module::new("g", "c", "1.0"),
            Module::new("g", "a", "1.0"),
            Module::new("g", "b", "1.0"),
        ]);
        let order: Vec<String> = graph
            .topological_sort()
            .unwrap()
            .iter()
            .map(|m| m.id().artifact.clone())
            .collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_circular_dependency_detection() {
        let graph = ModuleGraph::from_modules([
            Module::new("g", "root", "1.0").depends_on(id("a")),
            Module::new("g", "a", "1.0").depends_on(id("b")),
            Module::new("g", "b", "1.0").depends_on(id("c")),
            Module::new("g", "c", "1.0").depends_on(id("a")),
        ]);

        assert!(graph.has_cycle());
        let Err(ResolverError::CircularDependency { cycle }) = graph.topological_sort() else {
            panic!("expected a cycle");
        };
        assert_eq!(cycle, vec!["g:a", "g:b", "g:c", "g:a"]);
    }

    #[test]
    fn test_missing_dependency() {
        let graph = ModuleGraph::from_modules([Module::new("g", "app", "1.0").depends_on(id("lib"))]);
        assert_eq!(
            graph.topological_sort().unwrap_err(),
            ResolverError::MissingDependency {
                module: "g:app".to_string(),
                dependency: "g:lib".to_string(),
            }
        );
        assert!(!graph.has_cycle());
    }

    #[test]
    fn test_missing_collected_module() {
        let graph = ModuleGraph::from_modules([Module::new("g", "parent", "1.0").collects(id("child"))]);
        assert!(graph.check_references().is_err());
    }

    #[test]
    fn test_add_module_replaces_same_key() {
        let mut graph = ModuleGraph::new();
        graph.add_module(Module::new("g", "a", "1.0"));
        graph.add_module(Module::new("g", "a", "2.0"));
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get(&id("a")).unwrap().version(), "2.0");
    }

    #[test]
    fn test_collected_closure_is_transitive() {
        let graph = ModuleGraph::from_modules([
            Module::new("g", "root", "1.0").collects(id("mid")),
            Module::new("g", "mid", "1.0").collects(id("leaf")),
            Module::new("g", "leaf", "1.0"),
        ]);
        let closure = graph.collected_closure(&id("root"));
        assert!(closure.contains(&id("mid")));
        assert!(closure.contains(&id("leaf")));
        assert_eq!(closure.len(), 2);
        assert!(graph.collected_closure(&id("leaf")).is_empty());
    }

    #[test]
    fn test_upstream() {
        let graph = ModuleGraph::from_modules([
            Module::new("g", "lib", "1.0"),
            Module::new("g", "app", "1.0").depends_on(id("lib")),
        ]);
        let upstream = graph.upstream(&id("app"));
        assert_eq!(upstream.len(), 1);
        assert_eq!(upstream[0].id(), &id("lib"));
        assert!(graph.upstream(&id("lib")).is_empty());
    }
}
