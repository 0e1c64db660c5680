//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    use crate::core::module::{Module, ModuleId};
    use crate::core::resolver::ModuleGraph;

    /// Generate a valid module name (lowercase alphanumeric with hyphens)
    pub fn module_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,20}[a-z0-9]?".prop_filter("Name must not be empty", |s| !s.is_empty())
    }

    /// Generate a version string
    pub fn version() -> impl Strategy<Value = String> {
        (1u32..100, 0u32..100, 0u32..100)
            .prop_map(|(major, minor, patch)| format!("{major}.{minor}.{patch}"))
    }

    /// Generate an acyclic module graph of two to eight modules
    ///
    /// Module `m{i}` may only depend on modules declared before it. About half
    /// of the modules are aggregators, which collect any module except an
    /// earlier aggregator, so aggregators nest, take part in dependencies and
    /// sit beside modules they do not collect, without collection loops.
    pub fn acyclic_module_graph() -> impl Strategy<Value = ModuleGraph> {
        (2usize..9)
            .prop_flat_map(|n| prop::collection::vec((any::<u8>(), any::<u8>(), any::<bool>()), n))
            .prop_map(|specs| {
                let id = |i: usize| ModuleId::new("gen", format!("m{i}"));
                let aggregators: Vec<bool> = specs.iter().map(|(_, _, aggregator)| *aggregator).collect();
                let modules: Vec<Module> = specs
                    .iter()
                    .enumerate()
                    .map(|(i, (deps, collects, _))| {
                        let module = (0..i)
                            .filter(|j| deps & (1 << j) != 0)
                            .fold(Module::new("gen", format!("m{i}"), "1.0"), |m, j| m.depends_on(id(j)));
                        if !aggregators[i] {
                            return module;
                        }
                        (0..specs.len())
                            .filter(|&j| j != i && (!aggregators[j] || j > i) && collects & (1 << j) != 0)
                            .fold(module, |m, j| m.collects(id(j)))
                    })
                    .collect();
                ModuleGraph::from_modules(modules)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use crate::config::defaults::MIN_PROPTEST_ITERATIONS;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn test_module_name_generator(name in module_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn test_version_generator(version in version()) {
            let parts: Vec<&str> = version.split('.').collect();
            prop_assert_eq!(parts.len(), 3);
            for part in parts {
                prop_assert!(part.parse::<u32>().is_ok());
            }
        }

        #[test]
        fn test_module_graph_generator_is_acyclic(graph in acyclic_module_graph()) {
            prop_assert!(graph.len() >= 2);
            prop_assert!(graph.topological_sort().is_ok());
            for module in graph.modules() {
                prop_assert!(!graph.collected_closure(module.id()).contains(module.id()));
            }
        }
    }
}
