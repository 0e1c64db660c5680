//! Lifecycle registry
//!
//! A lifecycle is an ordered list of phases. Every phase `p` materialises as
//! three steps, `before:p`, `p` and `after:p`, so that executions can hook in
//! around a phase. The registry is built once per session and passed around
//! explicitly.

use crate::config::defaults::DEFAULT_LIFECYCLE;

/// Prefix of the step that opens a phase
pub const BEFORE: &str = "before:";

/// Prefix of the step that closes a phase
pub const AFTER: &str = "after:";

/// Prefix selecting the phase step itself, without its `after:` step
pub const AT: &str = "at:";

/// Alias running the whole default lifecycle across an aggregator and its children
pub const ALL: &str = "all";

/// Marker wrapping the per-module part of an `all` run
pub const EACH: &str = "each";

/// Which of the three steps of a phase a name points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// `before:<phase>`
    Before,
    /// `at:<phase>`, the phase step itself
    At,
    /// `<phase>` or `after:<phase>`: the phase including its closing step
    After,
}

/// Split a step or request name into its phase and boundary
pub fn split_step(name: &str) -> (&str, Boundary) {
    if let Some(phase) = name.strip_prefix(BEFORE) {
        (phase, Boundary::Before)
    } else if let Some(phase) = name.strip_prefix(AFTER) {
        (phase, Boundary::After)
    } else if let Some(phase) = name.strip_prefix(AT) {
        (phase, Boundary::At)
    } else {
        (name, Boundary::After)
    }
}

/// `before:<phase>`
pub fn before(phase: &str) -> String {
    format!("{BEFORE}{phase}")
}

/// `after:<phase>`
pub fn after(phase: &str) -> String {
    format!("{AFTER}{phase}")
}

/// A named, ordered sequence of phases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    id: String,
    phases: Vec<String>,
    aliases: Vec<(String, String)>,
}

impl Lifecycle {
    /// Create a lifecycle from its ordered phases
    pub fn new(id: impl Into<String>, phases: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            id: id.into(),
            phases: phases.into_iter().map(Into::into).collect(),
            aliases: Vec::new(),
        }
    }

    /// Declare an alias for one of this lifecycle's steps
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), target.into()));
        self
    }

    /// Lifecycle id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Phases in declared order
    pub fn phases(&self) -> &[String] {
        &self.phases
    }

    /// Aliases as (alias, target) pairs
    pub fn aliases(&self) -> &[(String, String)] {
        &self.aliases
    }

    /// Whether the lifecycle declares a phase
    pub fn contains(&self, phase: &str) -> bool {
        self.phases.iter().any(|p| p == phase)
    }

    /// Alias target, if `name` is an alias of this lifecycle
    pub fn alias(&self, name: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(alias, _)| alias == name)
            .map(|(_, target)| target.as_str())
    }

    /// Ordered step names from the start of the lifecycle up to `end`
    ///
    /// `end` may be a phase (`compile`, runs through `after:compile`) or one of
    /// its sub-steps (`before:compile`, `at:compile`, `after:compile`).
    pub fn steps_until(&self, end: &str) -> Option<Vec<String>> {
        let (phase, boundary) = split_step(end);
        let pos = self.phases.iter().position(|p| p == phase)?;

        let mut steps = Vec::with_capacity((pos + 1) * 3);
        for p in &self.phases[..=pos] {
            steps.push(before(p));
            steps.push(p.clone());
            steps.push(after(p));
        }
        match boundary {
            Boundary::Before => steps.truncate(steps.len() - 2),
            Boundary::At => steps.truncate(steps.len() - 1),
            Boundary::After => {}
        }
        Some(steps)
    }

    /// Every step of the lifecycle, in order
    pub fn all_steps(&self) -> Vec<String> {
        self.phases
            .last()
            .and_then(|last| self.steps_until(last))
            .unwrap_or_default()
    }
}

/// The ordered step names a request materialises per module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseChain {
    /// Lifecycle the chain belongs to
    pub lifecycle: String,
    /// Step names, first to last
    pub steps: Vec<String>,
    /// Whether aggregators fan out to their collected modules
    pub aggregate: bool,
}

impl PhaseChain {
    /// First step of the chain
    pub fn first(&self) -> Option<&str> {
        self.steps.first().map(String::as_str)
    }

    /// Last step of the chain
    pub fn last(&self) -> Option<&str> {
        self.steps.last().map(String::as_str)
    }
}

/// Registry of the lifecycles known to a build session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleRegistry {
    lifecycles: Vec<Lifecycle>,
}

impl Default for LifecycleRegistry {
    fn default() -> Self {
        Self::new(vec![clean_lifecycle(), default_lifecycle(), site_lifecycle()])
    }
}

impl LifecycleRegistry {
    /// Create a registry from explicit lifecycles
    pub fn new(lifecycles: Vec<Lifecycle>) -> Self {
        Self { lifecycles }
    }

    /// Enable the Maven 3 style phase names on the default lifecycle
    ///
    /// `generate-resources`, `process-classes`, `prepare-package` and friends
    /// then resolve to the corresponding steps of the default lifecycle.
    #[must_use]
    pub fn with_legacy_aliases(mut self) -> Self {
        if let Some(lifecycle) = self.lifecycles.iter_mut().find(|l| l.id == DEFAULT_LIFECYCLE) {
            for (alias, target) in LEGACY_ALIASES {
                if lifecycle.alias(alias).is_none() {
                    lifecycle.aliases.push(((*alias).to_string(), (*target).to_string()));
                }
            }
        }
        self
    }

    /// All lifecycles
    pub fn lifecycles(&self) -> &[Lifecycle] {
        &self.lifecycles
    }

    /// Look up a lifecycle by id
    pub fn lookup(&self, id: &str) -> Option<&Lifecycle> {
        self.lifecycles.iter().find(|l| l.id == id)
    }

    /// Resolve an alias to its target, or return the name unchanged
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.lifecycles
            .iter()
            .find_map(|l| l.alias(name))
            .unwrap_or(name)
    }

    /// Step name an execution bound to `phase` attaches to
    pub fn binding_step(&self, phase: &str) -> String {
        let resolved = self.resolve_alias(phase);
        resolved.strip_prefix(AT).unwrap_or(resolved).to_string()
    }

    /// Lifecycle declaring the phase of a step name
    pub fn lifecycle_for(&self, name: &str) -> Option<&Lifecycle> {
        let (phase, _) = split_step(name);
        self.lifecycles.iter().find(|l| l.contains(phase))
    }

    /// Every phase and alias name, for diagnostics
    pub fn available_phases(&self) -> Vec<String> {
        let mut names = vec![ALL.to_string(), EACH.to_string()];
        for lifecycle in &self.lifecycles {
            names.extend(lifecycle.phases.iter().cloned());
            names.extend(lifecycle.aliases.iter().map(|(alias, _)| alias.clone()));
        }
        names
    }

    /// Resolve a request to the chain of steps to materialise per module
    ///
    /// Returns `None` when no lifecycle declares the requested name.
    pub fn resolve(&self, request: &str) -> Option<PhaseChain> {
        if request == ALL || request == EACH {
            let lifecycle = self.lookup(DEFAULT_LIFECYCLE)?;
            let mut steps = Vec::new();
            if request == ALL {
                steps.push(before(ALL));
            }
            steps.push(before(EACH));
            steps.extend(lifecycle.all_steps());
            steps.push(after(EACH));
            if request == ALL {
                steps.push(after(ALL));
            }
            return Some(PhaseChain {
                lifecycle: lifecycle.id.clone(),
                steps,
                aggregate: request == ALL,
            });
        }

        let resolved = self.resolve_alias(request);
        let lifecycle = self.lifecycle_for(resolved)?;
        let steps = lifecycle.steps_until(resolved)?;
        Some(PhaseChain {
            lifecycle: lifecycle.id.clone(),
            steps,
            aggregate: false,
        })
    }
}

/// Maven 3 phase names and the steps they map to
const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("generate-sources", "sources"),
    ("process-sources", "after:sources"),
    ("generate-resources", "resources"),
    ("process-resources", "after:resources"),
    ("process-classes", "after:compile"),
    ("generate-test-sources", "test-sources"),
    ("process-test-sources", "after:test-sources"),
    ("generate-test-resources", "test-resources"),
    ("process-test-resources", "after:test-resources"),
    ("process-test-classes", "after:test-compile"),
    ("prepare-package", "before:package"),
    ("pre-integration-test", "before:integration-test"),
    ("post-integration-test", "after:integration-test"),
];

fn clean_lifecycle() -> Lifecycle {
    Lifecycle::new("clean", ["clean"])
        .with_alias("pre-clean", before("clean"))
        .with_alias("post-clean", after("clean"))
}

fn default_lifecycle() -> Lifecycle {
    Lifecycle::new(
        DEFAULT_LIFECYCLE,
        [
            "validate",
            "initialize",
            "sources",
            "resources",
            "compile",
            "ready",
            "test-sources",
            "test-resources",
            "test-compile",
            "test",
            "package",
            "integration-test",
            "verify",
            "install",
            "deploy",
        ],
    )
}

fn site_lifecycle() -> Lifecycle {
    Lifecycle::new("site", ["site", "site-deploy"])
        .with_alias("pre-site", before("site"))
        .with_alias("post-site", after("site"))
}
