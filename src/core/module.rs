//! Module model
//!
//! A module is one buildable unit of the workspace. Its configuration is a
//! flat value: build-order dependencies, collected children for aggregators,
//! and the executions bound to its lifecycle phases.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WorkspaceError;

/// Module key (`group:artifact`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId {
    /// Group identifier
    pub group: String,
    /// Artifact identifier
    pub artifact: String,
}

impl ModuleId {
    /// Create a module key
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

impl FromStr for ModuleId {
    type Err = WorkspaceError;

    /// Parses `group:artifact`, tolerating a trailing `:version`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(group), Some(artifact), _, None) if !group.is_empty() && !artifact.is_empty() => {
                Ok(Self::new(group, artifact))
            }
            _ => Err(WorkspaceError::InvalidReference {
                reference: s.to_string(),
            }),
        }
    }
}

/// One unit of work bound to a phase
///
/// The scheduler never looks inside an execution: it only orders executions
/// by priority and hands them to a [`MojoExecutor`](crate::core::executor::MojoExecutor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MojoExecution {
    /// Plugin prefix or coordinate
    pub plugin: String,
    /// Goal name
    pub goal: String,
    /// Execution id
    pub id: String,
    /// Phase the execution is bound to
    pub phase: Option<String>,
    /// Sort key among executions of the same step
    pub priority: i32,
    /// Flat, already-merged configuration
    pub configuration: BTreeMap<String, String>,
}

impl MojoExecution {
    /// Create an unbound execution
    pub fn new(plugin: impl Into<String>, goal: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            goal: goal.into(),
            id: id.into(),
            phase: None,
            priority: 0,
            configuration: BTreeMap::new(),
        }
    }

    /// Bind the execution to a phase
    #[must_use]
    pub fn bound_to(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Set the priority
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a configuration entry
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }

    /// Identity of the execution inside a step (`plugin:goal@id`)
    pub fn key(&self) -> String {
        format!("{}:{}@{}", self.plugin, self.goal, self.id)
    }
}

impl fmt::Display for MojoExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.plugin, self.goal, self.id)
    }
}

/// A buildable unit of the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    id: ModuleId,
    version: String,
    base_dir: Option<PathBuf>,
    dependencies: Vec<ModuleId>,
    collected: Vec<ModuleId>,
    executions: Vec<MojoExecution>,
}

impl Module {
    /// Create a module without dependencies or executions
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            id: ModuleId::new(group, artifact),
            version: version.into(),
            base_dir: None,
            dependencies: Vec::new(),
            collected: Vec::new(),
            executions: Vec::new(),
        }
    }

    /// Add a build-order dependency
    #[must_use]
    pub fn depends_on(mut self, module: ModuleId) -> Self {
        if !self.dependencies.contains(&module) {
            self.dependencies.push(module);
        }
        self
    }

    /// Add a collected child module
    #[must_use]
    pub fn collects(mut self, module: ModuleId) -> Self {
        if !self.collected.contains(&module) {
            self.collected.push(module);
        }
        self
    }

    /// Add an execution
    #[must_use]
    pub fn with_execution(mut self, execution: MojoExecution) -> Self {
        self.executions.push(execution);
        self
    }

    /// Set the base directory
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Module key
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Module version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Full coordinate (`group:artifact:version`)
    pub fn coordinate(&self) -> String {
        format!("{}:{}", self.id, self.version)
    }

    /// Base directory, if any
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Modules this module must be built after
    pub fn dependencies(&self) -> &[ModuleId] {
        &self.dependencies
    }

    /// Child modules aggregated by this module
    pub fn collected(&self) -> &[ModuleId] {
        &self.collected
    }

    /// Whether this module aggregates other modules
    pub fn is_aggregator(&self) -> bool {
        !self.collected.is_empty()
    }

    /// Executions configured on this module
    pub fn executions(&self) -> &[MojoExecution] {
        &self.executions
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.coordinate())
    }
}
