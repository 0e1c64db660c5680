//! Workspace descriptor (weave.toml) parsing
//!
//! The descriptor declares the modules of a workspace, their dependencies and
//! the executions bound to their phases. String values support environment
//! variable substitution using ${VAR} syntax.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::defaults::{RUN_KEY, WORKSPACE_FILE};
use crate::core::creator::UnknownPhasePolicy;
use crate::core::executor::FailureBehavior;
use crate::core::module::{Module, ModuleId, MojoExecution};
use crate::core::resolver::ModuleGraph;
use crate::error::WorkspaceError;

/// The whole descriptor
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Workspace {
    /// Session settings
    #[serde(default)]
    pub workspace: WorkspaceSettings,

    /// Modules in declaration order
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleDecl>,

    /// Commands run for goals invoked directly (`plugin:goal` -> command)
    #[serde(default)]
    pub goals: BTreeMap<String, String>,

    /// Directory holding the descriptor; module paths are relative to it
    #[serde(skip)]
    root: PathBuf,
}

/// `[workspace]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct WorkspaceSettings {
    /// Workspace name
    #[serde(default)]
    pub name: Option<String>,

    /// Worker count (`4` or `1.5C`)
    #[serde(default)]
    pub threads: Option<String>,

    /// Failure behaviour
    #[serde(default)]
    pub fail: Option<FailureBehavior>,

    /// Policy for phases no lifecycle declares
    #[serde(default)]
    pub unknown_phases: Option<UnknownPhasePolicy>,

    /// Accept Maven 3 style phase names
    #[serde(default)]
    pub legacy_aliases: bool,
}

/// `[[module]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleDecl {
    pub group: String,
    pub artifact: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Base directory, relative to the workspace root
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Build-order dependencies (`group:artifact`)
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Collected child modules (`group:artifact`)
    #[serde(default)]
    pub modules: Vec<String>,

    #[serde(default, rename = "execution")]
    pub executions: Vec<ExecutionDecl>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// `[[module.execution]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionDecl {
    pub id: String,

    #[serde(default = "default_plugin")]
    pub plugin: String,

    #[serde(default = "default_goal")]
    pub goal: String,

    /// Phase or sub-step the execution is bound to
    #[serde(default)]
    pub phase: Option<String>,

    #[serde(default)]
    pub priority: i32,

    /// Shell command, stored as the `run` configuration entry
    #[serde(default)]
    pub run: Option<String>,

    /// Extra configuration entries
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

fn default_plugin() -> String {
    "exec".to_string()
}

fn default_goal() -> String {
    "run".to_string()
}

/// Substitute environment variables in a string using ${VAR} syntax.
///
/// Unset variables are replaced by the empty string.
///
/// # Examples
/// ```
/// use weave::core::workspace::substitute_env_vars;
///
/// std::env::set_var("WEAVE_DOC_VAR", "hello");
/// let result = substitute_env_vars("prefix_${WEAVE_DOC_VAR}_suffix").unwrap();
/// assert_eq!(result, "prefix_hello_suffix");
/// std::env::remove_var("WEAVE_DOC_VAR");
/// ```
pub fn substitute_env_vars(input: &str) -> Result<String, WorkspaceError> {
    static VAR: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let re = VAR
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}"))
        .as_ref()
        .map_err(|e| WorkspaceError::Substitution(format!("Invalid regex: {e}")))?;

    let output = re.replace_all(input, |caps: &regex::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_default()
    });
    Ok(output.into_owned())
}

/// Recursively substitute environment variables in a TOML value
fn substitute_in_value(value: &mut toml::Value) -> Result<(), WorkspaceError> {
    match value {
        toml::Value::String(s) => {
            *s = substitute_env_vars(s)?;
        }
        toml::Value::Array(arr) => {
            for item in arr.iter_mut() {
                substitute_in_value(item)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, v) in table.iter_mut() {
                substitute_in_value(v)?;
            }
        }
        _ => {}
    }
    Ok(())
}

impl Workspace {
    /// Load the descriptor from a file
    pub fn load(path: &Path) -> Result<Self, WorkspaceError> {
        if !path.exists() {
            return Err(WorkspaceError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| WorkspaceError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let mut workspace = Self::from_toml(&content)?;
        workspace.root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(workspace)
    }

    /// Find `weave.toml` in `dir` or its closest ancestor and load it
    pub fn discover(dir: &Path) -> Result<Self, WorkspaceError> {
        dir.ancestors()
            .map(|d| d.join(WORKSPACE_FILE))
            .find(|candidate| candidate.is_file())
            .map_or_else(
                || {
                    Err(WorkspaceError::NotFound {
                        path: dir.join(WORKSPACE_FILE),
                    })
                },
                |path| Self::load(&path),
            )
    }

    /// Parse a descriptor, substituting ${VAR} references first
    pub fn from_toml(content: &str) -> Result<Self, WorkspaceError> {
        let mut value: toml::Value =
            toml::from_str(content).map_err(|e| WorkspaceError::Parse { source: e })?;
        substitute_in_value(&mut value)?;
        value.try_into::<Self>().map_err(|e| WorkspaceError::Parse { source: e })
    }

    /// Directory module paths are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Set the directory module paths are resolved against
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Display name of the workspace
    pub fn name(&self) -> &str {
        self.workspace.name.as_deref().unwrap_or("workspace")
    }

    /// Build the module graph
    ///
    /// Rejects duplicate module keys and malformed references. Whether
    /// references point at declared modules is checked by the graph.
    pub fn to_module_graph(&self) -> Result<ModuleGraph, WorkspaceError> {
        let mut seen = HashSet::new();
        let mut graph = ModuleGraph::new();

        for decl in &self.modules {
            let id = ModuleId::new(&decl.group, &decl.artifact);
            if decl.group.is_empty() || decl.artifact.is_empty() {
                return Err(WorkspaceError::InvalidReference {
                    reference: id.to_string(),
                });
            }
            if !seen.insert(id.clone()) {
                return Err(WorkspaceError::DuplicateModule {
                    module: id.to_string(),
                });
            }

            let base_dir = match &decl.path {
                Some(path) => self.root.join(path),
                None => self.root.clone(),
            };
            let mut module = Module::new(&decl.group, &decl.artifact, &decl.version).with_base_dir(base_dir);
            for dep in &decl.depends_on {
                module = module.depends_on(dep.parse()?);
            }
            for child in &decl.modules {
                module = module.collects(child.parse()?);
            }
            for exec in &decl.executions {
                module = module.with_execution(exec.to_execution());
            }
            graph.add_module(module);
        }

        Ok(graph)
    }
}

impl ExecutionDecl {
    fn to_execution(&self) -> MojoExecution {
        let mut execution = MojoExecution::new(&self.plugin, &self.goal, &self.id).with_priority(self.priority);
        if let Some(phase) = &self.phase {
            execution = execution.bound_to(phase);
        }
        for (key, value) in &self.config {
            execution = execution.with_config(key, value);
        }
        if let Some(run) = &self.run {
            execution = execution.with_config(RUN_KEY, run);
        }
        execution
    }
}
