//! Error types for weave
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Module graph errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// Circular dependency detected
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    /// Missing dependency
    #[error("Missing module: '{dependency}' referenced by '{module}'")]
    MissingDependency { module: String, dependency: String },
}

/// Build plan construction errors
///
/// Construction is all-or-nothing: none of these leave a partial plan behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// Requested phase is not declared by any lifecycle (strict mode only)
    #[error("Unknown lifecycle phase '{phase}'. Available lifecycle phases are: {}", available.join(", "))]
    UnknownPhase {
        phase: String,
        available: Vec<String>,
    },

    /// A dependency or collected module is not part of the module graph
    #[error("Module '{module}' references '{reference}' which is not part of the workspace")]
    UnknownModule { module: String, reference: String },

    /// The module graph has a cycle
    #[error("Cyclic module graph: {}", cycle.join(" -> "))]
    CyclicModules { cycle: Vec<String> },

    /// Wiring produced a cycle between build steps
    #[error("Build plan contains a cycle between steps: {}", steps.join(", "))]
    CyclicPlan { steps: Vec<String> },

    /// Goal task could not be parsed
    #[error("Invalid goal '{goal}': expected <plugin>:<goal>[@<execution-id>]")]
    InvalidGoal { goal: String },
}

impl From<ResolverError> for ConstructionError {
    fn from(error: ResolverError) -> Self {
        match error {
            ResolverError::CircularDependency { cycle } => Self::CyclicModules { cycle },
            ResolverError::MissingDependency { module, dependency } => Self::UnknownModule {
                module,
                reference: dependency,
            },
        }
    }
}

/// Failure reported by an action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The action ran and reported failure
    #[error("{execution} failed: {message}")]
    Failed { execution: String, message: String },

    /// The action panicked
    #[error("{execution} panicked: {message}")]
    Panicked { execution: String, message: String },

    /// The action could not be started
    #[error("{execution} could not be started: {message}")]
    Spawn { execution: String, message: String },
}

/// Scheduler invariant violations
///
/// These indicate a corrupted plan or an executor bug and abort the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A step's unresolved predecessor count dropped below zero
    #[error("Predecessor count of '{step}' went negative")]
    NegativePredecessorCount { step: String },

    /// A step was handed to a worker twice
    #[error("Step '{step}' was dispatched twice")]
    DoubleDispatch { step: String },

    /// The plan handed to the executor is not a DAG
    #[error("Cannot execute plan: {0}")]
    InvalidPlan(#[from] ConstructionError),

    /// Work remained but nothing was ready or running
    #[error("Build stalled with {} unfinished steps: {}", pending.len(), pending.join(", "))]
    Stalled { pending: Vec<String> },

    /// A worker task disappeared without reporting
    #[error("Worker task lost: {message}")]
    WorkerLost { message: String },
}

/// Workspace descriptor errors
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// Descriptor file not found
    #[error("Workspace descriptor not found at '{path}'")]
    NotFound { path: PathBuf },

    /// IO error while reading the descriptor
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },

    /// TOML parse error
    #[error("Failed to parse workspace descriptor: {source}")]
    Parse { source: toml::de::Error },

    /// Variable substitution error
    #[error("Failed to substitute variables: {0}")]
    Substitution(String),

    /// Module key declared twice
    #[error("Module '{module}' is declared more than once")]
    DuplicateModule { module: String },

    /// Malformed `group:artifact` reference
    #[error("Invalid module reference '{reference}': expected <group>:<artifact>")]
    InvalidReference { reference: String },

    /// Invalid setting value
    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level weave error type
#[derive(Error, Debug)]
pub enum WeaveError {
    /// Workspace error
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// Resolver error
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Plan construction error
    #[error("Plan error: {0}")]
    Construction(#[from] ConstructionError),

    /// Scheduler error
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}
