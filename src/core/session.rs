//! Build session settings
//!
//! Settings are layered: command line (which also covers the environment
//! through clap) over the `[workspace]` table of `weave.toml` over the
//! built-in defaults.

use std::str::FromStr;

use serde::Serialize;

use crate::config::defaults::DEFAULT_THREADS;
use crate::core::creator::UnknownPhasePolicy;
use crate::core::executor::FailureBehavior;
use crate::core::lifecycle::LifecycleRegistry;
use crate::core::workspace::WorkspaceSettings;
use crate::error::WorkspaceError;

/// Worker count, either fixed or relative to the CPU count
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Threads {
    /// Exactly this many workers
    Fixed(usize),
    /// This many workers per CPU core (`1.5C`)
    PerCore(f64),
}

impl Threads {
    /// Number of workers on this machine, at least 1
    pub fn count(self) -> usize {
        match self {
            Self::Fixed(n) => n.max(1),
            Self::PerCore(factor) => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
                let n = (factor * num_cpus::get() as f64) as usize;
                n.max(1)
            }
        }
    }
}

impl Default for Threads {
    fn default() -> Self {
        Self::Fixed(DEFAULT_THREADS)
    }
}

impl FromStr for Threads {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| WorkspaceError::InvalidValue {
            field: "threads".to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = s.trim();
        if let Some(factor) = trimmed.strip_suffix(['C', 'c']) {
            let factor: f64 = factor.parse().map_err(|_| invalid("expected a number before 'C'"))?;
            if !factor.is_finite() || factor <= 0.0 {
                return Err(invalid("must be positive"));
            }
            return Ok(Self::PerCore(factor));
        }
        match trimmed.parse::<usize>() {
            Ok(0) => Err(invalid("must be at least 1")),
            Ok(n) => Ok(Self::Fixed(n)),
            Err(_) => Err(invalid("expected an integer or '<n>C'")),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub threads: Option<Threads>,
    pub failure: Option<FailureBehavior>,
    /// Reject undeclared phases
    pub strict_phases: bool,
    pub legacy_aliases: bool,
}

/// Effective settings of one build session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildSettings {
    pub threads: Threads,
    pub failure: FailureBehavior,
    pub unknown_phases: UnknownPhasePolicy,
    pub legacy_aliases: bool,
}

impl BuildSettings {
    /// Layer command-line overrides over the workspace file over the defaults
    pub fn resolve(file: &WorkspaceSettings, overrides: &SettingsOverrides) -> Result<Self, WorkspaceError> {
        let mut settings = Self::default();

        if let Some(threads) = &file.threads {
            settings.threads = threads.parse()?;
        }
        if let Some(failure) = file.fail {
            settings.failure = failure;
        }
        if let Some(policy) = file.unknown_phases {
            settings.unknown_phases = policy;
        }
        settings.legacy_aliases = file.legacy_aliases;

        if let Some(threads) = overrides.threads {
            settings.threads = threads;
        }
        if let Some(failure) = overrides.failure {
            settings.failure = failure;
        }
        if overrides.strict_phases {
            settings.unknown_phases = UnknownPhasePolicy::Reject;
        }
        settings.legacy_aliases |= overrides.legacy_aliases;

        Ok(settings)
    }

    /// Lifecycle registry for this session
    pub fn registry(&self) -> LifecycleRegistry {
        let registry = LifecycleRegistry::default();
        if self.legacy_aliases {
            registry.with_legacy_aliases()
        } else {
            registry
        }
    }
}
