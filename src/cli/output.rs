//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars,
//! status prefixes, and error reports to the user.

use std::sync::OnceLock;

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::executor::BuildListener;
use crate::core::plan::BuildPlan;
use crate::core::result::{StepOutcome, StepState};
use crate::core::step::BuildStep;

/// Global output preferences
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub quiet: bool,
    pub json: bool,
    pub verbose: u8,
}

static OUTPUT: OnceLock<OutputConfig> = OnceLock::new();

impl OutputConfig {
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self { quiet, json, verbose }
    }

    /// Make this configuration visible to [`OutputConfig::global`]
    pub fn apply_global(self) {
        let _ = OUTPUT.set(self);
    }

    /// Configuration set by `main`, or the default
    pub fn global() -> Self {
        OUTPUT.get().copied().unwrap_or_default()
    }

    /// Default tracing filter for the verbosity flags
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Whether progress bars should be drawn
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    if OutputConfig::global().json {
        let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
        eprintln!(
            "{}",
            serde_json::json!({ "error": error.to_string(), "causes": causes })
        );
        return;
    }

    eprintln!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Create a progress bar for build steps
pub fn create_build_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} steps ({msg})")
        .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("█▓▒░"));
    pb.set_style(style);
    pb
}

/// Build listener driving a progress bar
pub struct ProgressListener {
    bar: ProgressBar,
}

impl ProgressListener {
    /// Create a listener; a hidden bar when `visible` is false
    pub fn new(visible: bool) -> Self {
        Self {
            bar: if visible { create_build_bar(0) } else { ProgressBar::hidden() },
        }
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl BuildListener for ProgressListener {
    fn build_started(&self, plan: &BuildPlan, _threads: usize) {
        self.bar.set_length(plan.len() as u64);
    }

    fn step_started(&self, step: &BuildStep) {
        if !step.is_empty() {
            self.bar.set_message(step.label());
        }
    }

    fn step_finished(&self, outcome: &StepOutcome) {
        self.bar.inc(1);
        if outcome.state == StepState::Failed {
            if let Some(error) = &outcome.error {
                self.bar.println(format!("{} {}: {error}", status::ERROR, outcome.label()));
            }
        }
    }
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";
}
