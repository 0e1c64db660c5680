//! Weave - multi-module build orchestrator
//!
//! This library computes lifecycle build plans across the modules of a
//! workspace and executes them in dependency order with bounded parallelism.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Plan construction and scheduling
//! - [`infra`] - Infrastructure layer (external processes)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
