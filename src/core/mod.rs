//! Core business logic module
//!
//! Plan construction is pure; the executor only touches the outside world
//! through the [`executor::MojoExecutor`] it is given, implemented in
//! [`crate::infra`].
//!
//! # Submodules
//!
//! - [`module`] - Modules and mojo executions
//! - [`resolver`] - Module graph and build order
//! - [`lifecycle`] - Lifecycles, phases and aliases
//! - [`step`] - Build steps
//! - [`plan`] - Build plan DAG
//! - [`creator`] - Build plan construction
//! - [`executor`] - Parallel plan execution
//! - [`result`] - Build results and reactor summary
//! - [`logger`] - Plan dumps
//! - [`workspace`] - Workspace descriptor (weave.toml) parsing
//! - [`session`] - Layered session settings

pub mod creator;
pub mod executor;
pub mod lifecycle;
pub mod logger;
pub mod module;
pub mod plan;
pub mod resolver;
pub mod result;
pub mod session;
pub mod step;
pub mod workspace;
