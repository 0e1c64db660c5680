//! Infrastructure layer
//!
//! Handles I/O with the outside world: running the commands bound to
//! executions. This module is the only place where side effects occur.

pub mod process;
