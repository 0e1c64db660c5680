//! Configuration and constants
//!
//! - [`defaults`] - Default values used when neither the CLI nor the
//!   workspace descriptor provide one

pub mod defaults;
