//! Default configuration values

/// Workspace descriptor file name
pub const WORKSPACE_FILE: &str = "weave.toml";

/// Default number of build threads (sequential build)
pub const DEFAULT_THREADS: usize = 1;

/// Lifecycle used when a phase name does not say otherwise
pub const DEFAULT_LIFECYCLE: &str = "default";

/// Execution id given to goals requested on the command line
pub const DEFAULT_CLI_EXECUTION_ID: &str = "default-cli";

/// Environment variable overriding the thread count
pub const THREADS_ENV: &str = "WEAVE_THREADS";

/// Configuration key holding the shell command of an execution
pub const RUN_KEY: &str = "run";

/// Number of trailing output lines kept in an action failure message
pub const FAILURE_OUTPUT_LINES: usize = 20;

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
