//! Error handling for dagrun.
//!
//! Only [`ConfigError`] ever crosses an API boundary as a `Result::Err`.
//! Everything that can go wrong once a task's supervisor is running
//! (a shell that fails to spawn, a readiness probe that times out, a child
//! that exits non-zero) is recorded as a task-state transition plus a
//! human-readable log record instead of being propagated; see
//! `supervisor` and `task::TaskState`.

use thiserror::Error;

/// Fatal errors raised while loading and validating configuration.
///
/// An orchestrator is never constructed when one of these occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error reading the configuration file from disk.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing the TOML document.
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// A task was declared with an empty name.
    #[error("task at position {0} has an empty name")]
    EmptyName(usize),

    /// Two or more tasks declared the same name.
    #[error("duplicate task name '{0}'")]
    DuplicateName(String),

    /// A task listed a dependency that does not resolve to any other task.
    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency {
        /// The task declaring the dependency.
        task: String,
        /// The dependency name that does not resolve.
        dependency: String,
    },

    /// The dependency graph is not acyclic.
    #[error("dependency cycle detected among: {0:?}")]
    Cycle(Vec<String>),
}
