//! Configuration model and loader for dagrun.
//!
//! The core only ever consumes the typed [`TaskConfig`] map this module
//! produces; the TOML grammar below is the bundled loader's concrete
//! surface and is intentionally small. See `SPEC_FULL.md` §6.1 for the
//! grammar this loader accepts.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::constants::{DEFAULT_MAX_LINES, DEFAULT_READY_TIMEOUT_SECS};
use crate::error::ConfigError;

/// The kind of a task, determining how it reaches the `Ready` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Expected to terminate; success is exit code 0.
    Oneshot,
    /// Long-lived, becomes `Ready` once its readiness probe succeeds.
    Service,
    /// Long-lived, becomes `Ready` immediately on spawn.
    Daemon,
}

impl Default for TaskKind {
    fn default() -> Self {
        Self::Oneshot
    }
}

/// Immutable per-task configuration, resolved against `[defaults]`.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Unique, non-empty identifier for this task.
    pub name: String,
    /// Determines how and when the task is considered ready.
    pub kind: TaskKind,
    /// The shell command string executed via `/bin/bash -c`.
    pub command: String,
    /// Names of tasks that must be `Ready` before this one starts.
    pub depends_on: Vec<String>,
    /// Optional command whose exit code 0 signals readiness for `Service`.
    pub ready_cmd: Option<String>,
    /// Absolute working directory the child is spawned in.
    pub workdir: PathBuf,
    /// Deadline for the readiness probe (or immaterial for other kinds).
    pub ready_timeout: Duration,
    /// Maximum number of log lines a consumer should retain for this task.
    pub max_lines: usize,
}

/// Raw `[defaults]` table as written in the configuration file.
#[derive(Debug, Default, Deserialize)]
struct RawDefaults {
    #[serde(default)]
    cmd_prefix: String,
    workdir: Option<String>,
    ready_timeout: Option<f64>,
    max_lines: Option<usize>,
}

/// Raw `[[task]]` entry as written in the configuration file.
#[derive(Debug, Deserialize)]
struct RawTask {
    #[serde(default)]
    name: String,
    #[serde(default)]
    kind: TaskKind,
    #[serde(default)]
    cmd: String,
    #[serde(default)]
    depends_on: Vec<String>,
    ready_cmd: Option<String>,
    workdir: Option<String>,
    ready_timeout: Option<f64>,
    max_lines: Option<usize>,
}

/// Raw top-level document shape.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    defaults: RawDefaults,
    #[serde(default)]
    task: Vec<RawTask>,
}

/// Result of a successful load: the validated, insertion-ordered task map
/// plus the defaults-derived maximum log line hint.
pub struct LoadedConfig {
    /// Task configurations keyed by name, in declaration order.
    pub tasks: IndexMap<String, TaskConfig>,
    /// Default maximum log lines, for callers that need the bare default.
    pub default_max_lines: usize,
}

fn resolve_workdir(raw: Option<&str>, base: &Path) -> Result<PathBuf, ConfigError> {
    let candidate = raw.map(PathBuf::from).unwrap_or_else(|| base.to_path_buf());
    let expanded = expand_home(&candidate);
    match fs::canonicalize(&expanded) {
        Ok(resolved) => Ok(resolved),
        Err(_) => Ok(expanded),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(stripped) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(stripped),
        None => path.to_path_buf(),
    }
}

/// Loads and validates a task configuration file from `path`.
///
/// Validates the semantic constraints the core requires (non-empty, unique
/// names; dependencies that resolve within the set); acyclicity is checked
/// separately by [`crate::planner::topological_order`].
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let text = fs::read_to_string(path)?;
    let raw: RawConfig = toml::from_str(&text)?;

    let default_workdir = path.parent().unwrap_or_else(|| Path::new("."));
    let def_workdir = resolve_workdir(raw.defaults.workdir.as_deref(), default_workdir)?;
    let def_ready_timeout = raw
        .defaults
        .ready_timeout
        .unwrap_or(DEFAULT_READY_TIMEOUT_SECS as f64);
    let def_max_lines = raw.defaults.max_lines.unwrap_or(DEFAULT_MAX_LINES);
    let prefix = raw.defaults.cmd_prefix.trim().to_string();

    let mut tasks: IndexMap<String, TaskConfig> = IndexMap::with_capacity(raw.task.len());
    for (index, row) in raw.task.into_iter().enumerate() {
        if row.name.trim().is_empty() {
            return Err(ConfigError::EmptyName(index));
        }
        if tasks.contains_key(&row.name) {
            return Err(ConfigError::DuplicateName(row.name));
        }

        let command = if prefix.is_empty() {
            row.cmd
        } else {
            format!("{prefix} && {}", row.cmd)
        };

        let ready_timeout = Duration::from_secs_f64(row.ready_timeout.unwrap_or(def_ready_timeout));
        let max_lines = row.max_lines.unwrap_or(def_max_lines);
        let workdir = resolve_workdir(row.workdir.as_deref(), &def_workdir)?;

        let cfg = TaskConfig {
            name: row.name.clone(),
            kind: row.kind,
            command,
            depends_on: row.depends_on,
            ready_cmd: row.ready_cmd,
            workdir,
            ready_timeout,
            max_lines,
        };
        tasks.insert(row.name, cfg);
    }

    for cfg in tasks.values() {
        for dep in &cfg.depends_on {
            if !tasks.contains_key(dep) {
                return Err(ConfigError::UnknownDependency {
                    task: cfg.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    Ok(LoadedConfig {
        tasks,
        default_max_lines: def_max_lines,
    })
}
