//! Dependency-gated process supervisor for local development task graphs.
//!
//! This crate launches a set of user-defined shell commands as child
//! processes, respects declared dependency ordering between them, pumps
//! their merged output to a single log queue, and tracks the live state of
//! each task. The terminal UI, the configuration file's concrete surface,
//! and CLI ergonomics beyond pointing at a config file are deliberately
//! left to callers; this crate is the supervision core they sit on top of.

#![warn(unused_crate_dependencies)]
// Only used by the binary entry point.
use ctrlc as _;

/// Typed task descriptors, defaults, and the bundled TOML loader.
pub mod config;

/// Errors raised while loading and validating configuration.
pub mod error;

/// Kahn's-algorithm dependency ordering and cycle detection.
pub mod planner;

/// Per-task mutable state, the ready latch, and the runtime record.
pub mod task;

/// PTY allocation and the line-splitting output pump.
pub mod pty;

/// Periodic readiness probing for `Service` tasks.
pub mod prober;

/// Spawns the shell child for a task in its own session/process group.
pub mod spawn;

/// The per-task lifecycle: wait-deps -> spawn -> observe -> finalize.
pub mod supervisor;

/// Owns all task runtimes, the log queue, and runs/shuts down the graph.
pub mod orchestrator;

/// Idempotent process-group termination and PTY release.
pub mod shutdown;

/// Command-line surface for the `dagrun` binary.
pub mod cli;

/// Magic numbers and the display color palette.
pub mod constants;
