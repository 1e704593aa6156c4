//! Magic numbers and the display color palette used throughout the crate.
//!
//! This module centralizes the values the original implementation hard-coded
//! at module scope, so they have one place to live and one place to change.

use std::time::Duration;

/// Default readiness timeout applied when a task does not set one explicitly.
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 30;

/// Default maximum number of log lines retained per task when not specified.
pub const DEFAULT_MAX_LINES: usize = 2000;

/// Interval between readiness-probe attempts after a failed probe.
pub const PROBE_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Maximum number of bytes read from a PTY master per pump iteration.
pub const PTY_READ_CHUNK: usize = 1024;

/// Box-drawing vertical bar used as the log-line separator, per the wire format.
pub const LOG_LINE_SEPARATOR: char = '\u{2502}';

/// Shell used to interpret task and probe command strings.
pub const TASK_SHELL: &str = "/bin/bash";

/// Flag passed to [`TASK_SHELL`] ahead of the command string.
pub const TASK_SHELL_FLAG: &str = "-c";

/// Capacity of the bounded log queue shared by every pump and supervisor.
///
/// Overflow policy is block-producer, not drop-oldest: see `orchestrator`.
pub const LOG_QUEUE_CAPACITY: usize = 4096;

/// Ten-entry color palette cycled in configuration order, mirroring the
/// matplotlib "tab10" palette the original implementation used to give each
/// task's log lines a stable, distinguishable color.
pub const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2",
    "#7f7f7f", "#bcbd22", "#17becf",
];

/// Returns the palette entry for the given configuration-order index,
/// cycling with period `PALETTE.len()`.
pub fn color_for_index(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}
