//! Readiness probing for `Service` tasks.
//!
//! Repeatedly runs the task's `ready_cmd` until it exits 0 or the deadline
//! elapses. Each attempt is a fresh, short-lived shell in its own process
//! group; a failed attempt is followed by a fixed retry interval.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::constants::PROBE_RETRY_INTERVAL;
use crate::spawn::spawn_probe;

/// Outcome of running the readiness loop to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The probe command exited 0 before the deadline.
    Success,
    /// The deadline elapsed with no successful attempt.
    Timeout,
    /// A shutdown/cancel request interrupted the loop before success.
    Cancelled,
}

/// Runs `command` repeatedly in `workdir` until it succeeds, `timeout`
/// elapses, or `cancel` is set. Blocks the calling thread for the duration
/// of the loop; callers run this on its own thread so it does not stall
/// other supervisors.
pub fn probe_until_ready(
    command: &str,
    workdir: &Path,
    timeout: Duration,
    cancel: &AtomicBool,
) -> ProbeOutcome {
    let deadline = Instant::now() + timeout;

    loop {
        if cancel.load(Ordering::SeqCst) {
            return ProbeOutcome::Cancelled;
        }

        match spawn_probe(command, workdir) {
            Ok(mut child) => {
                if let Ok(status) = child.wait()
                    && status.success()
                {
                    return ProbeOutcome::Success;
                }
            }
            Err(_) => {
                // Treat a spawn failure for this attempt like any other
                // failed attempt: retry until the deadline, same as the
                // reference behavior for a transiently-unavailable probe
                // command.
            }
        }

        if Instant::now() >= deadline {
            return ProbeOutcome::Timeout;
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let sleep_for = PROBE_RETRY_INTERVAL.min(remaining);
        if sleep_cancellable(sleep_for, cancel) {
            return ProbeOutcome::Cancelled;
        }
        if Instant::now() >= deadline {
            return ProbeOutcome::Timeout;
        }
    }
}

/// Sleeps in short slices so a cancel request is observed promptly rather
/// than only after the full retry interval. Returns `true` if cancelled.
fn sleep_cancellable(duration: Duration, cancel: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(25);
    let mut remaining = duration;
    while remaining > Duration::ZERO {
        if cancel.load(Ordering::SeqCst) {
            return true;
        }
        let step = SLICE.min(remaining);
        std::thread::sleep(step);
        remaining -= step;
    }
    cancel.load(Ordering::SeqCst)
}
