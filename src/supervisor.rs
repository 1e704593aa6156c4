//! Per-task lifecycle: wait for dependencies, spawn, observe, finalize.
//!
//! One supervisor runs per task, each on its own OS thread, communicating
//! with the rest of the graph only through the shared log queue and each
//! task's ready latch. A supervisor never returns an error to its caller:
//! every failure mode becomes a task-state transition plus a human-readable
//! log record, per the error handling design in `SPEC_FULL.md` §7.

use std::os::fd::{AsRawFd, IntoRawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::TaskKind;
use crate::prober::{self, ProbeOutcome};
use crate::pty;
use crate::spawn;
use crate::task::TaskRuntime;

/// Runs the full supervisor protocol for `runtime` to completion. Blocks
/// the calling thread for the task's entire lifetime.
pub fn run(
    runtime: Arc<TaskRuntime>,
    runtimes: &IndexMap<String, Arc<TaskRuntime>>,
    log_tx: SyncSender<String>,
    cancel: Arc<AtomicBool>,
) {
    let name = runtime.config.name.clone();
    debug!(task = %name, "supervisor thread started");

    if !wait_for_dependencies(&runtime, runtimes, &cancel) {
        debug!(task = %name, "cancelled while waiting on dependencies");
        return;
    }

    runtime.mark_running();
    send(&log_tx, format!("[{name}] started"));

    let pty_pair = match pty::open_pty() {
        Ok(pair) => pair,
        Err(err) => {
            runtime.mark_failed();
            send(&log_tx, format!("[{name}] failed to allocate pty: {err}"));
            return;
        }
    };
    let slave_fd = pty_pair.slave.as_raw_fd();

    let mut child =
        match spawn::spawn_in_pty(&runtime.config.command, &runtime.config.workdir, slave_fd) {
            Ok(child) => child,
            Err(err) => {
                runtime.mark_failed();
                send(&log_tx, format!("[{name}] failed to spawn: {err}"));
                return;
            }
        };

    // The child now holds its own duplicated copies of the slave; drop ours
    // so the master is the only remaining open reference to this side.
    drop(pty_pair.slave);

    *runtime.pgid.lock().unwrap_or_else(|p| p.into_inner()) = Some(spawn::pgid_of(&child));
    let master_fd = pty_pair.master.into_raw_fd();
    *runtime.pty_master.lock().unwrap_or_else(|p| p.into_inner()) = master_fd;

    let pump_handle = pty::spawn_pump(master_fd, name.clone(), log_tx.clone());

    determine_readiness(&runtime, &log_tx, &cancel);

    let start = Instant::now();
    let status = child.wait();
    runtime.record_end();
    debug!(task = %name, elapsed = ?start.elapsed(), "child exited");

    match status {
        Ok(status) => finalize(&runtime, &log_tx, &cancel, status.success(), status.code()),
        Err(err) => {
            warn!(task = %name, %err, "failed to wait for child");
            if !cancel.load(Ordering::SeqCst) {
                runtime.mark_failed();
            }
        }
    }

    let _ = pump_handle.join();
}

/// Blocks on every dependency's ready latch. Returns `false` if `cancel`
/// fired before all dependencies signaled, in which case the caller leaves
/// this task's state untouched (still `Pending`).
fn wait_for_dependencies(
    runtime: &TaskRuntime,
    runtimes: &IndexMap<String, Arc<TaskRuntime>>,
    cancel: &AtomicBool,
) -> bool {
    for dep_name in &runtime.config.depends_on {
        let Some(dependency) = runtimes.get(dep_name) else {
            // The planner already rejects unknown dependencies at load
            // time; this is unreachable in practice and handled the same
            // way a cancelled wait would be.
            return false;
        };
        if !dependency.ready.wait_cancellable(cancel) {
            return false;
        }
    }
    true
}

/// Determines readiness per the task's kind and transitions state
/// accordingly. Oneshot tasks are left untouched here; their readiness is
/// decided at exit in [`finalize`].
fn determine_readiness(runtime: &TaskRuntime, log_tx: &SyncSender<String>, cancel: &AtomicBool) {
    let name = &runtime.config.name;
    match runtime.config.kind {
        TaskKind::Oneshot => {}
        TaskKind::Service => match &runtime.config.ready_cmd {
            Some(probe_cmd) => {
                let outcome = prober::probe_until_ready(
                    probe_cmd,
                    &runtime.config.workdir,
                    runtime.config.ready_timeout,
                    cancel,
                );
                match outcome {
                    ProbeOutcome::Success => {
                        runtime.mark_ready();
                        send(log_tx, format!("[{name}] ready"));
                    }
                    ProbeOutcome::Timeout => {
                        runtime.mark_failed();
                        send(log_tx, format!("[{name}] READY TIMEOUT"));
                    }
                    ProbeOutcome::Cancelled => {
                        // Shutdown interrupted the probe; let the child's
                        // own exit (imminent, once shutdown kills it) settle
                        // the final state instead of forcing one here.
                    }
                }
            }
            None => {
                runtime.mark_ready();
                send(log_tx, format!("[{name}] ready"));
            }
        },
        TaskKind::Daemon => {
            runtime.mark_ready();
            send(log_tx, format!("[{name}] ready"));
        }
    }
}

/// Applies the exit-code rule for `runtime`'s kind once the child has
/// exited.
fn finalize(
    runtime: &TaskRuntime,
    log_tx: &SyncSender<String>,
    cancel: &AtomicBool,
    success: bool,
    code: Option<i32>,
) {
    let name = &runtime.config.name;
    match runtime.config.kind {
        TaskKind::Oneshot => {
            if success {
                runtime.mark_ready();
            } else {
                runtime.mark_failed();
                send(
                    log_tx,
                    format!("[{name}] exited with code {}", code.unwrap_or(-1)),
                );
            }
        }
        TaskKind::Service | TaskKind::Daemon => {
            if success {
                // Already Ready (or never reached it, e.g. a timed-out
                // Service); exit 0 on a long-lived task is not itself a
                // state transition.
                return;
            }
            if cancel.load(Ordering::SeqCst) {
                // Shutdown-induced: the non-zero exit is this task's
                // reaction to SIGTERM/SIGKILL, not a genuine failure.
                return;
            }
            runtime.mark_failed();
            send(
                log_tx,
                format!("[{name}] exited with code {}", code.unwrap_or(-1)),
            );
        }
    }
}

fn send(log_tx: &SyncSender<String>, record: String) {
    // Block-producer backpressure per SPEC_FULL.md §5.1: a full queue stalls
    // this supervisor rather than silently dropping the record. A closed
    // receiver (consumer gone) is not an error worth reporting here.
    let _ = log_tx.send(record);
}
