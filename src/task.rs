//! Per-task mutable state: the state machine, the one-shot ready latch, and
//! the runtime record a supervisor thread owns for the lifetime of a task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::config::TaskConfig;

/// The live state of a task. See `SPEC_FULL.md` §3 for the full transition
/// table; only the transitions implemented in `supervisor` are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting on dependencies; the initial state of every task.
    Pending,
    /// Dependencies satisfied, child spawned, not yet ready.
    Running,
    /// Reached successfully: exited 0 (Oneshot), probe succeeded (Service),
    /// or spawned with no probe (Daemon). Terminal for Oneshot only.
    Ready,
    /// Exited non-zero, spawn failed, or readiness timed out.
    Failed,
}

/// A one-shot broadcast event: many waiters, one setter. Once set,
/// subsequent waits return immediately.
///
/// Implemented as a condition variable guarding a boolean rather than a
/// channel, so that an unbounded number of dependents can wait on the same
/// instance without each consuming a distinct receiver.
#[derive(Default)]
pub struct Latch {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl Latch {
    /// Creates an unset latch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the latch, waking every current and future waiter. Idempotent:
    /// setting an already-set latch is a no-op, satisfying the "signaled at
    /// most once" invariant even if called more than once by mistake.
    pub fn set(&self) {
        let mut guard = self.signaled.lock().unwrap_or_else(|p| p.into_inner());
        if !*guard {
            *guard = true;
            self.condvar.notify_all();
        }
    }

    /// True once [`Latch::set`] has been called.
    pub fn is_set(&self) -> bool {
        *self.signaled.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Blocks until set, or until `cancel` flips to `true`. Polls `cancel`
    /// at a bounded interval so a dependency that never becomes ready does
    /// not prevent the process from reacting to shutdown; absent a
    /// shutdown signal, this waits indefinitely, matching the reference
    /// behavior of blocking a dependent forever on a failed dependency.
    ///
    /// Returns `true` if the latch was observed set, `false` if cancelled
    /// first.
    pub fn wait_cancellable(&self, cancel: &AtomicBool) -> bool {
        const POLL_INTERVAL: Duration = Duration::from_millis(50);
        let mut guard = self.signaled.lock().unwrap_or_else(|p| p.into_inner());
        loop {
            if *guard {
                return true;
            }
            if cancel.load(Ordering::SeqCst) {
                return false;
            }
            let (next, _timed_out) = self
                .condvar
                .wait_timeout(guard, POLL_INTERVAL)
                .unwrap_or_else(|p| p.into_inner());
            guard = next;
        }
    }
}

/// Per-task runtime record. Configuration is immutable; every other field
/// is written exclusively by this task's own supervisor thread, and read
/// without mutation by observers (other supervisors waiting on `ready`,
/// consumers taking a state snapshot).
pub struct TaskRuntime {
    /// The task's immutable, load-time configuration.
    pub config: TaskConfig,
    state: Mutex<TaskState>,
    /// Single-use, many-waiter signal that fires when this task first
    /// reaches `Ready`.
    pub ready: Latch,
    /// Process group id of the live child, if any; `None` once reaped.
    /// Used by the shutdown path to signal the group without needing the
    /// `Child` handle, which stays local to the supervisor thread.
    pub pgid: Mutex<Option<i32>>,
    /// Display color assigned by configuration-order palette cycling.
    pub color: &'static str,
    start_time: Mutex<Option<Instant>>,
    end_time: Mutex<Option<Instant>>,
    /// PTY master fd, or `-1` before allocation / after shutdown closes it.
    pub pty_master: Mutex<i32>,
}

impl TaskRuntime {
    /// Builds a fresh runtime record in the `Pending` state for `config`.
    pub fn new(config: TaskConfig, color: &'static str) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: Mutex::new(TaskState::Pending),
            ready: Latch::new(),
            pgid: Mutex::new(None),
            color,
            start_time: Mutex::new(None),
            end_time: Mutex::new(None),
            pty_master: Mutex::new(-1),
        })
    }

    /// Current state, for snapshotting by observers.
    pub fn state(&self) -> TaskState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// `Pending -> Running`. Records `start_time` exactly once.
    pub fn mark_running(&self) {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = TaskState::Running;
        let mut start = self.start_time.lock().unwrap_or_else(|p| p.into_inner());
        if start.is_none() {
            *start = Some(Instant::now());
        }
    }

    /// Transitions to `Ready` and signals the latch. Safe to call on a
    /// task already `Ready`; the latch's own idempotence absorbs repeats.
    pub fn mark_ready(&self) {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = TaskState::Ready;
        self.ready.set();
    }

    /// Transitions to `Failed`. Does not touch the latch: per the data
    /// model, the latch fires only on a (possibly earlier) Ready.
    pub fn mark_failed(&self) {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = TaskState::Failed;
    }

    /// Records `end_time`, once, at child exit.
    pub fn record_end(&self) {
        let mut end = self.end_time.lock().unwrap_or_else(|p| p.into_inner());
        if end.is_none() {
            *end = Some(Instant::now());
        }
    }

    /// Elapsed time since `start_time`, or `None` if the task never ran.
    pub fn elapsed(&self) -> Option<Duration> {
        let start = (*self.start_time.lock().unwrap_or_else(|p| p.into_inner()))?;
        let end = *self.end_time.lock().unwrap_or_else(|p| p.into_inner());
        Some(end.unwrap_or_else(Instant::now) - start)
    }
}
