//! Owns every task's runtime record, the shared log queue, and the
//! supervisor threads; the crate's top-level entry point for library
//! consumers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use indexmap::IndexMap;

use crate::config::LoadedConfig;
use crate::constants::{LOG_QUEUE_CAPACITY, color_for_index};
use crate::error::ConfigError;
use crate::planner::topological_order;
use crate::shutdown;
use crate::supervisor;
use crate::task::{TaskRuntime, TaskState};

/// A read-only snapshot of one task for table-view consumers.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    /// Task name.
    pub name: String,
    /// Task kind.
    pub kind: crate::config::TaskKind,
    /// Current state.
    pub state: TaskState,
    /// Assigned display color.
    pub color: &'static str,
    /// Elapsed running time, or `None` if the task has never run.
    pub elapsed: Option<std::time::Duration>,
}

/// Owns all task runtimes for the lifetime of one orchestrated run.
pub struct Orchestrator {
    runtimes: Arc<IndexMap<String, Arc<TaskRuntime>>>,
    launch_order: Vec<String>,
    log_tx: SyncSender<String>,
    log_rx: Mutex<Option<Receiver<String>>>,
    cancel: Arc<AtomicBool>,
    shutdown_done: AtomicBool,
}

impl Orchestrator {
    /// Builds runtime records from `config`, assigning display colors by
    /// cycling the fixed palette in configuration order, and validates the
    /// dependency graph. Fails with [`ConfigError::Cycle`] rather than
    /// constructing an orchestrator over a config with a cycle.
    pub fn new(config: LoadedConfig) -> Result<Self, ConfigError> {
        let launch_order = topological_order(&config.tasks)?;

        let mut runtimes = IndexMap::with_capacity(config.tasks.len());
        for (index, (name, task_config)) in config.tasks.into_iter().enumerate() {
            let color = color_for_index(index);
            runtimes.insert(name, TaskRuntime::new(task_config, color));
        }

        let (log_tx, log_rx) = mpsc::sync_channel(LOG_QUEUE_CAPACITY);

        Ok(Self {
            runtimes: Arc::new(runtimes),
            launch_order,
            log_tx,
            log_rx: Mutex::new(Some(log_rx)),
            cancel: Arc::new(AtomicBool::new(false)),
            shutdown_done: AtomicBool::new(false),
        })
    }

    /// Takes ownership of the receiving end of the log queue. May only be
    /// called once; subsequent calls return `None`. Typically taken by a
    /// consumer thread before [`Orchestrator::run`] is called, since `run`
    /// blocks until every supervisor finishes.
    pub fn take_log_receiver(&self) -> Option<Receiver<String>> {
        self.log_rx.lock().unwrap_or_else(|p| p.into_inner()).take()
    }

    /// A read-only snapshot of every task's current state, in configuration
    /// order, for table-view consumers.
    pub fn snapshot(&self) -> Vec<TaskSnapshot> {
        self.runtimes
            .values()
            .map(|runtime| TaskSnapshot {
                name: runtime.config.name.clone(),
                kind: runtime.config.kind,
                state: runtime.state(),
                color: runtime.color,
                elapsed: runtime.elapsed(),
            })
            .collect()
    }

    /// The PTY master fd for `task_name`, for stdin injection by an external
    /// consumer, or `None` if the task does not exist or has no PTY open.
    pub fn pty_master(&self, task_name: &str) -> Option<i32> {
        let runtime = self.runtimes.get(task_name)?;
        let fd = *runtime.pty_master.lock().unwrap_or_else(|p| p.into_inner());
        if fd >= 0 { Some(fd) } else { None }
    }

    /// Launches every task's supervisor concurrently and blocks until all of
    /// them finish. Completes immediately for an empty configuration.
    pub fn run(&self) {
        let mut dependents_index: HashMap<&str, usize> = HashMap::new();
        for (index, name) in self.launch_order.iter().enumerate() {
            dependents_index.insert(name.as_str(), index);
        }

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(self.launch_order.len());
        for name in &self.launch_order {
            let runtime = Arc::clone(&self.runtimes[name.as_str()]);
            let runtimes = Arc::clone(&self.runtimes);
            let log_tx = self.log_tx.clone();
            let cancel = Arc::clone(&self.cancel);

            handles.push(thread::spawn(move || {
                supervisor::run(runtime, &runtimes, log_tx, cancel);
            }));
        }

        for handle in handles {
            let _ = handle.join();
        }
    }

    /// Requests shutdown: `SIGTERM` then `SIGKILL` for every live task's
    /// process group, cancellation of pumps and probers, and release of
    /// every retained PTY master. Idempotent and safe to call from a signal
    /// handler or a UI event.
    pub fn shutdown(&self) {
        if self
            .shutdown_done
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        shutdown::request_cancel(&self.cancel);

        for runtime in self.runtimes.values() {
            let pgid = runtime.pgid.lock().unwrap_or_else(|p| p.into_inner()).take();
            if let Some(pgid) = pgid {
                shutdown::terminate_process_group(pgid);
            }
        }

        for runtime in self.runtimes.values() {
            let mut fd = runtime.pty_master.lock().unwrap_or_else(|p| p.into_inner());
            *fd = shutdown::close_pty(*fd);
        }
    }

    /// Whether a shutdown has been requested; supervisors consult this to
    /// distinguish a shutdown-induced exit from a genuine failure for
    /// long-lived tasks.
    pub fn shutdown_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}
