//! # Shared Scheduler - Named Delayed Tasks
//!
//! A single-worker delayed-task queue shared by the remote-binding and
//! free-install subsystems. Callers schedule a closure under a name
//! (`connect_42`, `disconnect_42`, `acquire_7`, ...) and may cancel it by
//! that name before it fires.
//!
//! ## Guarantees
//!
//! - `schedule_named` / `cancel_named` never block: they post a command to
//!   the worker over an unbounded channel and return immediately.
//! - Re-scheduling an existing name replaces its deadline and task.
//! - A fired or cancelled name is forgotten; firing and cancelling are
//!   mutually exclusive per name.
//! - Tasks run inline on the worker, so callbacks must be short and must
//!   not block.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, trace, warn};

/// A scheduled callback. Runs at most once, on the scheduler worker.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

enum Command {
    Schedule {
        name: String,
        deadline: Instant,
        task: Task,
    },
    Cancel {
        name: String,
    },
    Shutdown,
}

/// Clonable front end to the scheduler worker.
///
/// Handed to every subsystem that needs timer-driven recovery. The handle
/// stays usable (but inert) after the worker has shut down: commands are
/// dropped and the posting methods return `false`.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// Schedule `task` to run after `delay`, keyed by `name`.
    ///
    /// Replaces any pending task with the same name. Returns `false` if the
    /// worker is gone.
    pub fn schedule_named(&self, name: impl Into<String>, delay: Duration, task: Task) -> bool {
        let name = name.into();
        trace!(task = %name, ?delay, "schedule named task");
        self.tx
            .send(Command::Schedule {
                name,
                deadline: Instant::now() + delay,
                task,
            })
            .is_ok()
    }

    /// Cancel the pending task with the given name, if any.
    ///
    /// Cancelling an unknown name is a no-op. Returns `false` if the worker
    /// is gone.
    pub fn cancel_named(&self, name: &str) -> bool {
        trace!(task = %name, "cancel named task");
        self.tx
            .send(Command::Cancel {
                name: name.to_owned(),
            })
            .is_ok()
    }
}

/// The scheduler worker. Owns the pending-task map for its lifetime.
pub struct TimeoutScheduler {
    handle: SchedulerHandle,
    worker: JoinHandle<()>,
}

impl TimeoutScheduler {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx));
        Self {
            handle: SchedulerHandle { tx },
            worker,
        }
    }

    /// A clonable handle for posting commands.
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Stop the worker. Pending tasks are dropped without running.
    pub async fn shutdown(self) {
        if self.handle.tx.send(Command::Shutdown).is_err() {
            return;
        }
        if let Err(e) = self.worker.await {
            warn!(error = %e, "scheduler worker did not shut down cleanly");
        }
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut pending: HashMap<String, (Instant, Task)> = HashMap::new();

    loop {
        let next_deadline = pending.values().map(|(d, _)| *d).min();

        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Schedule { name, deadline, task }) => {
                    if pending.insert(name.clone(), (deadline, task)).is_some() {
                        debug!(task = %name, "replaced pending task");
                    }
                }
                Some(Command::Cancel { name }) => {
                    if pending.remove(&name).is_none() {
                        trace!(task = %name, "cancel for unknown task");
                    }
                }
                Some(Command::Shutdown) | None => break,
            },
            _ = wait_until(next_deadline) => {
                let now = Instant::now();
                let due: Vec<String> = pending
                    .iter()
                    .filter(|(_, (deadline, _))| *deadline <= now)
                    .map(|(name, _)| name.clone())
                    .collect();
                for name in due {
                    if let Some((_, task)) = pending.remove(&name) {
                        debug!(task = %name, "named task fired");
                        task();
                    }
                }
            }
        }
    }

    debug!(dropped = pending.len(), "scheduler worker stopped");
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => sleep_until(d).await,
        None => std::future::pending().await,
    }
}
