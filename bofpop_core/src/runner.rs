//! Parallel evaluation of independent tasks, with a per task timeout and crash isolation
//!
//! The [`TaskRunner`] keeps at most `workers` worker threads alive. Each task runs on its own
//! worker thread against its own clone of the shared state, so no task can observe the mutations
//! made by another. A supervisor loop tracks a deadline per task: a task past its deadline is abandoned,
//! its [`CancellationToken`] is signalled, and it is reported as [`TaskOutcome::TimedOut`]. A task
//! which panics is reported as [`TaskOutcome::Crashed`], and a task returning an error as
//! [`TaskOutcome::Failed`] along with the error's source chain. Nothing is retried.
//!
//! Threads cannot be killed, so an abandoned task keeps its worker slot until its thread returns.
//! New tasks only start once the live thread count drops below `workers`, across batches too.
//!
//! Reports arrive in completion order, each tagged with the index of the input it came from.
use std::any::Any;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::configuration::Configuration;

/// Flag shared between the supervisor and a task, set when the task is abandoned
///
/// Long running tasks should poll [`CancellationToken::is_cancelled`] and stop early, since an
/// abandoned worker thread otherwise runs to completion in the background.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of a single task
#[derive(Clone, Debug, PartialEq)]
pub enum TaskOutcome<T> {
    /// The task returned a value
    Completed(T),
    /// The task exceeded the per task timeout and was abandoned
    TimedOut,
    /// The worker running the task terminated abnormally, holds the panic message
    Crashed(String),
    /// The task returned an error, holds the error and its sources
    Failed(String),
}

impl<T> TaskOutcome<T> {
    /// The task's value, if it completed
    pub fn completed(self) -> Option<T> {
        match self {
            TaskOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Outcome of a task, tagged with the index of its input
#[derive(Clone, Debug, PartialEq)]
pub struct TaskReport<T> {
    pub task_id: usize,
    pub outcome: TaskOutcome<T>,
}

/// Interval at which a full pool of abandoned threads is checked for a free slot
const SLOT_POLL: Duration = Duration::from_millis(10);

/// Runs batches of tasks on a bounded pool of worker threads
///
/// Clones share the same pool of live threads.
#[derive(Clone, Debug)]
pub struct TaskRunner {
    workers: usize,
    timeout: Option<Duration>,
    live: Arc<AtomicUsize>,
}

impl TaskRunner {
    /// Create a runner with `workers` concurrent tasks (at least one) and a per task `timeout`
    pub fn new(workers: usize, timeout: Duration) -> Self {
        TaskRunner {
            workers: workers.max(1),
            timeout: Some(timeout),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a runner whose tasks may run for as long as they need
    pub fn without_timeout(workers: usize) -> Self {
        TaskRunner {
            workers: workers.max(1),
            timeout: None,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a runner sized to the configured number of processes
    pub fn with_available_cores(timeout: Duration) -> Self {
        Self::new(Configuration::current().processes, timeout)
    }

    /// Runner sharing this runner's pool of worker threads, with a different per task timeout
    pub fn with_timeout(&self, timeout: Option<Duration>) -> Self {
        TaskRunner {
            workers: self.workers,
            timeout,
            live: self.live.clone(),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Worker threads currently running, abandoned ones included
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Run `task` once per input, each call receiving its own clone of `shared`
    ///
    /// Returns one report per input, in completion order.
    pub fn run<S, I, T, E, F>(&self, shared: &S, inputs: Vec<I>, task: F) -> Vec<TaskReport<T>>
    where
        S: Clone + Send + 'static,
        I: Send + 'static,
        T: Send + 'static,
        E: Error + 'static,
        F: Fn(S, I, &CancellationToken) -> Result<T, E> + Send + Sync + 'static,
    {
        let total = inputs.len();
        let task = Arc::new(task);
        let (sender, receiver) = mpsc::channel::<(usize, TaskOutcome<T>)>();
        let mut queue = inputs.into_iter().enumerate().peekable();
        let mut in_flight: IndexMap<usize, (Option<Instant>, CancellationToken)> = IndexMap::new();
        let mut reports = Vec::with_capacity(total);

        loop {
            // Top up the pool, abandoned threads still hold their slot
            while self.live_workers() < self.workers {
                let Some((task_id, input)) = queue.next() else {
                    break;
                };
                let token = CancellationToken::new();
                match spawn_worker(
                    task_id,
                    shared.clone(),
                    input,
                    task.clone(),
                    token.clone(),
                    sender.clone(),
                    LiveWorker::register(&self.live),
                ) {
                    Ok(()) => {
                        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
                        in_flight.insert(task_id, (deadline, token));
                    }
                    Err(err) => {
                        warn!("Unable to start worker for task {task_id}: {err}");
                        reports.push(TaskReport {
                            task_id,
                            outcome: TaskOutcome::Crashed(format!("unable to start worker: {err}")),
                        });
                    }
                }
            }

            let next_deadline = in_flight.values().filter_map(|(deadline, _)| *deadline).min();
            let received = match next_deadline {
                Some(deadline) => {
                    receiver.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                // Every running task reports back eventually
                None if !in_flight.is_empty() => receiver
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
                None if queue.peek().is_some() => {
                    debug!("Waiting for abandoned workers to free a slot");
                    receiver.recv_timeout(SLOT_POLL)
                }
                None => break,
            };
            match received {
                Ok((task_id, outcome)) => {
                    // Results from abandoned tasks are no longer in flight and are dropped
                    if in_flight.shift_remove(&task_id).is_some() {
                        log_outcome(task_id, &outcome);
                        reports.push(TaskReport { task_id, outcome });
                    } else {
                        debug!("Discarding late result from abandoned task {task_id}");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    let now = Instant::now();
                    let expired: Vec<usize> = in_flight
                        .iter()
                        .filter(|(_, (deadline, _))| deadline.is_some_and(|d| d <= now))
                        .map(|(task_id, _)| *task_id)
                        .collect();
                    for task_id in expired {
                        if let Some((_, token)) = in_flight.shift_remove(&task_id) {
                            token.cancel();
                            warn!("Task {task_id} ran past its deadline and was abandoned");
                            reports.push(TaskReport {
                                task_id,
                                outcome: TaskOutcome::TimedOut,
                            });
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    for (task_id, (_, token)) in in_flight.drain(..) {
                        token.cancel();
                        reports.push(TaskReport {
                            task_id,
                            outcome: TaskOutcome::Crashed("result channel closed".to_string()),
                        });
                    }
                    break;
                }
            }
        }

        let completed = reports
            .iter()
            .filter(|r| matches!(r.outcome, TaskOutcome::Completed(_)))
            .count();
        info!(
            "Batch finished: {completed} of {total} tasks completed on {} workers",
            self.workers
        );
        reports
    }
}

fn spawn_worker<S, I, T, E, F>(
    task_id: usize,
    state: S,
    input: I,
    task: Arc<F>,
    token: CancellationToken,
    sender: Sender<(usize, TaskOutcome<T>)>,
    slot: LiveWorker,
) -> std::io::Result<()>
where
    S: Send + 'static,
    I: Send + 'static,
    T: Send + 'static,
    E: Error + 'static,
    F: Fn(S, I, &CancellationToken) -> Result<T, E> + Send + Sync + 'static,
{
    thread::Builder::new()
        .name(format!("bofpop-task-{task_id}"))
        .spawn(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| {
                (*task)(state, input, &token)
            })) {
                Ok(Ok(value)) => TaskOutcome::Completed(value),
                Ok(Err(err)) => TaskOutcome::Failed(error_trace(&err)),
                Err(payload) => TaskOutcome::Crashed(panic_message(payload.as_ref())),
            };
            // Free the slot before reporting, so the supervisor sees it on wake up
            drop(slot);
            // The supervisor stops listening once the batch is over
            let _ = sender.send((task_id, outcome));
        })
        .map(|_| ())
}

/// Counts a worker thread as live until dropped
///
/// Dropped when the thread finishes, or with the closure when the thread fails to start.
struct LiveWorker(Arc<AtomicUsize>);

impl LiveWorker {
    fn register(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        LiveWorker(live.clone())
    }
}

impl Drop for LiveWorker {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn log_outcome<T>(task_id: usize, outcome: &TaskOutcome<T>) {
    match outcome {
        TaskOutcome::Completed(_) => debug!("Task {task_id} completed"),
        TaskOutcome::TimedOut => warn!("Task {task_id} timed out"),
        TaskOutcome::Crashed(msg) => warn!("Task {task_id} crashed: {msg}"),
        TaskOutcome::Failed(trace) => warn!("Task {task_id} raised {trace}"),
    }
}

/// Render an error and each of its sources, one per line
fn error_trace<E: Error>(err: &E) -> String {
    let mut trace = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        trace.push_str("\n  caused by: ");
        trace.push_str(&cause.to_string());
        source = cause.source();
    }
    trace
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "worker panicked".to_string()
    }
}
