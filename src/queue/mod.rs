//! Serialized request queue with circuit breaker.
//!
//! A page full of widgets fires media requests at mount time; the remote
//! service enforces per-minute and per-day quotas. The queue converts
//! that uncoordinated burst into a predictable outbound rate:
//!
//! - at most one task in flight at any time, process-wide for the queue
//!   instance;
//! - a minimum start-to-start spacing between consecutive tasks;
//! - a cooldown window after a quota-exhaustion signal, during which
//!   nothing is issued and new admissions fail fast.
//!
//! # State machine
//!
//! The queue is either idle (no drain task alive) or draining. A single
//! drain task pops the head, runs it to completion, and applies spacing —
//! mutual exclusion is structural, not lock-based; the state mutex is
//! never held across an await. Orthogonally, the circuit is `Normal` or
//! `Cooldown { until }`:
//!
//! - `Normal → Cooldown`: a finished task failed with a rate-limit error.
//!   Other failures do not trip the circuit.
//! - `Cooldown → Normal`: the deadline elapsed. The drain task sleeps
//!   until then; an idle queue recovers lazily on the next admission
//!   check, so no timer task is needed.
//!
//! While cooling down, tasks already enqueued are held (and drained in
//! order once the circuit closes); *new* [`enqueue`](RequestQueue::enqueue)
//! calls are rejected with `CircuitOpen` without consuming a remote-call
//! attempt.
//!
//! # Ordering
//!
//! Strict FIFO, except that a priority task is inserted at the head of
//! the current queue at enqueue time. An already-running task is never
//! preempted. Canceled tasks are discarded at dequeue without consuming a
//! spacing slot; the order of the remaining live tasks is unaffected.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::telemetry;
use crate::{Result, ShowreelError};

/// Configuration for the request queue.
///
/// The defaults are deliberately generous — tuned for a free-tier image
/// quota, not for throughput:
///
/// ```rust
/// # use showreel::QueueConfig;
/// # use std::time::Duration;
/// let config = QueueConfig::new()
///     .min_interval(Duration::from_secs(5))
///     .cooldown(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Minimum start-to-start spacing between consecutive tasks.
    /// Default: 10s.
    pub min_interval: Duration,
    /// How long the circuit stays open after a quota signal. Default: 60s.
    pub cooldown: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(10),
            cooldown: Duration::from_secs(60),
        }
    }
}

impl QueueConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum start-to-start spacing.
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Set the cooldown applied after a quota-exhaustion signal.
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Circuit breaker state. One circuit per queue, gating every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Normal,
    Cooldown { until: Instant },
}

/// What the drain loop learns from a finished task. The caller's result
/// has already been delivered through the [`Ticket`] by this point.
enum TaskOutcome {
    Ok,
    RateLimited,
    Failed,
}

type TaskFuture = Pin<Box<dyn Future<Output = TaskOutcome> + Send>>;

struct QueuedTask {
    future: TaskFuture,
    canceled: Arc<AtomicBool>,
}

/// Handle to a queued request: the eventual result plus a cancellation
/// flag.
///
/// Dropping the ticket does not cancel the task — a caller that no
/// longer wants the result can simply discard it. [`cancel()`](Self::cancel)
/// marks the entry so the queue discards it before execution.
pub struct Ticket<T> {
    rx: oneshot::Receiver<Result<T>>,
    canceled: Arc<AtomicBool>,
}

impl<T> Ticket<T> {
    /// Mark the request as abandoned. Cooperative: a task that already
    /// started runs to completion; one still waiting is discarded at
    /// dequeue and resolves as `Canceled`.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    /// Wait for the queue to resolve this request.
    pub async fn resolve(self) -> Result<T> {
        match self.rx.await {
            Ok(result) => result,
            // The queue dropped the task before running it.
            Err(_) => Err(ShowreelError::Canceled),
        }
    }
}

struct QueueState {
    tasks: VecDeque<QueuedTask>,
    draining: bool,
    last_started: Option<Instant>,
    circuit: CircuitState,
}

impl QueueState {
    /// Whether the circuit is open at `now`, lazily closing an expired
    /// cooldown.
    fn circuit_open(&mut self, now: Instant) -> bool {
        match self.circuit {
            CircuitState::Normal => false,
            CircuitState::Cooldown { until } if now >= until => {
                debug!("circuit cooldown elapsed");
                self.circuit = CircuitState::Normal;
                false
            }
            CircuitState::Cooldown { .. } => true,
        }
    }

    /// Earliest permitted start for the next task, if spacing applies.
    fn next_slot(&self, config: &QueueConfig) -> Option<Instant> {
        self.last_started.map(|started| started + config.min_interval)
    }
}

struct QueueInner {
    config: QueueConfig,
    state: Mutex<QueueState>,
}

impl QueueInner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().expect("queue state lock poisoned")
    }
}

/// Serialized, rate-limited task queue gating all remote calls.
///
/// Cheap to clone; clones share the same queue and circuit. The queue is
/// long-lived — it never terminates on its own.
#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<QueueInner>,
}

impl RequestQueue {
    /// Create a queue with the given configuration.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                config,
                state: Mutex::new(QueueState {
                    tasks: VecDeque::new(),
                    draining: false,
                    last_started: None,
                    circuit: CircuitState::Normal,
                }),
            }),
        }
    }

    /// Admit a job. `priority` inserts at the head of the current queue
    /// instead of the tail.
    ///
    /// Fails fast with `CircuitOpen` while the circuit is cooling down.
    /// Requires a tokio runtime context (the drain task is spawned on
    /// demand).
    pub fn enqueue<T, F>(&self, job: F, priority: bool) -> Result<Ticket<T>>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let mut state = self.inner.lock();

        if state.circuit_open(Instant::now()) {
            metrics::counter!(telemetry::QUEUE_REJECTIONS_TOTAL).increment(1);
            return Err(ShowreelError::CircuitOpen);
        }

        let (tx, rx) = oneshot::channel();
        let canceled = Arc::new(AtomicBool::new(false));

        // The ticket's result is delivered from inside the task, so the
        // drain loop only sees the classified outcome.
        let future: TaskFuture = Box::pin(async move {
            match job.await {
                Ok(value) => {
                    let _ = tx.send(Ok(value));
                    TaskOutcome::Ok
                }
                Err(e) => {
                    let outcome = if e.is_rate_limit() {
                        TaskOutcome::RateLimited
                    } else {
                        TaskOutcome::Failed
                    };
                    debug!(error = %e, "queued task failed");
                    let _ = tx.send(Err(e));
                    outcome
                }
            }
        });

        let task = QueuedTask {
            future,
            canceled: canceled.clone(),
        };
        if priority {
            state.tasks.push_front(task);
        } else {
            state.tasks.push_back(task);
        }

        if !state.draining {
            state.draining = true;
            tokio::spawn(drain(self.inner.clone()));
        }

        Ok(Ticket { rx, canceled })
    }

    /// Number of tasks waiting (not counting one in flight).
    pub fn pending(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    /// Whether the circuit is currently open.
    pub fn is_cooling_down(&self) -> bool {
        self.inner.lock().circuit_open(Instant::now())
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

/// What the drain loop decided to do with the lock held.
enum Step {
    Sleep(Instant),
    Run(QueuedTask),
    Skip,
    Exit,
}

/// Serial processor. At most one drain task is alive per queue; it exits
/// when the queue empties and is respawned by the next enqueue.
async fn drain(inner: Arc<QueueInner>) {
    loop {
        let step = {
            let mut state = inner.lock();
            let now = Instant::now();

            if state.tasks.is_empty() {
                state.draining = false;
                Step::Exit
            } else if let CircuitState::Cooldown { until } = state.circuit {
                if now < until {
                    Step::Sleep(until)
                } else {
                    debug!("circuit cooldown elapsed, resuming queue");
                    state.circuit = CircuitState::Normal;
                    Step::Skip
                }
            } else if let Some(ready_at) = state.next_slot(&inner.config)
                && now < ready_at
            {
                Step::Sleep(ready_at)
            } else {
                let task = state.tasks.pop_front().expect("queue is non-empty");
                if task.canceled.load(Ordering::Acquire) {
                    // Dropping the task resolves its ticket as canceled.
                    debug!("discarding canceled task");
                    Step::Skip
                } else {
                    state.last_started = Some(now);
                    Step::Run(task)
                }
            }
        };

        match step {
            Step::Sleep(deadline) => sleep_until(deadline).await,
            Step::Skip => {}
            Step::Exit => return,
            Step::Run(task) => {
                if let TaskOutcome::RateLimited = task.future.await {
                    let until = Instant::now() + inner.config.cooldown;
                    let mut state = inner.lock();
                    state.circuit = CircuitState::Cooldown { until };
                    metrics::counter!(telemetry::CIRCUIT_TRIPS_TOTAL).increment(1);
                    warn!(
                        cooldown_ms = inner.config.cooldown.as_millis() as u64,
                        "quota exhausted, opening circuit"
                    );
                }
            }
        }
    }
}
