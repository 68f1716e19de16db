use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::adapter::{DeliveryError, SinkHandle};
use crate::record::LogRecord;

/// What `deliver` does when the queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Discard the incoming record.
    DropNewest,
    /// Evict the oldest queued record to make room for the incoming one.
    DropOldest,
    /// Wait up to `timeout` for room, then discard the incoming record.
    ///
    /// The wait blocks the calling thread. On a `current_thread` tokio
    /// runtime that thread also drives the delivery worker, so no room can
    /// free up: every blocked `deliver` runs to `timeout` and drops its
    /// record. Use this policy from a multi-threaded runtime or from threads
    /// outside the runtime.
    Block { timeout: Duration },
}

/// Configuration of an [`AsyncDeliveryPipeline`].
///
/// **Fields**
/// - `capacity`: maximum number of queued records (at least 1).
/// - `overflow`: policy applied when the queue is full.
/// - `delivery_timeout`: upper bound for a single `send` to the sink.
/// - `drain_timeout`: how long `shutdown` keeps delivering queued records.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
    pub delivery_timeout: Option<Duration>,
    pub drain_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            overflow: OverflowPolicy::DropNewest,
            delivery_timeout: Some(Duration::from_secs(5)),
            drain_timeout: Duration::from_secs(2),
        }
    }
}

/// Lifecycle of an [`AsyncDeliveryPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    Created = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl PipelineState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => PipelineState::Created,
            1 => PipelineState::Running,
            2 => PipelineState::Draining,
            _ => PipelineState::Stopped,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PipelineError {
    #[error("pipeline cannot start from state {0:?}")]
    InvalidState(PipelineState),

    #[error("no tokio runtime available to run the delivery worker")]
    NoRuntime,
}

/// Counters of an [`AsyncDeliveryPipeline`].
///
/// `dropped` counts overflow evictions and records left in the queue when
/// the drain deadline passed; `rejected` counts records offered while the
/// pipeline was not running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub enqueued: u64,
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
    pub rejected: u64,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
}

struct Shared {
    queue: Mutex<VecDeque<LogRecord>>,
    capacity: usize,
    not_empty: Notify,
    not_full: Condvar,
    state: AtomicU8,
    counters: Counters,
}

impl Shared {
    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<LogRecord>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PipelineState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Bounded queue in front of a [`SinkHandle`], drained by one background
/// task.
///
/// `deliver` never waits for the sink: it only takes the queue lock, except
/// under [`OverflowPolicy::Block`]. Records reach the sink in the order they
/// were enqueued and each one is attempted at most once; failures are
/// logged and counted.
///
/// Records offered outside the `Running` state are dropped and counted as
/// `rejected`.
///
/// Dropping the pipeline without [`shutdown`](Self::shutdown) stops intake;
/// the worker then delivers what is queued, with no deadline, and closes the
/// sink handle when the queue is empty.
pub struct AsyncDeliveryPipeline {
    shared: Arc<Shared>,
    handle: Arc<SinkHandle>,
    config: PipelineConfig,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncDeliveryPipeline {
    /// Create a pipeline in the `Created` state. Nothing is spawned until
    /// [`start`](Self::start).
    pub fn new(handle: SinkHandle, config: PipelineConfig) -> Self {
        let capacity = config.capacity.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
            not_empty: Notify::new(),
            not_full: Condvar::new(),
            state: AtomicU8::new(PipelineState::Created as u8),
            counters: Counters::default(),
        });

        Self {
            shared,
            handle: Arc::new(handle),
            config,
            worker: Mutex::new(None),
        }
    }

    /// Create and start a pipeline in one step.
    pub fn spawn(handle: SinkHandle, config: PipelineConfig) -> Result<Self, PipelineError> {
        let pipeline = Self::new(handle, config);
        pipeline.start()?;
        Ok(pipeline)
    }

    /// Spawn the delivery task on the current tokio runtime.
    pub fn start(&self) -> Result<(), PipelineError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PipelineError::NoRuntime)?;

        self.shared
            .state
            .compare_exchange(
                PipelineState::Created as u8,
                PipelineState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|current| PipelineError::InvalidState(PipelineState::from_u8(current)))?;

        let worker = runtime.spawn(run_worker(
            Arc::clone(&self.shared),
            Arc::clone(&self.handle),
            self.config.delivery_timeout,
        ));
        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(worker);

        debug!(factory = self.handle.factory(), capacity = self.shared.capacity, "delivery pipeline started");
        Ok(())
    }

    /// Offer a record for delivery.
    pub fn deliver(&self, record: LogRecord) {
        let counters = &self.shared.counters;
        let mut queue = self.shared.lock_queue();

        if self.shared.state() != PipelineState::Running {
            counters.rejected.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if queue.len() >= self.shared.capacity {
            match self.config.overflow {
                OverflowPolicy::DropNewest => {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                OverflowPolicy::DropOldest => {
                    queue.pop_front();
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                }
                OverflowPolicy::Block { timeout } => {
                    let deadline = Instant::now() + timeout;
                    while queue.len() >= self.shared.capacity {
                        if self.shared.state() != PipelineState::Running {
                            counters.rejected.fetch_add(1, Ordering::Relaxed);
                            return;
                        }
                        let now = Instant::now();
                        if now >= deadline {
                            counters.dropped.fetch_add(1, Ordering::Relaxed);
                            return;
                        }
                        let (guard, _) = self
                            .shared
                            .not_full
                            .wait_timeout(queue, deadline - now)
                            .unwrap_or_else(PoisonError::into_inner);
                        queue = guard;
                    }
                }
            }
        }

        queue.push_back(record);
        counters.enqueued.fetch_add(1, Ordering::Relaxed);
        drop(queue);
        self.shared.not_empty.notify_one();
    }

    /// Stop accepting records, deliver what is queued until the drain
    /// deadline, then close the sink handle.
    ///
    /// Calling it again, or concurrently, returns the current counters
    /// without doing anything.
    pub async fn shutdown(&self) -> PipelineStats {
        let previous = {
            let _queue = self.shared.lock_queue();
            let current = self.shared.state();
            match current {
                PipelineState::Created => self.shared.set_state(PipelineState::Stopped),
                PipelineState::Running => self.shared.set_state(PipelineState::Draining),
                PipelineState::Draining | PipelineState::Stopped => {}
            }
            current
        };

        match previous {
            PipelineState::Draining | PipelineState::Stopped => return self.stats(),
            PipelineState::Created => {
                self.close_handle().await;
                return self.stats();
            }
            PipelineState::Running => {}
        }

        self.shared.not_empty.notify_one();
        self.shared.not_full.notify_all();

        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(mut worker) = worker {
            if tokio::time::timeout(self.config.drain_timeout, &mut worker).await.is_err() {
                worker.abort();
                warn!(timeout = ?self.config.drain_timeout, "drain deadline passed, abandoning queued log records");
            }
        }

        let leftover = {
            let mut queue = self.shared.lock_queue();
            let n = queue.len();
            queue.clear();
            n
        };
        if leftover > 0 {
            self.shared.counters.dropped.fetch_add(leftover as u64, Ordering::Relaxed);
        }

        self.close_handle().await;
        self.shared.set_state(PipelineState::Stopped);

        let stats = self.stats();
        debug!(?stats, "delivery pipeline stopped");
        stats
    }

    async fn close_handle(&self) {
        if let Err(e) = self.handle.close().await {
            warn!(error = %e, "failed to close sink handle");
        }
    }

    pub fn state(&self) -> PipelineState {
        self.shared.state()
    }

    /// Number of records waiting in the queue.
    pub fn queued(&self) -> usize {
        self.shared.lock_queue().len()
    }

    pub fn handle(&self) -> &SinkHandle {
        &self.handle
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn stats(&self) -> PipelineStats {
        let c = &self.shared.counters;
        PipelineStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            delivered: c.delivered.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for AsyncDeliveryPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncDeliveryPipeline")
            .field("state", &self.state())
            .field("handle", &self.handle)
            .field("config", &self.config)
            .finish()
    }
}

impl Drop for AsyncDeliveryPipeline {
    fn drop(&mut self) {
        // let the worker drain what is left and exit
        {
            let _queue = self.shared.lock_queue();
            if self.shared.state() == PipelineState::Running {
                self.shared.set_state(PipelineState::Draining);
            }
        }
        self.shared.not_empty.notify_one();
        self.shared.not_full.notify_all();
    }
}

async fn run_worker(shared: Arc<Shared>, handle: Arc<SinkHandle>, delivery_timeout: Option<Duration>) {
    loop {
        let next = {
            let mut queue = shared.lock_queue();
            let next = queue.pop_front();
            if next.is_some() {
                shared.not_full.notify_one();
            }
            next
        };

        match next {
            Some(record) => deliver_one(&shared, &handle, &record, delivery_timeout).await,
            None => {
                if shared.state() != PipelineState::Running {
                    break;
                }
                shared.not_empty.notified().await;
            }
        }
    }

    // no-op when shutdown already closed it
    if let Err(e) = handle.close().await {
        warn!(error = %e, "failed to close sink handle");
    }
}

async fn deliver_one(shared: &Shared, handle: &SinkHandle, record: &LogRecord, delivery_timeout: Option<Duration>) {
    let result = match delivery_timeout {
        Some(limit) => match tokio::time::timeout(limit, handle.deliver(record)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(limit)),
        },
        None => handle.deliver(record).await,
    };

    match result {
        Ok(()) => {
            shared.counters.delivered.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            shared.counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, target_logger = %record.target, "failed to deliver log record");
        }
    }
}
