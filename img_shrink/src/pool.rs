//! Worker pool lifecycle: spawn, stop, join.
//!
//! The pool owns the run's shared state (stop flag, progress counter, done
//! flag) and guarantees every spawned worker is awaited before it reports
//! finished. Cancellation is cooperative: the stop flag halts new dequeues
//! and the queue is force-drained; tasks already on a worker finish, so the
//! worst-case stop latency is one codec operation.

use crate::errors::WorkerError;
use crate::progress::ProgressCounter;
use crate::queue::{Task, TaskQueue, TaskReceiver};
use crate::worker::{TaskFailure, Worker, WorkerContext, WorkSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How the task set is handed to workers.
pub enum Distribution {
    /// One shared queue, drained dynamically.
    Queue(TaskQueue),
    /// Pre-partitioned shards, one per worker.
    Shards(Vec<Vec<Task>>),
}

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Aggregate result of a finished pool.
#[derive(Debug, Clone, Default)]
pub struct PoolSummary {
    pub completed: u64,
    pub resized: u64,
    pub copied: u64,
    pub failed: u64,
    /// Workers that terminated abnormally. Their undone tasks show up as
    /// the gap between `completed` and the run's total.
    pub workers_failed: u64,
    pub cancelled: bool,
    pub failures: Vec<TaskFailure>,
}

/// Owns N workers bound to one task source.
pub struct WorkerPool {
    workers: Vec<Worker>,
    stop: Arc<AtomicBool>,
    counter: Arc<ProgressCounter>,
    done: Arc<AtomicBool>,
    drain: Option<TaskReceiver>,
    state: RunState,
    summary: Option<PoolSummary>,
}

impl WorkerPool {
    /// Spawn the workers and start processing.
    ///
    /// In queue mode exactly `worker_count` workers share the queue; in
    /// shard mode one worker is spawned per shard. `stop` may be shared
    /// with a signal handler; setting it has the same effect as [`stop`].
    ///
    /// [`stop`]: WorkerPool::stop
    pub fn start(
        work: Distribution,
        worker_count: usize,
        max_width: u32,
        stop: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        let counter = Arc::new(ProgressCounter::new());
        let done = Arc::new(AtomicBool::new(false));
        let ctx = WorkerContext {
            counter: Arc::clone(&counter),
            stop: Arc::clone(&stop),
            max_width,
        };

        let mut workers = Vec::new();
        let mut drain = None;
        match work {
            Distribution::Queue(queue) => {
                drain = Some(queue.handle());
                for id in 0..worker_count.max(1) {
                    workers.push(Worker::spawn(
                        id,
                        WorkSource::Queue(queue.handle()),
                        ctx.clone(),
                    )?);
                }
            }
            Distribution::Shards(shards) => {
                for (id, shard) in shards.into_iter().enumerate() {
                    workers.push(Worker::spawn(id, WorkSource::Shard(shard), ctx.clone())?);
                }
            }
        }

        info!(count = workers.len(), "workers spawned");
        Ok(Self {
            workers,
            stop,
            counter,
            done,
            drain,
            state: RunState::Running,
            summary: None,
        })
    }

    /// Shared counter of completed tasks, for reporters and observers.
    pub fn counter(&self) -> Arc<ProgressCounter> {
        Arc::clone(&self.counter)
    }

    /// Flag flipped once every worker has been awaited.
    pub fn done_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.done)
    }

    /// Flag a signal handler can set to request a cooperative stop.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Request a stop and wait for the workers to wind down.
    ///
    /// Queued tasks are discarded so nothing new starts; in-flight tasks
    /// finish. Safe to call more than once; later calls return the summary
    /// already collected.
    pub fn stop(&mut self) -> PoolSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }
        info!("stop requested");
        self.stop.store(true, Ordering::SeqCst);
        self.finish()
    }

    /// Block until every worker has exited naturally (queue drained).
    ///
    /// If the stop flag was raised while waiting the run counts as
    /// cancelled. Safe to call after `stop`.
    pub fn join(&mut self) -> PoolSummary {
        if let Some(summary) = &self.summary {
            return summary.clone();
        }
        self.finish()
    }

    fn finish(&mut self) -> PoolSummary {
        let mut summary = PoolSummary::default();
        for worker in self.workers.drain(..) {
            let id = worker.id();
            match worker.join() {
                Ok(tally) => {
                    summary.completed += tally.completed;
                    summary.resized += tally.resized;
                    summary.copied += tally.copied;
                    summary.failed += tally.failed;
                    summary.failures.extend(tally.failures);
                }
                Err(e) => {
                    warn!(worker = id, error = %e, "worker terminated abnormally");
                    summary.workers_failed += 1;
                }
            }
        }

        let cancelled = self.stop.load(Ordering::SeqCst);
        if cancelled {
            if let Some(rx) = &self.drain {
                let discarded = rx.drain();
                if discarded > 0 {
                    debug!(discarded, "queue drained on stop");
                }
            }
        }

        self.state = if cancelled {
            RunState::Cancelled
        } else {
            RunState::Completed
        };
        summary.cancelled = cancelled;
        self.done.store(true, Ordering::SeqCst);

        info!(
            completed = summary.completed,
            failed = summary.failed,
            cancelled,
            "pool finished"
        );
        self.summary = Some(summary.clone());
        summary
    }
}
