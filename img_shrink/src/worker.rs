//! Worker threads.
//!
//! Each worker pulls one task at a time from its work source, runs the
//! codec, bumps the shared counter, and keeps going. A task that fails is
//! recorded and skipped; it never takes the pool down. Parallelism comes
//! from running several workers, never from concurrency inside one.

use crate::codec::{self, CodecOutcome};
use crate::errors::WorkerError;
use crate::progress::ProgressCounter;
use crate::queue::{Dequeue, Task, TaskReceiver};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded wait per dequeue, so a stop request is noticed promptly.
const DEQUEUE_WAIT: Duration = Duration::from_millis(100);

/// Where a worker gets its tasks.
pub enum WorkSource {
    /// Shared dynamic queue, drained cooperatively by all workers.
    Queue(TaskReceiver),
    /// Disjoint shard assigned once at start; no arbitration needed.
    Shard(Vec<Task>),
}

/// A task whose conversion and fallback copy both failed.
#[derive(Debug, Clone, Serialize)]
pub struct TaskFailure {
    pub source: PathBuf,
    pub error: String,
}

/// What one worker did over its lifetime.
#[derive(Debug, Default)]
pub struct WorkerTally {
    pub completed: u64,
    pub resized: u64,
    pub copied: u64,
    pub failed: u64,
    pub failures: Vec<TaskFailure>,
}

/// Shared state handed to every worker.
#[derive(Clone)]
pub struct WorkerContext {
    pub counter: Arc<ProgressCounter>,
    pub stop: Arc<AtomicBool>,
    pub max_width: u32,
}

/// Handle to a spawned worker thread.
pub struct Worker {
    id: usize,
    handle: Option<JoinHandle<WorkerTally>>,
}

impl Worker {
    pub fn spawn(id: usize, source: WorkSource, ctx: WorkerContext) -> Result<Self, WorkerError> {
        let handle = thread::Builder::new()
            .name(format!("shrink-{}", id))
            .spawn(move || worker_loop(id, source, ctx))
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;
        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Wait for the worker to exit and collect its tally.
    pub fn join(mut self) -> Result<WorkerTally, WorkerError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| WorkerError::Panicked { id: self.id }),
            None => Ok(WorkerTally::default()),
        }
    }
}

fn worker_loop(id: usize, source: WorkSource, ctx: WorkerContext) -> WorkerTally {
    debug!(worker = id, "worker starting");
    let mut tally = WorkerTally::default();

    match source {
        WorkSource::Queue(rx) => loop {
            if ctx.stop.load(Ordering::Relaxed) {
                debug!(worker = id, "stop requested, abandoning dequeues");
                break;
            }
            match rx.recv_timeout(DEQUEUE_WAIT) {
                Dequeue::Task(task) => process_task(id, &task, &ctx, &mut tally),
                Dequeue::Empty => continue,
                Dequeue::Closed => break,
            }
        },
        WorkSource::Shard(tasks) => {
            for task in &tasks {
                if ctx.stop.load(Ordering::Relaxed) {
                    debug!(worker = id, "stop requested, abandoning shard");
                    break;
                }
                process_task(id, task, &ctx, &mut tally);
            }
        }
    }

    debug!(
        worker = id,
        completed = tally.completed,
        resized = tally.resized,
        copied = tally.copied,
        failed = tally.failed,
        "worker exiting"
    );
    tally
}

fn process_task(id: usize, task: &Task, ctx: &WorkerContext, tally: &mut WorkerTally) {
    match codec::convert_or_copy(&task.source, &task.destination, ctx.max_width) {
        Ok(CodecOutcome::Resized {
            from_width,
            to_width,
        }) => {
            debug!(
                worker = id,
                source = %task.source.display(),
                from_width,
                to_width,
                "resized"
            );
            tally.resized += 1;
        }
        Ok(CodecOutcome::Copied) => {
            tally.copied += 1;
        }
        Err(e) => {
            warn!(
                worker = id,
                source = %task.source.display(),
                error = %e,
                "task failed"
            );
            tally.failed += 1;
            tally.failures.push(TaskFailure {
                source: task.source.clone(),
                error: e.to_string(),
            });
        }
    }
    tally.completed += 1;
    ctx.counter.increment();
}
