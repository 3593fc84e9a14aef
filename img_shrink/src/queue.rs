//! Task queue shared by the worker pool.
//!
//! Two distribution strategies are supported. The default is a
//! multi-producer/multi-consumer channel that workers drain with a bounded
//! wait, so a stopped pool never leaves a worker blocked. The alternative is
//! static sharding: the task list is split into one disjoint shard per
//! worker up front and no queue synchronization happens at all.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::path::PathBuf;
use std::time::Duration;

/// One unit of work: a source file and its mirrored destination path.
///
/// Created once during enumeration and consumed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl Task {
    pub fn new(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// Result of a bounded-wait dequeue.
#[derive(Debug)]
pub enum Dequeue {
    /// A task was handed out.
    Task(Task),
    /// Nothing available within the wait; the queue may still refill.
    Empty,
    /// The queue is closed and fully drained; no task will ever arrive.
    Closed,
}

/// Concurrency-safe queue of tasks.
///
/// `close()` marks the producing side done; consumers observe `Closed` once
/// the remaining tasks are drained and terminate cleanly.
pub struct TaskQueue {
    sender: Option<Sender<Task>>,
    receiver: Receiver<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender: Some(sender),
            receiver,
        }
    }

    /// Build a queue pre-filled with `tasks` and already closed.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut queue = Self::new();
        for task in tasks {
            queue.push(task);
        }
        queue.close();
        queue
    }

    pub fn push(&self, task: Task) {
        if let Some(sender) = &self.sender {
            // Unbounded channel: send only fails when all receivers are gone.
            let _ = sender.send(task);
        }
    }

    /// Mark the queue as fully populated. Idempotent.
    pub fn close(&mut self) {
        self.sender.take();
    }

    /// Hand out a consumer handle; clone one per worker.
    pub fn handle(&self) -> TaskReceiver {
        TaskReceiver {
            receiver: self.receiver.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer handle for a [`TaskQueue`].
#[derive(Clone)]
pub struct TaskReceiver {
    receiver: Receiver<Task>,
}

impl TaskReceiver {
    /// Wait up to `timeout` for a task.
    pub fn recv_timeout(&self, timeout: Duration) -> Dequeue {
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => Dequeue::Task(task),
            Err(RecvTimeoutError::Timeout) => Dequeue::Empty,
            Err(RecvTimeoutError::Disconnected) => Dequeue::Closed,
        }
    }

    /// Discard every queued task, returning how many were thrown away.
    /// Used on cancellation so no new work is picked up.
    pub fn drain(&self) -> usize {
        let mut discarded = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(_) => discarded += 1,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        discarded
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Split `tasks` into exactly `worker_count` disjoint shards.
///
/// Short shards are padded with empty ones so every worker gets a shard.
/// Callers shuffle the task list first; sizes are then roughly balanced
/// even when large files cluster in one directory.
pub fn make_shards(tasks: Vec<Task>, worker_count: usize) -> Vec<Vec<Task>> {
    let worker_count = worker_count.max(1);
    let per_worker = tasks.len() / worker_count + 1;

    let mut shards: Vec<Vec<Task>> = Vec::with_capacity(worker_count);
    let mut remaining = tasks.into_iter().peekable();
    while remaining.peek().is_some() {
        shards.push(remaining.by_ref().take(per_worker).collect());
    }
    while shards.len() < worker_count {
        shards.push(Vec::new());
    }
    shards
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn task(n: usize) -> Task {
        Task::new(
            Path::new(&format!("/in/{}.jpg", n)).to_path_buf(),
            Path::new(&format!("/out/{}.jpg", n)).to_path_buf(),
        )
    }

    #[test]
    fn test_queue_hands_out_each_task_once() {
        let queue = TaskQueue::from_tasks((0..5).map(task).collect());
        let rx = queue.handle();

        let mut seen = Vec::new();
        loop {
            match rx.recv_timeout(Duration::from_millis(10)) {
                Dequeue::Task(t) => seen.push(t),
                Dequeue::Closed => break,
                Dequeue::Empty => panic!("closed queue should never report Empty"),
            }
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_open_queue_reports_empty_on_timeout() {
        let queue = TaskQueue::new();
        let rx = queue.handle();
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(10)),
            Dequeue::Empty
        ));
    }

    #[test]
    fn test_drain_discards_everything() {
        let queue = TaskQueue::from_tasks((0..8).map(task).collect());
        let rx = queue.handle();

        assert_eq!(rx.drain(), 8);
        assert!(rx.is_empty());
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(10)),
            Dequeue::Closed
        ));
    }

    #[test]
    fn test_make_shards_covers_all_tasks() {
        let tasks: Vec<Task> = (0..10).map(task).collect();
        let shards = make_shards(tasks.clone(), 4);

        assert_eq!(shards.len(), 4);
        let mut flattened: Vec<Task> = shards.into_iter().flatten().collect();
        flattened.sort_by(|a, b| a.source.cmp(&b.source));
        let mut expected = tasks;
        expected.sort_by(|a, b| a.source.cmp(&b.source));
        assert_eq!(flattened, expected);
    }

    #[test]
    fn test_make_shards_pads_with_empty() {
        let shards = make_shards(vec![task(0)], 4);
        assert_eq!(shards.len(), 4);
        assert_eq!(shards.iter().map(Vec::len).sum::<usize>(), 1);
    }

    #[test]
    fn test_make_shards_no_tasks() {
        let shards = make_shards(Vec::new(), 3);
        assert_eq!(shards.len(), 3);
        assert!(shards.iter().all(Vec::is_empty));
    }
}
