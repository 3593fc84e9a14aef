//! Shared progress counting and polled reporting.
//!
//! Workers bump a single atomic counter; a reporter thread samples it on a
//! fixed cadence and forwards `(completed, total)` to a sink. Polling keeps
//! workers free of any per-task coordination with the reporter - the stream
//! is monotonically non-decreasing and lands on the exact final count.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Sampling cadence of the reporter. A policy constant, not a correctness
/// requirement.
pub const REPORT_INTERVAL: Duration = Duration::from_millis(100);

/// Count of tasks completed in the current run.
///
/// Created fresh (at zero) for every run. Incremented by exactly one worker
/// at a time; read concurrently by anyone.
#[derive(Debug, Default)]
pub struct ProgressCounter(AtomicU64);

impl ProgressCounter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn read(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Receives progress samples. Implementations must be cheap and must not
/// block; they are called on every reporter tick.
pub trait ProgressSink: Send + Sync {
    fn report(&self, completed: u64, total: u64);

    /// Called once after the final sample.
    fn finished(&self) {}
}

/// Console progress bar sink.
pub struct ProgressBarSink {
    bar: ProgressBar,
}

mod templates {
    pub const BATCH: &str =
        "{spinner:.green} {prefix:.cyan.bold} ▕{bar:35.green/black}▏ {percent:>3}% • {pos}/{len} • ⏱️ {elapsed_precise}";
    pub const PROGRESS_CHARS: &str = "█▓░";
    pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
}

impl ProgressBarSink {
    pub fn new(prefix: &str) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(templates::BATCH)
                .expect("Invalid template")
                .progress_chars(templates::PROGRESS_CHARS)
                .tick_chars(templates::SPINNER_CHARS),
        );
        bar.set_prefix(prefix.to_string());
        bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(20));
        Self { bar }
    }
}

impl ProgressSink for ProgressBarSink {
    fn report(&self, completed: u64, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(completed);
    }

    fn finished(&self) {
        self.bar.finish_and_clear();
    }
}

/// Sink that drops every sample. For quiet mode and tests.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _completed: u64, _total: u64) {}
}

/// Sink that records every sample it sees. Used by tests and embedders that
/// want the raw stream.
#[derive(Debug, Default)]
pub struct CollectingSink {
    samples: Mutex<Vec<(u64, u64)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<(u64, u64)> {
        self.samples.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ProgressSink for CollectingSink {
    fn report(&self, completed: u64, total: u64) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.push((completed, total));
        }
    }
}

/// Polls the counter until the pool reports done, then forwards one final
/// sample equal to the true count.
pub struct ProgressReporter {
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    pub fn spawn(
        counter: Arc<ProgressCounter>,
        total: u64,
        done: Arc<AtomicBool>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let handle = thread::spawn(move || {
            while !done.load(Ordering::Relaxed) {
                sink.report(counter.read(), total);
                thread::sleep(REPORT_INTERVAL);
            }
            // Workers have all exited; the counter is final.
            sink.report(counter.read(), total);
            sink.finished();
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Wait for the final sample to be delivered.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_starts_at_zero() {
        let counter = ProgressCounter::new();
        assert_eq!(counter.read(), 0);
    }

    #[test]
    fn test_concurrent_increments_all_land() {
        let counter = Arc::new(ProgressCounter::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    counter.increment();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.read(), 8000);
    }

    #[test]
    fn test_reporter_stream_is_monotonic_and_exact() {
        let counter = Arc::new(ProgressCounter::new());
        let done = Arc::new(AtomicBool::new(false));
        let sink = Arc::new(CollectingSink::new());
        let total = 50u64;

        let reporter = ProgressReporter::spawn(
            Arc::clone(&counter),
            total,
            Arc::clone(&done),
            Arc::clone(&sink) as Arc<dyn ProgressSink>,
        );

        for _ in 0..total {
            counter.increment();
        }
        done.store(true, Ordering::SeqCst);
        reporter.join();

        let samples = sink.samples();
        assert!(!samples.is_empty());
        assert_eq!(*samples.last().unwrap(), (total, total));
        let mut prev = 0;
        for (completed, t) in samples {
            assert_eq!(t, total);
            assert!(completed >= prev, "progress went backwards");
            assert!(completed <= total, "progress exceeded total");
            prev = completed;
        }
    }

    #[test]
    fn test_reporter_final_sample_without_any_work() {
        let counter = Arc::new(ProgressCounter::new());
        let done = Arc::new(AtomicBool::new(true));
        let sink = Arc::new(CollectingSink::new());

        let reporter = ProgressReporter::spawn(
            counter,
            0,
            done,
            Arc::clone(&sink) as Arc<dyn ProgressSink>,
        );
        reporter.join();

        assert_eq!(*sink.samples().last().unwrap(), (0, 0));
    }
}
