//! Batch image resizer.
//!
//! Mirrors a directory tree into an output tree, downscaling JPEGs wider
//! than a configured maximum and byte-copying everything else. The engine
//! enumerates tasks, fans them out across a pool of worker threads (a
//! shared queue by default, static shards optionally), tracks completion
//! through one atomic counter sampled by a polling reporter, and supports
//! cooperative cancellation. Existing output files are treated as already
//! done, so an interrupted run can simply be re-run.

pub mod codec;
pub mod config;
pub mod enumerate;
pub mod errors;
pub mod logging;
pub mod pool;
pub mod progress;
pub mod queue;
pub mod report;
pub mod worker;

pub use codec::{convert_or_copy, CodecOutcome, JPEG_QUALITY};
pub use config::{RunConfig, DEFAULT_MAX_WIDTH};
pub use enumerate::{enumerate_tasks, shuffle_tasks};
pub use errors::{EnumerateError, RunError, WorkerError};
pub use pool::{Distribution, PoolSummary, RunState, WorkerPool};
pub use progress::{
    CollectingSink, NullSink, ProgressBarSink, ProgressCounter, ProgressReporter, ProgressSink,
    REPORT_INTERVAL,
};
pub use queue::{make_shards, Task, TaskQueue};
pub use report::RunReport;
pub use worker::TaskFailure;

use chrono::Utc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Run the whole pipeline: enumerate, distribute, convert, report.
///
/// `stop` is the cooperative cancellation flag; share it with a signal
/// handler to let Ctrl-C wind the run down cleanly. Progress samples go to
/// `sink` until every worker has exited.
pub fn run(
    config: &RunConfig,
    sink: Arc<dyn ProgressSink>,
    stop: Arc<AtomicBool>,
) -> Result<RunReport, RunError> {
    let started_at = Utc::now();
    let start = Instant::now();

    let mut tasks = enumerate_tasks(&config.input_dir, &config.output_dir)?;
    shuffle_tasks(&mut tasks);
    let total = tasks.len() as u64;
    info!(
        total,
        workers = config.workers,
        max_width = config.max_width,
        static_shards = config.static_shards,
        "starting run"
    );

    let work = if config.static_shards {
        Distribution::Shards(make_shards(tasks, config.workers))
    } else {
        Distribution::Queue(TaskQueue::from_tasks(tasks))
    };

    let mut pool = WorkerPool::start(work, config.workers, config.max_width, stop)?;
    let reporter = ProgressReporter::spawn(pool.counter(), total, pool.done_flag(), sink);

    let summary = pool.join();
    reporter.join();

    Ok(RunReport::new(
        config,
        started_at,
        start.elapsed(),
        total,
        summary,
    ))
}
