//! Run summary: console output and optional JSON report.

use crate::config::RunConfig;
use crate::pool::PoolSummary;
use crate::worker::TaskFailure;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything a run produced, in one serializable record.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_width: u32,
    pub workers: usize,
    pub total: u64,
    pub completed: u64,
    pub resized: u64,
    pub copied: u64,
    pub failed: u64,
    pub workers_failed: u64,
    pub cancelled: bool,
    pub elapsed: Duration,
    pub failures: Vec<TaskFailure>,
}

impl RunReport {
    pub fn new(
        config: &RunConfig,
        started_at: DateTime<Utc>,
        elapsed: Duration,
        total: u64,
        summary: PoolSummary,
    ) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            input_dir: config.input_dir.clone(),
            output_dir: config.output_dir.clone(),
            max_width: config.max_width,
            workers: config.workers,
            total,
            completed: summary.completed,
            resized: summary.resized,
            copied: summary.copied,
            failed: summary.failed,
            workers_failed: summary.workers_failed,
            cancelled: summary.cancelled,
            elapsed,
            failures: summary.failures,
        }
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize run report")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Print the end-of-run summary to stdout.
pub fn print_summary(report: &RunReport) {
    let headline = if report.cancelled {
        style("Run Cancelled").yellow().bold()
    } else {
        style("Run Complete").green().bold()
    };
    let rate = if report.elapsed.as_secs_f64() > 0.0 {
        report.completed as f64 / report.elapsed.as_secs_f64()
    } else {
        0.0
    };

    println!();
    println!("{}", headline);
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Tasks:").bold(), report.total);
    println!("  {} {}", style("Processed:").bold(), report.completed);
    println!("  {} {}", style("Resized:").bold(), report.resized);
    println!("  {} {}", style("Copied:").bold(), report.copied);
    if report.failed > 0 {
        println!("  {} {}", style("Failed:").yellow().bold(), report.failed);
    }
    if report.workers_failed > 0 {
        println!(
            "  {} {}",
            style("Workers lost:").red().bold(),
            report.workers_failed
        );
    }
    println!(
        "  {} {} ({:.0} files/sec)",
        style("Duration:").bold(),
        format_duration(report.elapsed),
        rate
    );

    if !report.failures.is_empty() {
        println!();
        println!("{}", style("Failed files:").yellow().bold());
        for failure in &report.failures {
            println!("   {} → {}", failure.source.display(), failure.error);
        }
    }
    println!();
}
