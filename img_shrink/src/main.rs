use anyhow::Context;
use clap::Parser;
use console::style;
use img_shrink::logging::{self, LogConfig};
use img_shrink::{config, report, NullSink, ProgressBarSink, ProgressSink, RunConfig};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "img-shrink")]
#[command(
    version,
    about = "Batch image resizer",
    long_about = "Resizes images in INPUT_DIR recursively and saves them to OUTPUT_DIR \
with the same directory structure.\n\n\
JPEGs wider than --max-width are downscaled without reducing quality; every \
other file is copied unchanged. Files already present in OUTPUT_DIR are \
skipped, so an interrupted run can simply be restarted."
)]
struct Cli {
    /// Directory holding the input images.
    input_dir: PathBuf,

    /// Directory the mirrored output tree is written to.
    output_dir: PathBuf,

    /// Max width of the output images. The default (4K) is enough for
    /// wallpapers.
    #[arg(short = 'w', long, default_value_t = config::DEFAULT_MAX_WIDTH)]
    max_width: u32,

    /// Number of workers. Defaults to the number of cpu cores.
    #[arg(short = 'n', long = "workers")]
    workers: Option<usize>,

    /// Pre-split the tasks into one fixed shard per worker instead of
    /// using a shared queue.
    #[arg(long)]
    static_shards: bool,

    /// Write a JSON run report to this path.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Directory for log files. Defaults to the system temp dir.
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Mirror log lines to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// No progress bar.
    #[arg(short, long)]
    quiet: bool,
}

fn print_header(config: &RunConfig) {
    println!();
    println!(
        "{} {}",
        style("img-shrink").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Input:").bold(), config.input_dir.display());
    println!(
        "  {} {}",
        style("Output:").bold(),
        config.output_dir.display()
    );
    println!("  {} {}px", style("Max width:").bold(), config.max_width);
    println!(
        "  {} {}{}",
        style("Workers:").bold(),
        config.workers,
        if config.static_shards {
            " (static shards)"
        } else {
            ""
        }
    );
    println!();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::default().with_stderr(cli.verbose);
    if let Some(dir) = &cli.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    logging::init_logging("img_shrink", log_config)?;

    let config = RunConfig::new(&cli.input_dir, &cli.output_dir)
        .with_max_width(cli.max_width)
        .with_workers(cli.workers.unwrap_or_else(RunConfig::default_workers))
        .with_static_shards(cli.static_shards);

    print_header(&config);

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        eprintln!("\nstop requested, letting in-flight files finish...");
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    let sink: Arc<dyn ProgressSink> = if cli.quiet {
        Arc::new(NullSink)
    } else {
        Arc::new(ProgressBarSink::new("Shrinking"))
    };

    let run_report = img_shrink::run(&config, sink, stop)?;
    report::print_summary(&run_report);

    if let Some(path) = &cli.report {
        run_report.write_json(path)?;
        println!("  {} {}", style("Report:").bold(), path.display());
    }

    Ok(())
}
