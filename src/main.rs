use clap::{Parser, ValueEnum};
use log::{error, info};
use page_stats::config::{DEFAULT_START_YEAR, DEFAULT_TOP_K, MAX_THREADS};
use page_stats::pipeline::{DEFAULT_QUEUE_CAPACITY, MAX_PRODUCERS};
use page_stats::report::write_report_file;
use page_stats::{CountingStrategy, PipelineBuilder, Result, StatsConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    /// Count every token exactly
    Exact,
    /// Cap memory by evicting rare body tokens; counts become lower bounds
    Bounded,
}

impl From<Strategy> for CountingStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Exact => CountingStrategy::Exact,
            Strategy::Bounded => CountingStrategy::Bounded,
        }
    }
}

/// Word, size and year statistics over MediaWiki dumps.
#[derive(Parser, Debug)]
#[command(name = "page-stats")]
#[command(version)]
struct Opts {
    /// Bzip2-compressed (or plain) XML dump file(s), comma separated
    #[arg(long, required = true, value_delimiter = ',')]
    inputs: Vec<PathBuf>,

    /// Report output file
    #[arg(long, default_value = "statistics.txt")]
    output: PathBuf,

    /// Number of aggregator threads
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..=MAX_THREADS as i64))]
    threads: u16,

    /// Number of decoding threads [default: min(threads, 8)]
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=MAX_THREADS as i64))]
    producers: Option<u16>,

    /// Word counting strategy for page bodies
    #[arg(long, value_enum, default_value_t = Strategy::Exact)]
    strategy: Strategy,

    /// Entries per word section of the report
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top: usize,

    /// Seed for selection pivots and bounded-mode evictions
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Pages buffered between decoders and aggregators
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// First year of the year histogram
    #[arg(long, default_value_t = DEFAULT_START_YEAR)]
    start_year: i32,
}

fn run(opts: Opts) -> Result<()> {
    let threads = usize::from(opts.threads);
    let producers = opts
        .producers
        .map_or(threads.min(MAX_PRODUCERS), usize::from);

    let mut stats = StatsConfig::default()
        .with_strategy(opts.strategy.into())
        .with_seed(opts.seed);
    stats.start_year = opts.start_year;

    let pipeline = PipelineBuilder::new()
        .aggregators(threads)
        .producers(producers)
        .queue_capacity(opts.queue_capacity)
        .stats(stats)
        .build()?;

    let started = Instant::now();
    let result = pipeline.run(opts.inputs)?;
    write_report_file(&result, opts.top, &opts.output)?;

    info!("report written to {}", opts.output.display());
    println!("Time: {} ms", started.elapsed().as_millis());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();
    match run(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
