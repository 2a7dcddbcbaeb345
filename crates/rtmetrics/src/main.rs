//! rtmetrics - realtime cluster metrics stream tool.
//!
//! Decodes recorded or piped metrics streams, merges several of them into a
//! cluster view, summarizes latency samples and builds request query strings.

mod report;
mod samples;
mod source;

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use rtmetrics_core::util::parse_duration;
use rtmetrics_core::{
    CancelToken, ClusterAggregator, METRICS_PATH, MetricType, MetricsOptions, RealtimeMetrics, StreamError,
    aggregate_streams, realtime_metrics,
};

use samples::{SampleError, Samples};
use source::{FileTransport, open_input, source_name};

// ============================================================
// CLI
// ============================================================

#[derive(Parser)]
#[command(name = "rtmetrics", about = "Realtime cluster metrics stream tool", version = rtmetrics_core::VERSION)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a metrics stream and print one line per frame.
    Watch {
        /// Recorded stream file, or "-" for stdin.
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Categories to show (names like "cpu,disk", "all", or a decimal mask).
        #[arg(long, default_value = "all", env = "RTMETRICS_TYPES")]
        types: MetricType,

        /// Merge every frame into a running view and print it at the end.
        #[arg(long)]
        merge: bool,

        /// Print frames as JSON instead of summary lines.
        #[arg(long)]
        json: bool,
    },

    /// Decode several streams concurrently and print the merged cluster view as JSON.
    Merge {
        /// Recorded stream files ("-" for stdin).
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Summarize latency samples, one per line, as JSON.
    Timings {
        /// Sample file, or "-" for stdin.
        #[arg(default_value = "-")]
        input: PathBuf,
    },

    /// Print the request path and query string for a metrics stream.
    Query(QueryArgs),
}

#[derive(ClapArgs)]
struct QueryArgs {
    /// Categories to collect.
    #[arg(long, default_value = "all", env = "RTMETRICS_TYPES")]
    types: MetricType,

    /// Number of samples; 0 streams until cancelled.
    #[arg(short = 'n', long = "samples", default_value = "0")]
    n: u32,

    /// Time between samples (e.g., "1s", "500ms", "1m").
    #[arg(long, default_value = "1s", env = "RTMETRICS_INTERVAL", value_parser = parse_duration)]
    interval: Duration,

    /// Only collect from these nodes.
    #[arg(long, value_delimiter = ',')]
    hosts: Vec<String>,

    /// Only collect from these drives.
    #[arg(long, value_delimiter = ',')]
    disks: Vec<String>,

    /// Include a per-node breakdown.
    #[arg(long)]
    by_host: bool,

    /// Include a per-drive breakdown.
    #[arg(long)]
    by_disk: bool,

    /// Restrict batch job metrics to one job.
    #[arg(long, default_value = "")]
    by_job_id: String,

    /// Restrict site resync metrics to one deployment.
    #[arg(long, default_value = "")]
    by_dep_id: String,
}

impl From<QueryArgs> for MetricsOptions {
    fn from(a: QueryArgs) -> Self {
        MetricsOptions {
            types: a.types,
            n: a.n,
            interval: a.interval,
            hosts: a.hosts,
            by_host: a.by_host,
            disks: a.disks,
            by_disk: a.by_disk,
            by_job_id: a.by_job_id,
            by_dep_id: a.by_dep_id,
        }
    }
}

// ============================================================
// Errors
// ============================================================

#[derive(Debug)]
enum CliError {
    Io(std::io::Error),
    Stream(StreamError),
    Samples(SampleError),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::Stream(e) => write!(f, "{}", e),
            CliError::Samples(e) => write!(f, "invalid sample at {}", e),
            CliError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<StreamError> for CliError {
    fn from(e: StreamError) -> Self {
        CliError::Stream(e)
    }
}

impl From<SampleError> for CliError {
    fn from(e: SampleError) -> Self {
        CliError::Samples(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

// ============================================================
// Main
// ============================================================

/// Initializes the tracing subscriber on stderr with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["rtmetrics", "rtmetrics_core"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("ignoring log directive for {}: {}", target, e),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(async_main(args.command)) {
        error!("{}", e);
        process::exit(1);
    }
}

async fn async_main(command: Command) -> Result<(), CliError> {
    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            on_interrupt.cancel();
        }
    });

    match command {
        Command::Watch {
            input,
            types,
            merge,
            json,
        } => watch(input, types, merge, json, &cancel).await,
        Command::Merge { inputs } => merge(inputs, &cancel).await,
        Command::Timings { input } => timings(input).await,
        Command::Query(args) => {
            query(args.into());
            Ok(())
        }
    }
}

// ============================================================
// Commands
// ============================================================

async fn watch(
    input: PathBuf,
    types: MetricType,
    merge: bool,
    json: bool,
    cancel: &CancelToken,
) -> Result<(), CliError> {
    let opts = MetricsOptions {
        types,
        ..Default::default()
    };
    let mut view = merge.then(ClusterAggregator::new);

    let sink = |mut frame: RealtimeMetrics| {
        // Recorded streams carry every category; narrow to what was asked for.
        frame.aggregated.filter(opts.types);
        for metrics in frame.by_host.values_mut() {
            metrics.filter(opts.types);
        }
        if let Some(view) = view.as_mut() {
            view.merge_envelope(&frame);
        }
        print_frame(&frame, json);
    };

    let summary = realtime_metrics(&FileTransport::new(input), &opts, cancel, sink).await?;
    info!(frames = summary.frames, "stream finished");

    if let Some(view) = view {
        let mut merged = view.into_inner();
        merged.is_final = true;
        if json {
            println!("{}", serde_json::to_string_pretty(&merged)?);
        } else {
            println!("merged: {}", report::frame_line(&merged));
        }
    }
    Ok(())
}

fn print_frame(frame: &RealtimeMetrics, json: bool) {
    if !json {
        println!("{}", report::frame_line(frame));
        return;
    }
    match serde_json::to_string(frame) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!(error = %e, "failed to encode frame"),
    }
}

async fn merge(inputs: Vec<PathBuf>, cancel: &CancelToken) -> Result<(), CliError> {
    let mut sources = Vec::with_capacity(inputs.len());
    for input in &inputs {
        sources.push((source_name(input), open_input(input).await?));
    }
    debug!(sources = sources.len(), "merging streams");

    let view = aggregate_streams(sources, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

async fn timings(input: PathBuf) -> Result<(), CliError> {
    let mut text = String::new();
    open_input(&input).await?.read_to_string(&mut text).await?;

    let mut samples = Samples::parse(&text)?;
    if samples.by_host.is_empty() {
        let count = samples.unlabelled.len();
        let summary = samples.unlabelled.measure();
        debug!(samples = count, "measured unlabelled samples");
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        if !samples.unlabelled.is_empty() {
            warn!(
                samples = samples.unlabelled.len(),
                "ignoring samples without a host"
            );
        }
        println!("{}", serde_json::to_string_pretty(&samples.per_host())?);
    }
    Ok(())
}

fn query(opts: MetricsOptions) {
    let effective = opts.effective_interval();
    if effective != opts.interval {
        warn!(
            requested = ?opts.interval,
            effective = ?effective,
            "server rounds the interval up to whole seconds"
        );
    }
    println!("{}?{}", METRICS_PATH, opts.query_string());
}
