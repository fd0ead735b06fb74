use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::Parser;
use configuration::{
    DEFAULT_GRACE_MS, DEFAULT_INSTANCES, DEFAULT_TOLERANCE, DEFAULT_WARMUP_MS, DEFAULT_WINDOW_MS,
};
use harness::{TrialConfig, run_trial};
use tracing::Level;

/// harness: CPU fairness trial for busy-loop workloads
///
/// Starts N instances of the workload, measures the CPU time each receives
/// over a fixed wall-clock window and kills them all at the end.
#[derive(Debug, Parser)]
#[command(verbatim_doc_comment)]
struct Opts {
    /// Workload binary. Defaults to `cpu_bound` next to this executable.
    #[clap(short = 'p', long)]
    program: Option<PathBuf>,

    /// Number of concurrent instances.
    #[clap(short = 'n', long, default_value_t = DEFAULT_INSTANCES)]
    instances: usize,

    /// Settling time before the first sample, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_WARMUP_MS)]
    warmup_ms: u64,

    /// Measurement window, in milliseconds.
    #[clap(short = 'w', long, default_value_t = DEFAULT_WINDOW_MS)]
    window_ms: u64,

    /// How long a killed instance may take to exit, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_GRACE_MS)]
    grace_ms: u64,

    /// Largest accepted relative deviation from the mean CPU share.
    #[clap(short = 't', long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Enable verbose output. Specify multiple times to increase verbosity.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Opts {
    fn trial_config(&self) -> std::io::Result<TrialConfig> {
        let program = match &self.program {
            Some(program) => program.clone(),
            None => std::env::current_exe()?.with_file_name("cpu_bound"),
        };

        Ok(TrialConfig {
            program,
            instances: self.instances,
            warmup: Duration::from_millis(self.warmup_ms),
            window: Duration::from_millis(self.window_ms),
            grace: Duration::from_millis(self.grace_ms),
            tolerance: self.tolerance,
        })
    }
}

fn main() -> ExitCode {
    let opts = Opts::parse();

    let level = match opts.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = match opts.trial_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("failed to locate the workload binary: {}", e);
            return ExitCode::from(2);
        }
    };

    let report = match run_trial(&config) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("trial failed: {}", e);
            return ExitCode::from(2);
        }
    };

    println!("{report}");
    if report.is_fair(config.tolerance) {
        ExitCode::SUCCESS
    } else {
        tracing::warn!(
            "CPU shares deviate more than {:.1}% from the mean",
            config.tolerance * 100.0
        );
        ExitCode::from(1)
    }
}
