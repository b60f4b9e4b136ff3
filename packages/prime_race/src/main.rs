#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the prime counting strategy comparison.
//!
//! Without arguments, runs the benchmark with the default configuration and prints one line per
//! strategy. The same binary doubles as the worker program of the multi-processing strategy.

use std::env;
use std::io;
use std::num::NonZero;
use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use prime_race::{Benchmark, BenchmarkConfig, Error, Result, serve_tasks, strategies_agree};
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

/// Compares single-threaded, multi-threaded and multi-process prime counting.
#[derive(FromArgs)]
struct Args {
    /// path to a TOML file with benchmark settings (total, threads, processes, repetitions)
    #[argh(option)]
    config: Option<PathBuf>,

    /// count the primes below this number
    #[argh(option)]
    total: Option<u64>,

    /// number of worker threads in the multi-threaded run
    #[argh(option)]
    threads: Option<NonZero<usize>>,

    /// number of worker processes in the multi-processing run
    #[argh(option)]
    processes: Option<NonZero<usize>>,

    /// how many times to execute each strategy
    #[argh(option)]
    repetitions: Option<NonZero<u32>>,

    #[argh(subcommand)]
    mode: Option<Mode>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Mode {
    Worker(WorkerArgs),
}

/// serve prime counting tasks on stdin/stdout (used internally by the multi-processing run)
#[derive(FromArgs)]
#[argh(subcommand, name = "worker")]
struct WorkerArgs {}

// Binary entry point - mutations would require subprocess testing which is impractical.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();

    let outcome = match &args.mode {
        Some(Mode::Worker(_)) => run_worker(),
        None => run_benchmark(&args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "benchmark failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    // stdout carries the report, and in worker mode the task protocol, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_worker() -> Result<()> {
    let served = serve_tasks(io::stdin().lock(), io::stdout().lock())?;

    debug!(served, "worker input closed");

    Ok(())
}

fn run_benchmark(args: &Args) -> Result<()> {
    let benchmark = Benchmark::new(resolve_config(args)?);

    debug!(config = ?benchmark.config(), "starting benchmark");

    // The worker processes are further instances of this very binary.
    let worker_program = env::current_exe().map_err(Error::LocateWorker)?;

    let measurements = benchmark.run(&benchmark.strategies(&worker_program), |measurement| {
        println!("{measurement}");
    })?;

    if !strategies_agree(&measurements) {
        warn!(?measurements, "strategies disagree about the number of primes");
    }

    Ok(())
}

/// Defaults, then the configuration file, then individual flags.
fn resolve_config(args: &Args) -> Result<BenchmarkConfig> {
    let mut config = match &args.config {
        Some(path) => BenchmarkConfig::load(path)?,
        None => BenchmarkConfig::default(),
    };

    if let Some(total) = args.total {
        config.total = total;
    }

    if let Some(threads) = args.threads {
        config.threads = threads;
    }

    if let Some(processes) = args.processes {
        config.processes = processes;
    }

    if let Some(repetitions) = args.repetitions {
        config.repetitions = repetitions;
    }

    Ok(config)
}
