use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::StrategyKind;

/// Errors that can abort a benchmark run.
///
/// None of these are recoverable. The benchmark either completes all of its work or fails.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker thread {index}")]
    SpawnThread {
        /// Worker slot of the thread that could not be started.
        index: usize,

        /// The underlying operating system error.
        source: io::Error,
    },

    /// A worker process could not be started.
    #[error("failed to spawn worker process '{}'", program.display())]
    SpawnProcess {
        /// The program that was supposed to run as the worker.
        program: PathBuf,

        /// The underlying operating system error.
        source: io::Error,
    },

    /// The program to run as the worker process could not be determined.
    #[error("failed to locate the worker program")]
    LocateWorker(#[source] io::Error),

    /// Writing a task to or reading a reply from a worker process failed.
    #[error("I/O failure while talking to worker process {worker}")]
    WorkerIo {
        /// Index of the worker process in its pool.
        worker: usize,

        /// The underlying I/O error.
        source: io::Error,
    },

    /// A worker process closed its output while a task was still outstanding.
    #[error("worker process {worker} stopped responding before replying to its task")]
    WorkerHungUp {
        /// Index of the worker process in its pool.
        worker: usize,
    },

    /// A worker process terminated unsuccessfully.
    #[error("worker process {worker} exited with {status}")]
    WorkerExited {
        /// Index of the worker process in its pool.
        worker: usize,

        /// How the process terminated.
        status: ExitStatus,
    },

    /// A worker process replied to a different task than the one it was given.
    #[error("worker replied to task {received} while task {expected} was outstanding")]
    MismatchedReply {
        /// The task index that was sent.
        expected: usize,

        /// The task index that came back.
        received: usize,
    },

    /// A message exchanged with a worker process could not be encoded or decoded.
    #[error("malformed worker message: {0}")]
    Wire(#[from] serde_json::Error),

    /// A task described an interval whose start is after its end.
    #[error("invalid interval [{start}, {end})")]
    InvalidInterval {
        /// The requested start.
        start: u64,

        /// The requested end.
        end: u64,
    },

    /// The worker side of the task protocol failed to read or write its streams.
    #[error("I/O failure while serving tasks")]
    ServeIo(#[source] io::Error),

    /// A configuration file could not be read.
    #[error("failed to read configuration file '{}'", path.display())]
    ReadConfig {
        /// The configuration file path.
        path: PathBuf,

        /// The underlying I/O error.
        source: io::Error,
    },

    /// A configuration file was not valid.
    #[error("invalid configuration: {0}")]
    ParseConfig(#[from] toml::de::Error),

    /// A strategy produced different answers for the same input.
    #[error("{strategy} found {first} primes in its first repetition but {other} in a later one")]
    Nondeterministic {
        /// The strategy that misbehaved.
        strategy: StrategyKind,

        /// Result of the first repetition.
        first: u64,

        /// The differing result of a later repetition.
        other: u64,
    },
}

/// A specialized `Result` type for benchmark operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
