use std::io::{self, BufRead, BufReader, Write};
use std::mem;
use std::num::NonZero;
use std::panic;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;
use std::thread;

use tracing::{debug, trace, warn};

use crate::wire::{ReplyMessage, TaskMessage, encode_line};
use crate::{Error, Interval, Partition, Result, Strategy, StrategyKind};

/// Argument that switches the worker program into task-serving mode.
pub const WORKER_SUBCOMMAND: &str = "worker";

/// Counts primes in child processes that share no memory with the caller.
///
/// Every invocation partitions the range into one interval per worker, starts a fresh
/// [`ProcessPool`] of that size, maps the intervals over the pool and tears the pool down again.
/// Tasks and results cross the process boundary only as serialized messages.
///
/// The worker program must implement the worker side of the task protocol when started with
/// [`WORKER_SUBCOMMAND`] as its only argument. The `prime_race` binary does.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IsolatedMemory {
    workers: NonZero<usize>,
    program: PathBuf,
}

impl IsolatedMemory {
    /// Creates the strategy with the given number of worker processes, each running `program`.
    #[must_use]
    pub fn new(workers: NonZero<usize>, program: impl Into<PathBuf>) -> Self {
        Self {
            workers,
            program: program.into(),
        }
    }

    /// Number of worker processes started per invocation.
    #[must_use]
    pub fn workers(&self) -> NonZero<usize> {
        self.workers
    }

    /// The program started as each worker process.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Strategy for IsolatedMemory {
    fn kind(&self) -> StrategyKind {
        StrategyKind::IsolatedMemory
    }

    fn count_primes_below(&self, total: u64) -> Result<u64> {
        let partition = Partition::new(total, self.workers);

        debug!(total, workers = self.workers.get(), "counting primes in processes");

        let mut pool = ProcessPool::spawn(&self.program, self.workers)?;
        let counts = pool.map(partition.intervals())?;
        pool.shutdown()?;

        Ok(counts.iter().sum())
    }
}

/// A fixed-size pool of worker processes fed from a shared task queue.
///
/// Each worker is a child process speaking the line-based task protocol over its stdin and stdout.
/// The worker's stderr is inherited, so its log output reaches the same console as ours.
///
/// # Lifecycle
///
/// Call [`shutdown()`][Self::shutdown] to let the workers exit cleanly and to learn whether they
/// did. Dropping the pool without shutting it down kills the workers.
#[derive(Debug)]
pub struct ProcessPool {
    workers: Vec<WorkerProcess>,
}

impl ProcessPool {
    /// Starts `size` worker processes running `program`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SpawnProcess`] if any worker cannot be started. Workers that were
    /// already started are killed.
    pub fn spawn(program: &Path, size: NonZero<usize>) -> Result<Self> {
        let pool = Self::from_workers(
            (0..size.get()).map(|index| WorkerProcess::spawn(index, program)),
        )?;

        debug!(program = %program.display(), size = size.get(), "process pool started");

        Ok(pool)
    }

    /// Collects workers as they are started, stopping at the first failure.
    fn from_workers(workers: impl IntoIterator<Item = Result<WorkerProcess>>) -> Result<Self> {
        let workers = workers.into_iter();

        let mut pool = Self {
            workers: Vec::with_capacity(workers.size_hint().0),
        };

        for worker in workers {
            // If this fails, dropping `pool` kills the workers started so far.
            pool.workers.push(worker?);
        }

        Ok(pool)
    }

    /// Number of worker processes in the pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Counts the primes of every interval in `tasks` on the pool's workers.
    ///
    /// The returned counts are in the same order as `tasks`, whichever worker happened to
    /// process each one. Blocks until every task has been answered.
    ///
    /// # Errors
    ///
    /// Returns an error if communicating with any worker fails or a worker answers with
    /// something other than the reply to its outstanding task.
    pub fn map(&mut self, tasks: &[Interval]) -> Result<Box<[u64]>> {
        let queue = Mutex::new(tasks.iter().copied().enumerate());
        let queue = &queue;

        // One coordinator thread per worker process, each feeding its worker from the queue.
        let batches = thread::scope(|scope| {
            let handles = self
                .workers
                .iter_mut()
                .map(|worker| scope.spawn(move || worker.drain(queue)))
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
                .collect::<Vec<_>>()
        });

        let mut counts = vec![None; tasks.len()];

        for batch in batches {
            for (index, count) in batch? {
                let slot = counts
                    .get_mut(index)
                    .expect("task indexes come from enumerating the task list");
                *slot = Some(count);
            }
        }

        Ok(counts
            .into_iter()
            .map(|count| count.expect("every task is taken from the queue exactly once"))
            .collect())
    }

    /// Closes the workers' input and waits for all of them to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails or a worker exits unsuccessfully. All workers are
    /// waited for even if an earlier one failed; the first failure is returned.
    pub fn shutdown(mut self) -> Result<()> {
        let mut outcome = Ok(());

        for worker in mem::take(&mut self.workers) {
            let result = worker.finish();

            if outcome.is_ok() {
                outcome = result;
            }
        }

        debug!("process pool shut down");

        outcome
    }
}

impl Drop for ProcessPool {
    #[cfg_attr(test, mutants::skip)] // Impractical to test that stuff stops happening.
    fn drop(&mut self) {
        for mut worker in self.workers.drain(..) {
            worker.kill();
        }
    }
}

#[derive(Debug)]
struct WorkerProcess {
    index: usize,
    child: Child,
    input: ChildStdin,
    output: BufReader<ChildStdout>,
}

impl WorkerProcess {
    fn spawn(index: usize, program: &Path) -> Result<Self> {
        let mut child = Command::new(program)
            .arg(WORKER_SUBCOMMAND)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| Error::SpawnProcess {
                program: program.to_path_buf(),
                source,
            })?;

        let input = child.stdin.take().expect("stdin was configured as piped");
        let output = child.stdout.take().expect("stdout was configured as piped");

        trace!(index, pid = child.id(), "worker process started");

        Ok(Self {
            index,
            child,
            input,
            output: BufReader::new(output),
        })
    }

    /// Takes tasks from the queue and executes them until the queue is empty.
    fn drain<I>(&mut self, queue: &Mutex<I>) -> Result<Vec<(usize, u64)>>
    where
        I: Iterator<Item = (usize, Interval)>,
    {
        let mut completed = Vec::new();

        loop {
            let next = queue
                .lock()
                .expect("task queue lock is never held across a panic")
                .next();

            let Some((index, interval)) = next else {
                break;
            };

            completed.push((index, self.execute(index, interval)?));
        }

        Ok(completed)
    }

    fn execute(&mut self, index: usize, interval: Interval) -> Result<u64> {
        let task = encode_line(&TaskMessage::new(index, interval))?;

        self.input
            .write_all(task.as_bytes())
            .and_then(|()| self.input.flush())
            .map_err(|source| self.io_error(source))?;

        let mut line = String::new();

        let bytes_read = self
            .output
            .read_line(&mut line)
            .map_err(|source| self.io_error(source))?;

        if bytes_read == 0 {
            return Err(Error::WorkerHungUp { worker: self.index });
        }

        let reply: ReplyMessage = serde_json::from_str(&line)?;

        if reply.index != index {
            return Err(Error::MismatchedReply {
                expected: index,
                received: reply.index,
            });
        }

        trace!(worker = self.index, index, count = reply.count, "task completed");

        Ok(reply.count)
    }

    fn finish(self) -> Result<()> {
        let Self {
            index,
            mut child,
            input,
            output,
        } = self;

        // End of input tells the worker there is nothing more to do.
        drop(input);
        drop(output);

        let status = child.wait().map_err(|source| Error::WorkerIo {
            worker: index,
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::WorkerExited {
                worker: index,
                status,
            })
        }
    }

    fn kill(&mut self) {
        if let Err(error) = self.child.kill() {
            warn!(worker = self.index, %error, "failed to kill worker process");
        }

        if let Err(error) = self.child.wait() {
            warn!(worker = self.index, %error, "failed to reap worker process");
        }
    }

    fn io_error(&self, source: io::Error) -> Error {
        Error::WorkerIo {
            worker: self.index,
            source,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn describes_itself() {
        let strategy = IsolatedMemory::new(new_zealand::nz!(3), "some/worker");

        assert_eq!(strategy.kind(), StrategyKind::IsolatedMemory);
        assert_eq!(strategy.workers().get(), 3);
        assert_eq!(strategy.program(), Path::new("some/worker"));
    }

    #[cfg(all(target_os = "linux", not(miri)))] // Observes process liveness through procfs.
    #[test]
    fn failed_start_kills_workers_already_started() {
        // `yes` keeps running until it is killed, so only the pool can stop it.
        let started = WorkerProcess::spawn(0, Path::new("yes")).unwrap();
        let proc_entry = PathBuf::from(format!("/proc/{}", started.child.id()));
        assert!(proc_entry.exists());

        let result = ProcessPool::from_workers([
            Ok(started),
            Err(Error::WorkerHungUp { worker: 1 }),
        ]);

        assert!(matches!(result, Err(Error::WorkerHungUp { worker: 1 })));
        assert!(!proc_entry.exists());
    }
}
