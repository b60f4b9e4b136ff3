use std::fmt;
use std::num::NonZero;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::{
    BenchmarkConfig, Error, IsolatedMemory, Result, Sequential, SharedMemory, Strategy,
    StrategyKind,
};

/// Runs each strategy repeatedly and measures the mean wall-clock time per run.
///
/// Repetitions are executed back to back and strategies one after another; nothing overlaps.
///
/// # Examples
///
/// ```
/// use prime_race::{Benchmark, BenchmarkConfig, Sequential};
///
/// let config = BenchmarkConfig::from_toml("total = 1000\nrepetitions = 2").unwrap();
/// let measurement = Benchmark::new(config).measure(&Sequential).unwrap();
///
/// assert_eq!(measurement.primes(), 168);
/// println!("{measurement}");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Benchmark {
    config: BenchmarkConfig,
}

impl Benchmark {
    /// Creates a benchmark with the given configuration.
    #[must_use]
    pub fn new(config: BenchmarkConfig) -> Self {
        Self { config }
    }

    /// The configuration the benchmark runs with.
    #[must_use]
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// The strategies being compared, in reporting order.
    ///
    /// `worker_program` is the program started for each worker process of the
    /// isolated-memory strategy.
    #[must_use]
    pub fn strategies(&self, worker_program: &Path) -> Vec<Box<dyn Strategy>> {
        vec![
            Box::new(Sequential),
            Box::new(SharedMemory::new(self.config.threads)),
            Box::new(IsolatedMemory::new(self.config.processes, worker_program)),
        ]
    }

    /// Measures each of `strategies` in order, handing every measurement to `report` as soon as
    /// it is available.
    ///
    /// # Errors
    ///
    /// Fails on the first strategy that fails; see [`measure()`][Self::measure]. Strategies after
    /// the failing one are not executed.
    pub fn run(
        &self,
        strategies: &[Box<dyn Strategy>],
        mut report: impl FnMut(&Measurement),
    ) -> Result<Vec<Measurement>> {
        let mut measurements = Vec::with_capacity(strategies.len());

        for strategy in strategies {
            let measurement = self.measure(strategy.as_ref())?;
            report(&measurement);
            measurements.push(measurement);
        }

        Ok(measurements)
    }

    /// Executes `strategy` for the configured number of repetitions and measures the mean
    /// duration of one execution.
    ///
    /// # Errors
    ///
    /// Returns the strategy's own error if any repetition fails, or
    /// [`Error::Nondeterministic`] if repetitions disagree about the prime count.
    pub fn measure(&self, strategy: &dyn Strategy) -> Result<Measurement> {
        let kind = strategy.kind();
        let total = self.config.total;
        let repetitions = self.config.repetitions;

        debug!(strategy = %kind, total, repetitions = repetitions.get(), "measuring strategy");

        let mut first = None;

        let started = Instant::now();

        for repetition in 0..repetitions.get() {
            let primes = strategy.count_primes_below(total)?;

            trace!(strategy = %kind, repetition, primes, "repetition completed");

            match first {
                None => first = Some(primes),
                Some(expected) if expected != primes => {
                    return Err(Error::Nondeterministic {
                        strategy: kind,
                        first: expected,
                        other: primes,
                    });
                }
                Some(_) => {}
            }
        }

        let elapsed = started.elapsed();

        let measurement = Measurement {
            strategy: kind,
            primes: first.expect("repetition count is NonZero, so at least one repetition ran"),
            mean_duration: calculate_mean_duration(elapsed, repetitions),
            repetitions,
        };

        debug!(strategy = %kind, mean_duration = ?measurement.mean_duration, "strategy measured");

        Ok(measurement)
    }
}

#[cfg_attr(test, mutants::skip)] // Difficult to simulate time and therefore set expectations.
fn calculate_mean_duration(elapsed: Duration, repetitions: NonZero<u32>) -> Duration {
    elapsed
        .checked_div(repetitions.get())
        .expect("repetition count is NonZero, so division by zero is impossible")
}

/// The outcome of measuring one strategy.
///
/// The `Display` form is one human-readable report line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Measurement {
    strategy: StrategyKind,
    primes: u64,
    mean_duration: Duration,
    repetitions: NonZero<u32>,
}

impl Measurement {
    /// The strategy that was measured.
    #[must_use]
    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// The number of primes the strategy found.
    #[must_use]
    pub fn primes(&self) -> u64 {
        self.primes
    }

    /// Mean wall-clock duration of one execution of the strategy.
    #[must_use]
    pub fn mean_duration(&self) -> Duration {
        self.mean_duration
    }

    /// How many executions the mean was taken over.
    #[must_use]
    pub fn repetitions(&self) -> NonZero<u32> {
        self.repetitions
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} primes found in {:.4} seconds",
            self.strategy,
            self.primes,
            self.mean_duration.as_secs_f64()
        )
    }
}

/// Whether all measurements report the same prime count.
///
/// Every strategy counts the same range, so a disagreement means one of them is broken.
#[must_use]
pub fn strategies_agree(measurements: &[Measurement]) -> bool {
    measurements
        .windows(2)
        .all(|pair| matches!(pair, [a, b] if a.primes == b.primes))
}
