use std::fmt::Debug;

use tracing::debug;

use crate::{Interval, Result, count_primes};

/// Identifies one of the execution strategies being compared.
///
/// The `Display` form is the label used in the benchmark report.
#[derive(Clone, Copy, Debug, derive_more::Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum StrategyKind {
    /// Counts everything on the calling thread.
    #[display("Single-threaded")]
    Sequential,

    /// Splits the work across threads that share the caller's memory.
    #[display("Multi-threaded")]
    SharedMemory,

    /// Splits the work across child processes that share no memory with the caller.
    #[display("Multi-processing")]
    IsolatedMemory,
}

/// A way of counting the primes below some bound.
///
/// All implementations return the same count for the same bound. They differ only in how the
/// work is scheduled.
pub trait Strategy: Debug {
    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Counts the primes in `[0, total)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the workers needed by the strategy cannot be started or fail
    /// while working. Nothing is retried.
    fn count_primes_below(&self, total: u64) -> Result<u64>;
}

/// Counts all primes on the calling thread, without partitioning.
///
/// # Examples
///
/// ```
/// use prime_race::{Sequential, Strategy};
///
/// assert_eq!(Sequential.count_primes_below(100).unwrap(), 25);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[expect(clippy::exhaustive_structs, reason = "unit strategy has no state to ever add")]
pub struct Sequential;

impl Strategy for Sequential {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Sequential
    }

    fn count_primes_below(&self, total: u64) -> Result<u64> {
        debug!(total, "counting primes sequentially");

        Ok(count_primes(Interval::new(0, total)))
    }
}
