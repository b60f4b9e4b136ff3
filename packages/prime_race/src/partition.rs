use std::num::NonZero;

use num_integer::Integer;
use tracing::trace;

use crate::Interval;

/// Splits `[0, total)` into one contiguous [`Interval`] per worker.
///
/// Every worker gets `total / workers` integers, except the last one, which also absorbs the
/// remainder of the division. When there are more workers than integers, all intervals except
/// the last are empty and the last one covers everything.
///
/// The intervals are ordered, do not overlap and leave no gaps.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use prime_race::{Interval, Partition};
///
/// let partition = Partition::new(10, nz!(3));
///
/// assert_eq!(
///     partition.intervals(),
///     &[Interval::new(0, 3), Interval::new(3, 6), Interval::new(6, 10)]
/// );
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Partition {
    total: u64,
    intervals: Box<[Interval]>,
}

impl Partition {
    /// Partitions `[0, total)` for `workers` workers.
    #[must_use]
    pub fn new(total: u64, workers: NonZero<usize>) -> Self {
        let worker_count =
            u64::try_from(workers.get()).expect("usize worker count always fits in u64");

        let (step, remainder) = total.div_rem(&worker_count);

        trace!(total, workers = workers.get(), step, remainder, "partitioning range");

        #[expect(
            clippy::arithmetic_side_effects,
            reason = "index < worker_count, so index * step and (index + 1) * step never exceed total"
        )]
        let intervals = (0..worker_count)
            .map(|index| {
                let start = index * step;
                let end = if index == worker_count - 1 {
                    total
                } else {
                    start + step
                };

                Interval::new(start, end)
            })
            .collect();

        Self { total, intervals }
    }

    /// The upper (exclusive) bound of the partitioned range.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// How many intervals the range was split into. Equal to the worker count.
    #[must_use]
    pub fn interval_count(&self) -> NonZero<usize> {
        NonZero::new(self.intervals.len())
            .expect("type invariant - there is one interval per worker and at least one worker")
    }

    /// The intervals, in order. Interval `i` belongs to worker slot `i`.
    #[must_use]
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Iterates over the intervals, in order.
    pub fn iter(&self) -> impl Iterator<Item = Interval> + '_ {
        self.intervals.iter().copied()
    }
}
