use std::num::NonZero;
use std::panic;
use std::thread;

use tracing::{debug, trace};

use crate::{Error, Partition, Result, Strategy, StrategyKind, count_primes};

/// Counts primes on a set of threads that share the caller's address space.
///
/// The range is partitioned into one interval per worker. Each worker thread owns exactly one slot
/// of a pre-sized results array and writes its partial count there; slots never alias, so no
/// locking is needed. All workers are joined before the slots are summed.
///
/// A panic in any worker is re-raised on the calling thread.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use prime_race::{SharedMemory, Strategy};
///
/// let strategy = SharedMemory::new(nz!(4));
/// assert_eq!(strategy.count_primes_below(100).unwrap(), 25);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SharedMemory {
    workers: NonZero<usize>,
}

impl SharedMemory {
    /// Creates the strategy with the given number of worker threads.
    #[must_use]
    pub fn new(workers: NonZero<usize>) -> Self {
        Self { workers }
    }

    /// Number of worker threads spawned per invocation.
    #[must_use]
    pub fn workers(&self) -> NonZero<usize> {
        self.workers
    }
}

impl Strategy for SharedMemory {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SharedMemory
    }

    fn count_primes_below(&self, total: u64) -> Result<u64> {
        let partition = Partition::new(total, self.workers);

        debug!(total, workers = self.workers.get(), "counting primes on threads");

        let mut slots = vec![0_u64; self.workers.get()].into_boxed_slice();

        thread::scope(|scope| -> Result<()> {
            let mut handles = Vec::with_capacity(self.workers.get());

            for (index, (slot, interval)) in slots.iter_mut().zip(partition.iter()).enumerate() {
                let handle = thread::Builder::new()
                    .name(format!("prime-worker-{index}"))
                    .spawn_scoped(scope, move || {
                        *slot = count_primes(interval);

                        trace!(
                            index,
                            start = interval.start(),
                            end = interval.end(),
                            count = *slot,
                            "worker finished"
                        );
                    })
                    .map_err(|source| Error::SpawnThread { index, source })?;

                handles.push(handle);
            }

            // Join barrier: nothing is summed until every worker has finished.
            for handle in handles {
                if let Err(payload) = handle.join() {
                    panic::resume_unwind(payload);
                }
            }

            Ok(())
        })?;

        Ok(slots.iter().sum())
    }
}
