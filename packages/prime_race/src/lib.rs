#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Compares three ways of executing the same CPU-bound workload: counting the primes below some
//! bound by naive trial division.
//!
//! The strategies are:
//!
//! - [`Sequential`] - all work on the calling thread.
//! - [`SharedMemory`] - the range is partitioned across threads that share the caller's memory,
//!   each writing its partial count into its own slot of a shared results array.
//! - [`IsolatedMemory`] - the range is partitioned across child processes that share no memory
//!   with the caller, exchanging tasks and results as serialized messages.
//!
//! All strategies implement [`Strategy`] and return identical counts for identical input. The
//! [`Benchmark`] driver runs each one repeatedly and reports the mean wall-clock time.
//!
//! This package is a teaching aid for comparing concurrency strategies and is not meant as a
//! fast prime counter.
//!
//! # Operating principles
//!
//! ## Partitioning
//!
//! [`Partition`] splits `[0, N)` into `K` contiguous [`Interval`]s. Every worker gets `N / K`
//! integers and the last worker also gets the remainder, so the last worker may carry up to
//! `K - 1` extra candidates. With more workers than integers, all but the last interval are empty.
//!
//! ## Worker processes
//!
//! [`IsolatedMemory`] starts a program in worker mode, by passing [`WORKER_SUBCOMMAND`] as its
//! argument. The program must then answer tasks on stdin via [`serve_tasks()`]. The `prime_race`
//! binary does this, so the usual worker program is the binary itself.
//!
//! # Example
//!
//! ```
//! use new_zealand::nz;
//! use prime_race::{Sequential, SharedMemory, Strategy};
//!
//! let sequential = Sequential.count_primes_below(1000).unwrap();
//! let threaded = SharedMemory::new(nz!(4)).count_primes_below(1000).unwrap();
//!
//! assert_eq!(sequential, 168);
//! assert_eq!(sequential, threaded);
//! ```

mod config;
mod driver;
mod error;
mod interval;
mod isolated_memory;
mod partition;
mod prime;
mod shared_memory;
mod strategy;
mod wire;

pub use config::*;
pub use driver::*;
pub use error::*;
pub use interval::*;
pub use isolated_memory::*;
pub use partition::*;
pub use prime::*;
pub use shared_memory::*;
pub use strategy::*;
pub use wire::serve_tasks;
