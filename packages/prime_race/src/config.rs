use std::fs;
use std::num::NonZero;
use std::path::Path;

use new_zealand::nz;
use serde::Deserialize;

use crate::{Error, Result};

/// Default upper bound (exclusive) of the counted range.
pub const DEFAULT_TOTAL: u64 = 1_000_000;

/// Default number of worker threads for the shared-memory strategy.
pub const DEFAULT_THREADS: NonZero<usize> = nz!(4);

/// Default number of worker processes for the isolated-memory strategy.
pub const DEFAULT_PROCESSES: NonZero<usize> = nz!(4);

/// Default number of times each strategy is repeated.
pub const DEFAULT_REPETITIONS: NonZero<u32> = nz!(100);

/// Tunables of a benchmark run.
///
/// Can be loaded from a TOML document in which every key is optional:
///
/// ```toml
/// total = 1000000
/// threads = 4
/// processes = 4
/// repetitions = 100
/// ```
///
/// # Examples
///
/// ```
/// use prime_race::BenchmarkConfig;
///
/// let config = BenchmarkConfig::from_toml("total = 500\nrepetitions = 3").unwrap();
///
/// assert_eq!(config.total, 500);
/// assert_eq!(config.repetitions.get(), 3);
/// assert_eq!(config.threads.get(), 4);
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct BenchmarkConfig {
    /// Primes are counted in `[0, total)`.
    pub total: u64,

    /// Worker thread count of the shared-memory strategy.
    pub threads: NonZero<usize>,

    /// Worker process count of the isolated-memory strategy.
    pub processes: NonZero<usize>,

    /// How many times each strategy is executed. The reported time is the mean.
    pub repetitions: NonZero<u32>,
}

impl BenchmarkConfig {
    /// Parses a configuration from a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseConfig`] if the document is not valid TOML, contains unknown keys
    /// or sets a count to zero.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadConfig`] if the file cannot be read, otherwise the same errors
    /// as [`from_toml()`][Self::from_toml].
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&text)
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            total: DEFAULT_TOTAL,
            threads: DEFAULT_THREADS,
            processes: DEFAULT_PROCESSES,
            repetitions: DEFAULT_REPETITIONS,
        }
    }
}
