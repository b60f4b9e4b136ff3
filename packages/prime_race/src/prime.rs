//! The CPU-bound workload: naive trial division.

use crate::Interval;

/// Checks whether `n` is prime by trial division.
///
/// Every integer from 2 up to the integer square root of `n` is tried as a divisor. There is no
/// shortcut for even numbers; the fixed per-candidate cost is what the strategies compete on.
///
/// # Examples
///
/// ```
/// use prime_race::is_prime;
///
/// assert!(is_prime(17));
/// assert!(!is_prime(1));
/// ```
#[must_use]
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }

    (2..=n.isqrt()).all(|divisor| n % divisor != 0)
}

/// Counts the primes in `interval`.
///
/// # Examples
///
/// ```
/// use prime_race::{Interval, count_primes};
///
/// assert_eq!(count_primes(Interval::new(0, 10)), 4);
/// ```
#[must_use]
pub fn count_primes(interval: Interval) -> u64 {
    let count = interval.range().filter(|&n| is_prime(n)).count();

    u64::try_from(count).expect("count cannot exceed the length of a u64 interval")
}
