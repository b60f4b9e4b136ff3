use std::ops::Range;

/// A half-open range of candidate integers, `[start, end)`.
///
/// The start is never greater than the end. An interval with `start == end` is empty.
///
/// # Examples
///
/// ```
/// use prime_race::Interval;
///
/// let interval = Interval::new(10, 20);
/// assert_eq!(interval.len(), 10);
/// assert!(interval.range().contains(&10));
/// assert!(!interval.range().contains(&20));
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Interval {
    start: u64,
    end: u64,
}

impl Interval {
    /// Creates the interval `[start, end)`.
    ///
    /// # Panics
    ///
    /// Panics if `start` is greater than `end`.
    #[must_use]
    pub fn new(start: u64, end: u64) -> Self {
        Self::checked_new(start, end).expect("interval start must not be greater than its end")
    }

    /// Creates the interval `[start, end)`, or returns `None` if `start` is greater than `end`.
    #[must_use]
    pub fn checked_new(start: u64, end: u64) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The first integer in the interval (inclusive).
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// The integer just past the interval (exclusive).
    #[must_use]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of integers covered by the interval.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end
            .checked_sub(self.start)
            .expect("type invariant - start is never greater than end")
    }

    /// Whether the interval covers no integers at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The covered integers as a standard range.
    #[must_use]
    pub fn range(&self) -> Range<u64> {
        self.start..self.end
    }
}
