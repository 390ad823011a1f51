//! Half-open time intervals.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A half-open interval `[start, end)` of UTC instants.
///
/// Construction does not enforce `end > start`; callers validate with
/// [`TimeRange::is_valid`] where an empty or inverted range must be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Creates a range of the given length starting at `start`.
    pub fn starting_at(start: DateTime<Utc>, length: Duration) -> Self {
        Self {
            start,
            end: start + length,
        }
    }

    /// Returns true if the range is non-empty (`end > start`).
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    /// Half-open overlap: `[s1,e1)` and `[s2,e2)` intersect iff `s1 < e2 && e1 > s2`.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
