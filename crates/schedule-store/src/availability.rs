//! Weekly availability windows.

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{TimeRange, UserId};

/// Day of the week, numbered `0` (Sunday) through `6` (Saturday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayOfWeek(u8);

impl DayOfWeek {
    pub const SUNDAY: DayOfWeek = DayOfWeek(0);
    pub const MONDAY: DayOfWeek = DayOfWeek(1);
    pub const SATURDAY: DayOfWeek = DayOfWeek(6);

    /// Returns `None` unless `day` is in `0..=6`.
    pub fn new(day: u8) -> Option<Self> {
        (day <= 6).then_some(Self(day))
    }

    /// Returns the weekday a calendar date falls on.
    pub fn of(date: NaiveDate) -> Self {
        Self(date.weekday().num_days_from_sunday() as u8)
    }

    pub fn number(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DayOfWeek {
    type Error = String;

    fn try_from(day: u8) -> Result<Self, Self::Error> {
        DayOfWeek::new(day).ok_or_else(|| format!("day of week must be 0-6, got {day}"))
    }
}

impl From<DayOfWeek> for u8 {
    fn from(day: DayOfWeek) -> Self {
        day.0
    }
}

impl std::fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Working hours of a provider on one day of the week.
///
/// Times are wall-clock values interpreted in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub provider_id: UserId,
    pub day_of_week: DayOfWeek,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl AvailabilityWindow {
    pub fn new(
        provider_id: UserId,
        day_of_week: DayOfWeek,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Self {
        Self {
            provider_id,
            day_of_week,
            start,
            end,
        }
    }

    /// Returns true if the window is non-empty.
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    /// Places the window on a concrete calendar date.
    pub fn on(&self, date: NaiveDate) -> TimeRange {
        TimeRange::new(
            date.and_time(self.start).and_utc(),
            date.and_time(self.end).and_utc(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn day_of_week_bounds() {
        assert!(DayOfWeek::new(0).is_some());
        assert!(DayOfWeek::new(6).is_some());
        assert!(DayOfWeek::new(7).is_none());
    }

    #[test]
    fn weekday_of_date_counts_from_sunday() {
        // 2030-01-06 is a Sunday.
        let sunday = NaiveDate::from_ymd_opt(2030, 1, 6).unwrap();
        assert_eq!(DayOfWeek::of(sunday), DayOfWeek::SUNDAY);
        assert_eq!(DayOfWeek::of(sunday.succ_opt().unwrap()), DayOfWeek::MONDAY);
    }

    #[test]
    fn window_on_date_is_utc() {
        let window = AvailabilityWindow::new(
            UserId::new(),
            DayOfWeek::MONDAY,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        );
        let range = window.on(NaiveDate::from_ymd_opt(2030, 1, 7).unwrap());
        assert_eq!(range.start, Utc.with_ymd_and_hms(2030, 1, 7, 9, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2030, 1, 7, 17, 0, 0).unwrap());
    }

    #[test]
    fn day_of_week_deserialization_rejects_out_of_range() {
        assert!(serde_json::from_str::<DayOfWeek>("3").is_ok());
        assert!(serde_json::from_str::<DayOfWeek>("9").is_err());
    }
}
