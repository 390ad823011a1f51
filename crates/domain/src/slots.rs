//! Free-slot generation and the parsers feeding it.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use common::TimeRange;

use crate::error::{Result, SchedulingError};

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| SchedulingError::InvalidDateFormat(input.to_string()))
}

/// Parses an `HH:MM` wall-clock time.
pub fn parse_clock(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M").map_err(|_| {
        SchedulingError::InvalidInput(format!("invalid time {input:?} (use HH:MM)"))
    })
}

/// Lists the start of every `slot`-long candidate in `window` that does not
/// intersect any of `booked`, in ascending order.
///
/// Candidates start at the window start and step by `slot` while the
/// candidate still ends at or before the window end. A trailing remainder
/// shorter than `slot` is never offered.
pub fn generate_free_slots(
    window: TimeRange,
    booked: &[TimeRange],
    slot: Duration,
) -> Vec<DateTime<Utc>> {
    if slot <= Duration::zero() {
        return Vec::new();
    }

    let mut free = Vec::new();
    let mut current = window.start;
    while current + slot <= window.end {
        let candidate = TimeRange::starting_at(current, slot);
        if !booked.iter().any(|b| candidate.overlaps(b)) {
            free.push(current);
        }
        current += slot;
    }
    free
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 7, h, m, 0).unwrap()
    }

    fn half_hour() -> Duration {
        Duration::minutes(30)
    }

    #[test]
    fn one_hour_window_yields_two_slots() {
        let slots = generate_free_slots(TimeRange::new(at(9, 0), at(10, 0)), &[], half_hour());
        assert_eq!(slots, vec![at(9, 0), at(9, 30)]);
    }

    #[test]
    fn straddling_appointment_blocks_both_slots() {
        let booked = [TimeRange::new(at(9, 15), at(9, 45))];
        let slots =
            generate_free_slots(TimeRange::new(at(9, 0), at(10, 0)), &booked, half_hour());
        assert!(slots.is_empty());
    }

    #[test]
    fn adjacent_appointment_does_not_block() {
        let booked = [TimeRange::new(at(9, 30), at(10, 0))];
        let slots =
            generate_free_slots(TimeRange::new(at(9, 0), at(10, 30)), &booked, half_hour());
        assert_eq!(slots, vec![at(9, 0), at(10, 0)]);
    }

    #[test]
    fn trailing_remainder_is_dropped() {
        let slots = generate_free_slots(TimeRange::new(at(9, 0), at(10, 15)), &[], half_hour());
        assert_eq!(slots, vec![at(9, 0), at(9, 30)]);
    }

    #[test]
    fn window_shorter_than_slot_is_empty() {
        let slots = generate_free_slots(TimeRange::new(at(9, 0), at(9, 20)), &[], half_hour());
        assert!(slots.is_empty());
    }

    #[test]
    fn full_day_of_work_has_sixteen_slots() {
        let slots = generate_free_slots(TimeRange::new(at(9, 0), at(17, 0)), &[], half_hour());
        assert_eq!(slots.len(), 16);
        assert_eq!(slots.first(), Some(&at(9, 0)));
        assert_eq!(slots.last(), Some(&at(16, 30)));
    }

    #[test]
    fn non_positive_slot_yields_nothing() {
        let window = TimeRange::new(at(9, 0), at(10, 0));
        assert!(generate_free_slots(window, &[], Duration::zero()).is_empty());
    }

    #[test]
    fn parses_dates_and_clock_times() {
        assert_eq!(
            parse_date("2030-01-07").unwrap(),
            NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
        );
        assert!(matches!(
            parse_date("07/01/2030"),
            Err(SchedulingError::InvalidDateFormat(_))
        ));
        assert!(parse_date("2030-02-30").is_err());

        assert_eq!(
            parse_clock("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(matches!(
            parse_clock("9am"),
            Err(SchedulingError::InvalidInput(_))
        ));
        assert!(parse_clock("25:00").is_err());
    }
}
