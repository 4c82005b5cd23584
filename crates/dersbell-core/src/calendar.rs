//! Academic calendar resolution — wall-clock instant to (week parity, day,
//! date). Pure and total: any valid instant resolves.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate};

use crate::types::{Day, WeekParity};

/// What a wall-clock instant resolves to on the academic calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarInfo {
    pub week_parity: WeekParity,
    pub day: Day,
    pub date: NaiveDate,
}

/// Resolve an instant against the academic calendar.
///
/// Parity counts whole Monday-anchored weeks since `semester_start`; the
/// week containing the anchor is odd ("tək"). Weeks before the anchor keep
/// alternating backwards, so the function stays total.
pub fn resolve(instant: DateTime<FixedOffset>, semester_start: NaiveDate) -> CalendarInfo {
    let date = instant.date_naive();
    CalendarInfo {
        week_parity: week_parity(date, semester_start),
        day: Day::from_weekday(date.weekday()),
        date,
    }
}

fn week_parity(date: NaiveDate, semester_start: NaiveDate) -> WeekParity {
    let anchor = monday_of(semester_start);
    let weeks = (date - anchor).num_days().div_euclid(7);
    if weeks.rem_euclid(2) == 0 {
        WeekParity::Odd
    } else {
        WeekParity::Even
    }
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn baku() -> FixedOffset {
        FixedOffset::east_opt(4 * 3600).unwrap()
    }

    fn anchor() -> NaiveDate {
        // A Monday.
        NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()
    }

    #[test]
    fn test_anchor_week_is_odd() {
        let instant = baku().with_ymd_and_hms(2025, 9, 17, 10, 0, 0).unwrap();
        let cal = resolve(instant, anchor());
        assert_eq!(cal.week_parity, WeekParity::Odd);
        assert_eq!(cal.day, Day::Wed);
    }

    #[test]
    fn test_parity_alternates_weekly() {
        let week2 = baku().with_ymd_and_hms(2025, 9, 23, 8, 0, 0).unwrap();
        assert_eq!(resolve(week2, anchor()).week_parity, WeekParity::Even);

        let week3 = baku().with_ymd_and_hms(2025, 9, 29, 8, 0, 0).unwrap();
        assert_eq!(resolve(week3, anchor()).week_parity, WeekParity::Odd);
    }

    #[test]
    fn test_sunday_belongs_to_its_week() {
        // Sunday of the anchor week is still odd.
        let sunday = baku().with_ymd_and_hms(2025, 9, 21, 23, 59, 0).unwrap();
        let cal = resolve(sunday, anchor());
        assert_eq!(cal.week_parity, WeekParity::Odd);
        assert_eq!(cal.day, Day::Sun);
    }

    #[test]
    fn test_total_before_anchor() {
        let before = baku().with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap();
        // One week before an odd week is even; no panic, no drift.
        assert_eq!(resolve(before, anchor()).week_parity, WeekParity::Even);
    }

    #[test]
    fn test_mid_week_anchor_normalizes_to_monday() {
        // Anchor given as a Thursday still keys parity off that week's Monday.
        let thursday_anchor = NaiveDate::from_ymd_opt(2025, 9, 18).unwrap();
        let same_week = baku().with_ymd_and_hms(2025, 9, 16, 9, 0, 0).unwrap();
        assert_eq!(resolve(same_week, thursday_anchor).week_parity, WeekParity::Odd);
    }
}
