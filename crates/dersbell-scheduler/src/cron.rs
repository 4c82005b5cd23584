//! Lightweight cron expression parser.
//! Supports: "MIN HOUR DOM MON DOW" (5-field, no seconds)
//! Wildcards: *, */N, comma lists, single values (minute and hour fields)
//! Example: "0 20 * * *" = every day at 20:00
//!
//! Generic over the timezone of `after`, so triggers pinned to a fixed
//! civil offset fire at the same local time regardless of server locale.

use chrono::{DateTime, Duration, TimeZone, Timelike};

/// Compute the next fire instant strictly after `after`.
pub fn next_run<Tz: TimeZone>(expression: &str, after: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let parts: Vec<&str> = expression.split_whitespace().collect();
    if parts.len() != 5 {
        tracing::warn!(
            "Invalid cron expression: '{}' (need 5 fields: MIN HOUR DOM MON DOW)",
            expression
        );
        return None;
    }

    let minutes = parse_field(parts[0], 0, 59)?;
    let hours = parse_field(parts[1], 0, 23)?;
    // Day-of-month, month, and day-of-week are accepted but only '*' is
    // honored — both triggers here are daily or sub-hourly.

    let mut candidate = (after + Duration::minutes(1))
        .with_second(0)?
        .with_nanosecond(0)?;

    // Try up to 48 hours ahead.
    for _ in 0..(48 * 60) {
        if minutes.contains(&candidate.minute()) && hours.contains(&candidate.hour()) {
            return Some(candidate);
        }
        candidate = candidate + Duration::minutes(1);
    }
    None
}

/// Parse a cron field into the list of matching values.
fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    if field == "*" {
        return Some((min..=max).collect());
    }

    // */N — every N
    if let Some(step) = field.strip_prefix("*/") {
        let n: u32 = step.parse().ok()?;
        if n == 0 {
            return None;
        }
        return Some((min..=max).step_by(n as usize).collect());
    }

    // Comma-separated: "0,15,30,45"
    if field.contains(',') {
        let vals: std::result::Result<Vec<u32>, _> =
            field.split(',').map(|s| s.trim().parse()).collect();
        return vals
            .ok()
            .map(|v| v.into_iter().filter(|x| *x >= min && *x <= max).collect());
    }

    // Single number
    let n: u32 = field.parse().ok()?;
    if n >= min && n <= max { Some(vec![n]) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn baku() -> FixedOffset {
        FixedOffset::east_opt(4 * 3600).unwrap()
    }

    #[test]
    fn test_daily_digest_time_in_local_offset() {
        let after = baku().with_ymd_and_hms(2026, 3, 2, 19, 10, 0).unwrap();
        let next = next_run("0 20 * * *", after).unwrap();
        assert_eq!(next.hour(), 20);
        assert_eq!(next.minute(), 0);
        assert_eq!(next.offset().local_minus_utc(), 4 * 3600);
    }

    #[test]
    fn test_daily_time_rolls_to_next_day() {
        let after = baku().with_ymd_and_hms(2026, 3, 2, 20, 0, 0).unwrap();
        let next = next_run("0 20 * * *", after).unwrap();
        assert_eq!(next.date_naive().to_string(), "2026-03-03");
    }

    #[test]
    fn test_every_five_minutes() {
        let after = baku().with_ymd_and_hms(2026, 3, 2, 10, 2, 30).unwrap();
        let next = next_run("*/5 * * * *", after).unwrap();
        assert_eq!(next.minute(), 5);
        assert_eq!(next.second(), 0);
    }

    #[test]
    fn test_comma_list() {
        let after = baku().with_ymd_and_hms(2026, 3, 2, 10, 16, 0).unwrap();
        let next = next_run("0,15,30,45 * * * *", after).unwrap();
        assert_eq!(next.minute(), 30);
    }

    #[test]
    fn test_invalid_expression() {
        let after = baku().with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        assert!(next_run("bad", after).is_none());
        assert!(next_run("61 * * * *", after).is_none());
    }
}
