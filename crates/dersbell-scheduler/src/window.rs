//! Window Evaluator — classifies the current instant into zero or more due
//! notifications.
//!
//! Both entry points are pure functions of the instant and the timetable
//! they are given: no hidden state, so a frozen clock always yields the
//! same requests.

use chrono::{DateTime, FixedOffset, TimeZone};

use dersbell_core::calendar::CalendarInfo;
use dersbell_core::types::{DaySchedule, LessonEntry, NotificationRequest};

/// Inclusive reminder window, minutes before the lesson starts.
///
/// Deliberately wider than the 5-minute poll tick: any two consecutive
/// ticks are at most 5 minutes apart, so a narrower window could let a
/// lesson fall between them. The width trades a small duplicate risk for
/// never skipping a lesson; the driver's `NotifiedCache` absorbs the
/// duplicates.
pub const REMINDER_WINDOW_MIN_MINUTES: i64 = 14;
pub const REMINDER_WINDOW_MAX_MINUTES: i64 = 20;

/// A lesson whose reminder is due now.
#[derive(Debug, Clone, PartialEq)]
pub struct DueLesson {
    /// Stable de-duplication key: `date:start:subject`.
    pub key: String,
    pub request: NotificationRequest,
}

/// Build tomorrow's digest, if tomorrow has real lessons.
///
/// `cal` must be the calendar resolution of *tomorrow*. Weekend days and
/// days whose timetable holds only sentinel entries produce no digest.
pub fn digest_request(
    cal: &CalendarInfo,
    schedule: Option<&DaySchedule>,
    sentinel: &str,
) -> Option<NotificationRequest> {
    if cal.day.is_weekend() {
        return None;
    }

    let lessons: Vec<&LessonEntry> = schedule?
        .lessons
        .iter()
        .filter(|lesson| lesson.subject != sentinel)
        .collect();
    if lessons.is_empty() {
        return None;
    }

    let first_lesson_time = lessons[0]
        .time
        .split('-')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("N/A");

    let mut details = String::new();
    for (index, lesson) in lessons.iter().enumerate() {
        details.push_str(&format!(
            "{}. {} - {} ({})\n",
            index + 1,
            lesson.time,
            lesson.subject,
            lesson.room
        ));
    }

    let day = cal.day.label();
    let request = NotificationRequest::new(
        format!("Sabahkı Dərs Cədvəli - {day}"),
        format!(
            "{day} ({} həftə) {} dərsiniz var. İlk dərs: {first_lesson_time}\n\n{details}",
            cal.week_parity.label(),
            lessons.len(),
        ),
    )
    .with_data("kind", "digest")
    .with_data("date", cal.date.to_string());
    Some(request)
}

/// Classify a poll instant against today's timetable.
///
/// `cal` must be the calendar resolution of `now`. Sentinel entries, empty
/// or malformed time strings, and unparseable start components are skipped —
/// one bad row never fails the whole evaluation.
pub fn reminder_requests(
    now: DateTime<FixedOffset>,
    cal: &CalendarInfo,
    schedule: Option<&DaySchedule>,
    sentinel: &str,
) -> Vec<DueLesson> {
    if cal.day.is_weekend() {
        return Vec::new();
    }
    let Some(schedule) = schedule else {
        return Vec::new();
    };

    let mut due = Vec::new();
    for lesson in &schedule.lessons {
        if lesson.subject == sentinel || lesson.time.is_empty() {
            continue;
        }
        let Some((hour, minute)) = parse_start_time(&lesson.time) else {
            tracing::debug!(
                "Skipping lesson '{}': unparseable time '{}'",
                lesson.subject,
                lesson.time
            );
            continue;
        };
        let Some(lesson_instant) = cal
            .date
            .and_hms_opt(hour, minute, 0)
            .and_then(|naive| now.timezone().from_local_datetime(&naive).single())
        else {
            continue;
        };

        let delta_minutes = (lesson_instant - now).num_minutes();
        if !(REMINDER_WINDOW_MIN_MINUTES..=REMINDER_WINDOW_MAX_MINUTES).contains(&delta_minutes) {
            continue;
        }

        due.push(DueLesson {
            key: format!("{}:{:02}:{:02}:{}", cal.date, hour, minute, lesson.subject),
            request: NotificationRequest::new(
                format!("Dərs Başlayır: {}", lesson.subject),
                format!(
                    "{} - {} dərsi 15 dəqiqə sonra başlayır.\nMüəllim: {}\nOtaq: {}",
                    lesson.time, lesson.subject, lesson.teacher, lesson.room
                ),
            )
            .with_data("kind", "reminder")
            .with_data("subject", lesson.subject.as_str()),
        });
    }
    due
}

/// Parse the start half of "HH:MM-HH:MM" into (hour, minute).
fn parse_start_time(time: &str) -> Option<(u32, u32)> {
    let (start, _) = time.split_once('-')?;
    let (h, m) = start.trim().split_once(':')?;
    let hour: u32 = h.trim().parse().ok()?;
    let minute: u32 = m.trim().parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}
