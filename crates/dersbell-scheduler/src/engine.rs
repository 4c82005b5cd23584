//! Scheduler Driver — owns the two cron triggers and runs
//! evaluate → dispatch per firing.
//!
//! Each trigger loop computes its next fire instant in the fixed civil
//! offset, sleeps, then spawns the tick body behind a non-blocking
//! `try_lock` guard: a firing that arrives while the previous run of the
//! same trigger is still dispatching is skipped, never queued. The two
//! triggers are independent of each other and may run concurrently.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use tokio::sync::Mutex;

use dersbell_core::calendar;
use dersbell_core::traits::LessonStore;

use crate::cron;
use crate::dispatch::Dispatcher;
use crate::window;

/// Remembers which lessons were already notified today, so a jittered tick
/// landing twice inside the 14..=20 minute window cannot double-send.
/// Driver state only — the evaluator stays stateless.
#[derive(Debug, Default)]
pub struct NotifiedCache {
    day: Option<NaiveDate>,
    keys: HashSet<String>,
}

impl NotifiedCache {
    pub fn contains(&self, date: NaiveDate, key: &str) -> bool {
        self.day == Some(date) && self.keys.contains(key)
    }

    /// Record a dispatched lesson; a date rollover clears yesterday's keys.
    pub fn mark(&mut self, date: NaiveDate, key: &str) {
        if self.day != Some(date) {
            self.day = Some(date);
            self.keys.clear();
        }
        self.keys.insert(key.to_string());
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Digest,
    Reminder,
}

impl Trigger {
    fn name(&self) -> &'static str {
        match self {
            Trigger::Digest => "digest",
            Trigger::Reminder => "reminder",
        }
    }
}

pub struct SchedulerDriver {
    lessons: Arc<dyn LessonStore>,
    dispatcher: Arc<Dispatcher>,
    tz: FixedOffset,
    semester_start: NaiveDate,
    sentinel: String,
    digest_cron: String,
    reminder_cron: String,
    digest_guard: Arc<Mutex<()>>,
    reminder_guard: Arc<Mutex<()>>,
    notified: Mutex<NotifiedCache>,
}

impl SchedulerDriver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lessons: Arc<dyn LessonStore>,
        dispatcher: Arc<Dispatcher>,
        tz: FixedOffset,
        semester_start: NaiveDate,
        sentinel: String,
        digest_cron: String,
        reminder_cron: String,
    ) -> Self {
        Self {
            lessons,
            dispatcher,
            tz,
            semester_start,
            sentinel,
            digest_cron,
            reminder_cron,
            digest_guard: Arc::new(Mutex::new(())),
            reminder_guard: Arc::new(Mutex::new(())),
            notified: Mutex::new(NotifiedCache::default()),
        }
    }

    /// Start both triggers as background tasks.
    pub fn start(self: Arc<Self>) {
        tokio::spawn(Arc::clone(&self).trigger_loop(Trigger::Digest));
        tokio::spawn(self.trigger_loop(Trigger::Reminder));
    }

    fn now_local(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.tz)
    }

    async fn trigger_loop(self: Arc<Self>, trigger: Trigger) {
        let expression = match trigger {
            Trigger::Digest => self.digest_cron.clone(),
            Trigger::Reminder => self.reminder_cron.clone(),
        };
        tracing::info!("⏰ {} trigger scheduled ({expression})", trigger.name());

        loop {
            let now = self.now_local();
            let Some(next) = cron::next_run(&expression, now) else {
                tracing::error!(
                    "Invalid cron expression for {} trigger: '{expression}' — trigger disabled",
                    trigger.name()
                );
                return;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let guard = match trigger {
                Trigger::Digest => &self.digest_guard,
                Trigger::Reminder => &self.reminder_guard,
            };
            let Ok(permit) = Arc::clone(guard).try_lock_owned() else {
                tracing::warn!(
                    "⏭️ Previous {} run still in flight, skipping this firing",
                    trigger.name()
                );
                continue;
            };

            let driver = Arc::clone(&self);
            tokio::spawn(async move {
                let _permit = permit;
                match trigger {
                    Trigger::Digest => driver.run_digest_tick().await,
                    Trigger::Reminder => driver.run_reminder_tick().await,
                }
            });
        }
    }

    /// Evaluate and dispatch tomorrow's digest. Safe to call directly (the
    /// `--run-digest` flag does) — trigger guarding happens in the loop.
    pub async fn run_digest_tick(&self) {
        tracing::info!("🌙 Digest trigger fired");
        let now = self.now_local();
        let tomorrow = now + Duration::days(1);
        let cal = calendar::resolve(tomorrow, self.semester_start);

        if cal.day.is_weekend() {
            tracing::info!("Tomorrow is a weekend day, skipping the digest");
            return;
        }

        let schedule = match self.lessons.find_schedule(cal.week_parity, cal.day).await {
            Ok(schedule) => schedule,
            Err(e) => {
                tracing::error!("Timetable lookup failed, waiting for the next firing: {e}");
                return;
            }
        };

        let Some(request) = window::digest_request(&cal, schedule.as_ref(), &self.sentinel) else {
            tracing::info!(
                "No lessons tomorrow ({}, {} həftə)",
                cal.day.label(),
                cal.week_parity.label()
            );
            return;
        };

        match self.dispatcher.dispatch_to_all(&request).await {
            Ok(report) => tracing::info!(
                "🌙 Digest sent to {}/{} recipient(s)",
                report.succeeded,
                report.total
            ),
            Err(e) => tracing::error!("Digest dispatch aborted: {e}"),
        }
    }

    /// Evaluate and dispatch imminent-lesson reminders. One full multicast
    /// round per due lesson, sequentially.
    pub async fn run_reminder_tick(&self) {
        let now = self.now_local();
        let cal = calendar::resolve(now, self.semester_start);

        if cal.day.is_weekend() {
            return;
        }

        let schedule = match self.lessons.find_schedule(cal.week_parity, cal.day).await {
            Ok(schedule) => schedule,
            Err(e) => {
                tracing::error!("Timetable lookup failed, waiting for the next firing: {e}");
                return;
            }
        };

        let due = window::reminder_requests(now, &cal, schedule.as_ref(), &self.sentinel);
        if due.is_empty() {
            tracing::debug!("No upcoming lessons in the reminder window");
            return;
        }

        for lesson in due {
            if self.notified.lock().await.contains(cal.date, &lesson.key) {
                tracing::debug!("Already notified for {}", lesson.key);
                continue;
            }
            match self.dispatcher.dispatch_to_all(&lesson.request).await {
                Ok(report) => {
                    // Marked only after a completed round, so a directory
                    // outage leaves the lesson eligible for the next tick.
                    self.notified.lock().await.mark(cal.date, &lesson.key);
                    tracing::info!(
                        "🔔 '{}' sent to {}/{} recipient(s)",
                        lesson.request.title,
                        report.succeeded,
                        report.total
                    );
                }
                Err(e) => tracing::error!("Reminder dispatch aborted: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_cache_suppresses_within_a_day() {
        let mut cache = NotifiedCache::default();
        let today = date(2025, 9, 16);
        assert!(!cache.contains(today, "k1"));
        cache.mark(today, "k1");
        assert!(cache.contains(today, "k1"));
        assert!(!cache.contains(today, "k2"));
    }

    #[test]
    fn test_cache_rearms_after_rollover() {
        let mut cache = NotifiedCache::default();
        cache.mark(date(2025, 9, 16), "k1");
        let tomorrow = date(2025, 9, 17);
        assert!(!cache.contains(tomorrow, "k1"));
        cache.mark(tomorrow, "k2");
        // Yesterday's keys are gone entirely.
        assert!(!cache.contains(tomorrow, "k1"));
        assert!(cache.contains(tomorrow, "k2"));
    }
}
