//! File-based timetable store.
//!
//! The whole weekly grid lives in `schedule.json` as a flat list of
//! `DaySchedule` cells, one per (week parity, day). Seeded by hand at the
//! start of the semester and looked up read-only by the triggers.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use dersbell_core::error::{DersBellError, Result};
use dersbell_core::traits::LessonStore;
use dersbell_core::types::{Day, DaySchedule, WeekParity};

/// File-backed timetable store.
pub struct ScheduleStore {
    file: PathBuf,
}

impl ScheduleStore {
    pub fn new(dir: &Path) -> Self {
        std::fs::create_dir_all(dir).ok();
        Self {
            file: dir.join("schedule.json"),
        }
    }

    /// Load the full grid. A missing file is an empty timetable.
    pub fn load(&self) -> Result<Vec<DaySchedule>> {
        if !self.file.exists() {
            tracing::debug!("No timetable at {}", self.file.display());
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&self.file)
            .map_err(|e| DersBellError::store(format!("read {}: {e}", self.file.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| DersBellError::store(format!("parse {}: {e}", self.file.display())))
    }

    /// Replace the full grid.
    pub fn save(&self, grid: &[DaySchedule]) -> Result<()> {
        let json = serde_json::to_string_pretty(grid)?;
        std::fs::write(&self.file, &json)
            .map_err(|e| DersBellError::store(format!("write {}: {e}", self.file.display())))?;
        tracing::debug!("💾 Saved {} timetable cell(s)", grid.len());
        Ok(())
    }
}

#[async_trait]
impl LessonStore for ScheduleStore {
    async fn find_schedule(&self, parity: WeekParity, day: Day) -> Result<Option<DaySchedule>> {
        let grid = self.load()?;
        Ok(grid
            .into_iter()
            .find(|cell| cell.week_parity == parity && cell.day == day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dersbell_core::types::LessonEntry;

    fn cell(parity: WeekParity, day: Day, subject: &str) -> DaySchedule {
        DaySchedule {
            week_parity: parity,
            day,
            lessons: vec![LessonEntry {
                subject: subject.into(),
                time: "09:00-09:45".into(),
                room: "204".into(),
                teacher: "R. Əliyev".into(),
            }],
        }
    }

    #[tokio::test]
    async fn test_round_trip_and_lookup() {
        let dir = std::env::temp_dir().join("dersbell-test-schedule");
        std::fs::remove_dir_all(&dir).ok();
        let store = ScheduleStore::new(&dir);

        store
            .save(&[
                cell(WeekParity::Odd, Day::Mon, "Riyaziyyat"),
                cell(WeekParity::Even, Day::Mon, "Fizika"),
            ])
            .unwrap();

        let hit = store
            .find_schedule(WeekParity::Even, Day::Mon)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.lessons[0].subject, "Fizika");

        let miss = store.find_schedule(WeekParity::Odd, Day::Tue).await.unwrap();
        assert!(miss.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_timetable() {
        let dir = std::env::temp_dir().join("dersbell-test-schedule-missing");
        std::fs::remove_dir_all(&dir).ok();
        let store = ScheduleStore::new(&dir);
        let cell = store.find_schedule(WeekParity::Odd, Day::Mon).await.unwrap();
        assert!(cell.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }
}
