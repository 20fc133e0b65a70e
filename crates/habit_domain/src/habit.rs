use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar;

/// Event status that counts as a completion. Other values are preserved but
/// never interpreted.
pub const STATUS_COMPLETED: &str = "completed";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub target_per_month: u32,
    /// Weekday labels the habit is scheduled on; empty means every day.
    #[serde(default)]
    pub recurrence: Vec<String>,
    pub position: i64,
    /// Denormalized counters maintained by the storage gateway; read-only
    /// inside the engine.
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl Habit {
    /// Whether the habit is expected on `day`. A recurrence entry that is
    /// not one of `Mon..Sun` never matches instead of failing, so habits
    /// with malformed legacy schedules stay visible rather than erroring.
    pub fn is_due(&self, day: NaiveDate) -> bool {
        if self.recurrence.is_empty() {
            return true;
        }
        let label = calendar::weekday_label(day);
        self.recurrence.iter().any(|entry| entry == label)
    }
}

/// One recorded completion. The pair (habit_id, date) is unique; a toggle is
/// a set/unset of the row, never an append.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionEvent {
    pub habit_id: i64,
    pub date: NaiveDate,
    pub status: String,
}

impl CompletionEvent {
    pub fn completed(habit_id: i64, date: NaiveDate) -> Self {
        Self {
            habit_id,
            date,
            status: STATUS_COMPLETED.to_string(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn habit_with_recurrence(recurrence: &[&str]) -> Habit {
        Habit {
            id: 1,
            name: "Meditate".into(),
            icon: None,
            target_per_month: 20,
            recurrence: recurrence.iter().map(|s| s.to_string()).collect(),
            position: 0,
            current_streak: 0,
            longest_streak: 0,
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[test]
    fn empty_recurrence_is_due_every_day() {
        let habit = habit_with_recurrence(&[]);
        for offset in 0..7 {
            assert!(habit.is_due(monday() + Days::new(offset)));
        }
    }

    #[test]
    fn recurrence_matches_only_listed_weekdays() {
        let habit = habit_with_recurrence(&["Mon", "Wed", "Fri"]);
        let mut due_days = 0;
        for offset in 0..28 {
            let day = monday() + Days::new(offset);
            let label = crate::calendar::weekday_label(day);
            let expected = matches!(label, "Mon" | "Wed" | "Fri");
            assert_eq!(habit.is_due(day), expected, "offset {offset}");
            if habit.is_due(day) {
                due_days += 1;
            }
        }
        assert_eq!(due_days, 12);
    }

    #[test]
    fn unrecognized_labels_never_match() {
        let habit = habit_with_recurrence(&["Monday", "someday"]);
        for offset in 0..7 {
            assert!(!habit.is_due(monday() + Days::new(offset)));
        }
    }

    #[test]
    fn only_the_completed_status_counts() {
        let day = monday();
        assert!(CompletionEvent::completed(1, day).is_completed());
        let skipped = CompletionEvent {
            habit_id: 1,
            date: day,
            status: "skipped".into(),
        };
        assert!(!skipped.is_completed());
    }
}
