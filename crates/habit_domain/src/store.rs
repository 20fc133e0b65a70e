use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::habit::{CompletionEvent, Habit};

/// Inclusive calendar-date range for gateway queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, EngineError> {
        if end < start {
            return Err(EngineError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }
}

/// Storage gateway the engine reads from and writes through. Implementations
/// own persistence, habit lifecycle (including cascade removal of events),
/// and the denormalized streak counters on `Habit`.
#[async_trait]
pub trait HabitStore: Send + Sync {
    /// All habits for the owner, position ascending then creation order.
    async fn list_habits(&self, owner: &str) -> Result<Vec<Habit>, EngineError>;

    /// Completion events for the owner inside `range`.
    async fn list_completion_events(
        &self,
        owner: &str,
        range: DateRange,
    ) -> Result<Vec<CompletionEvent>, EngineError>;

    /// Distinct dates on which the owner completed at least one habit,
    /// newest first, capped at `limit`.
    async fn list_recent_completion_dates(
        &self,
        owner: &str,
        limit: usize,
    ) -> Result<Vec<NaiveDate>, EngineError>;

    /// Records a completion for (habit, day). Inserting over an existing
    /// event must not create a duplicate.
    async fn upsert_completion_event(
        &self,
        owner: &str,
        habit_id: i64,
        day: NaiveDate,
    ) -> Result<(), EngineError>;

    /// Removes the completion for (habit, day). Deleting an absent event is
    /// a no-op, not an error.
    async fn delete_completion_event(
        &self,
        owner: &str,
        habit_id: i64,
        day: NaiveDate,
    ) -> Result<(), EngineError>;

    /// Rewrites display positions so each habit's position equals its index
    /// in `ordered_ids`.
    async fn update_habit_positions(
        &self,
        owner: &str,
        ordered_ids: &[i64],
    ) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_rejects_reversed_bounds() {
        let start = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert!(matches!(
            DateRange::new(start, end),
            Err(EngineError::InvalidRange { .. })
        ));
        let range = DateRange::new(end, start).unwrap();
        assert!(range.contains(start));
        assert!(range.contains(end));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2025, 6, 11).unwrap()));
    }
}
