use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::debug;

use habit_domain::habit::STATUS_COMPLETED;
use habit_domain::streak;
use habit_domain::{CompletionEvent, DateRange, EngineError, Habit, HabitStore};

#[derive(Debug, Default)]
struct OwnerState {
    /// Habits in creation order; display order is resolved by a stable sort
    /// on position at read time.
    habits: Vec<Habit>,
    /// Event status keyed by (habit, date). The map key is the uniqueness
    /// invariant: one event per habit per day.
    events: BTreeMap<(i64, NaiveDate), String>,
}

impl OwnerState {
    fn habit_dates(&self, habit_id: i64) -> Vec<NaiveDate> {
        self.events
            .iter()
            .filter(|((id, _), status)| *id == habit_id && status.as_str() == STATUS_COMPLETED)
            .map(|((_, date), _)| *date)
            .collect()
    }

    /// Recomputes the denormalized streak counters for one habit after its
    /// ledger changed. The current counter is the run ending at the habit's
    /// most recent completion.
    fn refresh_streak_counters(&mut self, habit_id: i64) {
        let dates = self.habit_dates(habit_id);
        let (current, longest) = match dates.iter().max() {
            Some(&latest) => (
                streak::current_streak(&dates, latest),
                streak::longest_run(&dates),
            ),
            None => (0, 0),
        };
        if let Some(habit) = self.habits.iter_mut().find(|h| h.id == habit_id) {
            habit.current_streak = current;
            habit.longest_streak = longest;
        }
    }
}

/// In-memory storage gateway used by tests and the demo binary.
#[derive(Debug, Default)]
pub struct MemoryStore {
    owners: RwLock<HashMap<String, OwnerState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a habit for `owner`. Habit ids must be unique per owner.
    pub fn insert_habit(&self, owner: &str, habit: Habit) {
        let mut owners = self.owners.write();
        let state = owners.entry(owner.to_string()).or_default();
        state.habits.retain(|existing| existing.id != habit.id);
        state.habits.push(habit);
    }

    /// Removes a habit and cascades removal of its completion events.
    pub fn remove_habit(&self, owner: &str, habit_id: i64) {
        let mut owners = self.owners.write();
        if let Some(state) = owners.get_mut(owner) {
            state.habits.retain(|habit| habit.id != habit_id);
            state.events.retain(|(id, _), _| *id != habit_id);
        }
    }

    fn with_owner<T>(
        &self,
        owner: &str,
        read: impl FnOnce(&OwnerState) -> T,
    ) -> T {
        let owners = self.owners.read();
        match owners.get(owner) {
            Some(state) => read(state),
            None => read(&OwnerState::default()),
        }
    }
}

#[async_trait]
impl HabitStore for MemoryStore {
    async fn list_habits(&self, owner: &str) -> Result<Vec<Habit>, EngineError> {
        let mut habits = self.with_owner(owner, |state| state.habits.clone());
        habits.sort_by_key(|habit| habit.position);
        Ok(habits)
    }

    async fn list_completion_events(
        &self,
        owner: &str,
        range: DateRange,
    ) -> Result<Vec<CompletionEvent>, EngineError> {
        Ok(self.with_owner(owner, |state| {
            state
                .events
                .iter()
                .filter(|((_, date), _)| range.contains(*date))
                .map(|((habit_id, date), status)| CompletionEvent {
                    habit_id: *habit_id,
                    date: *date,
                    status: status.clone(),
                })
                .collect()
        }))
    }

    async fn list_recent_completion_dates(
        &self,
        owner: &str,
        limit: usize,
    ) -> Result<Vec<NaiveDate>, EngineError> {
        Ok(self.with_owner(owner, |state| {
            let distinct: BTreeSet<NaiveDate> = state
                .events
                .iter()
                .filter(|(_, status)| status.as_str() == STATUS_COMPLETED)
                .map(|((_, date), _)| *date)
                .collect();
            distinct.into_iter().rev().take(limit).collect()
        }))
    }

    async fn upsert_completion_event(
        &self,
        owner: &str,
        habit_id: i64,
        day: NaiveDate,
    ) -> Result<(), EngineError> {
        let mut owners = self.owners.write();
        let state = owners
            .get_mut(owner)
            .ok_or_else(|| EngineError::habit_not_found(habit_id))?;
        if !state.habits.iter().any(|habit| habit.id == habit_id) {
            return Err(EngineError::habit_not_found(habit_id));
        }
        state
            .events
            .entry((habit_id, day))
            .or_insert_with(|| STATUS_COMPLETED.to_string());
        state.refresh_streak_counters(habit_id);
        debug!(owner, habit_id, %day, "completion recorded");
        Ok(())
    }

    async fn delete_completion_event(
        &self,
        owner: &str,
        habit_id: i64,
        day: NaiveDate,
    ) -> Result<(), EngineError> {
        let mut owners = self.owners.write();
        let Some(state) = owners.get_mut(owner) else {
            return Ok(());
        };
        state.events.remove(&(habit_id, day));
        state.refresh_streak_counters(habit_id);
        debug!(owner, habit_id, %day, "completion removed");
        Ok(())
    }

    async fn update_habit_positions(
        &self,
        owner: &str,
        ordered_ids: &[i64],
    ) -> Result<(), EngineError> {
        let mut owners = self.owners.write();
        let state = owners
            .get_mut(owner)
            .ok_or_else(|| EngineError::NotFound {
                entity: "owner",
                id: owner.to_string(),
            })?;
        for &id in ordered_ids {
            if !state.habits.iter().any(|habit| habit.id == id) {
                return Err(EngineError::habit_not_found(id));
            }
        }
        for (index, &id) in ordered_ids.iter().enumerate() {
            if let Some(habit) = state.habits.iter_mut().find(|habit| habit.id == id) {
                habit.position = index as i64;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn habit(id: i64, position: i64) -> Habit {
        Habit {
            id,
            name: format!("habit-{id}"),
            icon: None,
            target_per_month: 0,
            recurrence: Vec::new(),
            position,
            current_streak: 0,
            longest_streak: 0,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[tokio::test]
    async fn habits_are_ordered_by_position_then_creation() {
        let store = MemoryStore::new();
        store.insert_habit("u", habit(1, 5));
        store.insert_habit("u", habit(2, 5));
        store.insert_habit("u", habit(3, 1));
        let ids: Vec<i64> = store
            .list_habits("u")
            .await
            .unwrap()
            .iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn upsert_and_delete_are_idempotent() {
        let store = MemoryStore::new();
        store.insert_habit("u", habit(1, 0));
        store.upsert_completion_event("u", 1, date(5)).await.unwrap();
        store.upsert_completion_event("u", 1, date(5)).await.unwrap();
        let range = DateRange::new(date(1), date(30)).unwrap();
        assert_eq!(store.list_completion_events("u", range).await.unwrap().len(), 1);

        store.delete_completion_event("u", 1, date(5)).await.unwrap();
        store.delete_completion_event("u", 1, date(5)).await.unwrap();
        assert!(store.list_completion_events("u", range).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_for_unknown_habit_is_rejected() {
        let store = MemoryStore::new();
        store.insert_habit("u", habit(1, 0));
        assert!(matches!(
            store.upsert_completion_event("u", 99, date(5)).await,
            Err(EngineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn streak_counters_follow_the_ledger() {
        let store = MemoryStore::new();
        store.insert_habit("u", habit(1, 0));
        for d in [3, 4, 5, 9, 10] {
            store.upsert_completion_event("u", 1, date(d)).await.unwrap();
        }
        let habits = store.list_habits("u").await.unwrap();
        assert_eq!(habits[0].current_streak, 2);
        assert_eq!(habits[0].longest_streak, 3);

        store.delete_completion_event("u", 1, date(10)).await.unwrap();
        let habits = store.list_habits("u").await.unwrap();
        assert_eq!(habits[0].current_streak, 1);
        assert_eq!(habits[0].longest_streak, 3);
    }

    #[tokio::test]
    async fn recent_dates_are_distinct_descending_and_capped() {
        let store = MemoryStore::new();
        store.insert_habit("u", habit(1, 0));
        store.insert_habit("u", habit(2, 1));
        for d in 1..=6 {
            store.upsert_completion_event("u", 1, date(d)).await.unwrap();
        }
        store.upsert_completion_event("u", 2, date(6)).await.unwrap();
        let recent = store.list_recent_completion_dates("u", 4).await.unwrap();
        assert_eq!(recent, vec![date(6), date(5), date(4), date(3)]);
    }

    #[tokio::test]
    async fn removing_a_habit_cascades_to_its_events() {
        let store = MemoryStore::new();
        store.insert_habit("u", habit(1, 0));
        store.insert_habit("u", habit(2, 1));
        store.upsert_completion_event("u", 1, date(5)).await.unwrap();
        store.upsert_completion_event("u", 2, date(5)).await.unwrap();
        store.remove_habit("u", 1);
        let range = DateRange::new(date(1), date(30)).unwrap();
        let events = store.list_completion_events("u", range).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].habit_id, 2);
    }

    #[tokio::test]
    async fn reorder_rewrites_positions_by_index() {
        let store = MemoryStore::new();
        store.insert_habit("u", habit(1, 0));
        store.insert_habit("u", habit(2, 1));
        store.insert_habit("u", habit(3, 2));
        store.update_habit_positions("u", &[2, 1, 3]).await.unwrap();
        let ids: Vec<i64> = store
            .list_habits("u")
            .await
            .unwrap()
            .iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(ids, vec![2, 1, 3]);

        assert!(matches!(
            store.update_habit_positions("u", &[2, 99]).await,
            Err(EngineError::NotFound { .. })
        ));
    }
}
