use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use habit_domain::analytics::{self, DayCount, HabitScore};
use habit_domain::calendar;
use habit_domain::grid::{self, DueGrid};
use habit_domain::streak;
use habit_domain::{CompletionEvent, DateRange, EngineError, Habit, HabitStore};

/// Tunables for one user's session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Number of distinct completion dates fetched for the streak walk.
    /// A true streak longer than this window is reported as the window
    /// length.
    pub streak_lookback: usize,
    /// Length in days of the trailing completion series, ending today.
    pub weekly_window: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            streak_lookback: streak::DEFAULT_LOOKBACK,
            weekly_window: 7,
        }
    }
}

/// Immutable view handed to the presentation layer, recomputed from session
/// state on every refresh trigger.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub habits: Vec<Habit>,
    pub grid: DueGrid,
    /// Per-day completion counts across the viewed month.
    pub trend: Vec<DayCount>,
    /// Per-day completion counts for the trailing weekly window.
    pub weekly: Vec<DayCount>,
    pub efficiency: u32,
    pub top_habits: Vec<HabitScore>,
    pub streak: u32,
}

/// One habit's state for a single day, in display order.
#[derive(Debug, Clone, Serialize)]
pub struct DayHabit {
    pub habit: Habit,
    pub due: bool,
    pub completed: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    habits: Vec<Habit>,
    month_events: Vec<CompletionEvent>,
    weekly_events: Vec<CompletionEvent>,
    recent_dates: Vec<NaiveDate>,
    month_days: Vec<NaiveDate>,
    weekly_days: Vec<NaiveDate>,
    today: Option<NaiveDate>,
    applied_seq: u64,
}

impl SessionState {
    fn remove_event(&mut self, habit_id: i64, day: NaiveDate) {
        self.month_events
            .retain(|event| !(event.habit_id == habit_id && event.date == day));
        self.weekly_events
            .retain(|event| !(event.habit_id == habit_id && event.date == day));
        let still_completed = self
            .month_events
            .iter()
            .chain(self.weekly_events.iter())
            .any(|event| event.date == day && event.is_completed());
        if !still_completed {
            self.recent_dates.retain(|&d| d != day);
        }
    }

    fn insert_event(&mut self, habit_id: i64, day: NaiveDate) {
        let key_present = |events: &[CompletionEvent]| {
            events
                .iter()
                .any(|event| event.habit_id == habit_id && event.date == day)
        };
        if self.month_days.contains(&day) && !key_present(&self.month_events) {
            self.month_events.push(CompletionEvent::completed(habit_id, day));
        }
        if self.weekly_days.contains(&day) && !key_present(&self.weekly_events) {
            self.weekly_events.push(CompletionEvent::completed(habit_id, day));
        }
        if !self.recent_dates.contains(&day) {
            self.recent_dates.push(day);
            self.recent_dates.sort_unstable_by(|a, b| b.cmp(a));
        }
    }
}

pub struct HabitServiceBuilder {
    store: Arc<dyn HabitStore>,
    owner: String,
    config: SessionConfig,
}

impl HabitServiceBuilder {
    pub fn streak_lookback(mut self, limit: usize) -> Self {
        self.config.streak_lookback = limit;
        self
    }

    pub fn weekly_window(mut self, days: u64) -> Self {
        self.config.weekly_window = days.max(1);
        self
    }

    pub fn build(self) -> HabitService {
        HabitService {
            store: self.store,
            owner: self.owner,
            config: self.config,
            state: RwLock::new(SessionState::default()),
            fetch_seq: AtomicU64::new(0),
            cell_locks: Mutex::new(HashMap::new()),
        }
    }
}

/// Session-scoped coordinator: derives presentation snapshots from gateway
/// state and applies user mutations optimistically before persisting them.
pub struct HabitService {
    store: Arc<dyn HabitStore>,
    owner: String,
    config: SessionConfig,
    state: RwLock<SessionState>,
    fetch_seq: AtomicU64,
    cell_locks: Mutex<HashMap<(i64, NaiveDate), Arc<tokio::sync::Mutex<()>>>>,
}

impl HabitService {
    pub fn builder(store: Arc<dyn HabitStore>, owner: impl Into<String>) -> HabitServiceBuilder {
        HabitServiceBuilder {
            store,
            owner: owner.into(),
            config: SessionConfig::default(),
        }
    }

    /// Re-derives everything from gateway ground truth for the month
    /// containing `month_anchor`. Out-of-order completions are resolved by
    /// sequence: a fetch that finishes after a newer one has been applied is
    /// discarded and the fresher snapshot is returned instead.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub async fn refresh(
        &self,
        month_anchor: NaiveDate,
        today: NaiveDate,
    ) -> Result<DashboardSnapshot, EngineError> {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let (month_start, month_end) = calendar::month_bounds(month_anchor);
        let month_days = calendar::enumerate_days(month_start, month_end)?;
        let weekly_start = today - Days::new(self.config.weekly_window.saturating_sub(1));
        let weekly_days = calendar::enumerate_days(weekly_start, today)?;

        let habits = self.store.list_habits(&self.owner).await?;
        let month_events = self
            .store
            .list_completion_events(&self.owner, DateRange::new(month_start, month_end)?)
            .await?;
        let weekly_events = self
            .store
            .list_completion_events(&self.owner, DateRange::new(weekly_start, today)?)
            .await?;
        let recent_dates = self
            .store
            .list_recent_completion_dates(&self.owner, self.config.streak_lookback)
            .await?;

        let mut state = self.state.write();
        if seq < state.applied_seq {
            debug!(seq, applied = state.applied_seq, "discarding stale refresh");
            return Ok(Self::derive(&state));
        }
        state.applied_seq = seq;
        state.habits = habits;
        state.month_events = month_events;
        state.weekly_events = weekly_events;
        state.recent_dates = recent_dates;
        state.month_days = month_days;
        state.weekly_days = weekly_days;
        state.today = Some(today);
        Ok(Self::derive(&state))
    }

    /// Recomputes the snapshot from current session state, including any
    /// optimistic mutations applied since the last refresh.
    pub fn snapshot(&self) -> DashboardSnapshot {
        Self::derive(&self.state.read())
    }

    /// Flips completion for one (habit, day) cell. The session state is
    /// updated before the gateway write resolves; writes for the same cell
    /// are serialized so a rapid double toggle cannot land out of order.
    /// On a failed write the optimistic value is kept, not rolled back;
    /// the caller reconciles by calling `refresh`.
    #[instrument(skip(self))]
    pub async fn toggle_completion(
        &self,
        habit_id: i64,
        day: NaiveDate,
        currently_completed: bool,
    ) -> Result<bool, EngineError> {
        let now_completed = !currently_completed;

        {
            let mut state = self.state.write();
            if now_completed {
                state.insert_event(habit_id, day);
            } else {
                state.remove_event(habit_id, day);
            }
        }

        let lock = self.cell_lock(habit_id, day);
        let _guard = lock.lock().await;
        let written = if now_completed {
            self.store
                .upsert_completion_event(&self.owner, habit_id, day)
                .await
        } else {
            self.store
                .delete_completion_event(&self.owner, habit_id, day)
                .await
        };
        if let Err(err) = written {
            warn!(habit_id, %day, %err, "completion write failed; refresh to reconcile");
            return Err(err);
        }
        Ok(now_completed)
    }

    /// Applies a new display order: each habit's position becomes its index
    /// in `ordered_ids`. The local list is reordered optimistically before
    /// the gateway write.
    #[instrument(skip(self, ordered_ids))]
    pub async fn reorder_habits(&self, ordered_ids: &[i64]) -> Result<(), EngineError> {
        {
            let mut state = self.state.write();
            let rank: HashMap<i64, i64> = ordered_ids
                .iter()
                .enumerate()
                .map(|(index, &id)| (id, index as i64))
                .collect();
            for habit in &mut state.habits {
                if let Some(&position) = rank.get(&habit.id) {
                    habit.position = position;
                }
            }
            state.habits.sort_by_key(|habit| habit.position);
        }
        self.store
            .update_habit_positions(&self.owner, ordered_ids)
            .await
    }

    /// Habit list for a single day with due/completed flags, in display
    /// order. With `only_due` the list is filtered to scheduled habits.
    pub fn day_view(&self, day: NaiveDate, only_due: bool) -> Vec<DayHabit> {
        let state = self.state.read();
        state
            .habits
            .iter()
            .filter_map(|habit| {
                let due = habit.is_due(day);
                if only_due && !due {
                    return None;
                }
                let completed = state
                    .month_events
                    .iter()
                    .chain(state.weekly_events.iter())
                    .any(|event| {
                        event.habit_id == habit.id && event.date == day && event.is_completed()
                    });
                Some(DayHabit {
                    habit: habit.clone(),
                    due,
                    completed,
                })
            })
            .collect()
    }

    fn cell_lock(&self, habit_id: i64, day: NaiveDate) -> Arc<tokio::sync::Mutex<()>> {
        self.cell_locks
            .lock()
            .entry((habit_id, day))
            .or_default()
            .clone()
    }

    fn derive(state: &SessionState) -> DashboardSnapshot {
        let grid = grid::merge_grid(&state.habits, &state.month_events, &state.month_days);
        let trend = analytics::completion_series(&state.month_events, &state.month_days);
        let weekly = analytics::completion_series(&state.weekly_events, &state.weekly_days);
        let efficiency =
            analytics::efficiency(state.habits.len(), &state.month_events, &state.month_days);
        let top_habits = match (state.month_days.first(), state.today) {
            (Some(&month_start), Some(today)) => {
                analytics::consistency_scores(&state.habits, &state.month_events, month_start, today)
            }
            _ => Vec::new(),
        };
        let streak = state
            .today
            .map(|today| streak::current_streak(&state.recent_dates, today))
            .unwrap_or(0);
        DashboardSnapshot {
            habits: state.habits.clone(),
            grid,
            trend,
            weekly,
            efficiency,
            top_habits,
            streak,
        }
    }
}
