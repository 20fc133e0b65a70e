use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar;
use crate::habit::{CompletionEvent, Habit};

/// Ranked score lists are truncated to this many habits.
pub const TOP_HABITS: usize = 10;

/// One point of a per-day completion series.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub label: String,
    pub completed: u32,
}

/// A habit's consistency score for a month, as a rounded percentage.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HabitScore {
    pub habit_id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub score: u32,
}

/// Number of distinct habits completed on each of the given days. Habits
/// completed off-schedule count; recurrence only gates expectation, never
/// counting.
pub fn completion_series(events: &[CompletionEvent], days: &[NaiveDate]) -> Vec<DayCount> {
    days.iter()
        .map(|&day| {
            let distinct: HashSet<i64> = events
                .iter()
                .filter(|event| event.is_completed() && event.date == day)
                .map(|event| event.habit_id)
                .collect();
            DayCount {
                date: day,
                label: calendar::weekday_label(day).to_string(),
                completed: distinct.len() as u32,
            }
        })
        .collect()
}

/// Percentage of possible completions achieved over the range, rounded to
/// the nearest integer. The denominator is habit count × day count; days a
/// habit was not scheduled on are not subtracted. An empty range or an empty
/// habit list yields 0 rather than an error.
pub fn efficiency(habit_count: usize, events: &[CompletionEvent], days: &[NaiveDate]) -> u32 {
    let possible = habit_count * days.len();
    if possible == 0 {
        return 0;
    }
    let day_set: HashSet<NaiveDate> = days.iter().copied().collect();
    let completed = events
        .iter()
        .filter(|event| event.is_completed() && day_set.contains(&event.date))
        .count();
    ((completed as f64 / possible as f64) * 100.0).round() as u32
}

/// Per-habit completion rate over the days of `month` that have elapsed by
/// `today`, capped at 100. Ranked descending; ties keep the input habit
/// order; at most `TOP_HABITS` entries are returned.
pub fn consistency_scores(
    habits: &[Habit],
    events: &[CompletionEvent],
    month: NaiveDate,
    today: NaiveDate,
) -> Vec<HabitScore> {
    let (first, last) = calendar::month_bounds(month);
    let end = if last > today { today } else { last };
    let elapsed = ((end - first).num_days() + 1).max(1) as f64;

    let mut scores: Vec<HabitScore> = habits
        .iter()
        .map(|habit| {
            let completed_days: HashSet<NaiveDate> = events
                .iter()
                .filter(|event| {
                    event.is_completed()
                        && event.habit_id == habit.id
                        && event.date >= first
                        && event.date <= last
                })
                .map(|event| event.date)
                .collect();
            let ratio = (completed_days.len() as f64 / elapsed).min(1.0);
            HabitScore {
                habit_id: habit.id,
                name: habit.name.clone(),
                icon: habit.icon.clone(),
                score: (ratio * 100.0).round() as u32,
            }
        })
        .collect();

    scores.sort_by(|a, b| b.score.cmp(&a.score));
    scores.truncate(TOP_HABITS);
    scores
}
