use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::habit::{CompletionEvent, Habit};

/// One derived cell of the habit × day grid. `completed` does not imply
/// `due`: a completion logged on an unscheduled day is still a completion.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DueCell {
    pub habit_id: i64,
    pub date: NaiveDate,
    pub due: bool,
    pub completed: bool,
}

/// Dense completion grid derived from the sparse event ledger. Cells are
/// ordered habit-major, days ascending.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DueGrid {
    cells: Vec<DueCell>,
    #[serde(skip)]
    index: HashMap<(i64, NaiveDate), usize>,
}

impl DueGrid {
    pub fn cell(&self, habit_id: i64, day: NaiveDate) -> Option<&DueCell> {
        self.index.get(&(habit_id, day)).map(|idx| &self.cells[*idx])
    }

    pub fn is_completed(&self, habit_id: i64, day: NaiveDate) -> bool {
        self.cell(habit_id, day).map(|c| c.completed).unwrap_or(false)
    }

    pub fn cells(&self) -> &[DueCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Merges completion events onto the cartesian product of habits and days.
/// The result covers every (habit, day) pair exactly once, including habits
/// with no events and days with no due habits.
pub fn merge_grid(habits: &[Habit], events: &[CompletionEvent], days: &[NaiveDate]) -> DueGrid {
    let done: HashSet<(i64, NaiveDate)> = events
        .iter()
        .filter(|event| event.is_completed())
        .map(|event| (event.habit_id, event.date))
        .collect();

    let capacity = habits.len() * days.len();
    let mut grid = DueGrid {
        cells: Vec::with_capacity(capacity),
        index: HashMap::with_capacity(capacity),
    };
    for habit in habits {
        for &day in days {
            grid.index.insert((habit.id, day), grid.cells.len());
            grid.cells.push(DueCell {
                habit_id: habit.id,
                date: day,
                due: habit.is_due(day),
                completed: done.contains(&(habit.id, day)),
            });
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar;

    fn habit(id: i64, recurrence: &[&str]) -> Habit {
        Habit {
            id,
            name: format!("habit-{id}"),
            icon: None,
            target_per_month: 0,
            recurrence: recurrence.iter().map(|s| s.to_string()).collect(),
            position: id,
            current_streak: 0,
            longest_streak: 0,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn grid_covers_the_full_cartesian_product() {
        let habits = vec![habit(1, &[]), habit(2, &["Mon"])];
        let days = calendar::enumerate_days(date(2), date(4)).unwrap();
        let grid = merge_grid(&habits, &[], &days);
        assert_eq!(grid.len(), habits.len() * days.len());
        for h in &habits {
            for &day in &days {
                assert!(grid.cell(h.id, day).is_some());
            }
        }
    }

    #[test]
    fn completed_is_independent_of_due() {
        // 2025-06-03 is a Tuesday; habit 2 is only scheduled on Mondays.
        let habits = vec![habit(2, &["Mon"])];
        let days = vec![date(3)];
        let events = vec![CompletionEvent::completed(2, date(3))];
        let grid = merge_grid(&habits, &events, &days);
        let cell = grid.cell(2, date(3)).unwrap();
        assert!(!cell.due);
        assert!(cell.completed);
    }

    #[test]
    fn non_completed_events_are_ignored() {
        let habits = vec![habit(1, &[])];
        let days = vec![date(2)];
        let events = vec![CompletionEvent {
            habit_id: 1,
            date: date(2),
            status: "skipped".into(),
        }];
        let grid = merge_grid(&habits, &events, &days);
        assert!(!grid.is_completed(1, date(2)));
    }

    #[test]
    fn inputs_are_not_consumed_or_reordered() {
        let habits = vec![habit(1, &[])];
        let days = vec![date(2), date(3)];
        let events = vec![CompletionEvent::completed(1, date(3))];
        let first = merge_grid(&habits, &events, &days);
        let second = merge_grid(&habits, &events, &days);
        assert_eq!(first.cells(), second.cells());
    }
}
