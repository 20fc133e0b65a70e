use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

use crate::error::EngineError;

/// Weekday labels in Monday-first order, matching recurrence entries and
/// series labels.
pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

pub fn weekday_label(day: NaiveDate) -> &'static str {
    WEEKDAY_LABELS[day.weekday().num_days_from_monday() as usize]
}

/// Canonical `YYYY-MM-DD` key for a calendar day. This is the join key
/// between derived days and persisted event dates at the storage boundary.
pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub fn parse_key(key: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").map_err(|_| EngineError::MalformedKey {
        key: key.to_string(),
    })
}

/// Inclusive day range, ascending.
pub fn enumerate_days(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, EngineError> {
    if end < start {
        return Err(EngineError::InvalidRange { start, end });
    }
    let mut days = Vec::with_capacity((end - start).num_days() as usize + 1);
    let mut cursor = start;
    while cursor <= end {
        days.push(cursor);
        let Some(next) = cursor.succ_opt() else {
            break;
        };
        cursor = next;
    }
    Ok(days)
}

/// First and last day of the month containing `day`.
pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day - Days::new(u64::from(day.day0()));
    let last = first + Months::new(1) - Days::new(1);
    (first, last)
}

/// Splits an ordered run of days into display weeks, closing each week on
/// Sunday. The first and last week of a month may be partial.
pub fn month_weeks(days: &[NaiveDate]) -> Vec<Vec<NaiveDate>> {
    let mut weeks = Vec::new();
    let mut current = Vec::new();
    for (idx, day) in days.iter().enumerate() {
        current.push(*day);
        if day.weekday() == Weekday::Sun || idx + 1 == days.len() {
            weeks.push(std::mem::take(&mut current));
        }
    }
    weeks
}
