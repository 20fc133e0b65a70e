use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};

/// Default cap on how many distinct completion dates the streak walk looks
/// back over. A true streak longer than the window is reported as the
/// window length.
pub const DEFAULT_LOOKBACK: usize = 100;

/// Length of the current run of consecutive days with at least one
/// completion, ending today or yesterday. No completion on either of those
/// days means the streak is 0, whatever happened earlier. Input dates may
/// arrive in any order and with duplicates.
pub fn current_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let unique: BTreeSet<NaiveDate> = dates.iter().copied().collect();

    let anchor = if unique.contains(&today) {
        Some(today)
    } else {
        today.pred_opt().filter(|day| unique.contains(day))
    };
    let Some(anchor) = anchor else {
        return 0;
    };

    let mut count: u32 = 0;
    for &date in unique.iter().rev() {
        if date > anchor {
            continue;
        }
        let expected = anchor - Days::new(u64::from(count));
        if date == expected {
            count += 1;
        } else if date < expected {
            break;
        }
    }
    count
}

/// Longest run of consecutive days anywhere in the set, independent of
/// today. Used by gateways to maintain the denormalized longest-streak
/// counter.
pub fn longest_run(dates: &[NaiveDate]) -> u32 {
    let unique: BTreeSet<NaiveDate> = dates.iter().copied().collect();
    let mut longest: u32 = 0;
    let mut run: u32 = 0;
    let mut prev: Option<NaiveDate> = None;
    for &date in &unique {
        run = match prev {
            Some(p) if p.succ_opt() == Some(date) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(date);
    }
    longest
}
