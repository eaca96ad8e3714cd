use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Streaks {
    /// Consecutive tracked days ending today, or yesterday if nothing was tracked today yet.
    pub current: u32,
    pub longest: u32,
}

pub fn compute_streaks(daily: &BTreeMap<NaiveDate, Duration>, today: NaiveDate) -> Streaks {
    let tracked = |date: &NaiveDate| daily.get(date).is_some_and(|d| *d > Duration::zero());

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for date in daily.keys().filter(|d| tracked(*d)) {
        run = match previous {
            Some(p) if p.succ_opt() == Some(*date) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*date);
    }

    let mut cursor = if tracked(&today) {
        Some(today)
    } else {
        today.pred_opt().filter(tracked)
    };
    let mut current = 0;
    while let Some(date) = cursor.filter(tracked) {
        current += 1;
        cursor = date.pred_opt();
    }

    Streaks { current, longest }
}
