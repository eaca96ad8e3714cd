use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::{api::entities::TimeEntry, utils::time::next_day_start};

pub const MAX_LEVEL: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapDay {
    pub date: NaiveDate,
    pub duration: Duration,
    /// 0 for an empty day, otherwise 1..=[MAX_LEVEL] relative to the busiest day.
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heatmap {
    pub days: Vec<HeatmapDay>,
    pub busiest: Duration,
}

/// Tracked time per calendar day of `tz`. Entries crossing midnight are split between days.
pub fn daily_totals<Tz: TimeZone>(
    entries: &[TimeEntry],
    now: DateTime<Utc>,
    tz: &Tz,
) -> BTreeMap<NaiveDate, Duration> {
    let mut days = BTreeMap::new();
    for entry in entries {
        let end = entry.end_or(now);
        let mut cursor = entry.start;
        while cursor < end {
            let local = cursor.with_timezone(tz);
            let boundary = next_day_start(local.clone()).with_timezone(&Utc);
            // A timezone without a valid midnight could stall the loop.
            let chunk_end = if boundary > cursor { boundary.min(end) } else { end };
            *days
                .entry(local.date_naive())
                .or_insert_with(Duration::zero) += chunk_end - cursor;
            cursor = chunk_end;
        }
    }
    days
}

/// Builds one cell per day of the inclusive range `from..=to`.
pub fn build_heatmap(totals: &BTreeMap<NaiveDate, Duration>, from: NaiveDate, to: NaiveDate) -> Heatmap {
    let durations = from
        .iter_days()
        .take_while(|date| *date <= to)
        .map(|date| (date, totals.get(&date).copied().unwrap_or_else(Duration::zero)))
        .collect::<Vec<_>>();

    let busiest = durations
        .iter()
        .map(|(_, d)| *d)
        .max()
        .unwrap_or_else(Duration::zero);

    let days = durations
        .into_iter()
        .map(|(date, duration)| HeatmapDay {
            date,
            duration,
            level: level(duration, busiest),
        })
        .collect();

    Heatmap { days, busiest }
}

fn level(duration: Duration, busiest: Duration) -> u8 {
    if duration <= Duration::zero() || busiest <= Duration::zero() {
        return 0;
    }
    let ratio = duration.num_seconds() as f64 / busiest.num_seconds().max(1) as f64;
    ((ratio * MAX_LEVEL as f64).ceil() as u8).clamp(1, MAX_LEVEL)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::analytics::test_entries::entry;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    #[test]
    fn entries_crossing_midnight_are_split() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 23, 0, 0).unwrap();
        let totals = daily_totals(&[entry(1, start, Some(120))], start + Duration::days(1), &Utc);
        assert_eq!(totals.get(&date(10)), Some(&Duration::hours(1)));
        assert_eq!(totals.get(&date(11)), Some(&Duration::hours(1)));
    }

    #[test]
    fn days_follow_timezone() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 23, 0, 0).unwrap();
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let totals = daily_totals(&[entry(1, start, Some(30))], start + Duration::days(1), &tz);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals.get(&date(11)), Some(&Duration::minutes(30)));
    }

    #[test]
    fn heatmap_covers_whole_range_with_levels() {
        let mut totals = BTreeMap::new();
        totals.insert(date(2), Duration::hours(4));
        totals.insert(date(3), Duration::hours(1));
        totals.insert(date(4), Duration::minutes(1));
        totals.insert(date(9), Duration::hours(9));

        let heatmap = build_heatmap(&totals, date(1), date(5));

        assert_eq!(heatmap.days.len(), 5);
        assert_eq!(heatmap.busiest, Duration::hours(4));
        let levels = heatmap.days.iter().map(|d| d.level).collect::<Vec<_>>();
        assert_eq!(levels, vec![0, 4, 1, 1, 0]);
    }

    #[test]
    fn empty_range_has_no_levels() {
        let heatmap = build_heatmap(&BTreeMap::new(), date(1), date(3));
        assert!(heatmap.days.iter().all(|d| d.level == 0));
        assert_eq!(heatmap.busiest, Duration::zero());
    }

    #[test]
    fn inverted_range_is_empty() {
        let heatmap = build_heatmap(&BTreeMap::new(), date(5), date(1));
        assert!(heatmap.days.is_empty());
    }
}
