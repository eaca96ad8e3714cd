//! Client-side aggregation over fetched time entries. Everything here is a pure reduction over a
//! slice of [TimeEntry], parameterised by `now` (for running entries) and a timezone (for
//! hour-of-day and calendar-day grouping).

pub mod csv;
pub mod heatmap;
pub mod streaks;

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use uuid::Uuid;

use crate::api::entities::TimeEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityTotal {
    pub activity_id: Uuid,
    pub duration: Duration,
    pub sessions: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: Duration,
    pub sessions: usize,
    /// Mean over rated sessions only.
    pub average_rating: Option<f64>,
    pub distractions: u64,
    /// Sorted by duration, longest first.
    pub per_activity: Vec<ActivityTotal>,
    /// Sorted by duration, longest first.
    pub per_tag: Vec<(String, Duration)>,
    /// Index is the hour of day in the requested timezone.
    pub per_hour: [Duration; 24],
}

impl Summary {
    pub fn average_session(&self) -> Option<Duration> {
        (self.sessions > 0).then(|| self.total / self.sessions as i32)
    }

    /// Hour of day with the most tracked time, if any time was tracked.
    pub fn busiest_hour(&self) -> Option<u32> {
        self.per_hour
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.is_zero())
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(hour, _)| hour as u32)
    }
}

pub fn summarize<Tz: TimeZone>(entries: &[TimeEntry], now: DateTime<Utc>, tz: &Tz) -> Summary {
    let mut total = Duration::zero();
    let mut ratings = vec![];
    let mut distractions = 0u64;
    let mut per_activity = HashMap::<Uuid, ActivityTotal>::new();
    let mut per_tag = HashMap::<String, Duration>::new();
    let mut per_hour = [Duration::zero(); 24];

    for entry in entries {
        let duration = entry.duration(now);
        total += duration;
        if let Some(rating) = entry.rating {
            ratings.push(rating as f64);
        }
        distractions += entry.distractions.unwrap_or(0) as u64;

        let activity = per_activity
            .entry(entry.activity_id)
            .or_insert_with(|| ActivityTotal {
                activity_id: entry.activity_id,
                duration: Duration::zero(),
                sessions: 0,
            });
        activity.duration += duration;
        activity.sessions += 1;

        for tag in &entry.tags {
            *per_tag.entry(tag.clone()).or_insert_with(Duration::zero) += duration;
        }

        for (hour, chunk) in split_by_hour(entry.start, entry.end_or(now), tz) {
            per_hour[hour as usize] += chunk;
        }
    }

    let average_rating =
        (!ratings.is_empty()).then(|| ratings.iter().sum::<f64>() / ratings.len() as f64);

    let mut per_activity = per_activity.into_values().collect::<Vec<_>>();
    per_activity.sort_by(|a, b| {
        b.duration
            .cmp(&a.duration)
            .then(a.activity_id.cmp(&b.activity_id))
    });
    let mut per_tag = per_tag.into_iter().collect::<Vec<_>>();
    per_tag.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    Summary {
        total,
        sessions: entries.len(),
        average_rating,
        distractions,
        per_activity,
        per_tag,
        per_hour,
    }
}

/// Splits `[start, end)` at every hour boundary of `tz`, yielding the local hour and the time
/// spent in it.
pub fn split_by_hour<Tz: TimeZone>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: &Tz,
) -> Vec<(u32, Duration)> {
    let mut chunks = vec![];
    let mut cursor = start;
    while cursor < end {
        let local = cursor.with_timezone(tz);
        let into_hour = Duration::minutes(local.minute() as i64)
            + Duration::seconds(local.second() as i64)
            + Duration::nanoseconds(local.nanosecond() as i64);
        let boundary = cursor + (Duration::hours(1) - into_hour);
        let chunk_end = boundary.min(end);
        chunks.push((local.hour(), chunk_end - cursor));
        cursor = chunk_end;
    }
    chunks
}

/// Restricts entries to `[from, to)`. Entries entirely outside are dropped, the rest are cut at
/// the edges. Running entries are closed at `now` so the result no longer depends on time.
pub fn clip_entries(
    entries: Vec<TimeEntry>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<TimeEntry> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let start = entry.start.max(from);
            let stop = entry.end_or(now).min(to);
            (start < stop).then(|| TimeEntry {
                start,
                stop: Some(stop),
                ..entry
            })
        })
        .collect()
}
