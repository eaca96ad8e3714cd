use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::api::entities::TimeEntry;

pub const HEADER: [&str; 9] = [
    "id",
    "activity",
    "start",
    "stop",
    "duration_seconds",
    "rating",
    "comment",
    "tags",
    "distractions",
];

/// Quotes a field when it contains a separator, a quote or a line break. Quotes are doubled.
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Renders entries as CSV, one line per entry in the given order, CRLF terminated.
/// Unknown activities fall back to their id. Running entries have an empty `stop` and their
/// duration measured up to `now`.
pub fn build_csv(
    entries: &[TimeEntry],
    activity_names: &HashMap<Uuid, String>,
    now: DateTime<Utc>,
) -> String {
    let mut out = HEADER.join(",");
    out.push_str("\r\n");

    for entry in entries {
        let activity = activity_names
            .get(&entry.activity_id)
            .cloned()
            .unwrap_or_else(|| entry.activity_id.to_string());
        let row = [
            entry.id.to_string(),
            activity,
            timestamp(entry.start),
            entry.stop.map(timestamp).unwrap_or_default(),
            entry.duration(now).num_seconds().to_string(),
            entry.rating.map(|r| r.to_string()).unwrap_or_default(),
            entry.comment.clone().unwrap_or_default(),
            entry.tags.join(";"),
            entry.distractions.map(|d| d.to_string()).unwrap_or_default(),
        ];
        let line = row
            .iter()
            .map(|field| escape_field(field))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push_str("\r\n");
    }
    out
}
