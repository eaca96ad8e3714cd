//! Plain-text rendering shared by the commands. Functions here build strings and never print so
//! they can be tested.

use std::collections::HashMap;

use ansi_term::Colour;
use chrono::{DateTime, Datelike, Duration, Local, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    analytics::heatmap::{Heatmap, MAX_LEVEL},
    api::entities::{Activity, TimeEntry},
    utils::time::{date_to_string, format_duration},
};

const GLYPHS: [char; MAX_LEVEL as usize + 1] = ['·', '░', '▒', '▓', '█'];
const SHADES: [u8; MAX_LEVEL as usize + 1] = [240, 22, 28, 34, 46];

pub fn activity_line(activity: &Activity) -> String {
    match activity.archived_at {
        Some(at) => format!(
            "{}\t{}\t(archived {})",
            activity.id,
            activity.name,
            date_to_string(at.with_timezone(&Local).date_naive())
        ),
        None => format!("{}\t{}", activity.id, activity.name),
    }
}

fn stars(rating: Option<u8>) -> String {
    match rating {
        Some(r) => "*".repeat(r as usize),
        None => "-".into(),
    }
}

/// One tab separated line per entry: id, start, duration, activity, rating, distractions, tags,
/// comment.
pub fn entry_line<Tz: TimeZone>(
    entry: &TimeEntry,
    names: &HashMap<Uuid, String>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let activity = names
        .get(&entry.activity_id)
        .map(String::as_str)
        .unwrap_or("(unknown)");
    let duration = if entry.is_running() {
        format!("{} (running)", format_duration(entry.duration(now)))
    } else {
        format_duration(entry.duration(now))
    };
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        entry.id,
        entry.start.with_timezone(tz).format("%Y-%m-%d %H:%M"),
        duration,
        activity,
        stars(entry.rating),
        entry.distractions.unwrap_or(0),
        entry.tags.join(","),
        entry.comment.as_deref().unwrap_or("")
    )
}

/// A horizontal bar of `width` cells filled in proportion to `value / max`.
pub fn bar(value: Duration, max: Duration, width: usize) -> String {
    if max <= Duration::zero() || value <= Duration::zero() {
        return String::new();
    }
    let filled = (value.num_seconds() as f64 / max.num_seconds() as f64 * width as f64).round();
    "#".repeat((filled as usize).clamp(1, width))
}

/// Calendar style heatmap, one row per week starting on Monday.
pub fn render_heatmap(heatmap: &Heatmap, color: bool) -> String {
    let mut out = String::from("           Mo Tu We Th Fr Sa Su\n");
    let Some(first) = heatmap.days.first() else {
        return out;
    };

    let padding = first.date.weekday().num_days_from_monday() as usize;
    let mut cells = vec![None; padding];
    cells.extend(heatmap.days.iter().map(Some));

    for week in cells.chunks(7) {
        let week_start = week
            .iter()
            .flatten()
            .next()
            .map(|d| d.date - Duration::days(d.date.weekday().num_days_from_monday() as i64));
        let Some(week_start) = week_start else {
            continue;
        };
        out.push_str(&date_to_string(week_start));
        out.push(' ');
        for cell in week {
            out.push(' ');
            match cell {
                Some(day) => {
                    let glyph = GLYPHS[day.level as usize].to_string().repeat(2);
                    if color {
                        out.push_str(&Colour::Fixed(SHADES[day.level as usize]).paint(glyph).to_string());
                    } else {
                        out.push_str(&glyph);
                    }
                }
                None => out.push_str("  "),
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::analytics::{heatmap::build_heatmap, test_entries::entry};

    #[test]
    fn entry_line_shows_annotations() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let mut e = entry(1, start, Some(90));
        e.id = Uuid::nil();
        e.rating = Some(3);
        e.tags = vec!["deep".into(), "rust".into()];
        e.comment = Some("good".into());
        e.distractions = Some(1);
        let names = HashMap::from([(Uuid::from_u128(1), "Writing".to_string())]);

        assert_eq!(
            entry_line(&e, &names, start, &Utc),
            "00000000-0000-0000-0000-000000000000\t2025-03-10 09:00\t1h30m0s\tWriting\t***\t1\tdeep,rust\tgood"
        );
    }

    #[test]
    fn running_entry_is_marked() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let line = entry_line(
            &entry(1, start, None),
            &HashMap::new(),
            start + Duration::minutes(5),
            &Utc,
        );
        assert!(line.contains("5m0s (running)\t(unknown)"));
    }

    #[test]
    fn bars_scale_to_width() {
        assert_eq!(bar(Duration::hours(1), Duration::hours(2), 10), "#####");
        assert_eq!(bar(Duration::seconds(1), Duration::hours(2), 10), "#");
        assert_eq!(bar(Duration::zero(), Duration::hours(2), 10), "");
        assert_eq!(bar(Duration::hours(1), Duration::zero(), 10), "");
    }

    #[test]
    fn heatmap_rows_start_on_monday() {
        // 2025-03-12 is a Wednesday.
        let from = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        let mut totals = BTreeMap::new();
        totals.insert(from, Duration::hours(2));
        let rendered = render_heatmap(&build_heatmap(&totals, from, to), false);
        let lines = rendered.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "2025-03-10        ██ ·· ·· ·· ··");
        assert_eq!(lines[2], "2025-03-17  ··");
    }
}
