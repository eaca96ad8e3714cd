use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};

/// The standard way of converting a date to a string in timeflow. Used for heatmap rows and
/// query parameters.
pub fn date_to_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    let next = date + Duration::days(1);
    let tz = next.timezone();
    tz.from_local_datetime(&next.date_naive().and_time(NaiveTime::MIN))
        .earliest()
        .unwrap_or(next)
}

/// Compact duration used in tables: `1h5m3s`, `12m0s`, `45s`. Negative durations print as zero.
pub fn format_duration(v: Duration) -> String {
    let v = v.max(Duration::zero());
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

/// Stopwatch style `HH:MM:SS` used by live timers. Hours are not wrapped at 24.
pub fn format_clock(v: Duration) -> String {
    let seconds = v.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

/// Hours with one decimal, for CSV-friendly and summary outputs.
pub fn format_hours(v: Duration) -> String {
    format!("{:.1}h", v.num_seconds().max(0) as f64 / 3600.)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    #[test]
    fn compact_format_drops_empty_leading_units() {
        assert_eq!(format_duration(Duration::seconds(45)), "45s");
        assert_eq!(format_duration(Duration::seconds(12 * 60)), "12m0s");
        assert_eq!(format_duration(Duration::seconds(3600 + 5 * 60 + 3)), "1h5m3s");
        assert_eq!(format_duration(Duration::hours(26)), "26h0m0s");
    }

    #[test]
    fn negative_durations_format_as_zero() {
        assert_eq!(format_duration(Duration::seconds(-30)), "0s");
        assert_eq!(format_clock(Duration::seconds(-30)), "00:00:00");
    }

    #[test]
    fn clock_format_pads_and_does_not_wrap_hours() {
        assert_eq!(format_clock(Duration::seconds(59)), "00:00:59");
        assert_eq!(format_clock(Duration::seconds(3661)), "01:01:01");
        assert_eq!(format_clock(Duration::hours(30)), "30:00:00");
    }

    #[test]
    fn hours_have_one_decimal() {
        assert_eq!(format_hours(Duration::minutes(90)), "1.5h");
        assert_eq!(format_hours(Duration::zero()), "0.0h");
    }

    #[test]
    fn next_day_start_is_midnight() {
        let date = Utc.with_ymd_and_hms(2025, 3, 15, 17, 42, 0).unwrap();
        assert_eq!(
            next_day_start(date),
            Utc.with_ymd_and_hms(2025, 3, 16, 0, 0, 0).unwrap()
        );
    }
}
