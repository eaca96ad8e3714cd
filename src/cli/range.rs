use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, Duration, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};
use now::DateTimeNow;

use crate::{api::entities::EntryRange, utils::time::next_day_start};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Date range flags shared by `entry list`, `stats` and `export`.
#[derive(Debug, Clone, clap::Args)]
pub struct RangeArgs {
    #[arg(
        long = "start",
        short,
        help = "Start of the range. Examples are \"yesterday\", \"1 week ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    pub start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "End of the range. Examples are \"today\", \"1 hour ago\", \"15/03/2025\""
    )]
    pub end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    pub date_style: DateStyle,
    #[arg(
        long = "days",
        default_value_t = false,
        help = "Take inputs as whole days. For example if start and end are both 15/03/2025 this includes the whole day"
    )]
    pub treat_as_days: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl DateRange {
    pub fn to_entry_range(self) -> EntryRange {
        EntryRange::between(self.start.with_timezone(&Utc), self.end.with_timezone(&Utc))
    }
}

/// Parses a single point in time such as "9:30", "yesterday 14:00" or "15/03/2025 12:00".
pub fn parse_instant(
    value: &str,
    now: DateTime<Local>,
    style: DateStyle,
    name: &str,
) -> Result<DateTime<Local>> {
    match parse_date_string(value, now, style.into()) {
        Ok(v) => Ok(v.with_timezone(&Local)),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate {name} date {e}"),
            )
            .into()),
    }
}

impl RangeArgs {
    /// Resolves the flags against `now`. Without a start the range covers `default_days` days up
    /// to now. The end is clamped to now since nothing can be tracked in the future.
    pub fn resolve(&self, now: DateTime<Local>, default_days: i64) -> Result<DateRange> {
        let parse = |value: &Option<String>, name: &str| {
            value
                .as_deref()
                .map(|s| parse_instant(s, now, self.date_style, name))
                .transpose()
        };

        let start = parse(&self.start_date, "start")?;
        let end = parse(&self.end_date, "end")?;

        let (mut start, mut end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            (Some(start), None) => (start, now),
            (None, end) => {
                let end = end.unwrap_or(now);
                ((end - Duration::days(default_days - 1)).beginning_of_day(), end)
            }
        };
        if self.treat_as_days {
            start = start.beginning_of_day();
            end = next_day_start(end);
        }
        end = end.min(now);

        if start >= end {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    "Start of the range must be before its end",
                )
                .into());
        }
        Ok(DateRange { start, end })
    }
}
