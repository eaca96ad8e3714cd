use std::collections::HashMap;

use anyhow::Result;
use chrono::{Duration, Local, Utc};
use clap::Parser;
use uuid::Uuid;

use crate::{
    analytics::{
        clip_entries,
        heatmap::{build_heatmap, daily_totals},
        streaks::compute_streaks,
        summarize, Summary,
    },
    utils::{
        percentage::{duration_percentage, Percentage},
        time::{format_duration, format_hours},
    },
};

use super::{
    output::{bar, render_heatmap},
    range::RangeArgs,
    Context,
};

const BAR_WIDTH: usize = 30;
const DEFAULT_DAYS: i64 = 28;

#[derive(Debug, Parser)]
pub struct StatsCommand {
    #[command(flatten)]
    range: RangeArgs,
    #[arg(
        short = 'p',
        long = "min-share",
        default_value = "0",
        help = "Hide activities below this share of the total, e.g. 5%"
    )]
    min_share: Percentage,
    #[arg(long, help = "Also print time per hour of day")]
    hours: bool,
    #[arg(long, help = "Disable colors in the heatmap")]
    no_color: bool,
}

/// Prints a summary, per activity and per tag shares, streaks and a calendar heatmap for the
/// range. Without `--start` the last four weeks are shown.
pub async fn process_stats_command(
    context: &Context,
    StatsCommand {
        range,
        min_share,
        hours,
        no_color,
    }: StatsCommand,
) -> Result<()> {
    let repository = &context.repository;
    let now = context.clock.time();
    let range = range.resolve(now.with_timezone(&Local), DEFAULT_DAYS)?;
    let (from, to) = (range.start.with_timezone(&Utc), range.end.with_timezone(&Utc));

    let (entries, names) = futures::try_join!(
        repository.entries(range.to_entry_range()),
        repository.activity_names()
    )?;
    let entries = clip_entries(entries, from, to, now);
    let summary = summarize(&entries, now, &Local);

    println!(
        "{} to {}",
        range.start.format("%Y-%m-%d %H:%M"),
        range.end.format("%Y-%m-%d %H:%M")
    );
    print_summary(&summary);

    if summary.sessions == 0 {
        return Ok(());
    }

    println!();
    print_activities(&summary, &names, min_share);

    if !summary.per_tag.is_empty() {
        println!();
        println!("Tags");
        for (tag, duration) in &summary.per_tag {
            println!(
                "{}\t{}\t{}",
                duration_percentage(*duration, summary.total),
                format_duration(*duration),
                tag
            );
        }
    }

    if hours {
        println!();
        println!("Hours");
        let max = summary.per_hour.iter().copied().max().unwrap_or_else(Duration::zero);
        for (hour, duration) in summary.per_hour.iter().enumerate() {
            println!(
                "{:02}:00\t{:>6}\t{}",
                hour,
                format_hours(*duration),
                bar(*duration, max, BAR_WIDTH)
            );
        }
    }

    let totals = daily_totals(&entries, now, &Local);
    let today = now.with_timezone(&Local).date_naive();
    let streaks = compute_streaks(&totals, today);
    println!();
    println!(
        "Streak\t{} days, longest {} days",
        streaks.current, streaks.longest
    );

    let last_day = (range.end - Duration::seconds(1)).date_naive();
    let heatmap = build_heatmap(&totals, range.start.date_naive(), last_day);
    println!();
    print!("{}", render_heatmap(&heatmap, !no_color));
    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("Total\t{}", format_duration(summary.total));
    println!("Sessions\t{}", summary.sessions);
    if let Some(average) = summary.average_session() {
        println!("Average session\t{}", format_duration(average));
    }
    match summary.average_rating {
        Some(rating) => println!("Average rating\t{rating:.1}"),
        None => println!("Average rating\t-"),
    }
    println!("Distractions\t{}", summary.distractions);
    if let Some(hour) = summary.busiest_hour() {
        println!("Busiest hour\t{hour:02}:00");
    }
}

fn print_activities(summary: &Summary, names: &HashMap<Uuid, String>, min_share: Percentage) {
    let max = summary
        .per_activity
        .first()
        .map(|a| a.duration)
        .unwrap_or_else(Duration::zero);
    for total in &summary.per_activity {
        let share = duration_percentage(total.duration, summary.total);
        if share < min_share {
            continue;
        }
        println!(
            "{}\t{}\t{}\t{}",
            share,
            format_duration(total.duration),
            bar(total.duration, max, BAR_WIDTH),
            names
                .get(&total.activity_id)
                .map(String::as_str)
                .unwrap_or("(unknown)")
        );
    }
}
