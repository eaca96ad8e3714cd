use std::{io::Write, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use clap::Parser;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    api::entities::TimeEntry,
    utils::{
        shutdown::detect_shutdown,
        time::{format_clock, format_duration},
    },
};

use super::{entry::AnnotationArgs, Context};

#[derive(Debug, Parser)]
pub struct StopCommand {
    #[command(flatten)]
    annotation: AnnotationArgs,
}

#[derive(Debug, Parser)]
pub struct StatusCommand {
    #[arg(long, short, help = "Keep the timer on screen until Ctrl-C")]
    watch: bool,
}

pub async fn process_start_command(context: &Context, activity: &str) -> Result<()> {
    let repository = &context.repository;
    let activity = repository.resolve_activity(activity).await?;
    let (started, stopped) = repository.start_timer(&activity).await?;
    if let Some(stopped) = stopped {
        let names = repository.activity_names().await?;
        println!(
            "Stopped {} after {}",
            names
                .get(&stopped.activity_id)
                .map(String::as_str)
                .unwrap_or("(unknown)"),
            format_duration(stopped.duration(context.clock.time()))
        );
    }
    println!(
        "Tracking {} since {}",
        activity.name,
        started.start.with_timezone(&Local).format("%H:%M")
    );
    Ok(())
}

/// Stops the timer and, when any annotation flag is given, annotates the finished session.
pub async fn process_stop_command(
    context: &Context,
    StopCommand { annotation }: StopCommand,
) -> Result<()> {
    let repository = &context.repository;
    let patch = annotation.to_patch();
    let Some(mut stopped) = repository.stop_timer().await? else {
        println!("No timer is running");
        return Ok(());
    };
    if !patch.is_empty() {
        stopped = repository.annotate_entry(stopped.id, patch).await?;
    }
    let names = repository.activity_names().await?;
    println!(
        "Stopped {} after {}",
        names
            .get(&stopped.activity_id)
            .map(String::as_str)
            .unwrap_or("(unknown)"),
        format_duration(stopped.duration(context.clock.time()))
    );
    Ok(())
}

fn status_line(entry: &TimeEntry, activity: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}\t{}\tsince {}",
        activity,
        format_clock(entry.duration(now)),
        entry.start.with_timezone(&Local).format("%H:%M")
    )
}

pub async fn process_status_command(
    context: &Context,
    StatusCommand { watch }: StatusCommand,
) -> Result<()> {
    let repository = &context.repository;
    let names = repository.activity_names().await?;
    let name_of = |entry: &TimeEntry| {
        names
            .get(&entry.activity_id)
            .cloned()
            .unwrap_or_else(|| "(unknown)".into())
    };

    if !watch {
        match repository.active_entry().await? {
            Some(entry) => println!("{}", status_line(&entry, &name_of(&entry), context.clock.time())),
            None => println!("No timer is running"),
        }
        return Ok(());
    }

    let cancelation = CancellationToken::new();
    let view = async {
        let result: Result<()> = async {
            loop {
                // Cached, refetched once stale.
                let line = match repository.active_entry().await? {
                    Some(entry) => status_line(&entry, &name_of(&entry), context.clock.time()),
                    None => "No timer is running".to_string(),
                };
                print!("\r\x1b[2K{line}");
                std::io::stdout().flush()?;
                select! {
                    biased;
                    _ = cancelation.cancelled() => break,
                    _ = context.clock.sleep(Duration::from_secs(1)) => {},
                }
            }
            Ok(())
        }
        .await;
        cancelation.cancel();
        result
    };
    let ((), result) = tokio::join!(detect_shutdown(cancelation.clone()), view);
    println!();
    debug!("Left status view");
    result
}
