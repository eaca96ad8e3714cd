use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::{Local, Utc};
use clap::Parser;
use tracing::info;

use crate::analytics::{clip_entries, csv::build_csv};

use super::{range::RangeArgs, Context};

#[derive(Debug, Parser)]
pub struct ExportCommand {
    #[command(flatten)]
    range: RangeArgs,
    #[arg(long, short, help = "Write to this file instead of stdout")]
    output: Option<PathBuf>,
    #[arg(
        long,
        help = "Cut sessions at the edges of the range instead of exporting them whole"
    )]
    clip: bool,
}

pub async fn process_export_command(
    context: &Context,
    ExportCommand {
        range,
        output,
        clip,
    }: ExportCommand,
) -> Result<()> {
    let repository = &context.repository;
    let now = context.clock.time();
    let range = range.resolve(now.with_timezone(&Local), 30)?;
    let (mut entries, names) = futures::try_join!(
        repository.entries(range.to_entry_range()),
        repository.activity_names()
    )?;
    if clip {
        entries = clip_entries(
            entries,
            range.start.with_timezone(&Utc),
            range.end.with_timezone(&Utc),
            now,
        );
    }
    let csv = build_csv(&entries, &names, now);

    match output {
        Some(path) => {
            tokio::fs::write(&path, csv)
                .await
                .with_context(|| format!("Couldn't write {}", path.display()))?;
            info!("Exported {} entries to {}", entries.len(), path.display());
            println!("Exported {} entries to {}", entries.len(), path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}
