use anyhow::{bail, Result};
use chrono::{Local, Utc};
use clap::Subcommand;
use uuid::Uuid;

use crate::api::entities::{EntryPatch, NewTimeEntry};

use super::{
    output::entry_line,
    range::{parse_instant, DateStyle, RangeArgs},
    Context,
};

/// Session annotations accepted by `stop`, `entry add` and `entry annotate`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct AnnotationArgs {
    #[arg(long, short, help = "How the session went, 1 to 5")]
    pub rating: Option<u8>,
    #[arg(long, short, help = "Free text note. An empty string clears it")]
    pub comment: Option<String>,
    #[arg(long = "tag", short, help = "Tag the session. Repeat for several tags")]
    pub tags: Vec<String>,
    #[arg(long, conflicts_with = "tags", help = "Remove every tag from the session")]
    pub clear_tags: bool,
    #[arg(long, short, help = "How many times you got distracted")]
    pub distractions: Option<u32>,
}

impl AnnotationArgs {
    pub fn to_patch(&self) -> EntryPatch {
        let tags = if self.clear_tags {
            Some(vec![])
        } else if self.tags.is_empty() {
            None
        } else {
            Some(self.tags.clone())
        };
        EntryPatch {
            rating: self.rating,
            comment: self.comment.clone(),
            tags,
            distractions: self.distractions,
            ..Default::default()
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum EntryCommand {
    #[command(about = "List time entries in a date range, the last 7 days by default")]
    List {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, short, help = "Only entries of this activity (name or id)")]
        activity: Option<String>,
    },
    #[command(about = "Add a finished session after the fact")]
    Add {
        #[arg(help = "Activity name or id")]
        activity: String,
        #[arg(long, short, help = "When the session started, e.g. \"9:30\" or \"yesterday 14:00\"")]
        start: String,
        #[arg(long, short = 'e', help = "When the session ended. Defaults to now")]
        stop: Option<String>,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing")]
        date_style: DateStyle,
        #[command(flatten)]
        annotation: AnnotationArgs,
    },
    #[command(about = "Rate, comment, tag or count distractions of a session")]
    Annotate {
        id: Uuid,
        #[command(flatten)]
        annotation: AnnotationArgs,
    },
    #[command(about = "Delete a time entry")]
    Delete { id: Uuid },
}

pub async fn process_entry_command(context: &Context, command: EntryCommand) -> Result<()> {
    let repository = &context.repository;
    let now = context.clock.time();
    match command {
        EntryCommand::List { range, activity } => {
            let mut range = range
                .resolve(now.with_timezone(&Local), 7)?
                .to_entry_range();
            if let Some(activity) = activity {
                range.activity_id = Some(repository.resolve_activity(&activity).await?.id);
            }
            let (entries, names) =
                futures::try_join!(repository.entries(range), repository.activity_names())?;
            if entries.is_empty() {
                println!("No entries in this range");
            }
            for entry in entries {
                println!("{}", entry_line(&entry, &names, now, &Local));
            }
        }
        EntryCommand::Add {
            activity,
            start,
            stop,
            date_style,
            annotation,
        } => {
            let activity = repository.resolve_activity(&activity).await?;
            let local_now = now.with_timezone(&Local);
            let start = parse_instant(&start, local_now, date_style, "start")?;
            let stop = match stop {
                Some(stop) => parse_instant(&stop, local_now, date_style, "stop")?,
                None => local_now,
            };
            let patch = annotation.to_patch();
            let created = repository
                .create_entry(NewTimeEntry {
                    activity_id: activity.id,
                    start: start.with_timezone(&Utc),
                    stop: stop.with_timezone(&Utc),
                    rating: patch.rating,
                    comment: patch.comment,
                    tags: patch.tags.unwrap_or_default(),
                    distractions: patch.distractions,
                })
                .await?;
            let names = repository.activity_names().await?;
            println!("Added {}", entry_line(&created, &names, now, &Local));
        }
        EntryCommand::Annotate { id, annotation } => {
            let patch = annotation.to_patch();
            if patch.is_empty() {
                bail!("Pass at least one of --rating, --comment, --tag, --clear-tags or --distractions");
            }
            let updated = repository.annotate_entry(id, patch).await?;
            let names = repository.activity_names().await?;
            println!("Updated {}", entry_line(&updated, &names, now, &Local));
        }
        EntryCommand::Delete { id } => {
            repository.delete_entry(id).await?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}
