use anyhow::Result;
use clap::Subcommand;

use super::{output::activity_line, Context};

#[derive(Debug, Subcommand)]
pub enum ActivityCommand {
    #[command(about = "List activities")]
    List {
        #[arg(long, short, help = "Include archived activities")]
        all: bool,
    },
    #[command(about = "Create an activity")]
    Create { name: String },
    #[command(about = "Rename an activity")]
    Rename {
        #[arg(help = "Activity name or id")]
        activity: String,
        #[arg(help = "New name")]
        name: String,
    },
    #[command(about = "Hide an activity from the default list and from `start`")]
    Archive {
        #[arg(help = "Activity name or id")]
        activity: String,
    },
    #[command(about = "Bring an archived activity back")]
    Unarchive {
        #[arg(help = "Activity name or id")]
        activity: String,
    },
    #[command(about = "Delete an activity together with its time entries")]
    Delete {
        #[arg(help = "Activity name or id")]
        activity: String,
    },
}

pub async fn process_activity_command(context: &Context, command: ActivityCommand) -> Result<()> {
    let repository = &context.repository;
    match command {
        ActivityCommand::List { all } => {
            let activities = repository.activities(all).await?;
            if activities.is_empty() {
                println!("No activities yet. Create one with `timeflow activity create <name>`");
            }
            for activity in activities {
                println!("{}", activity_line(&activity));
            }
        }
        ActivityCommand::Create { name } => {
            let activity = repository.create_activity(&name).await?;
            println!("Created {}", activity_line(&activity));
        }
        ActivityCommand::Rename { activity, name } => {
            let activity = repository.resolve_activity(&activity).await?;
            let renamed = repository.rename_activity(activity.id, &name).await?;
            println!("Renamed {} to {}", activity.name, renamed.name);
        }
        ActivityCommand::Archive { activity } => {
            let activity = repository.resolve_activity(&activity).await?;
            if activity.is_archived() {
                println!("{} is already archived", activity.name);
            } else {
                repository.set_archived(activity.id, true).await?;
                println!("Archived {}", activity.name);
            }
        }
        ActivityCommand::Unarchive { activity } => {
            let activity = repository.resolve_activity(&activity).await?;
            if activity.is_archived() {
                repository.set_archived(activity.id, false).await?;
                println!("Unarchived {}", activity.name);
            } else {
                println!("{} isn't archived", activity.name);
            }
        }
        ActivityCommand::Delete { activity } => {
            let activity = repository.resolve_activity(&activity).await?;
            repository.delete_activity(activity.id).await?;
            println!("Deleted {}", activity.name);
        }
    }
    Ok(())
}
