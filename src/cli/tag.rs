use anyhow::Result;
use clap::Subcommand;

use super::Context;

#[derive(Debug, Subcommand)]
pub enum TagCommand {
    #[command(about = "List tags")]
    List,
    #[command(about = "Create a tag")]
    Create { name: String },
    #[command(about = "Delete a tag. Entries keep the tag text")]
    Delete {
        #[arg(help = "Tag name or id")]
        tag: String,
    },
}

pub async fn process_tag_command(context: &Context, command: TagCommand) -> Result<()> {
    let repository = &context.repository;
    match command {
        TagCommand::List => {
            let mut tags = repository.tags().await?;
            tags.sort_by_key(|t| t.name.to_lowercase());
            for tag in tags {
                println!("{}\t{}", tag.id, tag.name);
            }
        }
        TagCommand::Create { name } => {
            let tag = repository.create_tag(&name).await?;
            println!("Created {}\t{}", tag.id, tag.name);
        }
        TagCommand::Delete { tag } => {
            let found = repository.resolve_tag(&tag).await?;
            repository.delete_tag(found.id).await?;
            println!("Deleted {}", found.name);
        }
    }
    Ok(())
}
