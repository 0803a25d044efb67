use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    AddOutcome, HttpProfileDirectory, MissingProfileDirectory, ProfileDirectory,
    SettingsController,
};
use shared::domain::{ProfileId, MINIMAL_FLAG};
use storage::Storage;
use tracing_subscriber::EnvFilter;
use url::Url;

mod config;
mod render;

#[derive(Parser, Debug)]
#[command(about = "Manage the watched-users list and display preferences")]
struct Cli {
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    directory_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the whole settings panel.
    Show,
    /// Look a username up and append it to the list.
    Add { username: String },
    /// Remove the entry at a list position.
    Remove { index: usize },
    /// Remove the first entry with the given profile id.
    RemoveId { id: String },
    /// Set a display flag.
    Set {
        flag: String,
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
    /// Shorthand for `set minimal <value>`.
    Minimal {
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
    /// Print every stored display flag.
    Prefs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = config::load_settings(&cli.config)?;
    if let Some(database_url) = cli.database_url {
        settings.database_url = config::normalize_database_url(&database_url);
    }
    if let Some(directory_url) = cli.directory_url {
        settings.directory_url = Some(directory_url);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let storage = Storage::new(&settings.database_url).await?;
    let directory: Arc<dyn ProfileDirectory> = match &settings.directory_url {
        Some(raw) => {
            let base_url =
                Url::parse(raw).with_context(|| format!("invalid directory url '{raw}'"))?;
            Arc::new(HttpProfileDirectory::new(base_url))
        }
        None => {
            tracing::warn!("no directory url configured; lookups will fail");
            Arc::new(MissingProfileDirectory)
        }
    };
    let controller = SettingsController::new(Arc::new(storage), directory);

    match cli.command {
        Command::Show => {}
        Command::Add { username } => {
            controller.set_query(username.as_str()).await;
            match controller.submit().await {
                Ok(AddOutcome::Added(profile)) => {
                    println!("added {} (id {})", profile.username, profile.id);
                }
                Ok(AddOutcome::Ignored) => println!("nothing to add"),
                Ok(AddOutcome::Dropped) => println!("a lookup is already running"),
                Err(err) => {
                    print!("{}", render::render_view(&controller.view().await?));
                    return Err(err).with_context(|| format!("failed to add '{username}'"));
                }
            }
        }
        Command::Remove { index } => {
            let removed = controller.delete_at(index).await?;
            println!("removed {}", removed.username);
        }
        Command::RemoveId { id } => {
            let removed = controller.delete_by_id(&ProfileId::new(id)).await?;
            println!("removed {}", removed.username);
        }
        Command::Set { flag, value } => {
            controller.set_preference(&flag, value).await?;
        }
        Command::Minimal { value } => {
            controller.set_preference(MINIMAL_FLAG, value).await?;
        }
        Command::Prefs => {
            for (flag, value) in controller.preferences().await?.flags() {
                println!("{flag} = {value}");
            }
            return Ok(());
        }
    }

    print!("{}", render::render_view(&controller.view().await?));
    Ok(())
}
