//! Taged CLI
//!
//! Command-line client for a taged notes server

mod config;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use config::CliConfig;
use std::path::PathBuf;
use std::sync::Arc;
use taged_client::{ClientError, LoginRedirect, TagedClient};
use taged_core::format::format_bytes;
use taged_core::thumbnails::origin_image_url;
use taged_core::{DetailNote, NoteSearchFilter};
use taged_storage::FileStore;
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "taged")]
#[command(about = "Taged - search and manage tagged notes", long_about = None)]
struct Cli {
    /// Path to a YAML or TOML config file
    #[arg(long, global = true, env = "TAGED_CONFIG")]
    config: Option<PathBuf>,

    /// Server base URL, overrides the config file
    #[arg(long, global = true, env = "TAGED_BASE_URL")]
    base_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "TAGED_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami {
        /// Reload the profile from the server
        #[arg(long)]
        refresh: bool,
    },
    /// Search notes
    Search {
        /// Free-text query
        query: Option<String>,

        /// Restrict to a tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Use vector search alongside text search
        #[arg(long)]
        vector: bool,

        /// Use vector search only
        #[arg(long)]
        vector_only: bool,

        /// Start from a saved search location, e.g. "?search=vlan&tags-in=net"
        #[arg(long, conflicts_with_all = ["query", "tags", "vector", "vector_only"])]
        location: Option<String>,

        #[arg(long, default_value = "1")]
        page: u32,

        /// Print the raw page as JSON
        #[arg(long)]
        json: bool,
    },
    /// Work with a single note
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },
    /// List available tags or complete a title
    Tags {
        /// Suggest titles for a partial term instead
        #[arg(long)]
        complete: Option<String>,
    },
    /// Manage drafts
    Drafts {
        #[command(subcommand)]
        action: DraftAction,
    },
}

#[derive(Subcommand)]
enum NoteAction {
    /// Print a note
    Show { id: String },
    /// List the files attached to a note
    Files { id: String },
    /// Create a temporary share link
    Link {
        id: String,

        #[arg(long, default_value = "60")]
        minutes: u32,
    },
    /// Delete a note
    Delete { id: String },
    /// Show what the current user may do with notes
    Permissions,
}

#[derive(Subcommand)]
enum DraftAction {
    List,
    Show { id: String },
    Delete { id: String },
}

/// Tells the user to log in again once the session is gone
struct LoginHint;

impl LoginRedirect for LoginHint {
    fn redirect_to_login(&self) {
        eprintln!("Session expired. Run `taged login` to sign in again.");
    }
}

fn init_tracing(config: &config::LoggingConfig, verbose: bool) -> Result<()> {
    let log_level = if verbose {
        Level::DEBUG
    } else {
        match config.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    };

    // RUST_LOG wins unless --verbose was given
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) if !verbose => filter,
        _ => EnvFilter::new(format!("{}", log_level)),
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn print_note_row(note: &DetailNote) {
    let score = if note.score > 0.0 {
        format!(" ({}%)", note.score_percents())
    } else {
        String::new()
    };
    println!(
        "{}  {}{}  [{}]",
        note.id,
        note.title,
        score,
        note.tags.join(", ")
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    config.merge_env();
    if let Some(base_url) = cli.base_url {
        config.client.base_url = base_url;
    }

    init_tracing(&config.logging, cli.verbose)?;

    let store_path = config.store_path();
    debug!("Using session store {}", store_path.display());
    let store = FileStore::open(&store_path)
        .await
        .with_context(|| format!("Failed to open session store {}", store_path.display()))?;

    let client = TagedClient::connect(&config.client, Arc::new(store), Arc::new(LoginHint))
        .await
        .context("Failed to create client")?;

    match run(cli.command, &client).await {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast_ref::<ClientError>() {
            Some(ClientError::AuthExpired { .. }) => std::process::exit(2),
            Some(client_error) => bail!("{}", client_error.verbose_message()),
            None => Err(e),
        },
    }
}

async fn run(command: Commands, client: &TagedClient) -> Result<()> {
    match command {
        Commands::Login { username, password } => {
            match client.auth().login(&username, &password).await? {
                Some(user) => println!("Logged in as {}", user.display_name()),
                None => println!("Logged in as {} (profile unavailable)", username),
            }
        }
        Commands::Logout => {
            client.auth().logout().await?;
            println!("Logged out");
        }
        Commands::Whoami { refresh } => {
            let user = if refresh {
                Some(client.auth().fetch_profile().await?)
            } else {
                client.auth().whoami().await
            };
            match user {
                Some(user) => {
                    println!("{} ({})", user.display_name(), user.username);
                    if user.is_superuser {
                        println!("superuser");
                    } else if user.is_staff {
                        println!("staff");
                    }
                }
                None if client.session().is_logged_in().await => {
                    println!("Logged in, profile not loaded (try --refresh)")
                }
                None => println!("Not logged in"),
            }
        }
        Commands::Search {
            query,
            tags,
            vector,
            vector_only,
            location,
            page,
            json,
        } => {
            let filter = match location {
                Some(location) => {
                    let query = location.trim_start_matches('/').trim_start_matches('?');
                    NoteSearchFilter::from_query(query)?
                }
                None => {
                    let mut filter = NoteSearchFilter::new(query.unwrap_or_default()).with_tags(tags);
                    filter.use_vectorizer = vector || vector_only;
                    filter.vectorizer_only = vector_only;
                    filter
                }
            };

            let found = client.notes().find_notes(&filter, page).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
                return Ok(());
            }

            for note in &found.notes {
                print_note_row(note);
            }
            println!(
                "-- {} notes, page {}/{}, location {}",
                found.total_records,
                found.paginator.current_page,
                found.paginator.max_pages,
                found.location
            );
        }
        Commands::Note { action } => match action {
            NoteAction::Show { id } => {
                let note = client.notes().get_note(&id).await?;
                println!("{}", note.title);
                println!("tags: {}", note.tags.join(", "));
                if !note.published_at.is_empty() {
                    println!("published: {}", note.published_at);
                }
                if !note.preview_image.is_empty() {
                    println!("preview: {}", origin_image_url(&note.preview_image));
                }
                println!();
                println!("{}", note.content);
                for file in &note.files {
                    println!("  {} ({})", file.name, format_bytes(file.size));
                }
            }
            NoteAction::Files { id } => {
                for file in client.notes().note_files(&id).await? {
                    println!(
                        "{}\t{}\t{}",
                        file.name,
                        format_bytes(file.size),
                        file.content_type
                    );
                }
            }
            NoteAction::Link { id, minutes } => {
                println!("{}", client.notes().temp_link(&id, minutes).await?);
            }
            NoteAction::Delete { id } => {
                client.notes().delete_note(&id).await?;
                println!("Deleted {}", id);
            }
            NoteAction::Permissions => {
                let perms = client.notes().permissions().await?;
                println!("create: {}", perms.can_create_notes());
                println!("update: {}", perms.can_update_notes());
                println!("delete: {}", perms.can_delete_notes());
            }
        },
        Commands::Tags { complete } => {
            let items = match complete {
                Some(term) => client.notes().autocomplete(&term).await?,
                None => client.notes().available_tags().await?,
            };
            for item in items {
                println!("{}", item);
            }
        }
        Commands::Drafts { action } => match action {
            DraftAction::List => {
                for draft in client.notes().list_drafts().await {
                    println!("{}  {}", draft.id, draft.title);
                }
            }
            DraftAction::Show { id } => match client.notes().get_draft(&id).await {
                Some(draft) => {
                    println!("{}", draft.title);
                    println!("tags: {}", draft.tags.join(", "));
                    println!();
                    println!("{}", draft.content);
                }
                None => bail!("Draft {} not found", id),
            },
            DraftAction::Delete { id } => {
                client.notes().delete_draft(&id).await?;
                println!("Deleted draft {}", id);
            }
        },
    }

    Ok(())
}
