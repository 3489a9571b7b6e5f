//! Quette CLI
//!
//! Command-line interface for Quette - media ratings in pizza slices.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use quette_core::{Config, ImportMode, MediaType, Store};

mod commands;
mod logging;
mod output;
mod prompt;

use commands::rating::RatingFields;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "quette")]
#[command(about = "Quette - rate films, series, games and books in pizza slices")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage ratings
    Rating {
        #[command(subcommand)]
        command: RatingCommands,
    },
    /// Manage collections
    Collection {
        #[command(subcommand)]
        command: CollectionCommands,
    },
    /// Write a backup file
    Export {
        /// Directory to write the backup into (default: current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Restore data from a backup file
    Import {
        /// Backup file to read
        file: PathBuf,
        /// merge (keep existing data) or replace (discard it)
        #[arg(short, long)]
        mode: Option<ImportMode>,
        /// Don't ask for confirmation before replacing
        #[arg(short, long)]
        yes: bool,
    },
    /// List standard and custom ingredients
    Ingredients,
    /// Show storage status and counts
    Status,
    /// Follow changes made by other processes until Ctrl-C
    Watch {
        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval: u64,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(clap::Args)]
struct FieldArgs {
    /// Title of the film, series, game or book
    #[arg(short = 'T', long)]
    title: Option<String>,
    /// Media type (film, series, game, book)
    #[arg(short = 't', long = "type")]
    media_type: Option<MediaType>,
    /// Score from 0 to 10
    #[arg(short, long)]
    slices: Option<u8>,
    /// Pizza flavor that sums it up
    #[arg(short, long)]
    flavor: Option<String>,
    /// Ingredient (repeatable)
    #[arg(short, long = "ingredient")]
    ingredients: Vec<String>,
}

impl From<FieldArgs> for RatingFields {
    fn from(args: FieldArgs) -> Self {
        Self {
            title: args.title,
            media_type: args.media_type,
            slices: args.slices,
            flavor: args.flavor,
            ingredients: args.ingredients,
        }
    }
}

#[derive(Subcommand)]
enum RatingCommands {
    /// Rate something new
    #[command(alias = "create")]
    Add {
        #[command(flatten)]
        fields: FieldArgs,
        /// Add to this collection (id or prefix, repeatable)
        #[arg(short, long = "collection")]
        collections: Vec<String>,
    },
    /// List ratings
    #[command(alias = "ls")]
    List {
        /// Only this media type
        #[arg(short = 't', long = "type")]
        media_type: Option<MediaType>,
        /// Title contains (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,
        /// newest, oldest, highest, lowest, az or za
        #[arg(long, default_value = "newest")]
        sort: String,
    },
    /// Show the most recent ratings
    Recent {
        /// How many to show (default from config)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show rating details
    Show {
        /// Rating ID (full id or prefix)
        id: String,
    },
    /// Change a rating
    Edit {
        /// Rating ID (full id or prefix)
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
        /// Add an ingredient (repeatable)
        #[arg(long)]
        add_ingredient: Vec<String>,
        /// Remove an ingredient (repeatable)
        #[arg(long)]
        remove_ingredient: Vec<String>,
    },
    /// Delete a rating
    #[command(alias = "rm")]
    Delete {
        /// Rating ID (full id or prefix)
        id: String,
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum CollectionCommands {
    /// Create an empty collection
    #[command(alias = "add")]
    Create {
        /// Collection name
        name: String,
    },
    /// List collections
    #[command(alias = "ls")]
    List,
    /// Show a collection and its ratings
    Show {
        /// Collection ID (full id or prefix)
        id: String,
    },
    /// Rename a collection
    Rename {
        /// Collection ID (full id or prefix)
        id: String,
        /// New name
        name: String,
    },
    /// Delete a collection (ratings are kept)
    #[command(alias = "rm")]
    Delete {
        /// Collection ID (full id or prefix)
        id: String,
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Add a rating to a collection, or remove it if already there
    Toggle {
        /// Collection ID (full id or prefix)
        collection: String,
        /// Rating ID (full id or prefix)
        rating: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, log_file, import_mode, recent_limit)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    logging::init(&config);

    let mut store = Store::open_with_config(&config).context("Failed to open data directory")?;
    if !store.is_watching() {
        tracing::warn!("Changes from other processes will not be picked up");
    }

    match cli.command {
        Commands::Rating { command } => {
            handle_rating_command(command, &mut store, &config, &output)
        }
        Commands::Collection { command } => {
            handle_collection_command(command, &mut store, &output)
        }
        Commands::Export { dir } => commands::data::export(&store, dir, &output),
        Commands::Import { file, mode, yes } => {
            let mode = mode.unwrap_or(config.import_mode);
            commands::data::import(&mut store, file, mode, yes, &output).await
        }
        Commands::Ingredients => commands::ingredients::list(&store, &output),
        Commands::Status => commands::status::show(&store, &config, &output),
        Commands::Watch { interval } => commands::watch::run(&mut store, interval, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_rating_command(
    command: RatingCommands,
    store: &mut Store,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        RatingCommands::Add {
            fields,
            collections,
        } => commands::rating::add(store, fields.into(), collections, output),
        RatingCommands::List {
            media_type,
            search,
            sort,
        } => commands::rating::list(store, media_type, search, &sort, output),
        RatingCommands::Recent { limit } => {
            commands::rating::recent(store, limit.unwrap_or(config.recent_limit), output)
        }
        RatingCommands::Show { id } => commands::rating::show(store, id, output),
        RatingCommands::Edit {
            id,
            fields,
            add_ingredient,
            remove_ingredient,
        } => commands::rating::edit(
            store,
            id,
            fields.into(),
            add_ingredient,
            remove_ingredient,
            output,
        ),
        RatingCommands::Delete { id, yes } => commands::rating::delete(store, id, yes, output),
    }
}

fn handle_collection_command(
    command: CollectionCommands,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        CollectionCommands::Create { name } => commands::collection::create(store, name, output),
        CollectionCommands::List => commands::collection::list(store, output),
        CollectionCommands::Show { id } => commands::collection::show(store, id, output),
        CollectionCommands::Rename { id, name } => {
            commands::collection::rename(store, id, name, output)
        }
        CollectionCommands::Delete { id, yes } => {
            commands::collection::delete(store, id, yes, output)
        }
        CollectionCommands::Toggle { collection, rating } => {
            commands::collection::toggle(store, collection, rating, output)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}
