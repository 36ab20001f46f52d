//! AetherLore CLI
//!
//! Command-line interface for AetherLore - lorebook editing and
//! AI-assisted writing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use aetherlore_core::{Config, EntryType, StorageError, Store};

mod commands;
mod editor;
mod logging;
mod output;

use commands::entry::EditArgs;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "aetherlore")]
#[command(about = "AetherLore - World-building lorebook with AI-assisted writing")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to config file (overrides AETHERLORE_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show, rename, export or import the lorebook
    Book {
        #[command(subcommand)]
        command: Option<BookCommands>,
    },
    /// Manage entries
    Entry {
        #[command(subcommand)]
        command: EntryCommands,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        command: Option<CategoryCommands>,
    },
    /// Generate text for an entry with the configured AI provider
    Generate {
        /// Entry ID (full ID or prefix)
        id: String,
        /// What to write
        prompt: String,
        /// Ignore the existing body and replace it
        #[arg(long)]
        fresh: bool,
    },
    /// Show or change application settings
    Settings {
        #[command(subcommand)]
        command: Option<SettingsCommands>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show status (storage, counts, provider)
    Status,
}

#[derive(Subcommand)]
enum BookCommands {
    /// Show the book name and counts
    Show,
    /// Rename the book
    Rename {
        /// New name
        name: String,
    },
    /// Export the book to a JSON file
    Export {
        /// Directory to write into (defaults to the current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Replace the book with an exported JSON file
    Import {
        /// File to import
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum EntryCommands {
    /// Create a new entry
    #[command(alias = "create")]
    Add {
        /// Entry title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Entry type (character, location, item, journal)
        #[arg(short = 't', long = "type")]
        entry_type: Option<EntryType>,
        /// Category name
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List entries grouped by category
    #[command(alias = "ls")]
    List {
        /// Filter by title or key
        #[arg(short, long)]
        search: Option<String>,
        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show entry details
    Show {
        /// Entry ID (full ID or prefix)
        id: String,
    },
    /// Edit an entry
    Edit {
        /// Entry ID (full ID or prefix)
        id: String,
        #[command(flatten)]
        args: EditArgs,
    },
    /// Delete an entry
    #[command(alias = "rm")]
    Delete {
        /// Entry ID (full ID or prefix)
        id: String,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// List categories
    #[command(alias = "ls")]
    List,
    /// Add a category
    Add {
        name: String,
    },
    /// Delete a category (its entries become Uncategorized)
    #[command(alias = "rm")]
    Delete {
        name: String,
    },
    /// Rename a category
    Rename {
        old_name: String,
        new_name: String,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current settings
    Show,
    /// Set a settings value
    Set {
        /// Settings key (theme, provider, gemini_model, local_base_url,
        /// local_model, novelai_api_key, temperature, max_tokens)
        key: String,
        /// Settings value
        value: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, gemini_api_key, log_file, debounce_ms)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        if let Some(hint) = recovery_hint(&err) {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(1);
    }
}

/// Suggestion attached to the first storage error in the chain
fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<StorageError>())
        .and_then(StorageError::recovery_suggestion)
}

async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands work without opening the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    logging::init(&config);

    let mut store = Store::open_with_config(config)?;
    for recovered in store.recovered_records() {
        output.warn(&recovered.to_string());
        if let Some(hint) = recovered.recovery_suggestion() {
            output.warn(hint);
        }
    }

    match cli.command {
        Commands::Book { command } => handle_book_command(command, &mut store, &output),
        Commands::Entry { command } => handle_entry_command(command, &mut store, &output),
        Commands::Category { command } => handle_category_command(command, &mut store, &output),
        Commands::Generate { id, prompt, fresh } => {
            commands::generate::run(&mut store, id, prompt, fresh, &output).await
        }
        Commands::Settings { command } => handle_settings_command(command, &mut store, &output),
        Commands::Config { .. } => Ok(()), // Handled above
        Commands::Status => commands::status::show(&store, &output),
    }
}

fn handle_book_command(
    command: Option<BookCommands>,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        Some(BookCommands::Show) | None => commands::book::show(store, output),
        Some(BookCommands::Rename { name }) => commands::book::rename(store, name, output),
        Some(BookCommands::Export { dir }) => commands::book::export(store, dir, output),
        Some(BookCommands::Import { file }) => commands::book::import(store, file, output),
    }
}

fn handle_entry_command(command: EntryCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        EntryCommands::Add {
            title,
            entry_type,
            category,
        } => commands::entry::add(store, title, entry_type, category, output),
        EntryCommands::List { search, category } => {
            commands::entry::list(store, search, category, output)
        }
        EntryCommands::Show { id } => commands::entry::show(store, id, output),
        EntryCommands::Edit { id, args } => commands::entry::edit(store, id, args, output),
        EntryCommands::Delete { id } => commands::entry::delete(store, id, output),
    }
}

fn handle_category_command(
    command: Option<CategoryCommands>,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        Some(CategoryCommands::List) | None => commands::category::list(store, output),
        Some(CategoryCommands::Add { name }) => commands::category::add(store, name, output),
        Some(CategoryCommands::Delete { name }) => {
            commands::category::delete(store, name, output)
        }
        Some(CategoryCommands::Rename { old_name, new_name }) => {
            commands::category::rename(store, old_name, new_name, output)
        }
    }
}

fn handle_settings_command(
    command: Option<SettingsCommands>,
    store: &mut Store,
    output: &Output,
) -> Result<()> {
    match command {
        Some(SettingsCommands::Show) | None => commands::settings::show(store, output),
        Some(SettingsCommands::Set { key, value }) => {
            commands::settings::set(store, key, value, output)
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
