use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use contextvault::cli;
use contextvault::config::VaultConfig;
use contextvault::vault::types::{Category, EntrySource};

#[derive(Parser)]
#[command(
    name = "contextvault",
    version,
    about = "Personal context memory proxy for Ollama"
)]
struct Cli {
    /// Config file (default: ~/.contextvault/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the proxy in front of the Ollama backend
    Serve,
    /// Store a fact
    Add {
        content: String,
        /// Category (classified from the text when omitted)
        #[arg(long)]
        category: Option<Category>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Confidence in [0, 1] (default 1.0)
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// List entries, newest first
    List {
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        source: Option<EntrySource>,
        #[arg(long)]
        tag: Option<String>,
        /// Include superseded entries (marked with ~)
        #[arg(long)]
        all: bool,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Show one entry with its relationships
    Show { id: String },
    /// Similarity search over active entries
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Mark a learned entry as correct
    Confirm { id: String },
    /// Set which categories a model may receive (`*` for every model)
    Permit {
        model: String,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        none: bool,
        #[arg(long, value_delimiter = ',')]
        categories: Vec<Category>,
    },
    /// List model permissions
    Permissions,
    /// Vault statistics
    Stats,
    /// Write every entry, relationship and permission as JSON
    Export {
        /// Output file (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Restore entries from an export file, skipping ids that already exist
    Import { file: PathBuf },
    /// Database and model diagnostics
    Doctor,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model for the dense backend
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => VaultConfig::load_from(path)?,
        None => VaultConfig::load()?,
    };

    // Logs go to stderr so command output stays clean.
    let filter =
        EnvFilter::try_new(&config.server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => contextvault::proxy::serve(config).await?,
        Command::Add {
            content,
            category,
            tags,
            confidence,
        } => cli::entries::add(&config, &content, category, tags, confidence)?,
        Command::List {
            category,
            source,
            tag,
            all,
            limit,
        } => cli::entries::list(&config, category, source, tag, all, limit)?,
        Command::Show { id } => cli::entries::show(&config, &id)?,
        Command::Search { query, limit } => cli::search::search(&config, &query, limit)?,
        Command::Confirm { id } => cli::entries::confirm(&config, &id)?,
        Command::Permit {
            model,
            all,
            none,
            categories,
        } => {
            let scope = cli::permissions::scope_from_flags(all, none, categories)?;
            cli::permissions::permit(&config, &model, scope)?;
        }
        Command::Permissions => cli::permissions::permissions(&config)?,
        Command::Stats => cli::stats::stats(&config)?,
        Command::Export { output } => cli::export::export(&config, output.as_deref())?,
        Command::Import { file } => cli::import::import(&config, &file)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.similarity).await?,
        },
    }

    Ok(())
}
