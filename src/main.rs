//! # Quote Enrich CLI (`qenrich`)
//!
//! The `qenrich` binary enriches a local quote dataset with sentiment scores,
//! theme tags, and derived emotions, and lets you explore the result.
//!
//! ## Usage
//!
//! ```bash
//! qenrich --config ./config/qenrich.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qenrich enrich` | Annotate every quote through the completion API |
//! | `qenrich emotions` | Derive emotions for an already-analyzed dataset |
//! | `qenrich probe` | Annotate a few sample quotes without touching the dataset |
//! | `qenrich query` | Filter and page through the dataset |
//! | `qenrich stats` | Print sentiment and emotion statistics |
//! | `qenrich saved <action>` | Manage bookmarked quotes |
//!
//! ## Examples
//!
//! ```bash
//! # See how many groups a run would take
//! qenrich enrich --dry-run
//!
//! # Spot-check the first 5 quotes, writing nothing
//! qenrich enrich --limit 5
//!
//! # Full run
//! OPENAI_API_KEY=sk-... qenrich enrich
//!
//! # Hopeful quotes by Naruto, as JSON
//! qenrich query --emotion hopeful --character "Naruto Uzumaki" --json
//! ```

use clap::{Parser, Subcommand};
use quote_enrich::config;
use quote_enrich::explore::QueryFilter;
use quote_enrich::progress::ProgressMode;
use quote_enrich::saved::SavedAction;
use quote_enrich::{emotions_cmd, enrich_cmd, probe, query, saved, stats};
use std::path::PathBuf;

/// Quote Enrich CLI: offline sentiment, tag, and emotion enrichment for a
/// quote dataset.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/qenrich.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "qenrich",
    about = "Quote Enrich — sentiment, tag, and emotion enrichment for a quote dataset",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/qenrich.toml`.
    #[arg(long, global = true, default_value = "./config/qenrich.toml")]
    config: PathBuf,

    /// Progress output on stderr. Defaults to `human` on a terminal,
    /// otherwise `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Annotate every quote with sentiment, tags, and emotion.
    ///
    /// Requires `OPENAI_API_KEY`. Skips (exit 0) if the dataset is already
    /// analyzed. Writes the backup before overwriting the dataset.
    Enrich {
        /// Show quote, group, and pause counts without calling the API.
        #[arg(long)]
        dry_run: bool,

        /// Annotate only the first N quotes and print them; writes nothing.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Derive emotions for a dataset that already has sentiment and tags.
    ///
    /// No network calls. Fails if the dataset has not been analyzed yet.
    Emotions,

    /// Annotate sample quotes and print the analysis.
    ///
    /// Uses three built-in quotes unless `--quote` is given.
    Probe {
        #[arg(long)]
        quote: Option<String>,
        #[arg(long, requires = "quote")]
        character: Option<String>,
        #[arg(long, requires = "quote")]
        anime: Option<String>,
    },

    /// Filter and page through the dataset.
    Query {
        /// Case-insensitive substring of the quote text.
        text: Option<String>,

        /// Exact character name.
        #[arg(long)]
        character: Option<String>,

        /// Sentiment label: positive, negative, neutral, or mixed.
        #[arg(long)]
        sentiment: Option<String>,

        /// Emotion name (case-insensitive), e.g. `Hopeful`.
        #[arg(long)]
        emotion: Option<String>,

        #[arg(long)]
        min_score: Option<i64>,

        #[arg(long)]
        max_score: Option<i64>,

        /// Tag substring; repeat for any-of matching.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Page number (0-based).
        #[arg(long, default_value_t = 0)]
        page: usize,

        #[arg(long, default_value_t = quote_enrich::explore::DEFAULT_HITS_PER_PAGE)]
        per_page: usize,

        /// Print the page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print dataset statistics.
    Stats {
        #[arg(long)]
        json: bool,

        /// Also list every distinct tag.
        #[arg(long)]
        tags: bool,
    },

    /// Manage saved quotes.
    Saved {
        #[command(subcommand)]
        action: SavedCommand,
    },
}

/// Saved-quote subcommands.
#[derive(Subcommand)]
enum SavedCommand {
    /// List saved quotes.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Save a quote from the dataset by objectID.
    Add { object_id: String },
    /// Remove a saved quote by objectID.
    Remove { object_id: String },
    /// Save the quote if it is not saved, otherwise remove it.
    Toggle { object_id: String },
    /// Remove every saved quote.
    Clear,
}

impl From<SavedCommand> for SavedAction {
    fn from(cmd: SavedCommand) -> Self {
        match cmd {
            SavedCommand::List { json } => SavedAction::List { json },
            SavedCommand::Add { object_id } => SavedAction::Add(object_id),
            SavedCommand::Remove { object_id } => SavedAction::Remove(object_id),
            SavedCommand::Toggle { object_id } => SavedAction::Toggle(object_id),
            SavedCommand::Clear => SavedAction::Clear,
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quote_enrich=info,quote_enrich_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Enrich { dry_run, limit } => {
            enrich_cmd::run_enrich(&cfg, dry_run, limit, progress).await?;
        }
        Commands::Emotions => {
            emotions_cmd::run_emotions(&cfg, progress).await?;
        }
        Commands::Probe {
            quote,
            character,
            anime,
        } => {
            probe::run_probe(&cfg, quote, character, anime).await?;
        }
        Commands::Query {
            text,
            character,
            sentiment,
            emotion,
            min_score,
            max_score,
            tags,
            page,
            per_page,
            json,
        } => {
            let filter = QueryFilter {
                text,
                character,
                sentiment,
                emotion,
                min_score,
                max_score,
                tags,
            };
            query::run_query(&cfg, filter, page, per_page, json).await?;
        }
        Commands::Stats { json, tags } => {
            stats::run_stats(&cfg, json, tags).await?;
        }
        Commands::Saved { action } => {
            saved::run_saved(&cfg, action.into()).await?;
        }
    }

    Ok(())
}
