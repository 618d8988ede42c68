//! # Admissions Harness CLI (`admitd`)
//!
//! The `admitd` binary is the operational interface for Admissions Harness.
//! It provides commands for database initialization and seeding, knowledge
//! base management, indexing, retrieval debugging, assistant sync, and
//! running the voice-platform webhook server.
//!
//! ## Usage
//!
//! ```bash
//! admitd --config ./config/admitd.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `admitd init` | Create the SQLite database and run schema migrations |
//! | `admitd seed` | Insert default college/agent/template rows when absent |
//! | `admitd kb add` | Add a knowledge document from a file or inline text |
//! | `admitd kb list` | List knowledge documents with chunk counts |
//! | `admitd index <id\|all>` | Chunk + embed documents into the vector store |
//! | `admitd retrieve` | Debug: print the chunks retrieval would surface |
//! | `admitd sync-assistant` | Push the assembled prompt to the voice platform |
//! | `admitd serve` | Start the webhook HTTP server |
//!
//! ## Environment
//!
//! Credentials come from the environment, never the config file:
//! `OPENAI_API_KEY` (embeddings), `VAPI_PRIVATE_KEY` / `VAPI_ASSISTANT_ID`
//! (assistant sync), `TWILIO_ACCOUNT_SID` / `TWILIO_AUTH_TOKEN` /
//! `TWILIO_PHONE_NUMBER` (SMS), `SENDGRID_API_KEY` / `SENDGRID_FROM` (email).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use admissions_harness::{assistant, config, embedding, index, kb, migrate, notices, retrieve, seed, webhook};

/// Admissions Harness CLI — a voice-AI admissions enquiry backend for colleges.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/admitd.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "admitd",
    about = "Admissions Harness — a voice-AI admissions enquiry backend for colleges",
    version,
    long_about = "Admissions Harness pairs a SQLite-backed knowledge base (chunked and embedded \
    for retrieval) with a webhook server for a third-party voice platform: dynamic prompt \
    assembly per call, call logging, lead extraction, and post-call notifications."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/admitd.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables. This
    /// command is idempotent — running it multiple times is safe.
    Init,

    /// Insert default college info, agent config, and message templates.
    ///
    /// Rows that already exist are preserved, so re-seeding never clobbers
    /// admin edits.
    Seed,

    /// Manage knowledge documents.
    Kb {
        #[command(subcommand)]
        action: KbAction,
    },

    /// Chunk and embed documents into the vector store.
    ///
    /// Pass a document id, or `all` to reindex every document. Requires an
    /// embedding provider; partial embedding failures are reported, not fatal.
    Index {
        /// Document id, or `all`.
        target: String,
    },

    /// Print the chunks retrieval would surface for the probe topics.
    ///
    /// Useful for checking what knowledge the assistant prompt will carry
    /// before a call comes in.
    Retrieve {
        /// Maximum number of chunks to return.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Push the assembled system prompt to the hosted voice assistant.
    ///
    /// Requires VAPI_PRIVATE_KEY and VAPI_ASSISTANT_ID in the environment.
    SyncAssistant,

    /// Start the voice-platform webhook server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// webhook and health endpoints.
    Serve,
}

/// Knowledge-base subcommands.
#[derive(Subcommand)]
enum KbAction {
    /// Add a knowledge document.
    Add {
        /// Document title shown in listings and the dashboard.
        #[arg(long)]
        title: String,

        /// Read document content from this file.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Document content passed inline.
        #[arg(long)]
        content: Option<String>,
    },
    /// List knowledge documents with chunk counts.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Seed => {
            seed::run_seed(&cfg).await?;
        }
        Commands::Kb { action } => match action {
            KbAction::Add {
                title,
                file,
                content,
            } => {
                kb::run_kb_add(&cfg, &title, file, content).await?;
            }
            KbAction::List => {
                kb::run_kb_list(&cfg).await?;
            }
        },
        Commands::Index { target } => {
            let embedder = embedding::EmbeddingClient::new(&cfg.embedding);
            index::run_index(&cfg, &embedder, &target).await?;
        }
        Commands::Retrieve { top_k } => {
            let embedder = embedding::EmbeddingClient::new(&cfg.embedding);
            retrieve::run_retrieve(&cfg, &embedder, top_k).await?;
        }
        Commands::SyncAssistant => {
            let embedder = embedding::EmbeddingClient::new(&cfg.embedding);
            let fetcher =
                notices::NoticeFetcher::new(Duration::from_secs(cfg.enrichment.notices_cache_secs));
            assistant::run_sync_assistant(&cfg, &embedder, &fetcher).await?;
        }
        Commands::Serve => {
            webhook::run_server(&cfg).await?;
        }
    }

    Ok(())
}
