//! # Reseed CLI (`reseed`)
//!
//! The `reseed` binary drives the snapshot/seed cycle for a collection-based
//! content store: schema initialization, snapshot extraction, full or partial
//! reseeding, and the HTTP trigger server.
//!
//! ## Usage
//!
//! ```bash
//! reseed --config ./config/reseed.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `reseed init` | Create the SQLite store and run schema migrations |
//! | `reseed collections` | List known collections, counts, and snapshot status |
//! | `reseed extract` | Dump all collections to JSON snapshot files |
//! | `reseed seed [COLLECTION]` | Reseed the store from snapshots |
//! | `reseed serve` | Start the authenticated HTTP seed endpoint |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the store
//! reseed init --config ./config/reseed.toml
//!
//! # Snapshot the current content
//! reseed extract --config ./config/reseed.toml
//!
//! # Full reseed, all collections in dependency order
//! reseed seed --config ./config/reseed.toml
//!
//! # Reseed a single collection against the persisted ID map
//! reseed seed chapters --config ./config/reseed.toml
//!
//! # Check what a seed pass would cover without touching the store
//! reseed seed --dry-run --config ./config/reseed.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use reseed::{collections, config, extract, migrate, seed, server};

/// Reseed — snapshot extraction and dependency-ordered reseeding for a
/// collection-based content store.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/reseed.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "reseed",
    about = "Reseed — snapshot extraction and dependency-ordered reseeding for a content store",
    version,
    long_about = "Reseed dumps the collections of a content store to on-disk JSON snapshots and \
    replays them back in dependency order, translating cross-collection ID references through a \
    persisted ID map so relations survive the round trip."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/reseed.toml`. Store, snapshot, seed, and server
    /// settings are read from this file.
    #[arg(long, global = true, default_value = "./config/reseed.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the store schema.
    ///
    /// Creates the SQLite database file and the documents table. This
    /// command is idempotent — running it multiple times is safe.
    Init,

    /// List known collections and their status.
    ///
    /// Shows each collection in seed order with its stored document count,
    /// whether a snapshot file exists, and what it depends on.
    Collections,

    /// Dump all collections to JSON snapshot files.
    ///
    /// Writes one pretty-printed file per collection (up to 1000 documents
    /// each, shallow) plus the media binaries. One-shot batch operation.
    Extract,

    /// Reseed the store from snapshots.
    ///
    /// Without a collection, processes everything in dependency order and
    /// resets the ID map. With a collection, reseeds just that one against
    /// the persisted map (seeding media alone also resets it). Per-document
    /// failures are logged and skipped, never fatal.
    Seed {
        /// Collection to reseed (e.g. `media`, `chapters`). Omit for all.
        collection: Option<String>,

        /// Show snapshot document counts without writing to the store.
        #[arg(long)]
        dry_run: bool,
    },

    /// Start the HTTP trigger server.
    ///
    /// Binds to `[server].bind` and serves `POST /seed` (bearer-token
    /// authenticated) and `GET /health`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Store initialized successfully.");
        }
        Commands::Collections => {
            collections::list_collections(&cfg).await?;
        }
        Commands::Extract => {
            extract::run_extract(&cfg).await?;
        }
        Commands::Seed {
            collection,
            dry_run,
        } => {
            seed::run_seed(&cfg, collection.as_deref(), dry_run).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
