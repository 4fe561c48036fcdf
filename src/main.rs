//! # Slow Morocco CLI (`slowmo`)
//!
//! ## Usage
//!
//! ```bash
//! slowmo --config ./config/site.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `slowmo init` | Create the catalog database and run schema migrations |
//! | `slowmo serve` | Start the JSON API server |
//! | `slowmo rows <collection>` | Dump a collection's rows (normalized headers) as JSON |
//! | `slowmo related --destinations ..` | Rank related stories against live content |
//! | `slowmo import-catalog <file>` | Upsert journeys and routes from a JSON export |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use slow_morocco::{config, inspect, migrate, server};

/// Slow Morocco content service.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/site.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "slowmo",
    about = "Slow Morocco content service: spreadsheet-backed JSON API for the travel site",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/site.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the catalog schema. Safe to run repeatedly.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Print the rows of one collection (sheet tab) as JSON.
    Rows {
        /// Collection name, e.g. `Stories` or `Website_Journeys`.
        collection: String,

        /// Print at most this many rows.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show stories related to a set of destinations.
    Related {
        /// Comma-separated destinations, e.g. `Fes,Merzouga`.
        #[arg(long)]
        destinations: String,

        /// Journey focus, matched against story tags and category.
        #[arg(long, default_value = "")]
        focus: String,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Load journeys and routes from a JSON export into the catalog.
    ImportCatalog {
        /// File shaped like `{"journeys": [...], "routes": [...]}`.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| cfg.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Catalog initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Rows { collection, limit } => {
            inspect::run_rows(&cfg, &collection, limit).await?;
        }
        Commands::Related {
            destinations,
            focus,
            limit,
        } => {
            inspect::run_related(&cfg, &destinations, &focus, limit).await?;
        }
        Commands::ImportCatalog { path } => {
            inspect::run_import(&cfg, &path).await?;
        }
    }

    Ok(())
}
