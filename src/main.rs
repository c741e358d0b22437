//! # Claim Advisor CLI (`cadv`)
//!
//! ## Usage
//!
//! ```bash
//! cadv --config ./config/cadv.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cadv init` | Create the SQLite database and run schema migrations |
//! | `cadv extract <file>` | Print the text extracted from one file |
//! | `cadv analyze` | Index documents and print the top five claim risks |
//! | `cadv chat` | Analyze, then discuss a risk interactively |
//! | `cadv search "<query>"` | Nearest chunks in the indexed collection |
//!
//! ## Examples
//!
//! ```bash
//! # Documents laid out as ./docs/contract/*.pdf, ./docs/daily/*.xlsx, ...
//! cadv analyze --input ./docs
//!
//! # Individual files
//! cadv chat --file contract=./gcc.pdf --file email=./notice.txt
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use claim_advisor::{config, console, extract, migrate, retrieve};

/// Claim Advisor CLI: claim-risk analysis and persona chat over
/// construction project documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cadv.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cadv",
    about = "Claim Advisor: construction-claim risk analysis over project documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cadv.toml`. A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/cadv.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Document sources shared by `analyze` and `chat`.
#[derive(clap::Args)]
struct InputArgs {
    /// Directory with one subdirectory per category
    /// (contract, official, meeting, email, daily, etc).
    #[arg(long)]
    input: Option<PathBuf>,

    /// A single file as `CATEGORY=PATH`. Repeatable.
    #[arg(long = "file", value_name = "CATEGORY=PATH")]
    files: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// This command is idempotent; running it multiple times is safe.
    Init,

    /// Print the text extracted from a file.
    Extract {
        /// File to extract (pdf, docx, doc, xlsx, xls, txt).
        path: PathBuf,
    },

    /// Extract and index documents, then print the top five claim risks.
    ///
    /// Replaces the indexed collection with the given documents.
    Analyze {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Analyze documents, then chat about a selected risk.
    Chat {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Search the indexed collection.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("claim_advisor=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Extract { path } = &cli.command {
        return extract::run_extract(path);
    }

    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Extract { .. } => {}
        Commands::Analyze { input } => {
            console::run_analyze(&cfg, input.input.as_deref(), &input.files).await?;
        }
        Commands::Chat { input } => {
            console::run_chat(&cfg, input.input.as_deref(), &input.files).await?;
        }
        Commands::Search { query, top_k } => {
            retrieve::run_search(&cfg, &query, top_k).await?;
        }
    }

    Ok(())
}
