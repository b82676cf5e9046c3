//! Tally CLI - command-line access to tally leaderboards

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "tally")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the database directory [default: ./data]
    #[arg(short, long, global = true)]
    db_path: Option<PathBuf>,

    /// JSON store configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    policy: PolicyArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Policy applied by the operation
#[derive(Args, Debug, Default)]
pub struct PolicyArgs {
    /// Clone from this leaderboard when the target does not exist
    #[arg(long, global = true)]
    pub construct_from: Option<String>,

    /// Keep at most this many members
    #[arg(long, global = true)]
    pub capacity: Option<i64>,

    /// Expire at this epoch-millisecond instant
    #[arg(long, global = true, conflicts_with = "idle_expire")]
    pub expire_at: Option<i64>,

    /// Expire after this many idle milliseconds
    #[arg(long, global = true)]
    pub idle_expire: Option<i64>,

    /// Send no options: initialize keys only, leave expiry untouched
    #[arg(long, global = true, conflicts_with_all = ["construct_from", "capacity", "expire_at", "idle_expire"])]
    pub no_options: bool,

    /// Raw JSON options object; an empty string sends no options
    #[arg(long, global = true, value_name = "JSON", conflicts_with_all = ["construct_from", "capacity", "expire_at", "idle_expire", "no_options"])]
    pub options: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply policy only
    Touch { key: String },

    /// Set a member's score
    SetScore {
        key: String,
        id: String,
        #[arg(allow_negative_numbers = true)]
        score: f64,
        /// Info payload stored with the member
        #[arg(long)]
        info: Option<String>,
    },

    /// Add to a member's score
    IncScore {
        key: String,
        id: String,
        #[arg(allow_negative_numbers = true)]
        delta: f64,
        #[arg(long)]
        info: Option<String>,
    },

    /// Set a member's info without ranking it
    SetInfo { key: String, id: String, info: String },

    /// List members between two ranks, highest score first
    GetRange {
        key: String,
        #[arg(allow_negative_numbers = true)]
        start: i64,
        #[arg(allow_negative_numbers = true)]
        stop: i64,
    },

    /// Show one member
    Get { key: String, id: String },

    /// Remove members
    Remove {
        key: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Append members ahead of existing ones
    Append {
        key: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Swap two members' scores by id
    SwapId { key: String, a: String, b: String },

    /// Swap the members at two ranks
    SwapRank {
        key: String,
        #[arg(allow_negative_numbers = true)]
        a: i64,
        #[arg(allow_negative_numbers = true)]
        b: i64,
    },

    /// Run a raw JSON command
    Exec { json: String },

    /// Database information, optionally for one leaderboard
    Status { key: Option<String> },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let db = commands::open_db(cli.db_path, cli.config)?;

    match cli.command {
        Commands::Status { key } => commands::status::execute(&db, key.as_deref())?,
        Commands::Exec { json } => commands::leaderboard::exec(&db, &json)?,
        command => commands::leaderboard::execute(&db, &cli.policy, command)?,
    }

    Ok(())
}
