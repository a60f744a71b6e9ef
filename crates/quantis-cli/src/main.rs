//! Quantis operator CLI.
//!
//! Entry point for the `quantis` binary. Parses CLI arguments, initializes
//! logging, and dispatches to subcommand handlers.
mod commands;

use clap::Parser;
use quantis_core::config::Config;
use tracing_subscriber::EnvFilter;

/// Quantis — adaptive session planner and enrichment pipeline operator CLI.
#[derive(Parser)]
#[command(name = "quantis")]
#[command(version)]
#[command(about = "Operator CLI for the Quantis adaptive session planning service")]
#[command(after_help = "\
Quick start:
  1. quantis init            — write a default config and initialize the database
  2. quantis ingest <file>   — load admin-authored questions from a JSON file
  3. quantis enrich          — classify, score, and activate pending questions
  4. quantis plan <student>  — preview the next adaptive pack for a student
  5. quantis stats <student> — show mastery and coverage for a student")]
struct Cli {
    /// Path to config.toml
    #[arg(short = 'c', long, global = true, default_value = "~/.quantis/config.toml")]
    config: String,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Write a default configuration file and initialize the database
    Init(commands::InitArgs),
    /// Load admin-authored questions from a JSON file
    Ingest(commands::IngestArgs),
    /// Classify, score, and activate questions pending enrichment
    Enrich(commands::EnrichArgs),
    /// Preview the next adaptive pack for a student
    Plan(commands::PlanArgs),
    /// Show mastery and coverage stats for a student
    Stats(commands::StatsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("quantis=debug,quantis_core=debug,info")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("quantis=info,quantis_core=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .compact()
        .init();

    tracing::debug!(config_path = %cli.config, "starting quantis cli");

    if let Commands::Init(args) = &cli.command {
        return commands::init::execute(&cli.config, args.force).await;
    }

    let config = Config::load(Some(&cli.config)).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration: {e}\n\
             Hint: Run 'quantis init' to create a default configuration file."
        )
    })?;

    match cli.command {
        Commands::Init(_) => unreachable!(),
        Commands::Ingest(args) => commands::ingest::execute(&config, &args.file).await,
        Commands::Enrich(args) => commands::enrich::execute(&config, args.limit).await,
        Commands::Plan(args) => commands::plan::execute(&config, &args.student_id).await,
        Commands::Stats(args) => commands::stats::execute(&config, &args.student_id).await,
    }
}
