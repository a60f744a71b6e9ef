//! CLI subcommand argument definitions and implementations for Quantis.
//!
//! Each subcommand struct defines its flags and arguments matching the
//! CLI interface contract.
pub mod enrich;
pub mod init;
pub mod ingest;
pub mod plan;
pub mod stats;

use clap::Args;

/// Arguments for the `init` subcommand.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `ingest` subcommand.
#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Path to a JSON file containing an array of admin-authored questions.
    pub file: String,
}

/// Arguments for the `enrich` subcommand.
#[derive(Debug, Args)]
pub struct EnrichArgs {
    /// Maximum number of pending questions to enrich in this run.
    #[arg(long, default_value = "50")]
    pub limit: usize,
}

/// Arguments for the `plan` subcommand.
#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Student to preview a pack for.
    pub student_id: String,
}

/// Arguments for the `stats` subcommand.
#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Student to show mastery and coverage stats for.
    pub student_id: String,
}
