//! Implementation of the `quantis init` command.
//!
//! Writes a default configuration file and initializes the SQLite database,
//! mirroring the two-step bootstrap every other subcommand assumes has
//! already happened.

use quantis_core::config::Config;
use quantis_core::storage;
use std::path::Path;

pub async fn execute(config_path: &str, force: bool) -> anyhow::Result<()> {
    let expanded = storage::expand_tilde(config_path);
    let path = Path::new(&expanded);

    if path.exists() && !force {
        anyhow::bail!("{} already exists. Re-run with --force to overwrite.", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let config = Config::default();
    let toml = toml::to_string_pretty(&config)?;
    std::fs::write(path, toml)?;

    let pool = storage::init_db(&config.storage.db_path).await?;
    pool.close().await;

    println!("Wrote configuration to {}", path.display());
    println!("Initialized database at {}", config.storage.db_path);
    println!("Set llm.api_key in the config (or QUANTIS_LLM__API_KEY) before running `quantis enrich`.");

    Ok(())
}
