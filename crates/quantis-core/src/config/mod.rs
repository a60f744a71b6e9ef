//! Configuration management for Quantis.
//!
//! Supports three-layer configuration loading:
//! 1. Built-in defaults
//! 2. TOML config file (`~/.quantis/config.toml`)
//! 3. Environment variable overrides (`QUANTIS_` prefix)
//!
//! CLI flag overrides are applied by the binary crates after loading.

mod defaults;
mod env_overrides;
mod validation;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use defaults::*;

/// Top-level configuration for the Quantis planning and enrichment service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// LLM provider and model selection.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Mastery tracker (EWMA + time decay) parameters.
    #[serde(default)]
    pub mastery: MasteryConfig,

    /// Candidate pool sizing and ladder-expansion parameters.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Diversity cap and cooldown parameters for the planner.
    #[serde(default)]
    pub diversity: DiversityConfig,

    /// Phase cutoffs (served-or-completed session counts).
    #[serde(default)]
    pub phases: PhaseConfig,

    /// Data storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            mastery: MasteryConfig::default(),
            pool: PoolConfig::default(),
            diversity: DiversityConfig::default(),
            phases: PhaseConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// LLM provider configuration.
///
/// Matches §4.3: a single provider exposes two named models, `primary` and
/// `fallback`, selected by the gateway's rate-limit recovery policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// LLM provider name: "anthropic" or "openai" (OpenAI-compatible endpoint).
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// API key for the LLM provider.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override URL for custom/self-hosted endpoints.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Primary model identifier.
    #[serde(default = "default_primary_model")]
    pub primary_model: String,

    /// Fallback model identifier, used while the primary is rate-limited.
    #[serde(default = "default_fallback_model")]
    pub fallback_model: String,

    /// Seconds since the last observed rate limit before the gateway
    /// probes the primary model again.
    #[serde(default = "default_recovery_interval_seconds")]
    pub recovery_interval_seconds: u64,

    /// Hard per-call timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Retry back-off delays in seconds, applied in order for non-rate-limit errors.
    #[serde(default = "default_retry_delays")]
    pub retry_delays: Vec<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            base_url: None,
            primary_model: default_primary_model(),
            fallback_model: default_fallback_model(),
            recovery_interval_seconds: default_recovery_interval_seconds(),
            timeout_seconds: default_timeout_seconds(),
            retry_delays: default_retry_delays(),
        }
    }
}

/// Mastery tracker parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MasteryConfig {
    /// EWMA smoothing factor applied to per-band accuracy.
    #[serde(default = "default_ewma_alpha")]
    pub ewma_alpha: f64,

    /// Daily multiplicative decay applied to accuracy and efficiency.
    #[serde(default = "default_time_decay_daily")]
    pub time_decay_daily: f64,
}

impl Default for MasteryConfig {
    fn default() -> Self {
        Self {
            ewma_alpha: default_ewma_alpha(),
            time_decay_daily: default_time_decay_daily(),
        }
    }
}

/// Candidate pool sizing (§4.8).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Base pool size requested per difficulty band.
    #[serde(default = "default_pool_k_per_band")]
    pub k_per_band: u32,

    /// Ladder of pool sizes tried in order when feasibility preflight fails.
    #[serde(default = "default_pool_ladder")]
    pub ladder: Vec<u32>,

    /// Cooldown in days before an Easy question may be reshown.
    #[serde(default)]
    pub cooldown_easy_days: u32,

    /// Cooldown in days before a Medium question may be reshown.
    #[serde(default)]
    pub cooldown_medium_days: u32,

    /// Cooldown in days before a Hard question may be reshown.
    #[serde(default)]
    pub cooldown_hard_days: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            k_per_band: default_pool_k_per_band(),
            ladder: default_pool_ladder(),
            cooldown_easy_days: 0,
            cooldown_medium_days: 0,
            cooldown_hard_days: 0,
        }
    }
}

/// Diversity cap parameters (§4.7).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiversityConfig {
    /// Strict (default) max questions per subcategory.
    #[serde(default = "default_max_per_subcategory_strict")]
    pub max_per_subcategory_strict: u32,

    /// Relaxed max questions per subcategory (first relaxation rung).
    #[serde(default = "default_max_per_subcategory_relaxed")]
    pub max_per_subcategory_relaxed: u32,

    /// Ceiling max questions per subcategory (final relaxation rung, effectively unlimited).
    #[serde(default = "default_max_per_subcategory_ceiling")]
    pub max_per_subcategory_ceiling: u32,

    /// Minimum distinct subcategories required per pack.
    #[serde(default = "default_min_subcategories_per_session")]
    pub min_subcategories_per_session: u32,

    /// Maximum questions per (subcategory, type) pair.
    #[serde(default = "default_max_per_type")]
    pub max_per_type: u32,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            max_per_subcategory_strict: default_max_per_subcategory_strict(),
            max_per_subcategory_relaxed: default_max_per_subcategory_relaxed(),
            max_per_subcategory_ceiling: default_max_per_subcategory_ceiling(),
            min_subcategories_per_session: default_min_subcategories_per_session(),
            max_per_type: default_max_per_type(),
        }
    }
}

/// Phase cutoff parameters (§4.7).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhaseConfig {
    /// Sessions below this count are Phase A (Coverage & Calibration).
    #[serde(default = "default_phase_a_cutoff")]
    pub phase_a_cutoff: u32,

    /// Sessions below this count (and at/above `phase_a_cutoff`) are Phase B.
    #[serde(default = "default_phase_b_cutoff")]
    pub phase_b_cutoff: u32,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            phase_a_cutoff: default_phase_a_cutoff(),
            phase_b_cutoff: default_phase_b_cutoff(),
        }
    }
}

/// Data storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Logging and observability settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` env-filter directive, e.g. `"quantis_core=debug,info"`.
    #[serde(default)]
    pub filter: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file with environment variable overrides.
    ///
    /// The loading sequence:
    /// 1. Determine config file path (argument > `QUANTIS_CONFIG` env var > default)
    /// 2. Parse TOML file (or use defaults if the default path doesn't exist)
    /// 3. Apply environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Config, ConfigError> {
        let (path, explicit) = Self::resolve_config_path(config_path);

        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::ParseError { source: e })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if explicit {
                    return Err(ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                Config::default()
            }
            Err(_) => {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
        };

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Load configuration and validate it, returning all validation errors at once.
    pub fn load_and_validate(config_path: Option<&str>) -> Result<Config, Vec<ConfigError>> {
        let config = Config::load(config_path).map_err(|e| vec![e])?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_config_path(config_path: Option<&str>) -> (PathBuf, bool) {
        if let Some(p) = config_path {
            return (PathBuf::from(p), true);
        }
        if let Ok(p) = std::env::var("QUANTIS_CONFIG") {
            return (PathBuf::from(p), true);
        }
        let default = dirs::home_dir()
            .map(|h| h.join(".quantis").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".quantis/config.toml"));
        (default, false)
    }
}
