//! Environment variable overrides for configuration.
//!
//! Uses the `QUANTIS_` prefix with double underscores separating nested keys
//! (e.g. `QUANTIS_LLM__API_KEY`), matching the naming of the environment
//! options recognized by the external interface contract.

use super::Config;
use crate::error::ConfigError;
use std::env;

impl Config {
    pub(super) fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = env::var("QUANTIS_LLM__PROVIDER") {
            self.llm.provider = val;
        }
        if let Ok(val) = env::var("QUANTIS_LLM__API_KEY") {
            self.llm.api_key = Some(val);
        }
        if let Ok(val) = env::var("QUANTIS_LLM__BASE_URL") {
            self.llm.base_url = Some(val);
        }
        if let Ok(val) = env::var("LLM_PRIMARY_MODEL") {
            self.llm.primary_model = val;
        }
        if let Ok(val) = env::var("LLM_FALLBACK_MODEL") {
            self.llm.fallback_model = val;
        }
        if let Ok(val) = env::var("LLM_RECOVERY_INTERVAL_SECONDS") {
            self.llm.recovery_interval_seconds =
                parse_env_u64("LLM_RECOVERY_INTERVAL_SECONDS", &val)?;
        }
        if let Ok(val) = env::var("LLM_TIMEOUT_SECONDS") {
            self.llm.timeout_seconds = parse_env_u64("LLM_TIMEOUT_SECONDS", &val)?;
        }
        if let Ok(val) = env::var("LLM_RETRY_DELAYS") {
            self.llm.retry_delays = split_csv_u64("LLM_RETRY_DELAYS", &val)?;
        }

        if let Ok(val) = env::var("EWMA_ALPHA") {
            self.mastery.ewma_alpha = parse_env_f64("EWMA_ALPHA", &val)?;
        }
        if let Ok(val) = env::var("TIME_DECAY_DAILY") {
            self.mastery.time_decay_daily = parse_env_f64("TIME_DECAY_DAILY", &val)?;
        }

        if let Ok(val) = env::var("POOL_K_PER_BAND") {
            self.pool.k_per_band = parse_env_u32("POOL_K_PER_BAND", &val)?;
        }
        if let Ok(val) = env::var("POOL_LADDER") {
            self.pool.ladder = split_csv_u32("POOL_LADDER", &val)?;
        }
        if let Ok(val) = env::var("COOLDOWN_EASY_DAYS") {
            self.pool.cooldown_easy_days = parse_env_u32("COOLDOWN_EASY_DAYS", &val)?;
        }
        if let Ok(val) = env::var("COOLDOWN_MEDIUM_DAYS") {
            self.pool.cooldown_medium_days = parse_env_u32("COOLDOWN_MEDIUM_DAYS", &val)?;
        }
        if let Ok(val) = env::var("COOLDOWN_HARD_DAYS") {
            self.pool.cooldown_hard_days = parse_env_u32("COOLDOWN_HARD_DAYS", &val)?;
        }

        if let Ok(val) = env::var("MAX_PER_SUBCATEGORY_STRICT") {
            self.diversity.max_per_subcategory_strict =
                parse_env_u32("MAX_PER_SUBCATEGORY_STRICT", &val)?;
        }
        if let Ok(val) = env::var("MAX_PER_SUBCATEGORY_RELAXED") {
            self.diversity.max_per_subcategory_relaxed =
                parse_env_u32("MAX_PER_SUBCATEGORY_RELAXED", &val)?;
        }
        if let Ok(val) = env::var("MAX_PER_SUBCATEGORY_CEILING") {
            self.diversity.max_per_subcategory_ceiling =
                parse_env_u32("MAX_PER_SUBCATEGORY_CEILING", &val)?;
        }

        if let Ok(val) = env::var("PHASE_A_CUTOFF") {
            self.phases.phase_a_cutoff = parse_env_u32("PHASE_A_CUTOFF", &val)?;
        }
        if let Ok(val) = env::var("PHASE_B_CUTOFF") {
            self.phases.phase_b_cutoff = parse_env_u32("PHASE_B_CUTOFF", &val)?;
        }

        if let Ok(val) = env::var("QUANTIS_STORAGE__DB_PATH") {
            self.storage.db_path = val;
        }
        if let Ok(val) = env::var("QUANTIS_LOGGING__FILTER") {
            self.logging.filter = Some(val);
        }

        Ok(())
    }
}

fn parse_env_u64(name: &str, val: &str) -> Result<u64, ConfigError> {
    val.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue {
            field: name.to_string(),
            message: format!("expected an unsigned integer, got '{val}'"),
        })
}

fn parse_env_u32(name: &str, val: &str) -> Result<u32, ConfigError> {
    val.trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidValue {
            field: name.to_string(),
            message: format!("expected an unsigned integer, got '{val}'"),
        })
}

fn parse_env_f64(name: &str, val: &str) -> Result<f64, ConfigError> {
    val.trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidValue {
            field: name.to_string(),
            message: format!("expected a decimal number, got '{val}'"),
        })
}

fn split_csv_u64(name: &str, val: &str) -> Result<Vec<u64>, ConfigError> {
    val.split(',')
        .map(|s| parse_env_u64(name, s.trim()))
        .collect()
}

fn split_csv_u32(name: &str, val: &str) -> Result<Vec<u32>, ConfigError> {
    val.split(',')
        .map(|s| parse_env_u32(name, s.trim()))
        .collect()
}
