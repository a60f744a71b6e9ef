//! Configuration validation.

use super::Config;
use crate::error::ConfigError;

impl Config {
    /// Validate the configuration, returning all errors found (not just the first).
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        match self.llm.provider.as_str() {
            "anthropic" | "openai" => {}
            other => errors.push(ConfigError::InvalidValue {
                field: "llm.provider".to_string(),
                message: format!("must be anthropic or openai, got '{other}'"),
            }),
        }

        if self.llm.primary_model.is_empty() {
            errors.push(ConfigError::MissingField {
                field: "llm.primary_model".to_string(),
            });
        }
        if self.llm.fallback_model.is_empty() {
            errors.push(ConfigError::MissingField {
                field: "llm.fallback_model".to_string(),
            });
        }
        if self.llm.retry_delays.is_empty() {
            errors.push(ConfigError::InvalidValue {
                field: "llm.retry_delays".to_string(),
                message: "must contain at least one delay".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.mastery.ewma_alpha) {
            errors.push(ConfigError::InvalidValue {
                field: "mastery.ewma_alpha".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.mastery.time_decay_daily) {
            errors.push(ConfigError::InvalidValue {
                field: "mastery.time_decay_daily".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }

        if self.pool.k_per_band == 0 {
            errors.push(ConfigError::InvalidValue {
                field: "pool.k_per_band".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.pool.ladder.is_empty() {
            errors.push(ConfigError::InvalidValue {
                field: "pool.ladder".to_string(),
                message: "must contain at least one rung".to_string(),
            });
        } else if self.pool.ladder.windows(2).any(|w| w[1] <= w[0]) {
            errors.push(ConfigError::InvalidValue {
                field: "pool.ladder".to_string(),
                message: "rungs must be strictly increasing".to_string(),
            });
        }

        if self.diversity.max_per_subcategory_strict > self.diversity.max_per_subcategory_relaxed
            || self.diversity.max_per_subcategory_relaxed
                > self.diversity.max_per_subcategory_ceiling
        {
            errors.push(ConfigError::InvalidValue {
                field: "diversity.max_per_subcategory_*".to_string(),
                message: "strict <= relaxed <= ceiling must hold".to_string(),
            });
        }
        if self.diversity.min_subcategories_per_session == 0 {
            errors.push(ConfigError::InvalidValue {
                field: "diversity.min_subcategories_per_session".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.phases.phase_a_cutoff >= self.phases.phase_b_cutoff {
            errors.push(ConfigError::InvalidValue {
                field: "phases.phase_a_cutoff".to_string(),
                message: "must be less than phases.phase_b_cutoff".to_string(),
            });
        }

        if self.storage.db_path.is_empty() {
            errors.push(ConfigError::MissingField {
                field: "storage.db_path".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
