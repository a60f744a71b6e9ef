//! Default value functions for serde and `Default` impls.
//!
//! Constants here mirror the environment variable defaults named in the
//! external interface contract: `LLM_PRIMARY_MODEL`, `LLM_RECOVERY_INTERVAL_SECONDS`,
//! `EWMA_ALPHA`, `POOL_K_PER_BAND`, `PHASE_A_CUTOFF`, and friends.

pub(super) fn default_llm_provider() -> String {
    "anthropic".to_string()
}

pub(super) fn default_primary_model() -> String {
    "claude-sonnet-4-5".to_string()
}

pub(super) fn default_fallback_model() -> String {
    "claude-haiku-4-5".to_string()
}

pub(super) fn default_recovery_interval_seconds() -> u64 {
    1800
}

pub(super) fn default_timeout_seconds() -> u64 {
    60
}

pub(super) fn default_retry_delays() -> Vec<u64> {
    vec![3, 7, 15, 30]
}

pub(super) fn default_ewma_alpha() -> f64 {
    0.6
}

pub(super) fn default_time_decay_daily() -> f64 {
    0.95
}

pub(super) fn default_pool_k_per_band() -> u32 {
    80
}

pub(super) fn default_pool_ladder() -> Vec<u32> {
    vec![80, 160, 320]
}

pub(super) fn default_max_per_subcategory_strict() -> u32 {
    3
}

pub(super) fn default_max_per_subcategory_relaxed() -> u32 {
    5
}

pub(super) fn default_max_per_subcategory_ceiling() -> u32 {
    u32::MAX
}

pub(super) fn default_min_subcategories_per_session() -> u32 {
    3
}

pub(super) fn default_max_per_type() -> u32 {
    3
}

pub(super) fn default_phase_a_cutoff() -> u32 {
    30
}

pub(super) fn default_phase_b_cutoff() -> u32 {
    60
}

pub(super) fn default_db_path() -> String {
    "~/.quantis/quantis.db".to_string()
}
