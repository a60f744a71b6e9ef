//! The single point through which all LLM calls flow (C3).
//!
//! Normalizes model selection (primary vs. fallback), rate-limit recovery,
//! retry back-off, and per-call timeouts across callers in C4/C5.

use super::backoff::{looks_like_rate_limit, retry_delay};
use super::{GenerationParams, LlmProvider, LlmResponse};
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Gateway wrapping a primary and fallback model of the same provider.
///
/// `last_rate_limit_time` is process-wide state scoped to this instance: a
/// single long-lived `LlmGateway` is expected to be shared (via `Arc`)
/// across all request handlers. It is treated as an advisory cache, not a
/// strongly-consistent fact — see the Design Notes on the gateway singleton.
pub struct LlmGateway {
    primary: Arc<dyn LlmProvider>,
    fallback: Arc<dyn LlmProvider>,
    recovery_interval: Duration,
    timeout: Duration,
    retry_delays: Vec<u64>,
    last_rate_limit_time: Mutex<Option<Instant>>,
    rate_limited: AtomicBool,
}

impl LlmGateway {
    /// Build a gateway from two already-constructed providers (same
    /// provider kind, different models) and the LLM section of config.
    pub fn new(primary: Arc<dyn LlmProvider>, fallback: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            primary,
            fallback,
            recovery_interval: Duration::from_secs(config.recovery_interval_seconds),
            timeout: Duration::from_secs(config.timeout_seconds),
            retry_delays: config.retry_delays.clone(),
            last_rate_limit_time: Mutex::new(None),
            rate_limited: AtomicBool::new(false),
        }
    }

    /// Whether the gateway currently believes the primary model is
    /// rate-limited (for observability/tests only).
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limited.load(Ordering::Relaxed)
    }

    /// Select which provider to use for the next call, and whether this
    /// call is a recovery probe of the primary model.
    fn select(&self) -> (Arc<dyn LlmProvider>, bool) {
        let guard = self.last_rate_limit_time.lock().expect("gateway mutex poisoned");
        match *guard {
            None => (self.primary.clone(), false),
            Some(t) if t.elapsed() >= self.recovery_interval => (self.primary.clone(), true),
            Some(_) => (self.fallback.clone(), false),
        }
    }

    fn mark_rate_limited(&self) {
        *self.last_rate_limit_time.lock().expect("gateway mutex poisoned") = Some(Instant::now());
        self.rate_limited.store(true, Ordering::Relaxed);
    }

    fn mark_recovered(&self) {
        *self.last_rate_limit_time.lock().expect("gateway mutex poisoned") = None;
        self.rate_limited.store(false, Ordering::Relaxed);
    }

    async fn call_with_timeout(
        &self,
        provider: &Arc<dyn LlmProvider>,
        system: &str,
        user_message: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError> {
        match tokio::time::timeout(self.timeout, provider.complete(system, user_message, params)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                seconds: self.timeout.as_secs(),
            }),
        }
    }

    /// Send a completion request through the gateway, applying model
    /// selection, rate-limit detection, and the retry ladder.
    pub async fn complete(
        &self,
        system: &str,
        user_message: &str,
        params: &GenerationParams,
    ) -> Result<LlmResponse, LlmError> {
        let (provider, is_probe) = self.select();

        let first_attempt = self.call_with_timeout(&provider, system, user_message, params).await;

        let is_rate_limit = matches!(first_attempt, Err(LlmError::RateLimited { .. }))
            || matches!(&first_attempt, Err(LlmError::Api { message, .. }) if looks_like_rate_limit(message));

        if is_rate_limit {
            tracing::warn!(provider = provider.name(), "LLM rate limit detected, switching to fallback");
            self.mark_rate_limited();
            // Immediate retry on fallback, without consuming the back-off budget.
            return self.call_with_timeout(&self.fallback, system, user_message, params).await;
        }

        match first_attempt {
            Ok(response) => {
                if is_probe {
                    tracing::info!("primary model recovered, clearing rate-limit state");
                    self.mark_recovered();
                }
                Ok(response)
            }
            Err(first_error) => {
                self.retry_non_rate_limit(&provider, system, user_message, params, first_error)
                    .await
            }
        }
    }

    async fn retry_non_rate_limit(
        &self,
        provider: &Arc<dyn LlmProvider>,
        system: &str,
        user_message: &str,
        params: &GenerationParams,
        first_error: LlmError,
    ) -> Result<LlmResponse, LlmError> {
        let mut last_error = first_error;
        let mut attempt = 0;
        while let Some(delay) = retry_delay(&self.retry_delays, attempt) {
            tracing::debug!(attempt, delay_secs = delay.as_secs(), error = %last_error, "retrying LLM call");
            tokio::time::sleep(delay).await;
            match self.call_with_timeout(provider, system, user_message, params).await {
                Ok(response) => return Ok(response),
                Err(e) => last_error = e,
            }
            attempt += 1;
        }
        Err(LlmError::RetriesExhausted {
            attempts: (self.retry_delays.len() + 1) as u32,
            last_error: last_error.to_string(),
        })
    }
}

/// Strip a leading/trailing fenced code block (```json ... ``` or ``` ... ```)
/// from an LLM response before JSON parsing, per §4.3.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\n', '\r']);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse an LLM response as JSON, tolerating fenced code blocks.
pub fn parse_json_response<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let stripped = strip_code_fence(text);
    serde_json::from_str(stripped).map_err(|e| LlmError::Parse(format!("{e}: {stripped}")))
}
