//! Implementation of the `quantis enrich` command.
//!
//! Runs the enrichment pipeline (C4) over questions still awaiting
//! classification, reporting per-question pass/fail outcomes.

use quantis_core::config::Config;
use quantis_core::llm::backoff::ConsecutiveErrorTracker;
use quantis_core::llm::factory::build_providers;
use quantis_core::llm::gateway::LlmGateway;
use quantis_core::storage;
use quantis_core::enrichment;
use quantis_core::storage::questions::pending_enrichment;
use std::time::Duration;

/// Consecutive fully-failed questions (every stage errored, not just a
/// quality-gate rejection) before the batch pauses to let a sustained
/// upstream outage clear.
const MAX_CONSECUTIVE_FAILURES: u32 = 5;
const FAILURE_PAUSE: Duration = Duration::from_secs(300);

pub async fn execute(config: &Config, limit: usize) -> anyhow::Result<()> {
    let (primary, fallback) = build_providers(&config.llm).map_err(|e| {
        anyhow::anyhow!("{e}\nHint: set llm.api_key (or QUANTIS_LLM__API_KEY) before running `quantis enrich`.")
    })?;
    let gateway = LlmGateway::new(primary, fallback, &config.llm);

    let pool = storage::init_db(&config.storage.db_path).await?;
    let pending = pending_enrichment(&pool).await?;

    if pending.is_empty() {
        println!("No questions pending enrichment.");
        return Ok(());
    }

    let mut passed = 0;
    let mut failed = 0;
    let mut error_tracker = ConsecutiveErrorTracker::new(MAX_CONSECUTIVE_FAILURES, FAILURE_PAUSE);

    for question in pending.into_iter().take(limit) {
        let stem_preview: String = question.stem.chars().take(60).collect();
        let outcome = enrichment::enrich_question(&gateway, &pool, question).await?;

        if outcome.failures.is_empty() {
            passed += 1;
            error_tracker.record_success();
            println!("  ok    {stem_preview}");
        } else {
            failed += 1;
            println!("  failed {stem_preview}");
            for failure in &outcome.failures {
                println!("           {failure}");
            }

            if error_tracker.record_error() {
                println!(
                    "  {} consecutive failures, pausing {}s for upstream to recover...",
                    error_tracker.count(),
                    error_tracker.pause_duration().as_secs()
                );
                tokio::time::sleep(error_tracker.pause_duration()).await;
                error_tracker.reset();
            }
        }
    }

    pool.close().await;
    println!("Enriched {passed} question(s), {failed} not activated.");

    Ok(())
}
