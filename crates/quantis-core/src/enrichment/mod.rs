//! Enrichment Pipeline (C4): transforms a raw question into a
//! quality-verified, fully-classified record, or leaves it inactive.

mod stages;

pub use stages::ConsolidatedAnalysis;

use crate::error::{EnrichmentError, EnrichmentFailureKind, StorageError};
use crate::llm::gateway::LlmGateway;
use crate::storage::questions::Question;
use crate::storage::DbPool;

/// Result of one pipeline stage. A type alias rather than a bespoke enum:
/// `Ok`/`Err` already carry the two cases the original's try/except ladder
/// conflated, and every caller already speaks `Result`.
pub type StageResult<T> = Result<T, EnrichmentError>;

/// Everything the pipeline produced for one question, whether or not it
/// ended up eligible for activation.
#[derive(Debug)]
pub struct EnrichmentOutcome {
    /// The question record after any derived fields were applied.
    pub question: Question,
    /// Every stage failure encountered, in stage order. Empty iff the
    /// question was fully enriched.
    pub failures: Vec<EnrichmentError>,
}

/// Run all five stages against `question`, persist the result (derived
/// fields only -- admin-owned content is read-only to this function), and
/// return the outcome.
///
/// Idempotent: re-running against an already-enriched question overwrites
/// derived fields but never touches `stem`, `admin_answer`,
/// `admin_solution`, `principle_to_remember`, or `image_url`.
pub async fn enrich_question(
    gateway: &LlmGateway,
    pool: &DbPool,
    mut question: Question,
) -> Result<EnrichmentOutcome, StorageError> {
    let mut failures = Vec::new();

    let analysis = match stages::consolidated_analysis(gateway, &question.stem).await {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            failures.push(e);
            None
        }
    };

    if let Some(analysis) = analysis {
        match stages::canonical_matching(gateway, &analysis, &question.stem).await {
            Ok(triple) => match stages::band_score_reconciliation(&analysis.difficulty_band, analysis.difficulty_score) {
                Ok((band, score)) => {
                    let pyq_score = match stages::pyq_frequency_scoring(
                        gateway,
                        pool,
                        score,
                        &triple.category,
                        &triple.subcategory,
                        &question.stem,
                        &analysis,
                    )
                    .await
                    {
                        Ok(s) => s,
                        Err(e) => {
                            failures.push(e);
                            0.5
                        }
                    };
                    stages::apply_derived_fields(&mut question, &analysis, &triple, &band, score, pyq_score);
                }
                Err(e) => failures.push(e),
            },
            Err(e) => failures.push(e),
        }
    }

    question.concept_extraction_status = stages::concept_extraction_status(&question);

    if failures.is_empty() {
        match crate::verifier::run_quality_gate(gateway, &question).await {
            Ok(verdict) if verdict.passed => {
                question.quality_verified = true;
                question.is_active = true;
            }
            Ok(verdict) => {
                question.quality_verified = false;
                question.is_active = false;
                let detail = verdict
                    .structural_failures
                    .iter()
                    .map(|f| f.criterion.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                failures.push(EnrichmentError {
                    stage: "quality_gate".to_string(),
                    kind: EnrichmentFailureKind::SchemaViolation(if detail.is_empty() {
                        "semantic answer match returned NO_MATCH".to_string()
                    } else {
                        detail
                    }),
                });
            }
            Err(e) => failures.push(EnrichmentError {
                stage: "quality_gate".to_string(),
                kind: EnrichmentFailureKind::TransientUpstream(e.to_string()),
            }),
        }
    } else {
        question.quality_verified = false;
        question.is_active = false;
    }

    crate::storage::questions::upsert_question(pool, &question).await?;

    Ok(EnrichmentOutcome { question, failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::llm::{GenerationParams, LlmProvider, LlmResponse, TokenUsage};
    use crate::storage::init_test_db;
    use chrono::Utc;
    use std::sync::Arc;

    struct ScriptedProvider {
        name: &'static str,
        responses: std::sync::Mutex<Vec<&'static str>>,
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(
            &self,
            _system: &str,
            _user_message: &str,
            _params: &GenerationParams,
        ) -> Result<LlmResponse, crate::error::LlmError> {
            let mut responses = self.responses.lock().unwrap();
            let text = if responses.is_empty() {
                "MATCH"
            } else {
                responses.remove(0)
            };
            Ok(LlmResponse {
                text: text.to_string(),
                usage: TokenUsage::default(),
                model: self.name.to_string(),
            })
        }

        async fn health_check(&self) -> Result<(), crate::error::LlmError> {
            Ok(())
        }
    }

    fn gateway_with_scripted_response(analysis_json: &'static str) -> LlmGateway {
        let primary = Arc::new(ScriptedProvider {
            name: "primary",
            responses: std::sync::Mutex::new(vec![analysis_json, "MATCH"]),
        });
        let fallback = Arc::new(ScriptedProvider {
            name: "fallback",
            responses: std::sync::Mutex::new(vec![]),
        });
        LlmGateway::new(primary, fallback, &LlmConfig::default())
    }

    fn raw_question(id: &str) -> Question {
        let now = Utc::now().to_rfc3339();
        Question {
            id: id.to_string(),
            stem: "A shop sells an item at 20% profit. Find the profit on a 500 rupee item.".to_string(),
            source: "admin".to_string(),
            admin_answer: Some("100".to_string()),
            admin_solution: Some("500 * 0.2".to_string()),
            principle_to_remember: Some("profit = cost * rate".to_string()),
            image_url: None,
            right_answer: None,
            category: String::new(),
            subcategory: String::new(),
            type_of_question: String::new(),
            difficulty_band: String::new(),
            difficulty_score: 0.0,
            pyq_frequency_score: None,
            core_concepts: None,
            solution_method: None,
            concept_difficulty: None,
            operations_required: None,
            problem_structure: None,
            concept_keywords: None,
            is_active: false,
            quality_verified: false,
            concept_extraction_status: "pending".to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    const ANALYSIS_JSON: &str = r#"{
        "right_answer": "100",
        "category": "Arithmetic",
        "subcategory": "Profit and Loss",
        "type_of_question": "Basics",
        "difficulty_band": "Easy",
        "difficulty_score": 1.5,
        "core_concepts": ["profit", "percentage", "cost price"],
        "solution_method": "percentage of cost price",
        "concept_difficulty": {"prerequisites": [], "cognitive_barriers": [], "mastery_indicators": []},
        "operations_required": ["multiplication"],
        "problem_structure": "single_step",
        "concept_keywords": ["profit", "percentage"]
    }"#;

    #[tokio::test]
    async fn full_pipeline_activates_a_clean_question() {
        let pool = init_test_db().await.expect("init db");
        let gateway = gateway_with_scripted_response(ANALYSIS_JSON);
        let question = raw_question("q1");

        let outcome = enrich_question(&gateway, &pool, question).await.expect("enrich");
        assert!(outcome.failures.is_empty(), "unexpected failures: {:?}", outcome.failures);
        assert!(outcome.question.is_active);
        assert!(outcome.question.quality_verified);
        assert_eq!(outcome.question.category, "Arithmetic");
        assert_eq!(outcome.question.concept_extraction_status, "completed");
    }

    #[tokio::test]
    async fn admin_owned_fields_survive_enrichment() {
        let pool = init_test_db().await.expect("init db");
        let gateway = gateway_with_scripted_response(ANALYSIS_JSON);
        let question = raw_question("q2");
        let original_stem = question.stem.clone();
        let original_answer = question.admin_answer.clone();

        let outcome = enrich_question(&gateway, &pool, question).await.expect("enrich");
        assert_eq!(outcome.question.stem, original_stem);
        assert_eq!(outcome.question.admin_answer, original_answer);
    }

    #[tokio::test]
    async fn low_difficulty_skips_pyq_call_and_defaults() {
        let pool = init_test_db().await.expect("init db");
        let gateway = gateway_with_scripted_response(ANALYSIS_JSON);
        let question = raw_question("q3");

        let outcome = enrich_question(&gateway, &pool, question).await.expect("enrich");
        assert_eq!(outcome.question.pyq_frequency_score, Some(0.5));
    }

    #[tokio::test]
    async fn malformed_analysis_response_leaves_record_inactive() {
        let pool = init_test_db().await.expect("init db");
        let gateway = gateway_with_scripted_response("not json at all");
        let question = raw_question("q4");

        let outcome = enrich_question(&gateway, &pool, question).await.expect("enrich");
        assert!(!outcome.failures.is_empty());
        assert!(!outcome.question.is_active);
        assert!(!outcome.question.quality_verified);
    }
}
