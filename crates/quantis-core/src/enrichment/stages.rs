//! The individual stages of the enrichment pipeline (§4.4).

use crate::error::{EnrichmentError, EnrichmentFailureKind};
use crate::llm::gateway::{parse_json_response, LlmGateway};
use crate::llm::GenerationParams;
use crate::storage::questions::Question;
use crate::storage::pyq_questions::qualifying_pool;
use crate::storage::DbPool;
use crate::taxonomy::{self, render_taxonomy_context, CanonicalTriple};
use serde::Deserialize;

/// Stage 1 output: the LLM's raw classification of a question, before
/// canonical resolution or band/score reconciliation.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsolidatedAnalysis {
    /// The pipeline's own computed answer.
    pub right_answer: String,
    /// Free-text category, resolved against the taxonomy in stage 2.
    pub category: String,
    /// Free-text subcategory, resolved against the taxonomy in stage 2.
    pub subcategory: String,
    /// Free-text type, resolved against the taxonomy in stage 2.
    pub type_of_question: String,
    /// Proposed difficulty band.
    pub difficulty_band: String,
    /// Proposed difficulty score.
    pub difficulty_score: f64,
    /// Core concepts the question exercises.
    pub core_concepts: Vec<String>,
    /// Description of the solution method.
    pub solution_method: String,
    /// Structured difficulty breakdown.
    pub concept_difficulty: ConceptDifficulty,
    /// Operations the solution requires.
    pub operations_required: Vec<String>,
    /// A short token describing the problem's structure.
    pub problem_structure: String,
    /// Keywords for concept-overlap comparisons (e.g. PYQ scoring).
    pub concept_keywords: Vec<String>,
}

/// Structured difficulty record (§3).
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct ConceptDifficulty {
    /// Concepts a student must already know.
    pub prerequisites: Vec<String>,
    /// Known points of confusion.
    pub cognitive_barriers: Vec<String>,
    /// Signals that indicate mastery of this concept.
    pub mastery_indicators: Vec<String>,
}

/// Stage 1: one LLM round-trip producing the full raw classification, with
/// the canonical taxonomy supplied as context.
pub async fn consolidated_analysis(gateway: &LlmGateway, question_stem: &str) -> Result<ConsolidatedAnalysis, EnrichmentError> {
    let system = "You classify math questions for a competitive exam question bank. \
        Respond with JSON only, matching exactly this shape: \
        {\"right_answer\": string, \"category\": string, \"subcategory\": string, \"type_of_question\": string, \
        \"difficulty_band\": \"Easy\"|\"Medium\"|\"Hard\", \"difficulty_score\": number, \
        \"core_concepts\": [string], \"solution_method\": string, \
        \"concept_difficulty\": {\"prerequisites\": [string], \"cognitive_barriers\": [string], \"mastery_indicators\": [string]}, \
        \"operations_required\": [string], \"problem_structure\": string, \"concept_keywords\": [string]}";
    let user = format!("Canonical taxonomy:\n{}\n\nQuestion:\n{question_stem}", render_taxonomy_context());

    let response = gateway
        .complete(
            system,
            &user,
            &GenerationParams {
                max_tokens: 1024,
                temperature: 0.1,
                system_prompt: None,
            },
        )
        .await
        .map_err(|e| EnrichmentError {
            stage: "consolidated_analysis".to_string(),
            kind: EnrichmentFailureKind::TransientUpstream(e.to_string()),
        })?;

    parse_json_response(&response.text).map_err(|e| EnrichmentError {
        stage: "consolidated_analysis".to_string(),
        kind: EnrichmentFailureKind::SchemaViolation(e.to_string()),
    })
}

/// Stage 2: resolve stage 1's free-text classification against the closed
/// taxonomy via the three-step policy.
pub async fn canonical_matching(
    gateway: &LlmGateway,
    analysis: &ConsolidatedAnalysis,
    question_stem: &str,
) -> Result<CanonicalTriple, EnrichmentError> {
    let resolved = taxonomy::resolve(
        gateway,
        &analysis.category,
        &analysis.subcategory,
        &analysis.type_of_question,
        question_stem,
    )
    .await
    .map_err(|e| EnrichmentError {
        stage: "canonical_matching".to_string(),
        kind: EnrichmentFailureKind::TransientUpstream(e.to_string()),
    })?;

    resolved.ok_or_else(|| EnrichmentError {
        stage: "canonical_matching".to_string(),
        kind: EnrichmentFailureKind::CanonicalMiss(format!(
            "no canonical path for ({}, {}, {})",
            analysis.category, analysis.subcategory, analysis.type_of_question
        )),
    })
}

/// The default midpoint score for a band, used to repair an out-of-range
/// score without failing the stage.
fn band_midpoint(band: &str) -> Option<f64> {
    match band {
        "Easy" => Some(1.5),
        "Medium" => Some(2.75),
        "Hard" => Some(4.3),
        _ => None,
    }
}

fn score_in_band_range(band: &str, score: f64) -> bool {
    match band {
        "Easy" => (1.0..=2.0).contains(&score),
        "Medium" => score > 2.0 && score <= 3.5,
        "Hard" => score > 3.5 && score <= 5.0,
        _ => false,
    }
}

/// Stage 3: clamp and cross-check band/score alignment (§3). Invalid
/// bands fail the stage; out-of-range scores are replaced by the band's
/// midpoint rather than failing.
pub fn band_score_reconciliation(difficulty_band: &str, difficulty_score: f64) -> Result<(String, f64), EnrichmentError> {
    let Some(midpoint) = band_midpoint(difficulty_band) else {
        return Err(EnrichmentError {
            stage: "band_score_reconciliation".to_string(),
            kind: EnrichmentFailureKind::BandInvalid(format!("'{difficulty_band}' is not Easy, Medium, or Hard")),
        });
    };

    let score = if score_in_band_range(difficulty_band, difficulty_score) {
        difficulty_score
    } else {
        midpoint
    };

    Ok((difficulty_band.to_string(), score))
}

#[derive(Deserialize)]
struct PyqScoreResponse {
    frequency_score: f64,
}

/// Stage 4: PYQ frequency scoring against the qualifying pool. Skipped
/// (defaulting to 0.5) when `difficulty_score <= 1.5` or the pool is
/// empty.
pub async fn pyq_frequency_scoring(
    gateway: &LlmGateway,
    pool: &DbPool,
    difficulty_score: f64,
    category: &str,
    subcategory: &str,
    question_stem: &str,
    analysis: &ConsolidatedAnalysis,
) -> Result<f64, EnrichmentError> {
    if difficulty_score <= 1.5 {
        return Ok(0.5);
    }

    let candidates = qualifying_pool(pool, category, subcategory)
        .await
        .map_err(|e| EnrichmentError {
            stage: "pyq_frequency_scoring".to_string(),
            kind: EnrichmentFailureKind::TransientUpstream(e.to_string()),
        })?;

    if candidates.is_empty() {
        return Ok(0.5);
    }

    let pool_description = candidates
        .iter()
        .map(|c| format!("- structure={}, keywords={}", c.problem_structure.as_deref().unwrap_or(""), c.concept_keywords.as_deref().unwrap_or("[]")))
        .collect::<Vec<_>>()
        .join("\n");

    let system = "You estimate how often questions structurally and conceptually similar to the target \
        have appeared in a historical exam corpus. Compare the target's problem structure and concept \
        keywords against every pool entry. Respond with JSON only: {\"frequency_score\": number}.";
    let user = format!(
        "Target question:\n{question_stem}\nstructure={}\nkeywords={:?}\n\nHistorical pool:\n{pool_description}",
        analysis.problem_structure, analysis.concept_keywords,
    );

    let response = gateway
        .complete(
            system,
            &user,
            &GenerationParams {
                max_tokens: 64,
                temperature: 0.1,
                system_prompt: None,
            },
        )
        .await
        .map_err(|e| EnrichmentError {
            stage: "pyq_frequency_scoring".to_string(),
            kind: EnrichmentFailureKind::TransientUpstream(e.to_string()),
        })?;

    let parsed: PyqScoreResponse = parse_json_response(&response.text).map_err(|e| EnrichmentError {
        stage: "pyq_frequency_scoring".to_string(),
        kind: EnrichmentFailureKind::SchemaViolation(e.to_string()),
    })?;

    Ok(parsed.frequency_score)
}

/// Apply the resolved derived fields onto `question`, leaving admin-owned
/// content fields untouched.
pub fn apply_derived_fields(
    question: &mut Question,
    analysis: &ConsolidatedAnalysis,
    triple: &CanonicalTriple,
    band: &str,
    score: f64,
    pyq_score: f64,
) {
    question.right_answer = Some(analysis.right_answer.clone());
    question.category = triple.category.clone();
    question.subcategory = triple.subcategory.clone();
    question.type_of_question = triple.type_of_question.clone();
    question.difficulty_band = band.to_string();
    question.difficulty_score = score;
    question.pyq_frequency_score = Some(pyq_score);
    question.core_concepts = serde_json::to_string(&analysis.core_concepts).ok();
    question.solution_method = Some(analysis.solution_method.clone());
    question.concept_difficulty = serde_json::to_string(&analysis.concept_difficulty).ok();
    question.operations_required = serde_json::to_string(&analysis.operations_required).ok();
    question.problem_structure = Some(analysis.problem_structure.clone());
    question.concept_keywords = serde_json::to_string(&analysis.concept_keywords).ok();
}

/// Concept-extraction status is `completed` iff `core_concepts` is a
/// non-empty JSON array (§4.4).
pub fn concept_extraction_status(question: &Question) -> String {
    let has_concepts = question
        .core_concepts
        .as_deref()
        .and_then(|json| serde_json::from_str::<Vec<String>>(json).ok())
        .map(|v| !v.is_empty())
        .unwrap_or(false);

    if has_concepts {
        "completed".to_string()
    } else {
        "pending".to_string()
    }
}
