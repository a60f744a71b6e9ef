//! Quality Verifier (C5): structural checks plus a semantic cross-check
//! that gate whether an enriched question may be activated.

use crate::error::VerifierError;
use crate::llm::gateway::LlmGateway;
use crate::llm::GenerationParams;
use crate::storage::questions::Question;
use crate::taxonomy::valid_path;

/// Terms that are too generic to stand as a genuine concept, solution
/// method, or operation -- almost always a placeholder the LLM emitted
/// instead of doing the work.
const FORBIDDEN_GENERIC_TERMS: &[&str] = &[
    "calculation",
    "basic",
    "mathematics",
    "basic_problem",
    "standard_problem",
    "general_approach",
    "standard_method",
    "basic_math",
    "simple_calculation",
];

/// Placeholder strings that count as "absent" even though the column is non-null.
const PLACEHOLDER_VALUES: &[&str] = &["", "N/A", "n/a", "To be classified", "TBD", "null"];

/// A single failed structural or semantic check, named so the failure list
/// can drive later re-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    /// Name of the failed criterion.
    pub criterion: String,
    /// Human-readable detail.
    pub detail: String,
}

fn is_placeholder(value: &str) -> bool {
    PLACEHOLDER_VALUES.iter().any(|p| p.eq_ignore_ascii_case(value.trim()))
}

fn is_forbidden_term(value: &str) -> bool {
    FORBIDDEN_GENERIC_TERMS.iter().any(|t| t.eq_ignore_ascii_case(value.trim()))
}

fn check_required_field(failures: &mut Vec<CheckFailure>, name: &str, value: Option<&str>) {
    match value {
        None => failures.push(CheckFailure {
            criterion: name.to_string(),
            detail: "field is null".to_string(),
        }),
        Some(v) if is_placeholder(v) => failures.push(CheckFailure {
            criterion: name.to_string(),
            detail: format!("field is a placeholder value: '{v}'"),
        }),
        Some(_) => {}
    }
}

fn check_json_array_min_len(failures: &mut Vec<CheckFailure>, name: &str, json: Option<&str>, min: usize) -> Vec<String> {
    let Some(json) = json else {
        failures.push(CheckFailure {
            criterion: name.to_string(),
            detail: "field is null".to_string(),
        });
        return Vec::new();
    };
    let entries: Vec<String> = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => {
            failures.push(CheckFailure {
                criterion: name.to_string(),
                detail: format!("field is not a JSON array: {e}"),
            });
            return Vec::new();
        }
    };
    if entries.len() < min {
        failures.push(CheckFailure {
            criterion: name.to_string(),
            detail: format!("expected at least {min} entries, found {}", entries.len()),
        });
    }
    for entry in &entries {
        if is_forbidden_term(entry) {
            failures.push(CheckFailure {
                criterion: name.to_string(),
                detail: format!("entry '{entry}' is a forbidden generic term"),
            });
        }
    }
    entries
}

#[derive(serde::Deserialize)]
struct ConceptDifficultyShape {
    #[serde(default)]
    prerequisites: Option<serde_json::Value>,
    #[serde(default)]
    cognitive_barriers: Option<serde_json::Value>,
    #[serde(default)]
    mastery_indicators: Option<serde_json::Value>,
}

/// Pure structural checks over a question record (21 binary criteria).
/// Performs no I/O.
pub fn run_structural_checks(question: &Question) -> Vec<CheckFailure> {
    let mut failures = Vec::new();

    check_required_field(&mut failures, "stem", Some(question.stem.as_str()));
    check_required_field(&mut failures, "admin_answer", question.admin_answer.as_deref());
    check_required_field(&mut failures, "admin_solution", question.admin_solution.as_deref());
    check_required_field(&mut failures, "principle_to_remember", question.principle_to_remember.as_deref());
    check_required_field(&mut failures, "right_answer", question.right_answer.as_deref());
    check_required_field(&mut failures, "category", Some(question.category.as_str()));
    check_required_field(&mut failures, "subcategory", Some(question.subcategory.as_str()));
    check_required_field(&mut failures, "type_of_question", Some(question.type_of_question.as_str()));
    check_required_field(&mut failures, "difficulty_band", Some(question.difficulty_band.as_str()));
    check_required_field(&mut failures, "solution_method", question.solution_method.as_deref());
    check_required_field(&mut failures, "problem_structure", question.problem_structure.as_deref());
    check_required_field(&mut failures, "concept_extraction_status", Some(question.concept_extraction_status.as_str()));

    if !matches!(question.difficulty_band.as_str(), "Easy" | "Medium" | "Hard") {
        failures.push(CheckFailure {
            criterion: "difficulty_band_enum".to_string(),
            detail: format!("'{}' is not one of Easy, Medium, Hard", question.difficulty_band),
        });
    } else if !band_score_aligned(&question.difficulty_band, question.difficulty_score) {
        failures.push(CheckFailure {
            criterion: "difficulty_score_range".to_string(),
            detail: format!(
                "score {} out of range for band {}",
                question.difficulty_score, question.difficulty_band
            ),
        });
    }

    if !valid_path(&question.category, &question.subcategory, &question.type_of_question) {
        failures.push(CheckFailure {
            criterion: "canonical_path".to_string(),
            detail: format!(
                "({}, {}, {}) is not a valid taxonomy path",
                question.category, question.subcategory, question.type_of_question
            ),
        });
    }

    check_json_array_min_len(&mut failures, "core_concepts", question.core_concepts.as_deref(), 3);
    check_json_array_min_len(&mut failures, "concept_keywords", question.concept_keywords.as_deref(), 2);
    check_json_array_min_len(&mut failures, "operations_required", question.operations_required.as_deref(), 1);

    if let Some(method) = question.solution_method.as_deref() {
        if is_forbidden_term(method) {
            failures.push(CheckFailure {
                criterion: "solution_method".to_string(),
                detail: format!("'{method}' is a forbidden generic term"),
            });
        }
    }

    match question.concept_difficulty.as_deref().map(serde_json::from_str::<ConceptDifficultyShape>) {
        Some(Ok(shape)) => {
            if shape.prerequisites.is_none() || shape.cognitive_barriers.is_none() || shape.mastery_indicators.is_none() {
                failures.push(CheckFailure {
                    criterion: "concept_difficulty_shape".to_string(),
                    detail: "missing one of prerequisites/cognitive_barriers/mastery_indicators".to_string(),
                });
            }
        }
        Some(Err(e)) => failures.push(CheckFailure {
            criterion: "concept_difficulty_shape".to_string(),
            detail: format!("not a valid JSON object: {e}"),
        }),
        None => failures.push(CheckFailure {
            criterion: "concept_difficulty_shape".to_string(),
            detail: "field is null".to_string(),
        }),
    }

    if question.concept_extraction_status != "completed" {
        failures.push(CheckFailure {
            criterion: "concept_extraction_status".to_string(),
            detail: format!("status is '{}', expected 'completed'", question.concept_extraction_status),
        });
    }

    failures
}

/// Whether `difficulty_score` falls within the range for `difficulty_band`
/// (§3): Easy [1.0, 2.0], Medium (2.0, 3.5], Hard (3.5, 5.0].
pub fn band_score_aligned(difficulty_band: &str, difficulty_score: f64) -> bool {
    match difficulty_band {
        "Easy" => (1.0..=2.0).contains(&difficulty_score),
        "Medium" => difficulty_score > 2.0 && difficulty_score <= 3.5,
        "Hard" => difficulty_score > 3.5 && difficulty_score <= 5.0,
        _ => false,
    }
}

/// Outcome of the semantic answer-match check: MATCH/NO_MATCH against the
/// LLM, or skipped entirely (no admin answer to compare against).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticMatchOutcome {
    /// Not applicable -- no admin-provided answer to compare.
    NotApplicable,
    /// The two answers denote the same value.
    Match,
    /// The two answers diverge.
    NoMatch,
}

/// Ask the LLM whether the admin-provided answer and the pipeline's
/// `right_answer` denote the same mathematical value, tolerating units,
/// formatting, and equivalent fractions (§4.5).
pub async fn semantic_answer_match(gateway: &LlmGateway, question: &Question) -> Result<SemanticMatchOutcome, VerifierError> {
    let (Some(admin_answer), Some(right_answer)) = (question.admin_answer.as_deref(), question.right_answer.as_deref()) else {
        return Ok(SemanticMatchOutcome::NotApplicable);
    };

    let system = "You judge whether two answers to the same math question denote the same value. \
        Tolerate unit labels, formatting differences, and equivalent fractions/decimals. \
        Respond with exactly one word: MATCH or NO_MATCH.";
    let user = format!("Admin answer: {admin_answer}\nPipeline answer: {right_answer}");

    let response = gateway
        .complete(
            system,
            &user,
            &GenerationParams {
                max_tokens: 8,
                temperature: 0.1,
                system_prompt: None,
            },
        )
        .await?;

    if response.text.trim().eq_ignore_ascii_case("MATCH") {
        Ok(SemanticMatchOutcome::Match)
    } else {
        Ok(SemanticMatchOutcome::NoMatch)
    }
}

/// Overall quality-gate verdict: structural checks plus the semantic
/// match, if applicable.
#[derive(Debug, Clone)]
pub struct QualityGateVerdict {
    /// Whether the question may be activated.
    pub passed: bool,
    /// Every structural criterion that failed.
    pub structural_failures: Vec<CheckFailure>,
    /// The semantic match outcome.
    pub semantic_outcome: SemanticMatchOutcome,
}

/// Run the full quality gate: structural checks plus the semantic
/// cross-check (C5).
pub async fn run_quality_gate(gateway: &LlmGateway, question: &Question) -> Result<QualityGateVerdict, VerifierError> {
    let structural_failures = run_structural_checks(question);
    let semantic_outcome = semantic_answer_match(gateway, question).await?;

    let passed = structural_failures.is_empty()
        && !matches!(semantic_outcome, SemanticMatchOutcome::NoMatch)
        && question.concept_extraction_status == "completed";

    Ok(QualityGateVerdict {
        passed,
        structural_failures,
        semantic_outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn valid_question() -> Question {
        let now = Utc::now().to_rfc3339();
        Question {
            id: "q1".to_string(),
            stem: "A train travels 300km in 5 hours. Find its speed.".to_string(),
            source: "admin".to_string(),
            admin_answer: Some("60 km/h".to_string()),
            admin_solution: Some("distance / time".to_string()),
            principle_to_remember: Some("speed = distance / time".to_string()),
            image_url: None,
            right_answer: Some("60 km/h".to_string()),
            category: "Arithmetic".to_string(),
            subcategory: "Time-Speed-Distance".to_string(),
            type_of_question: "Basics".to_string(),
            difficulty_band: "Medium".to_string(),
            difficulty_score: 2.5,
            pyq_frequency_score: Some(0.8),
            core_concepts: Some("[\"speed\",\"distance\",\"time\"]".to_string()),
            solution_method: Some("direct formula application".to_string()),
            concept_difficulty: Some(
                "{\"prerequisites\":[],\"cognitive_barriers\":[],\"mastery_indicators\":[]}".to_string(),
            ),
            operations_required: Some("[\"division\"]".to_string()),
            problem_structure: Some("single_step".to_string()),
            concept_keywords: Some("[\"speed\",\"formula\"]".to_string()),
            is_active: false,
            quality_verified: false,
            concept_extraction_status: "completed".to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn valid_question_has_no_structural_failures() {
        let failures = run_structural_checks(&valid_question());
        assert!(failures.is_empty(), "unexpected failures: {failures:?}");
    }

    #[test]
    fn placeholder_field_fails() {
        let mut question = valid_question();
        question.solution_method = Some("N/A".to_string());
        let failures = run_structural_checks(&question);
        assert!(failures.iter().any(|f| f.criterion == "solution_method"));
    }

    #[test]
    fn forbidden_generic_term_in_core_concepts_fails() {
        let mut question = valid_question();
        question.core_concepts = Some("[\"speed\",\"basic\",\"formula\"]".to_string());
        let failures = run_structural_checks(&question);
        assert!(failures.iter().any(|f| f.criterion == "core_concepts"));
    }

    #[test]
    fn too_few_core_concepts_fails() {
        let mut question = valid_question();
        question.core_concepts = Some("[\"speed\"]".to_string());
        let failures = run_structural_checks(&question);
        assert!(failures.iter().any(|f| f.criterion == "core_concepts"));
    }

    #[test]
    fn band_score_misalignment_fails() {
        let mut question = valid_question();
        question.difficulty_score = 4.5;
        let failures = run_structural_checks(&question);
        assert!(failures.iter().any(|f| f.criterion == "difficulty_score_range"));
    }

    #[test]
    fn invalid_canonical_path_fails() {
        let mut question = valid_question();
        question.subcategory = "Nonexistent Subcategory".to_string();
        let failures = run_structural_checks(&question);
        assert!(failures.iter().any(|f| f.criterion == "canonical_path"));
    }

    #[test]
    fn band_score_aligned_boundaries() {
        assert!(band_score_aligned("Easy", 1.0));
        assert!(band_score_aligned("Easy", 2.0));
        assert!(!band_score_aligned("Medium", 2.0));
        assert!(band_score_aligned("Medium", 2.1));
        assert!(band_score_aligned("Medium", 3.5));
        assert!(!band_score_aligned("Hard", 3.5));
        assert!(band_score_aligned("Hard", 3.6));
        assert!(band_score_aligned("Hard", 5.0));
    }

    #[test]
    fn concept_difficulty_missing_keys_fails() {
        let mut question = valid_question();
        question.concept_difficulty = Some("{\"prerequisites\":[]}".to_string());
        let failures = run_structural_checks(&question);
        assert!(failures.iter().any(|f| f.criterion == "concept_difficulty_shape"));
    }
}
