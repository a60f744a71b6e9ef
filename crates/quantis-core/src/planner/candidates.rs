//! Candidate Provider (C8): a feasibility-checked, deterministically
//! ordered pool of question candidates for the adaptive planner.

use crate::config::PoolConfig;
use crate::error::{PlannerError, StorageError};
use crate::storage::questions::{active_questions, last_served_at_by_question, recent_questions_for, Question, QuestionFilter};
use crate::storage::DbPool;
use chrono::{DateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// A question plus any per-candidate overrides, replacing the ambient
/// mutable attributes the original attached directly to question objects.
#[derive(Debug, Clone)]
pub struct CandidateWrapper {
    /// The underlying question. Never mutated in place.
    pub question: Question,
    /// A forced difficulty override for this planning pass, if any.
    pub forced_difficulty: Option<String>,
    /// Selection telemetry attached once the planner picks this candidate.
    pub telemetry: Option<String>,
}

impl CandidateWrapper {
    fn new(question: Question) -> Self {
        Self {
            question,
            forced_difficulty: None,
            telemetry: None,
        }
    }
}

/// Whether the pool satisfies the minimum band and PYQ-frequency counts
/// required for Phase B/C planning (§4.8).
#[derive(Debug, Clone, Default)]
pub struct FeasibilityReport {
    /// Count of Easy candidates in the pool.
    pub easy_count: usize,
    /// Count of Medium candidates in the pool.
    pub medium_count: usize,
    /// Count of Hard candidates in the pool.
    pub hard_count: usize,
    /// Count of candidates with `pyq_frequency_score >= 1.0`.
    pub pyq_1_0_count: usize,
    /// Count of candidates with `pyq_frequency_score >= 1.5`.
    pub pyq_1_5_count: usize,
    /// Which ladder rung (`K`, `2K`, or `4K`) produced this pool.
    pub pool_rung: u32,
    /// Whether recent-question exclusion was relaxed to reach feasibility.
    pub recent_exclusion_relaxed: bool,
    /// Whether difficulty-specific cooldown exclusion was relaxed to reach feasibility.
    pub cooldowns_relaxed: bool,
}

impl FeasibilityReport {
    /// Phase B/C baseline minima: ≥3 Easy, ≥6 Medium, ≥3 Hard, ≥2 PYQ≥1.0, ≥2 PYQ≥1.5.
    pub fn is_feasible(&self) -> bool {
        self.easy_count >= 3
            && self.medium_count >= 6
            && self.hard_count >= 3
            && self.pyq_1_0_count >= 2
            && self.pyq_1_5_count >= 2
    }
}

/// A built candidate pool, partitioned by difficulty band and already
/// ordered deterministically within each band.
#[derive(Debug, Clone)]
pub struct CandidatePool {
    /// Candidates grouped by difficulty band.
    pub by_band: HashMap<String, Vec<CandidateWrapper>>,
    /// The feasibility report for the rung this pool was built at.
    pub feasibility: FeasibilityReport,
}

fn stable_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Deterministic rank for a candidate: `hash(question_id) XOR hash(seed)`.
/// Replaces any engine-level or language-level random ordering (§9).
fn deterministic_rank(question_id: &str, seed: &str) -> u64 {
    stable_hash(&question_id) ^ stable_hash(&seed)
}

fn seed_for(student_id: &str, session_seq: i64) -> String {
    format!("{student_id}:{session_seq}")
}

fn cooldown_days_for(band: &str, config: &PoolConfig) -> u32 {
    match band {
        "Easy" => config.cooldown_easy_days,
        "Hard" => config.cooldown_hard_days,
        _ => config.cooldown_medium_days,
    }
}

/// Whether `last_served` is still within `band`'s cooldown window as of `now`.
fn in_cooldown(last_served: Option<&String>, band: &str, config: &PoolConfig, now: DateTime<Utc>) -> bool {
    let cooldown_days = cooldown_days_for(band, config);
    if cooldown_days == 0 {
        return false;
    }
    let Some(last_served) = last_served else {
        return false;
    };
    let Ok(last_served) = DateTime::parse_from_rfc3339(last_served) else {
        return false;
    };
    let elapsed_days = (now - last_served.with_timezone(&Utc)).num_seconds() as f64 / 86_400.0;
    elapsed_days < cooldown_days as f64
}

fn compute_feasibility(
    by_band: &HashMap<String, Vec<CandidateWrapper>>,
    rung: u32,
    recent_exclusion_relaxed: bool,
    cooldowns_relaxed: bool,
) -> FeasibilityReport {
    let count_pyq = |min: f64| -> usize {
        by_band
            .values()
            .flatten()
            .filter(|c| c.question.pyq_frequency_score.map(|s| s >= min).unwrap_or(false))
            .count()
    };

    FeasibilityReport {
        easy_count: by_band.get("Easy").map(|v| v.len()).unwrap_or(0),
        medium_count: by_band.get("Medium").map(|v| v.len()).unwrap_or(0),
        hard_count: by_band.get("Hard").map(|v| v.len()).unwrap_or(0),
        pyq_1_0_count: count_pyq(1.0),
        pyq_1_5_count: count_pyq(1.5),
        pool_rung: rung,
        recent_exclusion_relaxed,
        cooldowns_relaxed,
    }
}

#[allow(clippy::too_many_arguments)]
async fn fetch_pool_at_rung(
    pool: &DbPool,
    student_id: &str,
    session_seq: i64,
    rung: u32,
    exclude_recent: bool,
    exclude_cooldowns: bool,
    config: &PoolConfig,
    now: DateTime<Utc>,
) -> Result<HashMap<String, Vec<CandidateWrapper>>, StorageError> {
    let excluded: Vec<String> = if exclude_recent {
        recent_questions_for(pool, student_id, 3).await?
    } else {
        Vec::new()
    };
    let last_served = if exclude_cooldowns {
        last_served_at_by_question(pool, student_id).await?
    } else {
        HashMap::new()
    };

    let seed = seed_for(student_id, session_seq);
    let mut by_band: HashMap<String, Vec<CandidateWrapper>> = HashMap::new();

    for band in ["Easy", "Medium", "Hard"] {
        let filter = QuestionFilter {
            difficulty_band: Some(band.to_string()),
            ..Default::default()
        };
        let mut questions = active_questions(pool, &filter).await?;
        questions.retain(|q| !excluded.contains(&q.id));
        if exclude_cooldowns {
            questions.retain(|q| !in_cooldown(last_served.get(&q.id), band, config, now));
        }
        questions.sort_by_key(|q| deterministic_rank(&q.id, &seed));
        questions.truncate(rung as usize);
        by_band.insert(band.to_string(), questions.into_iter().map(CandidateWrapper::new).collect());
    }

    Ok(by_band)
}

/// Build a feasibility-checked candidate pool for `student_id`, expanding
/// the ladder `[K, 2K, 4K]` and relaxing, in order, difficulty-specific
/// cooldowns and then recent-question exclusion as a last resort (§4.7, §4.8).
pub async fn build_pool(
    pool: &DbPool,
    student_id: &str,
    session_seq: i64,
    config: &PoolConfig,
) -> Result<CandidatePool, PlannerError> {
    let now = Utc::now();

    for &rung in &config.ladder {
        let by_band = fetch_pool_at_rung(pool, student_id, session_seq, rung, true, true, config, now).await?;
        let feasibility = compute_feasibility(&by_band, rung, false, false);
        if feasibility.is_feasible() {
            return Ok(CandidatePool { by_band, feasibility });
        }
    }

    let widest = *config.ladder.last().unwrap_or(&config.k_per_band);

    // Relax cooldowns first, keeping recent-session exclusion in force.
    let by_band = fetch_pool_at_rung(pool, student_id, session_seq, widest, true, false, config, now).await?;
    let feasibility = compute_feasibility(&by_band, widest, false, true);
    if feasibility.is_feasible() {
        return Ok(CandidatePool { by_band, feasibility });
    }

    // Last resort: relax recent-question exclusion too.
    let by_band = fetch_pool_at_rung(pool, student_id, session_seq, widest, false, false, config, now).await?;
    let feasibility = compute_feasibility(&by_band, widest, true, true);
    if feasibility.is_feasible() {
        return Ok(CandidatePool { by_band, feasibility });
    }

    Err(PlannerError::PoolInfeasible {
        detail: format!(
            "easy={} medium={} hard={} pyq1.0={} pyq1.5={}",
            feasibility.easy_count, feasibility.medium_count, feasibility.hard_count, feasibility.pyq_1_0_count, feasibility.pyq_1_5_count
        ),
    })
}

/// Cold-start pool: diversity-first, ~100 distinct questions spanning the
/// widest (subcategory, type) coverage, guaranteeing the PYQ minima up
/// front (§4.8).
pub async fn build_cold_start_pool(pool: &DbPool, student_id: &str, session_seq: i64) -> Result<CandidatePool, PlannerError> {
    let seed = seed_for(student_id, session_seq);
    let mut by_band: HashMap<String, Vec<CandidateWrapper>> = HashMap::new();

    for band in ["Easy", "Medium", "Hard"] {
        let filter = QuestionFilter {
            difficulty_band: Some(band.to_string()),
            ..Default::default()
        };
        let mut questions = active_questions(pool, &filter).await?;
        questions.sort_by_key(|q| deterministic_rank(&q.id, &seed));

        let mut seen_combinations = std::collections::HashSet::new();
        let mut selected = Vec::new();
        for question in questions {
            let combo = (question.subcategory.clone(), question.type_of_question.clone());
            if seen_combinations.insert(combo) || selected.len() < 100 {
                selected.push(question);
            }
            if selected.len() >= 100 {
                break;
            }
        }
        by_band.insert(band.to_string(), selected.into_iter().map(CandidateWrapper::new).collect());
    }

    let feasibility = compute_feasibility(&by_band, 0, false, false);
    Ok(CandidatePool { by_band, feasibility })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_rank_is_stable_across_calls() {
        let a = deterministic_rank("q1", "student1:5");
        let b = deterministic_rank("q1", "student1:5");
        assert_eq!(a, b);
    }

    #[test]
    fn deterministic_rank_differs_by_seed() {
        let a = deterministic_rank("q1", "student1:5");
        let b = deterministic_rank("q1", "student1:6");
        assert_ne!(a, b);
    }

    #[test]
    fn feasibility_report_requires_all_minima() {
        let report = FeasibilityReport {
            easy_count: 3,
            medium_count: 6,
            hard_count: 2,
            pyq_1_0_count: 2,
            pyq_1_5_count: 2,
            pool_rung: 80,
            recent_exclusion_relaxed: false,
            cooldowns_relaxed: false,
        };
        assert!(!report.is_feasible());
    }

    #[test]
    fn feasibility_report_passes_at_minima() {
        let report = FeasibilityReport {
            easy_count: 3,
            medium_count: 6,
            hard_count: 3,
            pyq_1_0_count: 2,
            pyq_1_5_count: 2,
            pool_rung: 80,
            recent_exclusion_relaxed: false,
            cooldowns_relaxed: false,
        };
        assert!(report.is_feasible());
    }

    #[test]
    fn in_cooldown_is_false_when_cooldown_days_is_zero() {
        let config = PoolConfig::default();
        let last_served = Utc::now().to_rfc3339();
        assert!(!in_cooldown(Some(&last_served), "Medium", &config, Utc::now()));
    }

    #[test]
    fn in_cooldown_respects_the_window() {
        let mut config = PoolConfig::default();
        config.cooldown_medium_days = 7;
        let now = Utc::now();
        let just_served = now.to_rfc3339();
        let long_ago = (now - chrono::Duration::days(30)).to_rfc3339();
        assert!(in_cooldown(Some(&just_served), "Medium", &config, now));
        assert!(!in_cooldown(Some(&long_ago), "Medium", &config, now));
        assert!(!in_cooldown(None, "Medium", &config, now));
    }
}

#[cfg(test)]
mod cooldown_scenario_tests {
    use super::*;
    use crate::storage::init_test_db;
    use crate::storage::questions::{upsert_question, Question};
    use crate::storage::sessions::{create_session, mark_served, next_sequence, save_pack};
    use std::collections::HashSet;

    fn mk_question(id: &str, subcategory: &str, band: &str, pyq: f64) -> Question {
        let now = Utc::now().to_rfc3339();
        Question {
            id: id.to_string(),
            stem: format!("Sample {subcategory} question"),
            source: "admin".to_string(),
            admin_answer: Some("42".to_string()),
            admin_solution: Some("worked solution".to_string()),
            principle_to_remember: None,
            image_url: None,
            right_answer: Some("42".to_string()),
            category: "Arithmetic".to_string(),
            subcategory: subcategory.to_string(),
            type_of_question: "Basics".to_string(),
            difficulty_band: band.to_string(),
            difficulty_score: 2.5,
            pyq_frequency_score: Some(pyq),
            core_concepts: None,
            solution_method: None,
            concept_difficulty: None,
            operations_required: None,
            problem_structure: None,
            concept_keywords: None,
            is_active: true,
            quality_verified: true,
            concept_extraction_status: "completed".to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    async fn seed_feasible_pool(pool: &DbPool, extra_medium: &str) {
        for i in 0..3 {
            upsert_question(pool, &mk_question(&format!("easy-{i}"), "Percentages", "Easy", 1.6)).await.unwrap();
        }
        for i in 0..6 {
            upsert_question(pool, &mk_question(&format!("med-{i}"), "Percentages", "Medium", 1.6)).await.unwrap();
        }
        for i in 0..3 {
            upsert_question(pool, &mk_question(&format!("hard-{i}"), "Percentages", "Hard", 1.6)).await.unwrap();
        }
        upsert_question(pool, &mk_question(extra_medium, "Percentages", "Medium", 1.6)).await.unwrap();
    }

    async fn serve_question_to(pool: &DbPool, student_id: &str, question_id: &str) {
        let seq = next_sequence(pool, student_id).await.unwrap();
        let session = create_session(pool, student_id, seq, &format!("{student_id}:{seq}"), "A", true).await.unwrap();
        save_pack(pool, &session.id, &format!("[\"{question_id}\"]"), "{}").await.unwrap();
        mark_served(pool, &session.id).await.unwrap();
    }

    #[tokio::test]
    async fn build_pool_excludes_a_cooled_down_question_when_pool_stays_feasible() {
        let pool = init_test_db().await.unwrap();
        seed_feasible_pool(&pool, "med-extra").await;
        serve_question_to(&pool, "student1", "med-extra").await;
        // Push med-extra's serve outside the last-3-sessions recent-exclusion
        // window so only the cooldown filter is responsible for its exclusion.
        for _ in 0..3 {
            serve_question_to(&pool, "student1", "easy-0").await;
        }

        let mut config = PoolConfig::default();
        config.cooldown_medium_days = 7;

        let built = build_pool(&pool, "student1", 5, &config).await.unwrap();
        let ids: HashSet<String> = built.by_band.values().flatten().map(|c| c.question.id.clone()).collect();
        assert!(!ids.contains("med-extra"));
        assert!(!built.feasibility.cooldowns_relaxed);
        assert!(!built.feasibility.recent_exclusion_relaxed);
    }

    #[tokio::test]
    async fn build_pool_relaxes_cooldowns_when_exclusion_would_be_infeasible() {
        let pool = init_test_db().await.unwrap();
        for i in 0..3 {
            upsert_question(&pool, &mk_question(&format!("easy-{i}"), "Percentages", "Easy", 1.6)).await.unwrap();
        }
        for i in 0..6 {
            upsert_question(&pool, &mk_question(&format!("med-{i}"), "Percentages", "Medium", 1.6)).await.unwrap();
        }
        for i in 0..3 {
            upsert_question(&pool, &mk_question(&format!("hard-{i}"), "Percentages", "Hard", 1.6)).await.unwrap();
        }
        serve_question_to(&pool, "student1", "med-0").await;
        // Push med-0's serve outside the separate last-3-sessions recent-exclusion
        // window, so only the cooldown filter (which keys off elapsed time, not
        // session count) is what needs relaxing below.
        for _ in 0..3 {
            serve_question_to(&pool, "student1", "easy-0").await;
        }

        let mut config = PoolConfig::default();
        config.cooldown_medium_days = 7;

        let built = build_pool(&pool, "student1", 5, &config).await.unwrap();
        let ids: HashSet<String> = built.by_band.values().flatten().map(|c| c.question.id.clone()).collect();
        assert!(ids.contains("med-0"));
        assert!(built.feasibility.cooldowns_relaxed);
        assert!(!built.feasibility.recent_exclusion_relaxed);
    }
}
