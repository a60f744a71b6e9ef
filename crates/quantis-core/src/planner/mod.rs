//! Adaptive Planner (C7): turns a candidate pool, a student's mastery
//! profile, and their adaptive phase into a deterministic 12-question
//! pack with full selection telemetry.

pub mod candidates;

use candidates::{build_cold_start_pool, build_pool, CandidateWrapper, FeasibilityReport};
use crate::config::{Config, PhaseConfig};
use crate::error::PlannerError;
use crate::mastery::ReadinessBand;
use crate::storage::coverage::coverage_for_student;
use crate::storage::mastery::{mastery_for_student, SUBCATEGORY_LEVEL};
use crate::storage::sessions::count_served_or_completed;
use crate::storage::DbPool;
use crate::taxonomy::data::BASELINE_CATEGORY_QUOTAS;
use crate::taxonomy::category_for_subcategory;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

const PACK_SIZE: usize = 12;

/// A student's adaptive phase, determined by their served-or-completed
/// session count (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Coverage & Calibration: n < phase_a_cutoff.
    A,
    /// Strengthen & Stretch: phase_a_cutoff <= n < phase_b_cutoff.
    B,
    /// Fully Adaptive: n >= phase_b_cutoff.
    C,
}

impl Phase {
    /// Determine phase from `n`, the count of served-or-completed sessions.
    pub fn determine(n: u32, config: &PhaseConfig) -> Self {
        if n < config.phase_a_cutoff {
            Phase::A
        } else if n < config.phase_b_cutoff {
            Phase::B
        } else {
            Phase::C
        }
    }

    /// Single-letter label used in session records and telemetry.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::A => "A",
            Phase::B => "B",
            Phase::C => "C",
        }
    }

    fn difficulty_mix(self) -> (f64, f64, f64) {
        match self {
            Phase::A => (0.20, 0.75, 0.05),
            Phase::B => (0.20, 0.50, 0.30),
            Phase::C => (0.15, 0.55, 0.30),
        }
    }
}

/// Target question counts per difficulty band, always summing to 12.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DifficultyTargets {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

/// Convert a phase's percentage mix into integer quotas that sum to
/// exactly 12, absorbing rounding drift into the Medium band (always the
/// plurality band across all three phases).
fn difficulty_targets_for(phase: Phase) -> DifficultyTargets {
    let (easy_pct, medium_pct, hard_pct) = phase.difficulty_mix();
    let easy = (easy_pct * PACK_SIZE as f64).round() as i32;
    let mut medium = (medium_pct * PACK_SIZE as f64).round() as i32;
    let hard = (hard_pct * PACK_SIZE as f64).round() as i32;
    medium += PACK_SIZE as i32 - (easy + medium + hard);

    DifficultyTargets {
        easy: easy.max(0) as u32,
        medium: medium.max(0) as u32,
        hard: hard.max(0) as u32,
    }
}

/// Per-category quotas for a pack, keyed by canonical category name.
pub type CategoryQuotas = HashMap<String, u32>;

fn baseline_category_quotas() -> CategoryQuotas {
    BASELINE_CATEGORY_QUOTAS.iter().map(|(c, q)| (c.to_string(), *q)).collect()
}

/// Average mastery percentage per category, rolled up from each
/// category's subcategory-level mastery records (§4.7's Phase C shift
/// rule needs a category-level signal but mastery is only tracked per
/// subcategory).
fn category_mastery_averages(records: &[crate::storage::mastery::MasteryRecord]) -> HashMap<String, f64> {
    let mut sums: HashMap<String, (f64, u32)> = HashMap::new();
    for record in records {
        if record.type_of_question != SUBCATEGORY_LEVEL {
            continue;
        }
        let Some(category) = category_for_subcategory(&record.subcategory) else {
            continue;
        };
        let entry = sums.entry(category.to_string()).or_insert((0.0, 0));
        entry.0 += record.mastery_pct;
        entry.1 += 1;
    }
    sums.into_iter().map(|(category, (total, count))| (category, total / count as f64)).collect()
}

/// Apply the Phase C ±1 category quota shift: +1 to the single weakest
/// category, -1 from the strongest category when its average mastery is
/// above 0.70 and its baseline quota is at least 2 (§4.7).
fn apply_phase_c_shift(mut quotas: CategoryQuotas, averages: &HashMap<String, f64>) -> CategoryQuotas {
    if averages.is_empty() {
        return quotas;
    }

    let weakest = averages.iter().min_by(|a, b| a.1.partial_cmp(b.1).unwrap()).map(|(c, _)| c.clone());
    let strongest = averages.iter().max_by(|a, b| a.1.partial_cmp(b.1).unwrap());

    if let Some((strong_category, &strong_avg)) = strongest {
        if strong_avg > 0.70 && quotas.get(strong_category).copied().unwrap_or(0) >= 2 {
            if let Some(weak_category) = weakest {
                if &weak_category != strong_category {
                    *quotas.entry(strong_category.clone()).or_insert(0) -= 1;
                    *quotas.entry(weak_category).or_insert(0) += 1;
                }
            }
        }
    }

    quotas
}

/// Weakness priority per subcategory, derived from its subcategory-level
/// mastery band: 0 for Needs-focus, 1 for On-track, 2 for Mastered.
/// Subcategories with no mastery history yet default to 0 (weak), since
/// an unattempted area should be prioritized the same as a struggling one.
fn weakness_priority(subcategory: &str, masteries: &HashMap<String, f64>) -> u8 {
    match masteries.get(subcategory) {
        Some(&pct) => match ReadinessBand::from_pct(pct) {
            ReadinessBand::NeedsFocus => 0,
            ReadinessBand::OnTrack => 1,
            ReadinessBand::Mastered => 2,
        },
        None => 0,
    }
}

/// Selection telemetry attached to every planned pack (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanTelemetry {
    pub phase: String,
    pub target_difficulty: DifficultyTargets,
    pub actual_difficulty: DifficultyTargets,
    pub category_distribution: HashMap<String, u32>,
    pub subcategory_distribution: HashMap<String, u32>,
    pub type_distribution: HashMap<String, u32>,
    pub coverage_new_count: u32,
    pub coverage_seen_count: u32,
    pub backfill_notes: Vec<String>,
    /// Whether cooldown exclusion was enforced as-is, without relaxation (§4.7).
    pub cooldowns_applied: bool,
    pub llm_assessment_respected: bool,
    pub feasibility: FeasibilityRecord,
    pub session_type: String,
}

/// A serializable snapshot of the pool feasibility report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeasibilityRecord {
    pub easy_count: usize,
    pub medium_count: usize,
    pub hard_count: usize,
    pub pyq_1_0_count: usize,
    pub pyq_1_5_count: usize,
    pub pool_rung: u32,
    pub recent_exclusion_relaxed: bool,
    pub cooldowns_relaxed: bool,
}

impl From<&FeasibilityReport> for FeasibilityRecord {
    fn from(r: &FeasibilityReport) -> Self {
        Self {
            easy_count: r.easy_count,
            medium_count: r.medium_count,
            hard_count: r.hard_count,
            pyq_1_0_count: r.pyq_1_0_count,
            pyq_1_5_count: r.pyq_1_5_count,
            pool_rung: r.pool_rung,
            recent_exclusion_relaxed: r.recent_exclusion_relaxed,
            cooldowns_relaxed: r.cooldowns_relaxed,
        }
    }
}

/// The final planned pack: ordered question ids plus telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedPack {
    pub question_ids: Vec<String>,
    pub telemetry: PlanTelemetry,
    pub phase: String,
}

fn stable_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn deterministic_rank(question_id: &str, seed: &str) -> u64 {
    stable_hash(&question_id) ^ stable_hash(&seed)
}

/// A candidate still eligible for selection, with the bookkeeping the
/// selection loop needs (is this combination new-to-student, which
/// category does it belong to).
struct Eligible<'a> {
    candidate: &'a CandidateWrapper,
    is_coverage_new: bool,
}

fn partition_band<'a>(
    band_candidates: &'a [CandidateWrapper],
    seen_combinations: &HashSet<(String, String)>,
) -> (Vec<Eligible<'a>>, Vec<Eligible<'a>>) {
    let mut new = Vec::new();
    let mut seen = Vec::new();
    for candidate in band_candidates {
        let combo = (candidate.question.subcategory.clone(), candidate.question.type_of_question.clone());
        let entry = Eligible {
            candidate,
            is_coverage_new: !seen_combinations.contains(&combo),
        };
        if entry.is_coverage_new {
            new.push(entry);
        } else {
            seen.push(entry);
        }
    }
    (new, seen)
}

struct SelectionState {
    selected: Vec<String>,
    category_counts: HashMap<String, u32>,
    subcategory_counts: HashMap<String, u32>,
    type_counts: HashMap<(String, String), u32>,
    coverage_new_count: u32,
    coverage_seen_count: u32,
}

impl SelectionState {
    fn new() -> Self {
        Self {
            selected: Vec::new(),
            category_counts: HashMap::new(),
            subcategory_counts: HashMap::new(),
            type_counts: HashMap::new(),
            coverage_new_count: 0,
            coverage_seen_count: 0,
        }
    }

    fn try_take(
        &mut self,
        entry: &Eligible<'_>,
        category_quotas: &CategoryQuotas,
        max_per_subcategory: u32,
        max_per_type: u32,
    ) -> bool {
        let q = &entry.candidate.question;
        if self.selected.contains(&q.id) {
            return false;
        }
        if let Some(&quota) = category_quotas.get(&q.category) {
            if self.category_counts.get(&q.category).copied().unwrap_or(0) >= quota {
                return false;
            }
        }
        if self.subcategory_counts.get(&q.subcategory).copied().unwrap_or(0) >= max_per_subcategory {
            return false;
        }
        let type_key = (q.subcategory.clone(), q.type_of_question.clone());
        if self.type_counts.get(&type_key).copied().unwrap_or(0) >= max_per_type {
            return false;
        }

        self.selected.push(q.id.clone());
        *self.category_counts.entry(q.category.clone()).or_insert(0) += 1;
        *self.subcategory_counts.entry(q.subcategory.clone()).or_insert(0) += 1;
        *self.type_counts.entry(type_key).or_insert(0) += 1;
        if entry.is_coverage_new {
            self.coverage_new_count += 1;
        } else {
            self.coverage_seen_count += 1;
        }
        true
    }
}

/// Sort candidates within a band by `(weakness_priority, -pyq_frequency_score, type_token)`.
fn order_candidates(entries: &mut [Eligible<'_>], weak_by_subcategory: &HashMap<String, f64>) {
    entries.sort_by(|a, b| {
        let wa = weakness_priority(&a.candidate.question.subcategory, weak_by_subcategory);
        let wb = weakness_priority(&b.candidate.question.subcategory, weak_by_subcategory);
        wa.cmp(&wb)
            .then_with(|| {
                let pa = a.candidate.question.pyq_frequency_score.unwrap_or(0.0);
                let pb = b.candidate.question.pyq_frequency_score.unwrap_or(0.0);
                pb.partial_cmp(&pa).unwrap()
            })
            .then_with(|| a.candidate.question.type_of_question.cmp(&b.candidate.question.type_of_question))
    });
}

/// Run steps 3-5 of the selection algorithm against a built candidate
/// pool, returning the selected ids, coverage counts, and backfill notes.
fn select_from_pool(
    by_band: &HashMap<String, Vec<CandidateWrapper>>,
    targets: DifficultyTargets,
    category_quotas: &CategoryQuotas,
    seen_combinations: &HashSet<(String, String)>,
    weak_by_subcategory: &HashMap<String, f64>,
    diversity_rungs: &[u32],
    max_per_type: u32,
) -> (SelectionState, Vec<String>) {
    let mut state = SelectionState::new();
    let mut backfill_notes = Vec::new();
    let empty: Vec<CandidateWrapper> = Vec::new();

    let target_for = |band: &str| match band {
        "Hard" => targets.hard,
        "Easy" => targets.easy,
        _ => targets.medium,
    };

    for band in ["Hard", "Easy", "Medium"] {
        let band_candidates = by_band.get(band).unwrap_or(&empty);
        let (mut new_part, mut seen_part) = partition_band(band_candidates, seen_combinations);
        order_candidates(&mut new_part, weak_by_subcategory);
        order_candidates(&mut seen_part, weak_by_subcategory);

        let quota = target_for(band) as usize;
        let start_len = state.selected.len();
        'rungs: for &cap in diversity_rungs {
            for entry in new_part.iter().chain(seen_part.iter()) {
                if state.selected.len() - start_len >= quota {
                    break 'rungs;
                }
                state.try_take(entry, category_quotas, cap, max_per_type);
            }
            if state.selected.len() - start_len >= quota {
                break;
            }
        }
    }

    if state.selected.len() < PACK_SIZE {
        for band in ["Medium", "Easy", "Hard"] {
            let band_candidates = by_band.get(band).unwrap_or(&empty);
            let (mut new_part, mut seen_part) = partition_band(band_candidates, seen_combinations);
            order_candidates(&mut new_part, weak_by_subcategory);
            order_candidates(&mut seen_part, weak_by_subcategory);

            for &cap in diversity_rungs {
                if state.selected.len() >= PACK_SIZE {
                    break;
                }
                let before = state.selected.len();
                for entry in new_part.iter().chain(seen_part.iter()) {
                    if state.selected.len() >= PACK_SIZE {
                        break;
                    }
                    state.try_take(entry, category_quotas, cap, max_per_type);
                }
                if state.selected.len() > before {
                    backfill_notes.push(format!("backfilled from {band} at subcategory cap {cap}"));
                }
            }
        }
    }

    (state, backfill_notes)
}

/// Order the final pack for presentation: by `(difficulty_order, subcategory, pyq_frequency_score)`.
fn order_for_presentation(ids: Vec<String>, questions_by_id: &HashMap<String, &crate::storage::questions::Question>) -> Vec<String> {
    let band_order = |band: &str| match band {
        "Easy" => 0,
        "Medium" => 1,
        _ => 2,
    };
    let mut ordered = ids;
    ordered.sort_by(|a, b| {
        let qa = questions_by_id[a];
        let qb = questions_by_id[b];
        band_order(&qa.difficulty_band)
            .cmp(&band_order(&qb.difficulty_band))
            .then_with(|| qa.subcategory.cmp(&qb.subcategory))
            .then_with(|| qb.pyq_frequency_score.partial_cmp(&qa.pyq_frequency_score).unwrap())
    });
    ordered
}

/// A last-resort, seeded-random pack used when the main selection
/// algorithm cannot be completed (§4.7 Fallback).
fn fallback_pack(by_band: &HashMap<String, Vec<CandidateWrapper>>, seed: &str) -> PlannedPack {
    let mut all: Vec<&CandidateWrapper> = by_band.values().flatten().collect();
    all.sort_by_key(|c| deterministic_rank(&c.question.id, seed));
    let ids: Vec<String> = all.into_iter().take(PACK_SIZE).map(|c| c.question.id.clone()).collect();
    let actual = DifficultyTargets::default();

    PlannedPack {
        question_ids: ids,
        phase: "A".to_string(),
        telemetry: PlanTelemetry {
            phase: "fallback".to_string(),
            target_difficulty: actual,
            actual_difficulty: actual,
            category_distribution: HashMap::new(),
            subcategory_distribution: HashMap::new(),
            type_distribution: HashMap::new(),
            coverage_new_count: 0,
            coverage_seen_count: 0,
            backfill_notes: vec!["fallback: simple_random pack".to_string()],
            cooldowns_applied: false,
            llm_assessment_respected: false,
            feasibility: FeasibilityRecord {
                easy_count: 0,
                medium_count: 0,
                hard_count: 0,
                pyq_1_0_count: 0,
                pyq_1_5_count: 0,
                pool_rung: 0,
                recent_exclusion_relaxed: false,
                cooldowns_relaxed: false,
            },
            session_type: "simple_random".to_string(),
        },
    }
}

/// Plan a 12-question pack for `student_id`'s `session_seq`-th session
/// (§4.7). Determines phase from the student's history, builds a
/// feasibility-checked candidate pool (§4.8), and runs the deterministic
/// selection algorithm. Falls back to a seeded-random pack rather than
/// failing the caller when the pool is unrecoverable.
pub async fn plan_session(
    pool: &DbPool,
    config: &Config,
    student_id: &str,
    session_seq: i64,
) -> Result<PlannedPack, PlannerError> {
    let n = count_served_or_completed(pool, student_id).await?;
    let phase = Phase::determine(n, &config.phases);
    let seed = format!("{student_id}:{session_seq}");

    let candidate_pool = if n == 0 {
        build_cold_start_pool(pool, student_id, session_seq).await
    } else {
        build_pool(pool, student_id, session_seq, &config.pool).await
    };

    let candidate_pool = match candidate_pool {
        Ok(p) => p,
        Err(_) => {
            let widest = build_cold_start_pool(pool, student_id, session_seq).await?;
            return Ok(fallback_pack(&widest.by_band, &seed));
        }
    };

    let mastery_records = mastery_for_student(pool, student_id).await?;
    let coverage_records = coverage_for_student(pool, student_id).await?;
    let seen_combinations: HashSet<(String, String)> = coverage_records
        .iter()
        .map(|c| (c.subcategory.clone(), c.type_of_question.clone()))
        .collect();
    let weak_by_subcategory: HashMap<String, f64> = mastery_records
        .iter()
        .filter(|r| r.type_of_question == SUBCATEGORY_LEVEL)
        .map(|r| (r.subcategory.clone(), r.mastery_pct))
        .collect();

    let mut targets = difficulty_targets_for(phase);
    let mut llm_assessment_respected = false;
    if phase == Phase::A {
        let no_easy = candidate_pool.by_band.get("Easy").map(|v| v.is_empty()).unwrap_or(true);
        let no_hard = candidate_pool.by_band.get("Hard").map(|v| v.is_empty()).unwrap_or(true);
        if no_easy && no_hard {
            targets = DifficultyTargets { easy: 0, medium: PACK_SIZE as u32, hard: 0 };
            llm_assessment_respected = true;
        }
    }

    let mut category_quotas = baseline_category_quotas();
    if phase == Phase::C {
        let averages = category_mastery_averages(&mastery_records);
        category_quotas = apply_phase_c_shift(category_quotas, &averages);
    }

    let diversity_rungs = [
        config.diversity.max_per_subcategory_strict,
        config.diversity.max_per_subcategory_relaxed,
        config.diversity.max_per_subcategory_ceiling,
    ];

    let (state, backfill_notes) = select_from_pool(
        &candidate_pool.by_band,
        targets,
        &category_quotas,
        &seen_combinations,
        &weak_by_subcategory,
        &diversity_rungs,
        config.diversity.max_per_type,
    );

    if state.selected.len() < PACK_SIZE {
        return Ok(fallback_pack(&candidate_pool.by_band, &seed));
    }

    let mut questions_by_id = HashMap::new();
    for candidate in candidate_pool.by_band.values().flatten() {
        questions_by_id.insert(candidate.question.id.clone(), &candidate.question);
    }
    let ordered_ids = order_for_presentation(state.selected.clone(), &questions_by_id);

    let actual_easy = ordered_ids.iter().filter(|id| questions_by_id[*id].difficulty_band == "Easy").count() as u32;
    let actual_medium = ordered_ids.iter().filter(|id| questions_by_id[*id].difficulty_band == "Medium").count() as u32;
    let actual_hard = ordered_ids.iter().filter(|id| questions_by_id[*id].difficulty_band == "Hard").count() as u32;

    let telemetry = PlanTelemetry {
        phase: phase.as_str().to_string(),
        target_difficulty: targets,
        actual_difficulty: DifficultyTargets {
            easy: actual_easy,
            medium: actual_medium,
            hard: actual_hard,
        },
        category_distribution: state.category_counts,
        subcategory_distribution: state.subcategory_counts,
        type_distribution: state
            .type_counts
            .into_iter()
            .map(|((sub, ty), count)| (format!("{sub}::{ty}"), count))
            .collect(),
        coverage_new_count: state.coverage_new_count,
        coverage_seen_count: state.coverage_seen_count,
        backfill_notes,
        cooldowns_applied: !candidate_pool.feasibility.cooldowns_relaxed,
        llm_assessment_respected,
        feasibility: (&candidate_pool.feasibility).into(),
        session_type: "adaptive".to_string(),
    };

    Ok(PlannedPack {
        question_ids: ordered_ids,
        telemetry,
        phase: phase.as_str().to_string(),
    })
}


/// End-to-end scenarios for `plan_session` against a real (in-memory)
/// database, covering the four phase/feasibility situations a student can
/// walk into (§8): Phase A cold start, Phase A relaxation to an
/// all-Medium pack, Phase B targeting, and Phase C adaptive targeting.
/// The per-field arithmetic of targets/quotas is covered by the unit
/// tests above; these confirm the full pipeline wires together.
#[cfg(test)]
mod scenario_tests {
    use super::*;
    use crate::storage::init_test_db;
    use crate::storage::mastery::{upsert_mastery, MasteryRecord};
    use crate::storage::questions::{upsert_question, Question};
    use crate::storage::sessions::{create_session, mark_served, next_sequence};
    use chrono::Utc;

    const CATEGORIES: [(&str, &str); 5] = [
        ("Arithmetic", "Percentages"),
        ("Algebra", "Linear Equations"),
        ("Geometry and Mensuration", "Triangles"),
        ("Number System", "HCF-LCM"),
        ("Modern Math", "Probability"),
    ];

    fn mk_question(id: String, category: &str, subcategory: &str, band: &str, pyq: f64) -> Question {
        let now = Utc::now().to_rfc3339();
        let difficulty_score = match band {
            "Easy" => 1.5,
            "Hard" => 4.0,
            _ => 2.5,
        };
        Question {
            id,
            stem: format!("Sample {subcategory} question"),
            source: "admin".to_string(),
            admin_answer: Some("42".to_string()),
            admin_solution: Some("worked solution".to_string()),
            principle_to_remember: None,
            image_url: None,
            right_answer: Some("42".to_string()),
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            type_of_question: "Basics".to_string(),
            difficulty_band: band.to_string(),
            difficulty_score,
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

    /// Advance `student_id` to `n` served-or-completed sessions so phase
    /// detection sees the right history.
    async fn advance_to_session_count(pool: &DbPool, student_id: &str, n: u32) {
        for _ in 0..n {
            let seq = next_sequence(pool, student_id).await.unwrap();
            let session = create_session(pool, student_id, seq, &uuid::Uuid::new_v4().to_string(), "A", true).await.unwrap();
            mark_served(pool, &session.id).await.unwrap();
        }
    }

    #[tokio::test]
    async fn phase_a_cold_start_builds_a_full_pack() {
        let pool = init_test_db().await.unwrap();
        let config = Config::default();

        let mut idx = 0;
        for (category, subcategory) in CATEGORIES {
            for _ in 0..3 {
                idx += 1;
                upsert_question(&pool, &mk_question(format!("med-{idx}"), category, subcategory, "Medium", 0.5)).await.unwrap();
            }
            idx += 1;
            upsert_question(&pool, &mk_question(format!("easy-{idx}"), category, subcategory, "Easy", 0.5)).await.unwrap();
        }
        upsert_question(&pool, &mk_question("hard-1".to_string(), "Arithmetic", "Percentages", "Hard", 1.6)).await.unwrap();

        let pack = plan_session(&pool, &config, "new-student", 1).await.unwrap();

        assert_eq!(pack.phase, "A");
        assert_eq!(pack.question_ids.len(), 12);
        assert_eq!(pack.telemetry.session_type, "adaptive");
        assert!(!pack.telemetry.llm_assessment_respected);

        let expected = difficulty_targets_for(Phase::A);
        assert_eq!(pack.telemetry.target_difficulty.easy, expected.easy);
        assert_eq!(pack.telemetry.target_difficulty.medium, expected.medium);
        assert_eq!(pack.telemetry.target_difficulty.hard, expected.hard);

        let baseline = baseline_category_quotas();
        let total: u32 = pack.telemetry.category_distribution.values().sum();
        assert_eq!(total, 12);
        for (category, count) in &pack.telemetry.category_distribution {
            assert!(count <= &baseline[category], "{category} exceeded its baseline quota");
        }
    }

    #[tokio::test]
    async fn phase_a_relaxes_to_all_medium_when_no_easy_or_hard_exist() {
        let pool = init_test_db().await.unwrap();
        let config = Config::default();

        let mut idx = 0;
        for (category, subcategory) in CATEGORIES {
            for _ in 0..3 {
                idx += 1;
                upsert_question(&pool, &mk_question(format!("med-{idx}"), category, subcategory, "Medium", 0.5)).await.unwrap();
            }
        }

        let pack = plan_session(&pool, &config, "medium-only-student", 1).await.unwrap();

        assert_eq!(pack.question_ids.len(), 12);
        assert!(pack.telemetry.llm_assessment_respected);
        assert_eq!(pack.telemetry.target_difficulty.easy, 0);
        assert_eq!(pack.telemetry.target_difficulty.medium, 12);
        assert_eq!(pack.telemetry.target_difficulty.hard, 0);
        assert_eq!(pack.telemetry.actual_difficulty.medium, 12);
    }

    async fn seed_balanced_pool(pool: &DbPool) {
        let mut idx = 0;
        for (category, subcategory) in CATEGORIES {
            for band in ["Easy", "Medium", "Medium", "Medium", "Hard", "Hard"] {
                idx += 1;
                let pyq = if idx <= 2 { 1.6 } else { 0.4 };
                upsert_question(pool, &mk_question(format!("q-{idx}"), category, subcategory, band, pyq)).await.unwrap();
            }
        }
    }

    #[tokio::test]
    async fn phase_b_targets_a_mixed_difficulty_pack() {
        let pool = init_test_db().await.unwrap();
        let config = Config::default();
        seed_balanced_pool(&pool).await;
        advance_to_session_count(&pool, "returning-student", config.phases.phase_a_cutoff).await;

        let pack = plan_session(&pool, &config, "returning-student", 31).await.unwrap();

        assert_eq!(pack.phase, "B");
        assert_eq!(pack.question_ids.len(), 12);
        assert_eq!(pack.telemetry.session_type, "adaptive");

        let expected = difficulty_targets_for(Phase::B);
        assert_eq!(pack.telemetry.target_difficulty.easy, expected.easy);
        assert_eq!(pack.telemetry.target_difficulty.medium, expected.medium);
        assert_eq!(pack.telemetry.target_difficulty.hard, expected.hard);
    }

    #[tokio::test]
    async fn phase_c_adaptive_shifts_toward_the_weaker_category() {
        let pool = init_test_db().await.unwrap();
        let config = Config::default();
        seed_balanced_pool(&pool).await;
        advance_to_session_count(&pool, "veteran-student", config.phases.phase_b_cutoff).await;

        let now = Utc::now().to_rfc3339();
        upsert_mastery(
            &pool,
            &MasteryRecord {
                student_id: "veteran-student".to_string(),
                subcategory: "Percentages".to_string(),
                type_of_question: SUBCATEGORY_LEVEL.to_string(),
                accuracy_easy: 0.9,
                accuracy_medium: 0.85,
                accuracy_hard: 0.75,
                efficiency: 0.8,
                exposure_count: 40,
                mastery_pct: 0.82,
                last_activity_at: now.clone(),
            },
        )
        .await
        .unwrap();
        upsert_mastery(
            &pool,
            &MasteryRecord {
                student_id: "veteran-student".to_string(),
                subcategory: "Triangles".to_string(),
                type_of_question: SUBCATEGORY_LEVEL.to_string(),
                accuracy_easy: 0.4,
                accuracy_medium: 0.35,
                accuracy_hard: 0.2,
                efficiency: 0.3,
                exposure_count: 40,
                mastery_pct: 0.40,
                last_activity_at: now,
            },
        )
        .await
        .unwrap();

        let pack = plan_session(&pool, &config, "veteran-student", 61).await.unwrap();

        assert_eq!(pack.phase, "C");
        assert_eq!(pack.question_ids.len(), 12);
        assert_eq!(pack.telemetry.session_type, "adaptive");

        let expected = difficulty_targets_for(Phase::C);
        assert_eq!(pack.telemetry.target_difficulty.easy, expected.easy);
        assert_eq!(pack.telemetry.target_difficulty.medium, expected.medium);
        assert_eq!(pack.telemetry.target_difficulty.hard, expected.hard);

        // The weakest category (Geometry and Mensuration, via Triangles) must
        // not be starved relative to its baseline quota now that the shift
        // has moved a slot to it from the strongest category (Arithmetic).
        let baseline = baseline_category_quotas();
        let arithmetic_count = *pack.telemetry.category_distribution.get("Arithmetic").unwrap_or(&0);
        assert!(arithmetic_count <= baseline["Arithmetic"]);
    }
}
