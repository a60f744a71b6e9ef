//! Mastery Tracker (C6): EWMA accuracy, time decay, and readiness banding
//! per (student, subcategory[, type]).

use crate::config::MasteryConfig;
use crate::storage::attempts::Attempt;
use crate::storage::mastery::{MasteryRecord, SUBCATEGORY_LEVEL};
use chrono::{DateTime, Utc};

/// Target completion time per difficulty band, in seconds (§4.6).
pub fn target_time_seconds(difficulty_band: &str) -> f64 {
    match difficulty_band {
        "Easy" => 90.0,
        "Medium" => 150.0,
        "Hard" => 210.0,
        _ => 150.0,
    }
}

/// Readiness band derived from overall mastery percentage (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessBand {
    /// `mastery_pct >= 0.85`.
    Mastered,
    /// `0.60 <= mastery_pct < 0.85`.
    OnTrack,
    /// `mastery_pct < 0.60`.
    NeedsFocus,
}

impl ReadinessBand {
    /// Classify a mastery percentage into a readiness band.
    pub fn from_pct(mastery_pct: f64) -> Self {
        if mastery_pct >= 0.85 {
            ReadinessBand::Mastered
        } else if mastery_pct >= 0.60 {
            ReadinessBand::OnTrack
        } else {
            ReadinessBand::NeedsFocus
        }
    }
}

/// Per-attempt efficiency: 1.0 at or under the target time, decaying
/// exponentially past it with a bonus for finishing well under target
/// (§4.6). Coefficient and bonus match the original tracker's formula.
fn attempt_efficiency(time_taken_seconds: f64, difficulty_band: &str) -> f64 {
    if time_taken_seconds <= 0.0 {
        return 0.5;
    }

    let target = target_time_seconds(difficulty_band);
    let mut efficiency = if time_taken_seconds <= target {
        1.0
    } else {
        (-0.5 * (time_taken_seconds - target) / target).exp()
    };

    if time_taken_seconds <= target * 0.7 {
        efficiency = (efficiency + 0.1).min(1.0);
    }

    efficiency.clamp(0.0, 1.0)
}

/// EWMA update for one band's accuracy: `alpha * x + (1 - alpha) * old`.
fn ewma_update(old: f64, x: f64, alpha: f64) -> f64 {
    alpha * x + (1.0 - alpha) * old
}

/// Exposure factor that reaches 1.0 at 10 attempts, linear below that.
fn exposure_factor(exposure_count: i64) -> f64 {
    (exposure_count as f64 / 10.0).min(1.0)
}

/// Weighted overall mastery from per-band accuracy and efficiency (§4.6).
fn overall_mastery(accuracy_easy: f64, accuracy_medium: f64, accuracy_hard: f64, efficiency: f64, exposure_count: i64) -> f64 {
    let raw = 0.2 * accuracy_easy + 0.4 * accuracy_medium + 0.4 * accuracy_hard + (0.1 * efficiency).min(0.1);
    raw * exposure_factor(exposure_count)
}

/// Fold a single new attempt into an existing (or fresh) mastery record.
///
/// `existing` is `None` when this is the student's first attempt at this
/// taxonomy node; a fresh record with all-zero accuracies is used as the
/// starting point.
pub fn apply_attempt(
    existing: Option<MasteryRecord>,
    student_id: &str,
    subcategory: &str,
    type_of_question: &str,
    attempt: &Attempt,
    difficulty_band: &str,
    config: &MasteryConfig,
) -> MasteryRecord {
    let mut record = existing.unwrap_or_else(|| MasteryRecord {
        student_id: student_id.to_string(),
        subcategory: subcategory.to_string(),
        type_of_question: type_of_question.to_string(),
        accuracy_easy: 0.0,
        accuracy_medium: 0.0,
        accuracy_hard: 0.0,
        efficiency: 0.0,
        exposure_count: 0,
        mastery_pct: 0.0,
        last_activity_at: attempt.created_at.clone(),
    });

    let x = if attempt.correct { 1.0 } else { 0.0 };
    let alpha = config.ewma_alpha;

    match difficulty_band {
        "Easy" => record.accuracy_easy = ewma_update(record.accuracy_easy, x, alpha),
        "Medium" => record.accuracy_medium = ewma_update(record.accuracy_medium, x, alpha),
        "Hard" => record.accuracy_hard = ewma_update(record.accuracy_hard, x, alpha),
        _ => {}
    }

    let efficiency_sample = attempt_efficiency(attempt.time_taken_seconds, difficulty_band);
    record.efficiency = ewma_update(record.efficiency, efficiency_sample, alpha);
    record.exposure_count += 1;
    record.last_activity_at = attempt.created_at.clone();
    record.mastery_pct = overall_mastery(
        record.accuracy_easy,
        record.accuracy_medium,
        record.accuracy_hard,
        record.efficiency,
        record.exposure_count,
    );

    record
}

/// Apply time decay to a mastery record based on days elapsed since its
/// last recorded activity (§4.6). A daily background job calls this once
/// per record; `now` is passed in rather than read from the clock so the
/// operation stays deterministic and testable.
pub fn apply_time_decay(mut record: MasteryRecord, now: DateTime<Utc>, config: &MasteryConfig) -> MasteryRecord {
    let Ok(last_activity) = DateTime::parse_from_rfc3339(&record.last_activity_at) else {
        return record;
    };
    let days = (now - last_activity.with_timezone(&Utc)).num_seconds() as f64 / 86_400.0;
    if days <= 0.0 {
        return record;
    }

    let decay = config.time_decay_daily.powf(days);
    record.accuracy_easy *= decay;
    record.accuracy_medium *= decay;
    record.accuracy_hard *= decay;
    record.efficiency *= decay;
    record.mastery_pct = overall_mastery(
        record.accuracy_easy,
        record.accuracy_medium,
        record.accuracy_hard,
        record.efficiency,
        record.exposure_count,
    );

    record
}

/// Whether `record` is the subcategory-level rollup rather than a
/// type-level node.
pub fn is_subcategory_level(record: &MasteryRecord) -> bool {
    record.type_of_question == SUBCATEGORY_LEVEL
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MasteryConfig {
        MasteryConfig {
            ewma_alpha: 0.6,
            time_decay_daily: 0.95,
        }
    }

    fn attempt(correct: bool, time_taken: f64, created_at: &str) -> Attempt {
        Attempt {
            id: "a1".to_string(),
            student_id: "s1".to_string(),
            question_id: "q1".to_string(),
            correct,
            time_taken_seconds: time_taken,
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn first_attempt_starts_from_zero() {
        let record = apply_attempt(
            None,
            "s1",
            "Percentages",
            SUBCATEGORY_LEVEL,
            &attempt(true, 80.0, "2026-01-01T00:00:00Z"),
            "Easy",
            &config(),
        );
        assert_eq!(record.accuracy_easy, 0.6);
        assert_eq!(record.exposure_count, 1);
    }

    #[test]
    fn correct_attempt_within_target_gets_full_efficiency() {
        let record = apply_attempt(
            None,
            "s1",
            "Percentages",
            SUBCATEGORY_LEVEL,
            &attempt(true, 60.0, "2026-01-01T00:00:00Z"),
            "Easy",
            &config(),
        );
        assert_eq!(record.efficiency, 0.6);
    }

    #[test]
    fn overrun_attempt_decays_efficiency() {
        let record = apply_attempt(
            None,
            "s1",
            "Percentages",
            SUBCATEGORY_LEVEL,
            &attempt(true, 300.0, "2026-01-01T00:00:00Z"),
            "Easy",
            &config(),
        );
        assert!(record.efficiency < 0.6);
        assert!(record.efficiency > 0.0);
    }

    #[test]
    fn exposure_factor_reaches_one_at_ten_attempts() {
        let mut record: Option<MasteryRecord> = None;
        for _ in 0..10 {
            record = Some(apply_attempt(
                record,
                "s1",
                "Percentages",
                SUBCATEGORY_LEVEL,
                &attempt(true, 80.0, "2026-01-01T00:00:00Z"),
                "Medium",
                &config(),
            ));
        }
        let record = record.unwrap();
        assert_eq!(record.exposure_count, 10);
        let raw = 0.4 * record.accuracy_medium + (0.1 * record.efficiency).min(0.1);
        assert!((record.mastery_pct - raw).abs() < 1e-9);
    }

    #[test]
    fn readiness_band_thresholds() {
        assert_eq!(ReadinessBand::from_pct(0.85), ReadinessBand::Mastered);
        assert_eq!(ReadinessBand::from_pct(0.84), ReadinessBand::OnTrack);
        assert_eq!(ReadinessBand::from_pct(0.60), ReadinessBand::OnTrack);
        assert_eq!(ReadinessBand::from_pct(0.59), ReadinessBand::NeedsFocus);
    }

    #[test]
    fn time_decay_reduces_accuracy_after_elapsed_days() {
        let record = MasteryRecord {
            student_id: "s1".to_string(),
            subcategory: "Percentages".to_string(),
            type_of_question: SUBCATEGORY_LEVEL.to_string(),
            accuracy_easy: 0.8,
            accuracy_medium: 0.0,
            accuracy_hard: 0.0,
            efficiency: 0.5,
            exposure_count: 5,
            mastery_pct: 0.2,
            last_activity_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let now = DateTime::parse_from_rfc3339("2026-01-03T00:00:00Z").unwrap().with_timezone(&Utc);
        let decayed = apply_time_decay(record, now, &config());
        assert!((decayed.accuracy_easy - 0.8 * 0.95_f64.powf(2.0)).abs() < 1e-9);
    }

    #[test]
    fn time_decay_is_noop_for_same_day_activity() {
        let record = MasteryRecord {
            student_id: "s1".to_string(),
            subcategory: "Percentages".to_string(),
            type_of_question: SUBCATEGORY_LEVEL.to_string(),
            accuracy_easy: 0.8,
            accuracy_medium: 0.0,
            accuracy_hard: 0.0,
            efficiency: 0.5,
            exposure_count: 5,
            mastery_pct: 0.2,
            last_activity_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let now = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let decayed = apply_time_decay(record, now, &config());
        assert_eq!(decayed.accuracy_easy, 0.8);
    }

    #[test]
    fn is_subcategory_level_detects_sentinel() {
        let record = MasteryRecord {
            student_id: "s1".to_string(),
            subcategory: "Percentages".to_string(),
            type_of_question: SUBCATEGORY_LEVEL.to_string(),
            accuracy_easy: 0.0,
            accuracy_medium: 0.0,
            accuracy_hard: 0.0,
            efficiency: 0.0,
            exposure_count: 0,
            mastery_pct: 0.0,
            last_activity_at: "2026-01-01T00:00:00Z".to_string(),
        };
        assert!(is_subcategory_level(&record));
    }
}
