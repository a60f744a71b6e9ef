//! Session Orchestrator (C9): the lifecycle state machine around a
//! planned pack -- `planned -> served -> completed` -- plus idempotent
//! planning and race-safe sequence assignment.

use crate::config::{Config, MasteryConfig};
use crate::error::{OrchestratorError, StorageError};
use crate::mastery;
use crate::planner::{self, PlannedPack};
use crate::storage::attempts::{record_attempt as insert_attempt, Attempt};
use crate::storage::mastery::{get_mastery, upsert_mastery, SUBCATEGORY_LEVEL};
use crate::storage::questions::get_question;
use crate::storage::sessions::{create_session, find_by_idempotency_key, get_pack, get_session, save_pack, Session};
use crate::storage::{coverage::upsert_coverage, sessions, DbPool};

fn integrity(message: String) -> OrchestratorError {
    OrchestratorError::Storage(StorageError::Integrity { message })
}

/// Plan the next session for `student_id`, identified by a caller-supplied
/// `idempotency_key` (conventionally `student_id:last_session_id:next_session_id`).
/// A duplicate key returns the previously planned session and pack
/// unchanged rather than planning again.
pub async fn plan_next(
    pool: &DbPool,
    config: &Config,
    student_id: &str,
    idempotency_key: &str,
) -> Result<(Session, PlannedPack), OrchestratorError> {
    if let Some(session) = find_by_idempotency_key(pool, idempotency_key).await? {
        let pack = get_pack(pool, &session.id)
            .await?
            .ok_or_else(|| integrity(format!("session {} has no pack", session.id)))?;

        let question_ids = serde_json::from_str(&pack.question_ids)
            .map_err(|e| integrity(format!("corrupt stored question_ids: {e}")))?;
        let telemetry = serde_json::from_str(&pack.telemetry)
            .map_err(|e| integrity(format!("corrupt stored telemetry: {e}")))?;

        return Ok((
            session.clone(),
            PlannedPack {
                question_ids,
                telemetry,
                phase: session.phase,
            },
        ));
    }

    let sess_seq = sessions::next_sequence(pool, student_id).await?;
    let planned = planner::plan_session(pool, config, student_id, sess_seq)
        .await
        .map_err(|e| integrity(format!("planning failed: {e}")))?;

    let session = create_session(
        pool,
        student_id,
        sess_seq,
        idempotency_key,
        &planned.phase,
        planned.telemetry.llm_assessment_respected,
    )
    .await?;

    let question_ids_json = serde_json::to_string(&planned.question_ids)
        .map_err(|e| integrity(format!("failed to serialize question_ids: {e}")))?;
    let telemetry_json = serde_json::to_string(&planned.telemetry)
        .map_err(|e| integrity(format!("failed to serialize telemetry: {e}")))?;
    save_pack(pool, &session.id, &question_ids_json, &telemetry_json).await?;

    Ok((session, planned))
}

/// Transition `session_id` from "planned" to "served", stamping
/// `started_at` and folding every (subcategory, type_of_question) in its
/// pack into the student's coverage tracker.
pub async fn mark_served(pool: &DbPool, session_id: &str) -> Result<(), OrchestratorError> {
    let session = get_session(pool, session_id)
        .await?
        .ok_or_else(|| OrchestratorError::InvalidTransition {
            session_id: session_id.to_string(),
            from: "absent".to_string(),
            event: "serve".to_string(),
        })?;

    if session.status != "planned" {
        return Err(OrchestratorError::InvalidTransition {
            session_id: session_id.to_string(),
            from: session.status,
            event: "serve".to_string(),
        });
    }

    sessions::mark_served(pool, session_id).await?;

    let pack = get_pack(pool, session_id)
        .await?
        .ok_or_else(|| integrity(format!("session {session_id} has no pack")))?;
    let question_ids: Vec<String> = serde_json::from_str(&pack.question_ids)
        .map_err(|e| integrity(format!("corrupt stored question_ids: {e}")))?;

    for question_id in question_ids {
        if let Some(question) = get_question(pool, &question_id).await? {
            upsert_coverage(pool, &session.student_id, &question.subcategory, &question.type_of_question, session.sess_seq).await?;
        }
    }

    Ok(())
}

/// Record one attempt against a question served in `session_id`, then fold
/// it into both the subcategory-level and type-level mastery rows for the
/// student (§4.6). Valid only once a session has been served -- a session
/// still in `planned` has nothing for the student to have attempted.
pub async fn record_attempt(
    pool: &DbPool,
    config: &MasteryConfig,
    session_id: &str,
    question_id: &str,
    correct: bool,
    time_taken_seconds: f64,
) -> Result<Attempt, OrchestratorError> {
    let session = get_session(pool, session_id)
        .await?
        .ok_or_else(|| OrchestratorError::InvalidTransition {
            session_id: session_id.to_string(),
            from: "absent".to_string(),
            event: "record_attempt".to_string(),
        })?;

    if session.status == "planned" {
        return Err(OrchestratorError::InvalidTransition {
            session_id: session_id.to_string(),
            from: session.status,
            event: "record_attempt".to_string(),
        });
    }

    let question = get_question(pool, question_id)
        .await?
        .ok_or_else(|| OrchestratorError::UnknownQuestion {
            question_id: question_id.to_string(),
        })?;

    let attempt = insert_attempt(pool, &session.student_id, question_id, correct, time_taken_seconds).await?;

    for type_of_question in [SUBCATEGORY_LEVEL, question.type_of_question.as_str()] {
        let existing = get_mastery(pool, &session.student_id, &question.subcategory, type_of_question).await?;
        let updated = mastery::apply_attempt(
            existing,
            &session.student_id,
            &question.subcategory,
            type_of_question,
            &attempt,
            &question.difficulty_band,
            config,
        );
        upsert_mastery(pool, &updated).await?;
    }

    Ok(attempt)
}

/// Transition `session_id` from "served" to "completed", stamping `ended_at`.
pub async fn complete(pool: &DbPool, session_id: &str) -> Result<(), OrchestratorError> {
    let session = get_session(pool, session_id)
        .await?
        .ok_or_else(|| OrchestratorError::InvalidTransition {
            session_id: session_id.to_string(),
            from: "absent".to_string(),
            event: "complete".to_string(),
        })?;

    if session.status != "served" {
        return Err(OrchestratorError::InvalidTransition {
            session_id: session_id.to_string(),
            from: session.status,
            event: "complete".to_string(),
        });
    }

    sessions::mark_completed(pool, session_id).await?;
    Ok(())
}
