//! Session and session-pack storage for the orchestrator (C9).

use super::DbPool;
use crate::error::StorageError;
use chrono::Utc;
use uuid::Uuid;

/// A planned/served/completed session.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Session {
    /// Stable identifier.
    pub id: String,
    /// Student this session belongs to.
    pub student_id: String,
    /// Monotonic per-student sequence number.
    pub sess_seq: i64,
    /// Lifecycle status: "planned", "served", or "completed".
    pub status: String,
    /// Caller-supplied idempotency key.
    pub idempotency_key: String,
    /// Adaptive phase this session was planned under ("A", "B", or "C").
    pub phase: String,
    /// Whether the question-level forced-difficulty override was honored.
    pub model_assessment_respected: bool,
    /// Server-generated creation timestamp.
    pub created_at: String,
    /// Timestamp the session transitioned to "served".
    pub started_at: Option<String>,
    /// Timestamp the session transitioned to "completed".
    pub ended_at: Option<String>,
}

/// The serialized question pack for a session.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct SessionPack {
    /// Session this pack belongs to.
    pub session_id: String,
    /// Serialized ordered list of question ids (JSON array).
    pub question_ids: String,
    /// Serialized per-question planning telemetry (JSON object).
    pub telemetry: String,
    /// Server-generated creation timestamp.
    pub created_at: String,
}

/// Atomically reserve the next sequence number for `student_id`, creating
/// the counter row on first use. Uses `BEGIN IMMEDIATE` to take a write
/// lock up front so two concurrent planners for the same student can't
/// both observe and increment the same value.
pub async fn next_sequence(pool: &DbPool, student_id: &str) -> Result<i64, StorageError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| StorageError::Query { source: e })?;

    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Query { source: e })?;

    sqlx::query(
        "INSERT INTO student_sequence_counters (student_id, next_seq) VALUES (?, 1) \
         ON CONFLICT(student_id) DO NOTHING",
    )
    .bind(student_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    let (seq,): (i64,) = sqlx::query_as("SELECT next_seq FROM student_sequence_counters WHERE student_id = ?")
        .bind(student_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StorageError::Query { source: e })?;

    sqlx::query("UPDATE student_sequence_counters SET next_seq = next_seq + 1 WHERE student_id = ?")
        .bind(student_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Query { source: e })?;

    tx.commit().await.map_err(|e| StorageError::Query { source: e })?;

    Ok(seq)
}

/// Look up a session by its caller-supplied idempotency key.
pub async fn find_by_idempotency_key(
    pool: &DbPool,
    idempotency_key: &str,
) -> Result<Option<Session>, StorageError> {
    sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE idempotency_key = ?")
        .bind(idempotency_key)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

/// Create a new session in the "planned" state.
///
/// `model_assessment_respected` is mirrored onto the row from the pack's
/// own telemetry so a query over `sessions` can answer "was the LLM's
/// classification respected" without deserializing the pack JSON.
pub async fn create_session(
    pool: &DbPool,
    student_id: &str,
    sess_seq: i64,
    idempotency_key: &str,
    phase: &str,
    model_assessment_respected: bool,
) -> Result<Session, StorageError> {
    let session = Session {
        id: Uuid::new_v4().to_string(),
        student_id: student_id.to_string(),
        sess_seq,
        status: "planned".to_string(),
        idempotency_key: idempotency_key.to_string(),
        phase: phase.to_string(),
        model_assessment_respected,
        created_at: Utc::now().to_rfc3339(),
        started_at: None,
        ended_at: None,
    };

    sqlx::query(
        "INSERT INTO sessions \
         (id, student_id, sess_seq, status, idempotency_key, phase, model_assessment_respected, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&session.id)
    .bind(&session.student_id)
    .bind(session.sess_seq)
    .bind(&session.status)
    .bind(&session.idempotency_key)
    .bind(&session.phase)
    .bind(session.model_assessment_respected)
    .bind(&session.created_at)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(session)
}

/// Persist the pack of questions planned for a session.
pub async fn save_pack(
    pool: &DbPool,
    session_id: &str,
    question_ids_json: &str,
    telemetry_json: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO session_packs (session_id, question_ids, telemetry, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(session_id)
    .bind(question_ids_json)
    .bind(telemetry_json)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(())
}

/// Fetch the pack for a session, if one has been planned.
pub async fn get_pack(pool: &DbPool, session_id: &str) -> Result<Option<SessionPack>, StorageError> {
    sqlx::query_as::<_, SessionPack>("SELECT * FROM session_packs WHERE session_id = ?")
        .bind(session_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

/// Fetch a session by id.
pub async fn get_session(pool: &DbPool, id: &str) -> Result<Option<Session>, StorageError> {
    sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

/// Count of `student_id`'s sessions with status "served" or "completed",
/// i.e. the `n` that determines the student's adaptive phase (§4.7).
pub async fn count_served_or_completed(pool: &DbPool, student_id: &str) -> Result<u32, StorageError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sessions WHERE student_id = ? AND status IN ('served', 'completed')",
    )
    .bind(student_id)
    .fetch_one(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;
    Ok(count as u32)
}

/// Transition a session to "served", stamping `started_at`.
pub async fn mark_served(pool: &DbPool, session_id: &str) -> Result<(), StorageError> {
    sqlx::query("UPDATE sessions SET status = 'served', started_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(session_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

/// Transition a session to "completed", stamping `ended_at`.
pub async fn mark_completed(pool: &DbPool, session_id: &str) -> Result<(), StorageError> {
    sqlx::query("UPDATE sessions SET status = 'completed', ended_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(session_id)
        .execute(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;

    #[tokio::test]
    async fn next_sequence_starts_at_one_and_increments() {
        let pool = init_test_db().await.expect("init db");
        assert_eq!(next_sequence(&pool, "student1").await.unwrap(), 1);
        assert_eq!(next_sequence(&pool, "student1").await.unwrap(), 2);
        assert_eq!(next_sequence(&pool, "student1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn next_sequence_is_independent_per_student() {
        let pool = init_test_db().await.expect("init db");
        assert_eq!(next_sequence(&pool, "a").await.unwrap(), 1);
        assert_eq!(next_sequence(&pool, "b").await.unwrap(), 1);
        assert_eq!(next_sequence(&pool, "a").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn create_and_fetch_session() {
        let pool = init_test_db().await.expect("init db");
        let seq = next_sequence(&pool, "student1").await.unwrap();
        let session = create_session(&pool, "student1", seq, "idem-1", "A", true).await.unwrap();

        let fetched = get_session(&pool, &session.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, "planned");
        assert_eq!(fetched.phase, "A");
    }

    #[tokio::test]
    async fn idempotency_key_is_unique() {
        let pool = init_test_db().await.expect("init db");
        let seq = next_sequence(&pool, "student1").await.unwrap();
        create_session(&pool, "student1", seq, "idem-dup", "A", true).await.unwrap();

        let seq2 = next_sequence(&pool, "student1").await.unwrap();
        let result = create_session(&pool, "student1", seq2, "idem-dup", "A", true).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn idempotency_lookup_returns_existing_session() {
        let pool = init_test_db().await.expect("init db");
        let seq = next_sequence(&pool, "student1").await.unwrap();
        let created = create_session(&pool, "student1", seq, "idem-2", "B", true).await.unwrap();

        let found = find_by_idempotency_key(&pool, "idem-2").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn session_lifecycle_transitions() {
        let pool = init_test_db().await.expect("init db");
        let seq = next_sequence(&pool, "student1").await.unwrap();
        let session = create_session(&pool, "student1", seq, "idem-3", "A", true).await.unwrap();

        save_pack(&pool, &session.id, "[\"q1\",\"q2\"]", "{}").await.unwrap();
        mark_served(&pool, &session.id).await.unwrap();
        let served = get_session(&pool, &session.id).await.unwrap().unwrap();
        assert_eq!(served.status, "served");
        assert!(served.started_at.is_some());

        mark_completed(&pool, &session.id).await.unwrap();
        let completed = get_session(&pool, &session.id).await.unwrap().unwrap();
        assert_eq!(completed.status, "completed");
        assert!(completed.ended_at.is_some());

        let pack = get_pack(&pool, &session.id).await.unwrap().unwrap();
        assert_eq!(pack.question_ids, "[\"q1\",\"q2\"]");
    }

    #[tokio::test]
    async fn count_served_or_completed_ignores_planned() {
        let pool = init_test_db().await.expect("init db");
        let seq1 = next_sequence(&pool, "student1").await.unwrap();
        let s1 = create_session(&pool, "student1", seq1, "idem-4", "A", true).await.unwrap();
        let seq2 = next_sequence(&pool, "student1").await.unwrap();
        let s2 = create_session(&pool, "student1", seq2, "idem-5", "A", true).await.unwrap();

        assert_eq!(count_served_or_completed(&pool, "student1").await.unwrap(), 0);

        mark_served(&pool, &s1.id).await.unwrap();
        mark_completed(&pool, &s2.id).await.unwrap();
        assert_eq!(count_served_or_completed(&pool, "student1").await.unwrap(), 2);
    }
}
