//! Per-student taxonomy-node coverage tracking, used by the adaptive
//! planner's diversity caps and cooldowns (C7/C8).

use super::DbPool;
use crate::error::StorageError;

/// Coverage of a single (subcategory, type) node for a student.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct CoverageRecord {
    /// Student this record belongs to.
    pub student_id: String,
    /// Canonical subcategory.
    pub subcategory: String,
    /// Canonical type of question.
    pub type_of_question: String,
    /// Number of sessions in which this node appeared.
    pub sessions_seen: i64,
    /// Session sequence number of first exposure.
    pub first_seen_session: i64,
    /// Session sequence number of most recent exposure.
    pub last_seen_session: i64,
}

/// Record that `(subcategory, type_of_question)` appeared in session
/// `session_seq` for `student_id`. On first exposure, sets
/// `first_seen_session`; on every call, increments `sessions_seen` and
/// advances `last_seen_session`. `first_seen_session` is never touched on
/// conflict.
pub async fn upsert_coverage(
    pool: &DbPool,
    student_id: &str,
    subcategory: &str,
    type_of_question: &str,
    session_seq: i64,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO student_coverage \
         (student_id, subcategory, type_of_question, sessions_seen, first_seen_session, last_seen_session) \
         VALUES (?, ?, ?, 1, ?, ?) \
         ON CONFLICT(student_id, subcategory, type_of_question) DO UPDATE SET \
            sessions_seen = sessions_seen + 1, \
            last_seen_session = excluded.last_seen_session",
    )
    .bind(student_id)
    .bind(subcategory)
    .bind(type_of_question)
    .bind(session_seq)
    .bind(session_seq)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(())
}

/// All coverage records for a student.
pub async fn coverage_for_student(pool: &DbPool, student_id: &str) -> Result<Vec<CoverageRecord>, StorageError> {
    sqlx::query_as::<_, CoverageRecord>("SELECT * FROM student_coverage WHERE student_id = ?")
        .bind(student_id)
        .fetch_all(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;

    #[tokio::test]
    async fn first_exposure_sets_both_seen_markers() {
        let pool = init_test_db().await.expect("init db");
        upsert_coverage(&pool, "s1", "Percentages", "Basics", 3).await.unwrap();

        let records = coverage_for_student(&pool, "s1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sessions_seen, 1);
        assert_eq!(records[0].first_seen_session, 3);
        assert_eq!(records[0].last_seen_session, 3);
    }

    #[tokio::test]
    async fn repeat_exposure_increments_without_moving_first_seen() {
        let pool = init_test_db().await.expect("init db");
        upsert_coverage(&pool, "s2", "Percentages", "Basics", 1).await.unwrap();
        upsert_coverage(&pool, "s2", "Percentages", "Basics", 5).await.unwrap();

        let records = coverage_for_student(&pool, "s2").await.unwrap();
        assert_eq!(records[0].sessions_seen, 2);
        assert_eq!(records[0].first_seen_session, 1);
        assert_eq!(records[0].last_seen_session, 5);
    }

    #[tokio::test]
    async fn distinct_nodes_tracked_independently() {
        let pool = init_test_db().await.expect("init db");
        upsert_coverage(&pool, "s3", "Percentages", "Basics", 1).await.unwrap();
        upsert_coverage(&pool, "s3", "Percentages", "Advanced", 1).await.unwrap();

        let records = coverage_for_student(&pool, "s3").await.unwrap();
        assert_eq!(records.len(), 2);
    }
}
