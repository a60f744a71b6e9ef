//! CRUD for the combined subcategory/type-level mastery table (C6).
//!
//! A row with `type_of_question = ""` is the subcategory-level record; any
//! other value is a type-level record, per the schema note in the
//! migration. Both granularities are read and written through the same
//! functions, distinguished only by the sentinel.

use super::DbPool;
use crate::error::StorageError;
use chrono::Utc;

/// The sentinel used in place of NULL for the subcategory-level row.
pub const SUBCATEGORY_LEVEL: &str = "";

/// A mastery record for one (student, subcategory[, type]) node.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct MasteryRecord {
    /// Student this record belongs to.
    pub student_id: String,
    /// Canonical subcategory.
    pub subcategory: String,
    /// Canonical type of question, or `SUBCATEGORY_LEVEL` for the rollup row.
    pub type_of_question: String,
    /// Accuracy on easy-band attempts, `[0, 1]`.
    pub accuracy_easy: f64,
    /// Accuracy on medium-band attempts, `[0, 1]`.
    pub accuracy_medium: f64,
    /// Accuracy on hard-band attempts, `[0, 1]`.
    pub accuracy_hard: f64,
    /// Time-efficiency factor, `[0, 1]`.
    pub efficiency: f64,
    /// Total number of attempts folded into this record.
    pub exposure_count: i64,
    /// Final mastery percentage after decay and exposure weighting.
    pub mastery_pct: f64,
    /// Timestamp of the most recent attempt folded in.
    pub last_activity_at: String,
}

/// Fetch the mastery record for a node, if it exists.
pub async fn get_mastery(
    pool: &DbPool,
    student_id: &str,
    subcategory: &str,
    type_of_question: &str,
) -> Result<Option<MasteryRecord>, StorageError> {
    sqlx::query_as::<_, MasteryRecord>(
        "SELECT * FROM mastery WHERE student_id = ? AND subcategory = ? AND type_of_question = ?",
    )
    .bind(student_id)
    .bind(subcategory)
    .bind(type_of_question)
    .fetch_optional(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

/// All mastery records for a student, both subcategory- and type-level.
pub async fn mastery_for_student(pool: &DbPool, student_id: &str) -> Result<Vec<MasteryRecord>, StorageError> {
    sqlx::query_as::<_, MasteryRecord>("SELECT * FROM mastery WHERE student_id = ?")
        .bind(student_id)
        .fetch_all(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

/// Insert or overwrite a mastery record with the recomputed values.
pub async fn upsert_mastery(pool: &DbPool, record: &MasteryRecord) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO mastery \
         (student_id, subcategory, type_of_question, accuracy_easy, accuracy_medium, accuracy_hard, \
          efficiency, exposure_count, mastery_pct, last_activity_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(student_id, subcategory, type_of_question) DO UPDATE SET \
            accuracy_easy = excluded.accuracy_easy, \
            accuracy_medium = excluded.accuracy_medium, \
            accuracy_hard = excluded.accuracy_hard, \
            efficiency = excluded.efficiency, \
            exposure_count = excluded.exposure_count, \
            mastery_pct = excluded.mastery_pct, \
            last_activity_at = excluded.last_activity_at",
    )
    .bind(&record.student_id)
    .bind(&record.subcategory)
    .bind(&record.type_of_question)
    .bind(record.accuracy_easy)
    .bind(record.accuracy_medium)
    .bind(record.accuracy_hard)
    .bind(record.efficiency)
    .bind(record.exposure_count)
    .bind(record.mastery_pct)
    .bind(&record.last_activity_at)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(())
}
