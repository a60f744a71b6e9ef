//! Append-only attempt storage, feeding mastery tracking (C6).

use super::DbPool;
use crate::error::StorageError;
use chrono::Utc;
use uuid::Uuid;

/// A single recorded attempt at a question.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Attempt {
    /// Stable identifier.
    pub id: String,
    /// Student who made the attempt.
    pub student_id: String,
    /// Question attempted.
    pub question_id: String,
    /// Whether the attempt was correct.
    pub correct: bool,
    /// Time taken, in seconds.
    pub time_taken_seconds: f64,
    /// Server-generated creation timestamp.
    pub created_at: String,
}

/// Record a new attempt. Attempts are immutable once recorded -- there is
/// no update or delete path, only inserts.
pub async fn record_attempt(
    pool: &DbPool,
    student_id: &str,
    question_id: &str,
    correct: bool,
    time_taken_seconds: f64,
) -> Result<Attempt, StorageError> {
    let attempt = Attempt {
        id: Uuid::new_v4().to_string(),
        student_id: student_id.to_string(),
        question_id: question_id.to_string(),
        correct,
        time_taken_seconds,
        created_at: Utc::now().to_rfc3339(),
    };

    sqlx::query(
        "INSERT INTO attempts (id, student_id, question_id, correct, time_taken_seconds, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&attempt.id)
    .bind(&attempt.student_id)
    .bind(&attempt.question_id)
    .bind(attempt.correct)
    .bind(attempt.time_taken_seconds)
    .bind(&attempt.created_at)
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(attempt)
}

/// All attempts by `student_id`, most recent first.
pub async fn attempts_for_student(pool: &DbPool, student_id: &str) -> Result<Vec<Attempt>, StorageError> {
    sqlx::query_as::<_, Attempt>(
        "SELECT * FROM attempts WHERE student_id = ? ORDER BY created_at DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

/// Attempts by `student_id` against questions in a given `category`/`subcategory`,
/// joined against `questions` for the classification. Used by mastery
/// recompute to pull the evidence window per taxonomy node.
pub async fn attempts_for_subcategory(
    pool: &DbPool,
    student_id: &str,
    subcategory: &str,
) -> Result<Vec<(Attempt, String)>, StorageError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        #[sqlx(flatten)]
        attempt: Attempt,
        difficulty_band: String,
    }

    let rows: Vec<Row> = sqlx::query_as(
        "SELECT a.*, q.difficulty_band FROM attempts a \
         JOIN questions q ON q.id = a.question_id \
         WHERE a.student_id = ? AND q.subcategory = ? \
         ORDER BY a.created_at ASC",
    )
    .bind(student_id)
    .bind(subcategory)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(rows.into_iter().map(|r| (r.attempt, r.difficulty_band)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;
    use crate::storage::questions::{upsert_question, Question};

    fn sample_question(id: &str, subcategory: &str, band: &str) -> Question {
        let now = Utc::now().to_rfc3339();
        Question {
            id: id.to_string(),
            stem: "stem".to_string(),
            source: "admin".to_string(),
            admin_answer: None,
            admin_solution: None,
            principle_to_remember: None,
            image_url: None,
            right_answer: None,
            category: "Arithmetic".to_string(),
            subcategory: subcategory.to_string(),
            type_of_question: "Basics".to_string(),
            difficulty_band: band.to_string(),
            difficulty_score: 2.0,
            pyq_frequency_score: None,
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

    #[tokio::test]
    async fn record_and_list_attempts() {
        let pool = init_test_db().await.expect("init db");
        upsert_question(&pool, &sample_question("q1", "Percentages", "Easy")).await.unwrap();

        record_attempt(&pool, "student1", "q1", true, 45.0).await.unwrap();
        record_attempt(&pool, "student1", "q1", false, 90.0).await.unwrap();

        let attempts = attempts_for_student(&pool, "student1").await.unwrap();
        assert_eq!(attempts.len(), 2);
    }

    #[tokio::test]
    async fn attempts_for_subcategory_joins_difficulty_band() {
        let pool = init_test_db().await.expect("init db");
        upsert_question(&pool, &sample_question("q2", "Percentages", "Hard")).await.unwrap();
        record_attempt(&pool, "student2", "q2", true, 180.0).await.unwrap();

        let rows = attempts_for_subcategory(&pool, "student2", "Percentages").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, "Hard");
    }

    #[tokio::test]
    async fn attempts_scoped_per_student() {
        let pool = init_test_db().await.expect("init db");
        upsert_question(&pool, &sample_question("q3", "Percentages", "Easy")).await.unwrap();
        record_attempt(&pool, "student3", "q3", true, 30.0).await.unwrap();

        let other = attempts_for_student(&pool, "nobody").await.unwrap();
        assert!(other.is_empty());
    }
}
