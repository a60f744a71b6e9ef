//! CRUD operations for previous-year-question (PYQ) records.
//!
//! PYQ records share most of their shape with `questions` but are kept in
//! a separate table since they feed a distinct purpose: the qualifying
//! pool consulted by enrichment stage 4 (PYQ frequency scoring).

use super::DbPool;
use crate::error::StorageError;
use chrono::Utc;

/// A previous-year-question record.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct PyqQuestion {
    /// Stable identifier.
    pub id: String,
    /// Question stem text.
    pub stem: String,
    /// Canonical category.
    pub category: String,
    /// Canonical subcategory.
    pub subcategory: String,
    /// Canonical type of question.
    pub type_of_question: String,
    /// Difficulty band: Easy, Medium, or Hard.
    pub difficulty_band: String,
    /// Difficulty score in `[1.0, 5.0]`.
    pub difficulty_score: f64,
    /// Serialized core concepts (JSON array).
    pub core_concepts: Option<String>,
    /// Solution method description.
    pub solution_method: Option<String>,
    /// Serialized concept difficulty record (JSON object).
    pub concept_difficulty: Option<String>,
    /// Serialized operations required (JSON array).
    pub operations_required: Option<String>,
    /// Problem structure token.
    pub problem_structure: Option<String>,
    /// Serialized concept keywords (JSON array).
    pub concept_keywords: Option<String>,
    /// Whether the record is eligible to be matched against.
    pub is_active: bool,
    /// Whether the quality gate has passed.
    pub quality_verified: bool,
    /// "pending" or "completed".
    pub concept_extraction_status: String,
    /// Server-generated creation timestamp.
    pub created_at: String,
    /// Server-generated last-update timestamp.
    pub updated_at: String,
}

/// Insert or replace a PYQ record.
pub async fn upsert_pyq_question(pool: &DbPool, pyq: &PyqQuestion) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO pyq_questions \
         (id, stem, category, subcategory, type_of_question, difficulty_band, difficulty_score, \
          core_concepts, solution_method, concept_difficulty, operations_required, problem_structure, \
          concept_keywords, is_active, quality_verified, concept_extraction_status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET \
            category = excluded.category, \
            subcategory = excluded.subcategory, \
            type_of_question = excluded.type_of_question, \
            difficulty_band = excluded.difficulty_band, \
            difficulty_score = excluded.difficulty_score, \
            core_concepts = excluded.core_concepts, \
            solution_method = excluded.solution_method, \
            concept_difficulty = excluded.concept_difficulty, \
            operations_required = excluded.operations_required, \
            problem_structure = excluded.problem_structure, \
            concept_keywords = excluded.concept_keywords, \
            is_active = excluded.is_active, \
            quality_verified = excluded.quality_verified, \
            concept_extraction_status = excluded.concept_extraction_status, \
            updated_at = excluded.updated_at",
    )
    .bind(&pyq.id)
    .bind(&pyq.stem)
    .bind(&pyq.category)
    .bind(&pyq.subcategory)
    .bind(&pyq.type_of_question)
    .bind(&pyq.difficulty_band)
    .bind(pyq.difficulty_score)
    .bind(&pyq.core_concepts)
    .bind(&pyq.solution_method)
    .bind(&pyq.concept_difficulty)
    .bind(&pyq.operations_required)
    .bind(&pyq.problem_structure)
    .bind(&pyq.concept_keywords)
    .bind(pyq.is_active)
    .bind(pyq.quality_verified)
    .bind(&pyq.concept_extraction_status)
    .bind(&pyq.created_at)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(())
}

/// The qualifying pool for PYQ frequency scoring (enrichment stage 4):
/// active, quality-verified records in the same (category, subcategory)
/// with non-null `problem_structure` and `concept_keywords`.
pub async fn qualifying_pool(
    pool: &DbPool,
    category: &str,
    subcategory: &str,
) -> Result<Vec<PyqQuestion>, StorageError> {
    sqlx::query_as::<_, PyqQuestion>(
        "SELECT * FROM pyq_questions \
         WHERE is_active = 1 AND quality_verified = 1 \
           AND category = ? AND subcategory = ? \
           AND problem_structure IS NOT NULL AND concept_keywords IS NOT NULL",
    )
    .bind(category)
    .bind(subcategory)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;

    fn sample_pyq(id: &str, structure: Option<&str>) -> PyqQuestion {
        let now = Utc::now().to_rfc3339();
        PyqQuestion {
            id: id.to_string(),
            stem: "If x + y = 10 and xy = 21...".to_string(),
            category: "Algebra".to_string(),
            subcategory: "Quadratic Equations".to_string(),
            type_of_question: "Roots".to_string(),
            difficulty_band: "Medium".to_string(),
            difficulty_score: 3.0,
            core_concepts: Some("[\"quadratics\"]".to_string()),
            solution_method: Some("sum-product substitution".to_string()),
            concept_difficulty: Some("{\"prerequisites\":[],\"cognitive_barriers\":[],\"mastery_indicators\":[]}".to_string()),
            operations_required: Some("[\"substitution\"]".to_string()),
            problem_structure: structure.map(str::to_string),
            concept_keywords: structure.map(|_| "[\"sum\",\"product\"]".to_string()),
            is_active: true,
            quality_verified: true,
            concept_extraction_status: "completed".to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn qualifying_pool_requires_structure_and_keywords() {
        let pool = init_test_db().await.expect("init db");
        upsert_pyq_question(&pool, &sample_pyq("p1", Some("single_step"))).await.unwrap();
        upsert_pyq_question(&pool, &sample_pyq("p2", None)).await.unwrap();

        let results = qualifying_pool(&pool, "Algebra", "Quadratic Equations").await.expect("query");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "p1");
    }

    #[tokio::test]
    async fn qualifying_pool_excludes_unverified() {
        let pool = init_test_db().await.expect("init db");
        let mut unverified = sample_pyq("p3", Some("single_step"));
        unverified.quality_verified = false;
        upsert_pyq_question(&pool, &unverified).await.unwrap();

        let results = qualifying_pool(&pool, "Algebra", "Quadratic Equations").await.expect("query");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn qualifying_pool_scopes_by_category_and_subcategory() {
        let pool = init_test_db().await.expect("init db");
        upsert_pyq_question(&pool, &sample_pyq("p4", Some("single_step"))).await.unwrap();

        let results = qualifying_pool(&pool, "Algebra", "Linear Equations").await.expect("query");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let pool = init_test_db().await.expect("init db");
        let pyq = sample_pyq("p5", Some("multi_step"));
        upsert_pyq_question(&pool, &pyq).await.unwrap();
        upsert_pyq_question(&pool, &pyq).await.unwrap();

        let results = qualifying_pool(&pool, "Algebra", "Quadratic Equations").await.expect("query");
        assert_eq!(results.len(), 1);
    }
}
