//! CRUD operations for the question bank (C2).

use super::DbPool;
use crate::error::StorageError;
use chrono::Utc;

/// A question row, admin-owned content plus pipeline-derived classification.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Question {
    /// Stable identifier.
    pub id: String,
    /// Question stem text. Admin-owned; never mutated by the pipeline.
    pub stem: String,
    /// Provenance of the question ("admin", "pyq_import", "llm_generated").
    pub source: String,
    /// Admin-provided answer. Admin-owned.
    pub admin_answer: Option<String>,
    /// Admin-provided worked solution. Admin-owned.
    pub admin_solution: Option<String>,
    /// Admin-provided key takeaway. Admin-owned.
    pub principle_to_remember: Option<String>,
    /// Admin-provided image reference. Admin-owned.
    pub image_url: Option<String>,
    /// Pipeline-derived answer (stage 1 of enrichment).
    pub right_answer: Option<String>,
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
    /// PYQ frequency score in `[0, 1]`, or `None` if undefined.
    pub pyq_frequency_score: Option<f64>,
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
    /// Whether the question is eligible to be served.
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

/// Filter keys accepted by `active_questions` (§4.2).
#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    /// Restrict to this category.
    pub category: Option<String>,
    /// Restrict to this subcategory.
    pub subcategory: Option<String>,
    /// Restrict to this difficulty band.
    pub difficulty_band: Option<String>,
    /// Minimum `pyq_frequency_score`, inclusive.
    pub pyq_frequency_score_gte: Option<f64>,
}

/// Stream of active questions matching `filter`. Always implies `is_active = true`.
pub async fn active_questions(pool: &DbPool, filter: &QuestionFilter) -> Result<Vec<Question>, StorageError> {
    let mut query = String::from("SELECT * FROM questions WHERE is_active = 1");
    if filter.category.is_some() {
        query.push_str(" AND category = ?");
    }
    if filter.subcategory.is_some() {
        query.push_str(" AND subcategory = ?");
    }
    if filter.difficulty_band.is_some() {
        query.push_str(" AND difficulty_band = ?");
    }
    if filter.pyq_frequency_score_gte.is_some() {
        query.push_str(" AND pyq_frequency_score >= ?");
    }

    let mut q = sqlx::query_as::<_, Question>(&query);
    if let Some(v) = &filter.category {
        q = q.bind(v);
    }
    if let Some(v) = &filter.subcategory {
        q = q.bind(v);
    }
    if let Some(v) = &filter.difficulty_band {
        q = q.bind(v);
    }
    if let Some(v) = filter.pyq_frequency_score_gte {
        q = q.bind(v);
    }

    q.fetch_all(pool).await.map_err(|e| StorageError::Query { source: e })
}

/// Questions awaiting enrichment (§4.4), oldest first.
pub async fn pending_enrichment(pool: &DbPool) -> Result<Vec<Question>, StorageError> {
    sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE concept_extraction_status = 'pending' ORDER BY created_at ASC",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })
}

/// Question IDs served to `student` in the most recent `last_k_sessions`.
pub async fn recent_questions_for(
    pool: &DbPool,
    student_id: &str,
    last_k_sessions: u32,
) -> Result<Vec<String>, StorageError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT sp.question_ids FROM session_packs sp \
         JOIN sessions s ON s.id = sp.session_id \
         WHERE s.student_id = ? AND s.status != 'planned' \
         ORDER BY s.sess_seq DESC LIMIT ?",
    )
    .bind(student_id)
    .bind(last_k_sessions)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    let mut seen = Vec::new();
    for (blob,) in rows {
        let ids: Vec<String> = serde_json::from_str(&blob)
            .map_err(|e| StorageError::Integrity { message: format!("corrupt session_packs.question_ids: {e}") })?;
        seen.extend(ids);
    }
    Ok(seen)
}

/// For every question ever served to `student_id`, the most recent
/// session's `started_at` timestamp it appeared in. Used by the planner's
/// difficulty-specific cooldown filter (§4.7), which needs "when was this
/// question last served" rather than just "was it in the last K sessions."
pub async fn last_served_at_by_question(
    pool: &DbPool,
    student_id: &str,
) -> Result<std::collections::HashMap<String, String>, StorageError> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT sp.question_ids, s.started_at FROM session_packs sp \
         JOIN sessions s ON s.id = sp.session_id \
         WHERE s.student_id = ? AND s.started_at IS NOT NULL",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    let mut last_served: std::collections::HashMap<String, String> = std::collections::HashMap::new();
    for (blob, started_at) in rows {
        let ids: Vec<String> = serde_json::from_str(&blob)
            .map_err(|e| StorageError::Integrity { message: format!("corrupt session_packs.question_ids: {e}") })?;
        for id in ids {
            last_served
                .entry(id)
                .and_modify(|existing| {
                    if started_at.as_str() > existing.as_str() {
                        *existing = started_at.clone();
                    }
                })
                .or_insert_with(|| started_at.clone());
        }
    }
    Ok(last_served)
}

/// Insert or replace a question record. Used both by ingestion (admin
/// fields) and by the enrichment pipeline (derived fields) -- callers are
/// responsible for not overwriting admin-owned fields on re-enrichment
/// (see `enrichment::persist_derived_fields`).
pub async fn upsert_question(pool: &DbPool, question: &Question) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO questions \
         (id, stem, source, admin_answer, admin_solution, principle_to_remember, image_url, \
          right_answer, category, subcategory, type_of_question, difficulty_band, difficulty_score, \
          pyq_frequency_score, core_concepts, solution_method, concept_difficulty, operations_required, \
          problem_structure, concept_keywords, is_active, quality_verified, concept_extraction_status, \
          created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET \
            right_answer = excluded.right_answer, \
            category = excluded.category, \
            subcategory = excluded.subcategory, \
            type_of_question = excluded.type_of_question, \
            difficulty_band = excluded.difficulty_band, \
            difficulty_score = excluded.difficulty_score, \
            pyq_frequency_score = excluded.pyq_frequency_score, \
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
    .bind(&question.id)
    .bind(&question.stem)
    .bind(&question.source)
    .bind(&question.admin_answer)
    .bind(&question.admin_solution)
    .bind(&question.principle_to_remember)
    .bind(&question.image_url)
    .bind(&question.right_answer)
    .bind(&question.category)
    .bind(&question.subcategory)
    .bind(&question.type_of_question)
    .bind(&question.difficulty_band)
    .bind(question.difficulty_score)
    .bind(question.pyq_frequency_score)
    .bind(&question.core_concepts)
    .bind(&question.solution_method)
    .bind(&question.concept_difficulty)
    .bind(&question.operations_required)
    .bind(&question.problem_structure)
    .bind(&question.concept_keywords)
    .bind(question.is_active)
    .bind(question.quality_verified)
    .bind(&question.concept_extraction_status)
    .bind(&question.created_at)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| StorageError::Query { source: e })?;

    Ok(())
}

/// Fetch a single question by id.
pub async fn get_question(pool: &DbPool, id: &str) -> Result<Option<Question>, StorageError> {
    sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::Query { source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::init_test_db;

    fn sample_question(id: &str, active: bool) -> Question {
        let now = Utc::now().to_rfc3339();
        Question {
            id: id.to_string(),
            stem: "A train travels 300km in 5 hours...".to_string(),
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
            concept_difficulty: Some("{\"prerequisites\":[],\"cognitive_barriers\":[],\"mastery_indicators\":[]}".to_string()),
            operations_required: Some("[\"division\"]".to_string()),
            problem_structure: Some("single_step".to_string()),
            concept_keywords: Some("[\"speed\",\"formula\"]".to_string()),
            is_active: active,
            quality_verified: active,
            concept_extraction_status: "completed".to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_and_retrieve() {
        let pool = init_test_db().await.expect("init db");
        let question = sample_question("q1", true);
        upsert_question(&pool, &question).await.expect("insert");

        let fetched = get_question(&pool, "q1").await.expect("get").expect("exists");
        assert_eq!(fetched.category, "Arithmetic");
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn active_questions_excludes_inactive() {
        let pool = init_test_db().await.expect("init db");
        upsert_question(&pool, &sample_question("active1", true)).await.unwrap();
        upsert_question(&pool, &sample_question("inactive1", false)).await.unwrap();

        let results = active_questions(&pool, &QuestionFilter::default()).await.expect("query");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "active1");
    }

    #[tokio::test]
    async fn active_questions_filters_by_difficulty_band() {
        let pool = init_test_db().await.expect("init db");
        let mut easy = sample_question("e1", true);
        easy.difficulty_band = "Easy".to_string();
        upsert_question(&pool, &easy).await.unwrap();
        upsert_question(&pool, &sample_question("m1", true)).await.unwrap();

        let filter = QuestionFilter {
            difficulty_band: Some("Easy".to_string()),
            ..Default::default()
        };
        let results = active_questions(&pool, &filter).await.expect("query");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "e1");
    }

    #[tokio::test]
    async fn upsert_preserves_admin_fields_on_reenrichment() {
        let pool = init_test_db().await.expect("init db");
        let original = sample_question("q2", false);
        upsert_question(&pool, &original).await.unwrap();

        let mut reenriched = original.clone();
        reenriched.difficulty_score = 3.0;
        reenriched.is_active = true;
        reenriched.quality_verified = true;
        upsert_question(&pool, &reenriched).await.unwrap();

        let fetched = get_question(&pool, "q2").await.unwrap().unwrap();
        assert_eq!(fetched.admin_answer, original.admin_answer);
        assert_eq!(fetched.stem, original.stem);
        assert_eq!(fetched.difficulty_score, 3.0);
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn get_nonexistent_returns_none() {
        let pool = init_test_db().await.expect("init db");
        assert!(get_question(&pool, "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn last_served_at_tracks_the_most_recent_serve_per_question() {
        let pool = init_test_db().await.expect("init db");
        upsert_question(&pool, &sample_question("q1", true)).await.unwrap();

        sqlx::query("INSERT INTO sessions (id, student_id, sess_seq, status, idempotency_key, phase, model_assessment_respected, created_at, started_at) VALUES ('sess1', 'student1', 1, 'served', 'k1', 'A', 1, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO session_packs (session_id, question_ids, telemetry, created_at) VALUES ('sess1', '[\"q1\"]', '{}', '2026-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query("INSERT INTO sessions (id, student_id, sess_seq, status, idempotency_key, phase, model_assessment_respected, created_at, started_at) VALUES ('sess2', 'student1', 2, 'served', 'k2', 'A', 1, '2026-01-05T00:00:00Z', '2026-01-05T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO session_packs (session_id, question_ids, telemetry, created_at) VALUES ('sess2', '[\"q1\"]', '{}', '2026-01-05T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();

        let last_served = last_served_at_by_question(&pool, "student1").await.unwrap();
        assert_eq!(last_served.get("q1").map(String::as_str), Some("2026-01-05T00:00:00Z"));
    }

    #[tokio::test]
    async fn last_served_at_ignores_still_planned_sessions() {
        let pool = init_test_db().await.expect("init db");
        upsert_question(&pool, &sample_question("q1", true)).await.unwrap();

        sqlx::query("INSERT INTO sessions (id, student_id, sess_seq, status, idempotency_key, phase, model_assessment_respected, created_at, started_at) VALUES ('sess1', 'student1', 1, 'planned', 'k1', 'A', 1, '2026-01-01T00:00:00Z', NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO session_packs (session_id, question_ids, telemetry, created_at) VALUES ('sess1', '[\"q1\"]', '{}', '2026-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();

        let last_served = last_served_at_by_question(&pool, "student1").await.unwrap();
        assert!(last_served.get("q1").is_none());
    }

    #[tokio::test]
    async fn pending_enrichment_excludes_completed() {
        let pool = init_test_db().await.expect("init db");
        let mut pending = sample_question("q3", false);
        pending.concept_extraction_status = "pending".to_string();
        upsert_question(&pool, &pending).await.unwrap();
        upsert_question(&pool, &sample_question("q4", true)).await.unwrap();

        let found = pending_enrichment(&pool).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "q3");
    }
}
