//! Implementation of the `quantis ingest` command.
//!
//! Loads admin-authored questions from a JSON file into the question store,
//! leaving every pipeline-derived field untouched (pending, inactive) for
//! `quantis enrich` to fill in.

use quantis_core::config::Config;
use quantis_core::storage;
use quantis_core::storage::questions::{upsert_question, Question};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct RawQuestion {
    stem: String,
    admin_answer: Option<String>,
    admin_solution: Option<String>,
    principle_to_remember: Option<String>,
    image_url: Option<String>,
}

pub async fn execute(config: &Config, file: &str) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(file)?;
    let raw: Vec<RawQuestion> = serde_json::from_str(&contents)?;

    if raw.is_empty() {
        anyhow::bail!("{file} contains no questions");
    }

    let pool = storage::init_db(&config.storage.db_path).await?;
    let now = chrono::Utc::now().to_rfc3339();

    let mut inserted = 0;
    for item in raw {
        let question = Question {
            id: Uuid::new_v4().to_string(),
            stem: item.stem,
            source: "admin".to_string(),
            admin_answer: item.admin_answer,
            admin_solution: item.admin_solution,
            principle_to_remember: item.principle_to_remember,
            image_url: item.image_url,
            right_answer: None,
            category: String::new(),
            subcategory: String::new(),
            type_of_question: String::new(),
            difficulty_band: "Medium".to_string(),
            difficulty_score: 3.0,
            pyq_frequency_score: None,
            core_concepts: None,
            solution_method: None,
            concept_difficulty: None,
            operations_required: None,
            problem_structure: None,
            concept_keywords: None,
            is_active: false,
            quality_verified: false,
            concept_extraction_status: "pending".to_string(),
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        upsert_question(&pool, &question).await?;
        inserted += 1;
    }

    pool.close().await;
    println!("Ingested {inserted} question(s); run `quantis enrich` to classify and activate them.");

    Ok(())
}
