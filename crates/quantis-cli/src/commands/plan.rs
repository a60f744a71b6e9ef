//! Implementation of the `quantis plan` command.
//!
//! Previews the next adaptive pack for a student without persisting a
//! session — useful for inspecting planner telemetry while iterating on
//! pool/diversity configuration.

use quantis_core::config::Config;
use quantis_core::planner;
use quantis_core::storage;
use quantis_core::storage::questions::get_question;
use quantis_core::storage::sessions::count_served_or_completed;

pub async fn execute(config: &Config, student_id: &str) -> anyhow::Result<()> {
    let pool = storage::init_db(&config.storage.db_path).await?;

    let served = count_served_or_completed(&pool, student_id).await?;
    let preview_seq = served as i64 + 1;

    let planned = planner::plan_session(&pool, config, student_id, preview_seq).await?;

    println!("Preview pack for {student_id} (phase {}, session #{preview_seq}):", planned.phase);
    for (i, id) in planned.question_ids.iter().enumerate() {
        match get_question(&pool, id).await? {
            Some(q) => println!(
                "  {:>2}. [{:<6}] {} / {} — {}",
                i + 1,
                q.difficulty_band,
                q.category,
                q.subcategory,
                q.stem.chars().take(60).collect::<String>()
            ),
            None => println!("  {:>2}. <missing question {id}>", i + 1),
        }
    }

    println!();
    println!(
        "target E/M/H: {}/{}/{}  actual E/M/H: {}/{}/{}",
        planned.telemetry.target_difficulty.easy,
        planned.telemetry.target_difficulty.medium,
        planned.telemetry.target_difficulty.hard,
        planned.telemetry.actual_difficulty.easy,
        planned.telemetry.actual_difficulty.medium,
        planned.telemetry.actual_difficulty.hard,
    );
    println!("session type: {}", planned.telemetry.session_type);
    println!("cooldowns applied: {}", planned.telemetry.cooldowns_applied);
    if !planned.telemetry.backfill_notes.is_empty() {
        println!("backfill notes: {}", planned.telemetry.backfill_notes.join("; "));
    }

    pool.close().await;
    Ok(())
}
