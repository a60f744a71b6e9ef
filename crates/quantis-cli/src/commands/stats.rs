//! Implementation of the `quantis stats` command.
//!
//! Displays a student's mastery by subcategory and question-bank coverage.

use quantis_core::config::Config;
use quantis_core::mastery::ReadinessBand;
use quantis_core::storage;
use quantis_core::storage::coverage::coverage_for_student;
use quantis_core::storage::mastery::{mastery_for_student, SUBCATEGORY_LEVEL};
use quantis_core::storage::sessions::count_served_or_completed;

pub async fn execute(config: &Config, student_id: &str) -> anyhow::Result<()> {
    let pool = storage::init_db(&config.storage.db_path).await?;

    let served = count_served_or_completed(&pool, student_id).await?;
    println!("=== Quantis stats for {student_id} ===");
    println!("sessions served or completed: {served}");
    println!();

    println!("--- Mastery by subcategory ---");
    let mastery = mastery_for_student(&pool, student_id).await?;
    let mut subcategory_rows: Vec<_> = mastery
        .iter()
        .filter(|r| r.type_of_question == SUBCATEGORY_LEVEL)
        .collect();
    subcategory_rows.sort_by(|a, b| a.mastery_pct.partial_cmp(&b.mastery_pct).unwrap());

    if subcategory_rows.is_empty() {
        println!("  No attempts recorded yet.");
    } else {
        for record in subcategory_rows {
            let band = ReadinessBand::from_pct(record.mastery_pct);
            println!(
                "  {:<28} {:>5.1}%  {:?}  ({} attempts)",
                record.subcategory,
                record.mastery_pct * 100.0,
                band,
                record.exposure_count,
            );
        }
    }
    println!();

    println!("--- Coverage ---");
    let coverage = coverage_for_student(&pool, student_id).await?;
    if coverage.is_empty() {
        println!("  No coverage recorded yet.");
    } else {
        println!("  {} distinct (subcategory, type) combinations seen", coverage.len());
    }

    pool.close().await;
    Ok(())
}
