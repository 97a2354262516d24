//! `wayfarer import <file>`: load a legacy JSON export.

use anyhow::{Context, Result};
use sqlx::PgPool;

use wayfarer_core::itinerary::import_legacy;

pub async fn run_import(pool: &PgPool, file: &str) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read export file: {file}"))?;
    let export: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("export file is not JSON: {file}"))?;

    let report = import_legacy(pool, &export).await?;

    println!(
        "Imported {} itineraries, skipped {}.",
        report.imported.len(),
        report.skipped.len()
    );
    for imported in &report.imported {
        println!(
            "  {} -> {} ({} activities)",
            imported.legacy_id.as_deref().unwrap_or("-"),
            imported.id,
            imported.activities
        );
    }
    if !report.skipped.is_empty() {
        println!();
        println!("Skipped:");
        for skipped in &report.skipped {
            println!(
                "  #{} {}: {}",
                skipped.index,
                skipped.legacy_id.as_deref().unwrap_or("-"),
                skipped.reason
            );
        }
    }
    Ok(())
}
