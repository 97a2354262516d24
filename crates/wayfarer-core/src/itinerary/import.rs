//! Import of itineraries exported by the legacy store.
//!
//! Legacy rows embed their activities as a JSON array (sometimes a string
//! holding one), store budgets as strings, dates as ISO timestamps and the
//! visibility as an `is_public` flag. Start times may lack the leading zero.

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use wayfarer_db::models::Visibility;
use wayfarer_db::queries::itineraries as itinerary_queries;

use super::NewItinerary;
use super::activities::write_activity_set;
use super::service::TripInput;
use super::validate::{ValidActivity, validate_drafts};
use crate::decode::decode_or_empty;
use crate::error::{CoreError, CoreResult};
use crate::planner::{ActivityDraft, DEFAULT_DURATION_MINUTES};

/// One itinerary row as exported by the legacy store.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyItinerary {
    #[serde(default)]
    pub id: Value,
    pub user_id: Uuid,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub budget: Value,
    #[serde(default)]
    pub preferences: Value,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_public: Value,
    #[serde(default)]
    pub activities: Value,
}

/// One embedded legacy activity. Its own id and timestamps are discarded.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyActivity {
    pub day_number: i32,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub order_index: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedItinerary {
    pub legacy_id: Option<String>,
    pub id: Uuid,
    pub activities: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItinerary {
    /// Position in the export.
    pub index: usize,
    pub legacy_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: Vec<ImportedItinerary>,
    pub skipped: Vec<SkippedItinerary>,
}

fn legacy_id_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// `2025-06-01` or `2025-06-01T00:00:00.000Z`.
fn parse_legacy_date(raw: &str, field: &str) -> CoreResult<NaiveDate> {
    raw.trim()
        .get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .ok_or_else(|| CoreError::validation(field, format!("{raw:?} is not a date")))
}

fn parse_legacy_amount(value: &Value) -> CoreResult<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    amount.ok_or_else(|| CoreError::validation("budget", format!("{value} is not an amount")))
}

fn parse_legacy_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "TRUE"),
        _ => false,
    }
}

/// Turn embedded activities into drafts with dense positions per day.
///
/// Activities keep their relative order within a day; ties and missing
/// positions fall back to export order.
pub fn legacy_drafts(activities: Vec<LegacyActivity>) -> Vec<ActivityDraft> {
    let mut indexed: Vec<(usize, LegacyActivity)> = activities.into_iter().enumerate().collect();
    indexed.sort_by_key(|(pos, a)| (a.day_number, a.order_index.unwrap_or(i32::MAX), *pos));

    let mut drafts = Vec::with_capacity(indexed.len());
    let mut current_day = None;
    let mut next = 0;
    for (_, a) in indexed {
        if current_day != Some(a.day_number) {
            current_day = Some(a.day_number);
            next = 0;
        }
        drafts.push(ActivityDraft {
            itinerary_id: None,
            day_number: a.day_number,
            title: a.title,
            description: a.description,
            location: a.location,
            start_time: a.start_time,
            duration_minutes: a.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
            estimated_cost: a.estimated_cost.unwrap_or(0.0),
            order_index: Some(next),
            notes: a.notes,
            photo_url: a.photo_url,
        });
        next += 1;
    }
    drafts
}

/// Validated pieces of one legacy record.
struct Prepared {
    trip: TripInput,
    activities: Vec<ValidActivity>,
}

fn prepare(record: LegacyItinerary, label: &str) -> CoreResult<Prepared> {
    let trip = TripInput::validated(NewItinerary {
        destination: record.destination,
        start_date: parse_legacy_date(&record.start_date, "start_date")?,
        end_date: parse_legacy_date(&record.end_date, "end_date")?,
        budget: parse_legacy_amount(&record.budget)?,
        preferences: decode_or_empty(&record.preferences, "preferences", label),
        visibility: Visibility::from_public_flag(parse_legacy_flag(&record.is_public)),
        notes: record.notes,
    })?;

    let legacy: Vec<LegacyActivity> = decode_or_empty(&record.activities, "activities", label);
    // Drafts carry no itinerary reference, so any id passes the match check.
    let activities = validate_drafts(legacy_drafts(legacy), Uuid::nil(), trip.day_span())?;
    Ok(Prepared { trip, activities })
}

/// Import a legacy export: a JSON array of itinerary rows, or an object
/// with an `itineraries` array.
///
/// Each itinerary is written in its own transaction. Rows that fail
/// validation are skipped and reported; a storage failure aborts the
/// import, keeping the itineraries already written.
pub async fn import_legacy(pool: &PgPool, export: &Value) -> CoreResult<ImportReport> {
    let rows = match export {
        Value::Array(rows) => rows,
        Value::Object(map) => match map.get("itineraries") {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(CoreError::validation(
                    "itineraries",
                    "export object has no itineraries array",
                ));
            }
        },
        _ => {
            return Err(CoreError::validation(
                "itineraries",
                "export must be an array of itineraries",
            ));
        }
    };

    let mut report = ImportReport::default();
    for (index, row) in rows.iter().enumerate() {
        let legacy_id = row.get("id").and_then(legacy_id_of);
        let label = legacy_id.clone().unwrap_or_else(|| format!("#{index}"));

        let prepared = LegacyItinerary::deserialize(row)
            .map_err(|e| CoreError::validation("itinerary", e.to_string()))
            .and_then(|record| {
                let owner = record.user_id;
                prepare(record, &label).map(|p| (owner, p))
            });
        let (owner, prepared) = match prepared {
            Ok(p) => p,
            Err(CoreError::Validation { field, message }) => {
                warn!(itinerary = %label, %field, %message, "skipping legacy itinerary");
                report.skipped.push(SkippedItinerary {
                    index,
                    legacy_id,
                    reason: format!("invalid {field}: {message}"),
                });
                continue;
            }
            Err(other) => return Err(other),
        };

        let mut tx = pool.begin().await.context("failed to begin transaction")?;
        let created =
            itinerary_queries::insert_itinerary(&mut *tx, owner, &prepared.trip.fields()).await?;
        let activities = write_activity_set(&mut tx, created.id, &prepared.activities).await?;
        tx.commit().await.context("failed to commit transaction")?;

        report.imported.push(ImportedItinerary {
            legacy_id,
            id: created.id,
            activities: activities.len(),
        });
    }

    info!(
        imported = report.imported.len(),
        skipped = report.skipped.len(),
        "legacy import finished"
    );
    Ok(report)
}
