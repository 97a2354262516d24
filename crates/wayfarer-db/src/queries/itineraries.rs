//! Database query functions for the `itineraries` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{Itinerary, Visibility};

/// Column values for inserting or fully rewriting an itinerary row.
#[derive(Debug, Clone)]
pub struct ItineraryFields<'a> {
    pub destination: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    pub preferences: &'a [String],
    pub visibility: Visibility,
    pub notes: Option<&'a str>,
}

/// Insert a new itinerary owned by `user_id`. Returns the inserted row with
/// server-generated defaults (id, timestamps).
pub async fn insert_itinerary<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    fields: &ItineraryFields<'_>,
) -> Result<Itinerary> {
    let itinerary = sqlx::query_as::<_, Itinerary>(
        "INSERT INTO itineraries \
         (user_id, destination, start_date, end_date, budget, preferences, visibility, notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING *",
    )
    .bind(user_id)
    .bind(fields.destination)
    .bind(fields.start_date)
    .bind(fields.end_date)
    .bind(fields.budget)
    .bind(Json(fields.preferences))
    .bind(fields.visibility)
    .bind(fields.notes)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert itinerary for {:?}", fields.destination))?;

    Ok(itinerary)
}

/// Fetch an itinerary by its ID.
pub async fn get_itinerary(pool: &PgPool, id: Uuid) -> Result<Option<Itinerary>> {
    let itinerary = sqlx::query_as::<_, Itinerary>("SELECT * FROM itineraries WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch itinerary")?;

    Ok(itinerary)
}

/// Fetch an itinerary and take a row lock on it for the rest of the
/// enclosing transaction.
///
/// Writers to an itinerary's activity set serialize on this lock.
pub async fn lock_itinerary<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<Itinerary>> {
    let itinerary =
        sqlx::query_as::<_, Itinerary>("SELECT * FROM itineraries WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
            .context("failed to lock itinerary")?;

    Ok(itinerary)
}

/// Search criteria for itinerary listings. Every field is optional and the
/// set ones are combined with AND.
///
/// `from`/`to` select trips overlapping the window: a trip matches when it
/// ends on or after `from` and starts on or before `to`. Budget bounds are
/// inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItineraryFilter {
    /// Case-insensitive substring of the destination.
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub min_budget: Option<f64>,
    #[serde(default)]
    pub max_budget: Option<f64>,
}

/// Itineraries visible to `viewer` and matching `filter`, newest first.
///
/// With no viewer `user_id = $1` is NULL for every row, which leaves only
/// the public ones.
async fn list_filtered(
    pool: &PgPool,
    viewer: Option<Uuid>,
    filter: &ItineraryFilter,
) -> Result<Vec<Itinerary>> {
    let itineraries = sqlx::query_as::<_, Itinerary>(
        "SELECT * FROM itineraries \
         WHERE (visibility = 'public' OR user_id = $1) \
           AND ($2::text IS NULL OR strpos(lower(destination), lower($2)) > 0) \
           AND ($3::date IS NULL OR end_date >= $3) \
           AND ($4::date IS NULL OR start_date <= $4) \
           AND ($5::float8 IS NULL OR budget >= $5) \
           AND ($6::float8 IS NULL OR budget <= $6) \
         ORDER BY created_at DESC, id",
    )
    .bind(viewer)
    .bind(filter.destination.as_deref())
    .bind(filter.from)
    .bind(filter.to)
    .bind(filter.min_budget)
    .bind(filter.max_budget)
    .fetch_all(pool)
    .await
    .context("failed to list itineraries")?;

    Ok(itineraries)
}

/// List the itineraries a user can see (their own plus every public one)
/// that match `filter`, newest first.
pub async fn list_visible_itineraries(
    pool: &PgPool,
    user_id: Uuid,
    filter: &ItineraryFilter,
) -> Result<Vec<Itinerary>> {
    list_filtered(pool, Some(user_id), filter).await
}

/// List public itineraries matching `filter`, newest first.
pub async fn list_public_itineraries(
    pool: &PgPool,
    filter: &ItineraryFilter,
) -> Result<Vec<Itinerary>> {
    list_filtered(pool, None, filter).await
}

/// Aggregates over the itineraries a user owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TripStats {
    pub total_trips: i64,
    /// Trips starting strictly after `today`.
    pub upcoming_trips: i64,
    pub total_budget: f64,
}

pub async fn owner_trip_stats(pool: &PgPool, user_id: Uuid, today: NaiveDate) -> Result<TripStats> {
    let stats = sqlx::query_as::<_, TripStats>(
        "SELECT COUNT(*) AS total_trips, \
                COUNT(*) FILTER (WHERE start_date > $2) AS upcoming_trips, \
                COALESCE(SUM(budget), 0)::float8 AS total_budget \
         FROM itineraries WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(today)
    .fetch_one(pool)
    .await
    .context("failed to compute trip stats")?;

    Ok(stats)
}

/// Overwrite every editable column of an itinerary and bump `updated_at`.
///
/// Returns `None` when no row has the given ID.
pub async fn update_itinerary<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    fields: &ItineraryFields<'_>,
) -> Result<Option<Itinerary>> {
    let itinerary = sqlx::query_as::<_, Itinerary>(
        "UPDATE itineraries \
         SET destination = $1, start_date = $2, end_date = $3, budget = $4, \
             preferences = $5, visibility = $6, notes = $7, updated_at = now() \
         WHERE id = $8 \
         RETURNING *",
    )
    .bind(fields.destination)
    .bind(fields.start_date)
    .bind(fields.end_date)
    .bind(fields.budget)
    .bind(Json(fields.preferences))
    .bind(fields.visibility)
    .bind(fields.notes)
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to update itinerary")?;

    Ok(itinerary)
}

/// Record the budget the current activity set was generated from.
pub async fn set_generated_budget<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    generated_budget: Option<f64>,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE itineraries SET generated_budget = $1, updated_at = now() WHERE id = $2",
    )
    .bind(generated_budget)
    .bind(id)
    .execute(executor)
    .await
    .context("failed to record generated budget")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("itinerary {id} not found");
    }

    Ok(())
}

/// Delete an itinerary. Its activities go with it (`ON DELETE CASCADE`).
///
/// Returns `true` if a row was deleted.
pub async fn delete_itinerary<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM itineraries WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete itinerary")?;

    Ok(result.rows_affected() > 0)
}
