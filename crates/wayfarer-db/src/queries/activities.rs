//! Database query functions for the `activities` table.

use anyhow::{Context, Result};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{Activity, OwnedActivity};

/// Column values for inserting or rewriting an activity row.
#[derive(Debug, Clone)]
pub struct ActivityFields<'a> {
    pub day_number: i32,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub start_time: Option<&'a str>,
    pub duration_minutes: i32,
    pub estimated_cost: f64,
    pub order_index: i32,
    pub notes: Option<&'a str>,
    pub photo_url: Option<&'a str>,
}

/// Insert one activity under an itinerary. Returns the inserted row with
/// server-generated defaults (id, created_at).
pub async fn insert_activity<'e, E: PgExecutor<'e>>(
    executor: E,
    itinerary_id: Uuid,
    fields: &ActivityFields<'_>,
) -> Result<Activity> {
    let activity = sqlx::query_as::<_, Activity>(
        "INSERT INTO activities \
         (itinerary_id, day_number, title, description, location, start_time, \
          duration_minutes, estimated_cost, order_index, notes, photo_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING *",
    )
    .bind(itinerary_id)
    .bind(fields.day_number)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.location)
    .bind(fields.start_time)
    .bind(fields.duration_minutes)
    .bind(fields.estimated_cost)
    .bind(fields.order_index)
    .bind(fields.notes)
    .bind(fields.photo_url)
    .fetch_one(executor)
    .await
    .with_context(|| {
        format!(
            "failed to insert activity {:?} (day {}, order {})",
            fields.title, fields.day_number, fields.order_index
        )
    })?;

    Ok(activity)
}

/// List an itinerary's activities in display order: day, then position
/// within the day.
pub async fn list_activities_for_itinerary<'e, E: PgExecutor<'e>>(
    executor: E,
    itinerary_id: Uuid,
) -> Result<Vec<Activity>> {
    let activities = sqlx::query_as::<_, Activity>(
        "SELECT * FROM activities \
         WHERE itinerary_id = $1 \
         ORDER BY day_number ASC, order_index ASC, created_at ASC, id ASC",
    )
    .bind(itinerary_id)
    .fetch_all(executor)
    .await
    .context("failed to list activities for itinerary")?;

    Ok(activities)
}

/// Fetch an activity together with its itinerary's owner, locking the
/// itinerary row for the rest of the enclosing transaction.
pub async fn lock_activity_with_owner<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<OwnedActivity>> {
    let row = sqlx::query_as::<_, OwnedActivity>(
        "SELECT a.*, i.user_id AS owner_id \
         FROM activities a \
         JOIN itineraries i ON i.id = a.itinerary_id \
         WHERE a.id = $1 \
         FOR UPDATE OF i",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to look up activity owner")?;

    Ok(row)
}

/// Overwrite the editable columns of an activity. `id`, `itinerary_id` and
/// `created_at` are never touched.
pub async fn update_activity<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    fields: &ActivityFields<'_>,
) -> Result<Option<Activity>> {
    let activity = sqlx::query_as::<_, Activity>(
        "UPDATE activities \
         SET day_number = $1, title = $2, description = $3, location = $4, \
             start_time = $5, duration_minutes = $6, estimated_cost = $7, \
             order_index = $8, notes = $9, photo_url = $10 \
         WHERE id = $11 \
         RETURNING *",
    )
    .bind(fields.day_number)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.location)
    .bind(fields.start_time)
    .bind(fields.duration_minutes)
    .bind(fields.estimated_cost)
    .bind(fields.order_index)
    .bind(fields.notes)
    .bind(fields.photo_url)
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to update activity")?;

    Ok(activity)
}

/// Whether another activity already occupies `(day_number, order_index)`
/// in the itinerary. `exclude` skips the activity being edited.
pub async fn slot_taken<'e, E: PgExecutor<'e>>(
    executor: E,
    itinerary_id: Uuid,
    day_number: i32,
    order_index: i32,
    exclude: Option<Uuid>,
) -> Result<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS( \
             SELECT 1 FROM activities \
             WHERE itinerary_id = $1 AND day_number = $2 AND order_index = $3 \
               AND ($4::uuid IS NULL OR id <> $4) \
         )",
    )
    .bind(itinerary_id)
    .bind(day_number)
    .bind(order_index)
    .bind(exclude)
    .fetch_one(executor)
    .await
    .context("failed to check activity slot")?;

    Ok(taken)
}

/// The next free position at the end of a day: one past the highest
/// `order_index`, or 0 for an empty day.
pub async fn next_order_index<'e, E: PgExecutor<'e>>(
    executor: E,
    itinerary_id: Uuid,
    day_number: i32,
) -> Result<i32> {
    let next: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(order_index) + 1, 0) FROM activities \
         WHERE itinerary_id = $1 AND day_number = $2",
    )
    .bind(itinerary_id)
    .bind(day_number)
    .fetch_one(executor)
    .await
    .context("failed to compute next order index")?;

    Ok(next)
}

/// Highest day number used by an itinerary's activities, if any.
pub async fn max_day_number<'e, E: PgExecutor<'e>>(
    executor: E,
    itinerary_id: Uuid,
) -> Result<Option<i32>> {
    let max: Option<i32> =
        sqlx::query_scalar("SELECT MAX(day_number) FROM activities WHERE itinerary_id = $1")
            .bind(itinerary_id)
            .fetch_one(executor)
            .await
            .context("failed to compute max day number")?;

    Ok(max)
}

/// Delete one activity. Returns `true` if a row was deleted.
pub async fn delete_activity<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM activities WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete activity")?;

    Ok(result.rows_affected() > 0)
}

/// Delete every activity of an itinerary. Returns the number removed.
pub async fn delete_activities_for_itinerary<'e, E: PgExecutor<'e>>(
    executor: E,
    itinerary_id: Uuid,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM activities WHERE itinerary_id = $1")
        .bind(itinerary_id)
        .execute(executor)
        .await
        .context("failed to delete activities for itinerary")?;

    Ok(result.rows_affected())
}
