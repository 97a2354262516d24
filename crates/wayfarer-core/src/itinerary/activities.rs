//! Activity-level operations on a single itinerary.

use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use wayfarer_db::models::Activity;
use wayfarer_db::queries::activities as activity_queries;
use wayfarer_db::queries::itineraries as itinerary_queries;

use super::service::lock_owned;
use super::validate::{ActivityInput, ValidActivity, validate_activity, validate_drafts};
use super::{ActivityPatch, NewActivity};
use crate::error::{CoreError, CoreResult};
use crate::planner::{ActivityDraft, DEFAULT_DURATION_MINUTES};

/// Swap an itinerary's activity set for `activities`.
///
/// The caller holds the itinerary lock. Returns the new set in display
/// order.
pub(crate) async fn write_activity_set(
    conn: &mut PgConnection,
    itinerary_id: Uuid,
    activities: &[ValidActivity],
) -> CoreResult<Vec<Activity>> {
    let removed =
        activity_queries::delete_activities_for_itinerary(&mut *conn, itinerary_id).await?;
    for activity in activities {
        activity_queries::insert_activity(&mut *conn, itinerary_id, &activity.fields()).await?;
    }
    debug!(%itinerary_id, removed, inserted = activities.len(), "activity set rewritten");

    let stored = activity_queries::list_activities_for_itinerary(&mut *conn, itinerary_id).await?;
    Ok(stored)
}

/// Replace an itinerary's whole activity set in one transaction.
///
/// Every draft is validated before anything is written; one bad draft
/// leaves the existing set untouched.
pub async fn replace_activities(
    pool: &PgPool,
    itinerary_id: Uuid,
    caller: Uuid,
    drafts: Vec<ActivityDraft>,
) -> CoreResult<Vec<Activity>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let itinerary = lock_owned(&mut tx, itinerary_id, caller, "replace activities").await?;

    let valid = validate_drafts(drafts, itinerary_id, itinerary.day_span())?;
    let activities = write_activity_set(&mut tx, itinerary_id, &valid).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(%itinerary_id, activities = activities.len(), "activities replaced");
    Ok(activities)
}

/// Append one activity to an itinerary.
pub async fn add_activity(pool: &PgPool, caller: Uuid, input: NewActivity) -> CoreResult<Activity> {
    let itinerary_id = input.itinerary_id;
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let itinerary = lock_owned(&mut tx, itinerary_id, caller, "add activities").await?;

    let order_index = match input.order_index {
        Some(order) => order,
        None => {
            activity_queries::next_order_index(&mut *tx, itinerary_id, input.day_number).await?
        }
    };
    let valid = validate_activity(
        ActivityInput {
            day_number: input.day_number,
            title: input.title,
            description: input.description,
            location: input.location,
            start_time: input.start_time,
            duration_minutes: input.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
            estimated_cost: input.estimated_cost.unwrap_or(0.0),
            order_index,
            notes: input.notes,
            photo_url: input.photo_url,
        },
        itinerary.day_span(),
        "",
    )?;
    ensure_slot_free(&mut tx, itinerary_id, &valid, None).await?;

    let activity =
        activity_queries::insert_activity(&mut *tx, itinerary_id, &valid.fields()).await?;
    tx.commit().await.context("failed to commit transaction")?;

    info!(activity_id = %activity.id, %itinerary_id, day = activity.day_number, "activity added");
    Ok(activity)
}

/// Patch one activity. Its id, itinerary and creation time never change.
pub async fn update_activity(
    pool: &PgPool,
    activity_id: Uuid,
    caller: Uuid,
    patch: ActivityPatch,
) -> CoreResult<Activity> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let owned = activity_queries::lock_activity_with_owner(&mut *tx, activity_id)
        .await?
        .ok_or_else(|| CoreError::not_found("activity", activity_id))?;
    if owned.owner_id != caller {
        return Err(CoreError::Authorization(format!(
            "update of activity {activity_id}"
        )));
    }
    let current = owned.activity;
    let itinerary = itinerary_queries::lock_itinerary(&mut *tx, current.itinerary_id)
        .await?
        .ok_or_else(|| CoreError::not_found("itinerary", current.itinerary_id))?;

    let valid = validate_activity(
        ActivityInput {
            day_number: patch.day_number.unwrap_or(current.day_number),
            title: patch.title.unwrap_or(current.title),
            description: patch.description.unwrap_or(current.description),
            location: patch.location.unwrap_or(current.location),
            start_time: patch.start_time.unwrap_or(current.start_time),
            duration_minutes: patch.duration_minutes.unwrap_or(current.duration_minutes),
            estimated_cost: patch.estimated_cost.unwrap_or(current.estimated_cost),
            order_index: patch.order_index.unwrap_or(current.order_index),
            notes: patch.notes.unwrap_or(current.notes),
            photo_url: patch.photo_url.unwrap_or(current.photo_url),
        },
        itinerary.day_span(),
        "",
    )?;
    ensure_slot_free(&mut tx, itinerary.id, &valid, Some(activity_id)).await?;

    let activity = activity_queries::update_activity(&mut *tx, activity_id, &valid.fields())
        .await?
        .ok_or_else(|| CoreError::not_found("activity", activity_id))?;
    tx.commit().await.context("failed to commit transaction")?;

    info!(%activity_id, itinerary_id = %activity.itinerary_id, "activity updated");
    Ok(activity)
}

/// Delete one activity.
pub async fn delete_activity(pool: &PgPool, activity_id: Uuid, caller: Uuid) -> CoreResult<()> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let owned = activity_queries::lock_activity_with_owner(&mut *tx, activity_id)
        .await?
        .ok_or_else(|| CoreError::not_found("activity", activity_id))?;
    if owned.owner_id != caller {
        return Err(CoreError::Authorization(format!(
            "deletion of activity {activity_id}"
        )));
    }

    activity_queries::delete_activity(&mut *tx, activity_id).await?;
    tx.commit().await.context("failed to commit transaction")?;

    info!(%activity_id, itinerary_id = %owned.activity.itinerary_id, "activity deleted");
    Ok(())
}

/// Remove every activity of an itinerary. Same as replacing the set with
/// nothing; returns how many were removed.
pub async fn delete_all_activities(
    pool: &PgPool,
    itinerary_id: Uuid,
    caller: Uuid,
) -> CoreResult<u64> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    lock_owned(&mut tx, itinerary_id, caller, "delete activities").await?;
    let removed =
        activity_queries::delete_activities_for_itinerary(&mut *tx, itinerary_id).await?;
    tx.commit().await.context("failed to commit transaction")?;

    info!(%itinerary_id, removed, "all activities deleted");
    Ok(removed)
}

/// An itinerary's activities sorted by day, then position.
pub async fn list_activities(pool: &PgPool, itinerary_id: Uuid) -> CoreResult<Vec<Activity>> {
    if itinerary_queries::get_itinerary(pool, itinerary_id)
        .await?
        .is_none()
    {
        return Err(CoreError::not_found("itinerary", itinerary_id));
    }
    let activities = activity_queries::list_activities_for_itinerary(pool, itinerary_id).await?;
    Ok(activities)
}

async fn ensure_slot_free(
    conn: &mut PgConnection,
    itinerary_id: Uuid,
    activity: &ValidActivity,
    exclude: Option<Uuid>,
) -> CoreResult<()> {
    let taken = activity_queries::slot_taken(
        &mut *conn,
        itinerary_id,
        activity.day_number,
        activity.order_index,
        exclude,
    )
    .await?;
    if taken {
        return Err(CoreError::validation(
            "order_index",
            format!(
                "day {} already has an activity at position {}",
                activity.day_number, activity.order_index
            ),
        ));
    }
    Ok(())
}
