//! Itinerary-level operations: create, read, update, delete, regenerate.

use anyhow::Context;
use chrono::NaiveDate;
use rand::Rng;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use wayfarer_db::models::{Activity, Itinerary, Visibility, day_span};
use wayfarer_db::queries::activities as activity_queries;
use wayfarer_db::queries::itineraries::{
    self as itinerary_queries, ItineraryFields, ItineraryFilter, TripStats,
};

use super::access::{can_view, require_owner};
use super::activities::write_activity_set;
use super::summary::BudgetSummary;
use super::validate::{
    normalize_filter, normalize_preferences, normalize_text, validate_drafts, validate_trip,
};
use super::{ItineraryDetail, ItineraryPatch, ItineraryView, NewItinerary};
use crate::decode::decode_or_empty;
use crate::error::{CoreError, CoreResult};
use crate::planner::Planner;

/// Validated, normalized itinerary input.
pub(crate) struct TripInput {
    destination: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    budget: f64,
    preferences: Vec<String>,
    visibility: Visibility,
    notes: Option<String>,
}

impl TripInput {
    pub(crate) fn validated(input: NewItinerary) -> CoreResult<Self> {
        validate_trip(&input.destination, input.start_date, input.end_date, input.budget)?;
        Ok(Self {
            destination: input.destination.trim().to_owned(),
            start_date: input.start_date,
            end_date: input.end_date,
            budget: input.budget,
            preferences: normalize_preferences(&input.preferences),
            visibility: input.visibility,
            notes: normalize_text(input.notes),
        })
    }

    pub(crate) fn fields(&self) -> ItineraryFields<'_> {
        ItineraryFields {
            destination: &self.destination,
            start_date: self.start_date,
            end_date: self.end_date,
            budget: self.budget,
            preferences: &self.preferences,
            visibility: self.visibility,
            notes: self.notes.as_deref(),
        }
    }

    pub(crate) fn day_span(&self) -> i64 {
        day_span(self.start_date, self.end_date)
    }
}

/// Lock an itinerary inside a transaction and check the caller owns it.
pub(crate) async fn lock_owned(
    conn: &mut PgConnection,
    itinerary_id: Uuid,
    caller: Uuid,
    action: &str,
) -> CoreResult<Itinerary> {
    let itinerary = itinerary_queries::lock_itinerary(&mut *conn, itinerary_id)
        .await?
        .ok_or_else(|| CoreError::not_found("itinerary", itinerary_id))?;
    require_owner(caller, &itinerary, action)?;
    Ok(itinerary)
}

/// Create an itinerary with an empty activity set.
pub async fn create_itinerary(
    pool: &PgPool,
    owner: Uuid,
    input: NewItinerary,
) -> CoreResult<ItineraryView> {
    let trip = TripInput::validated(input)?;
    let row = itinerary_queries::insert_itinerary(pool, owner, &trip.fields()).await?;

    info!(itinerary_id = %row.id, %owner, destination = %row.destination, "itinerary created");
    Ok(ItineraryView::from(&row))
}

/// Create an itinerary and fill it with a generated schedule in one
/// transaction.
pub async fn create_planned_itinerary<R: Rng + Send + ?Sized>(
    pool: &PgPool,
    planner: &Planner,
    owner: Uuid,
    input: NewItinerary,
    rng: &mut R,
) -> CoreResult<ItineraryDetail> {
    let trip = TripInput::validated(input)?;
    let days = trip.day_span();
    let drafts = planner.generate(&trip.destination, days, trip.budget, rng)?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let row = itinerary_queries::insert_itinerary(&mut *tx, owner, &trip.fields()).await?;
    let valid = validate_drafts(drafts, row.id, days)?;
    let activities = write_activity_set(&mut tx, row.id, &valid).await?;
    itinerary_queries::set_generated_budget(&mut *tx, row.id, Some(row.budget)).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        itinerary_id = %row.id,
        %owner,
        activities = activities.len(),
        "planned itinerary created"
    );

    let row = Itinerary {
        generated_budget: Some(row.budget),
        ..row
    };
    Ok(ItineraryDetail::new(&row, activities))
}

/// Fetch an itinerary with its activities and budget summary.
///
/// A private itinerary the caller may not see is reported as missing.
pub async fn get_itinerary(
    pool: &PgPool,
    itinerary_id: Uuid,
    caller: Option<Uuid>,
) -> CoreResult<ItineraryDetail> {
    let row = itinerary_queries::get_itinerary(pool, itinerary_id)
        .await?
        .filter(|row| can_view(caller, row))
        .ok_or_else(|| CoreError::not_found("itinerary", itinerary_id))?;
    let activities = activity_queries::list_activities_for_itinerary(pool, itinerary_id).await?;
    Ok(ItineraryDetail::new(&row, activities))
}

/// The caller's itineraries plus every public one that match `filter`,
/// newest first.
pub async fn list_itineraries(
    pool: &PgPool,
    caller: Uuid,
    filter: ItineraryFilter,
) -> CoreResult<Vec<ItineraryView>> {
    let filter = normalize_filter(filter)?;
    let rows = itinerary_queries::list_visible_itineraries(pool, caller, &filter).await?;
    Ok(rows.iter().map(ItineraryView::from).collect())
}

pub async fn list_public_itineraries(
    pool: &PgPool,
    filter: ItineraryFilter,
) -> CoreResult<Vec<ItineraryView>> {
    let filter = normalize_filter(filter)?;
    let rows = itinerary_queries::list_public_itineraries(pool, &filter).await?;
    Ok(rows.iter().map(ItineraryView::from).collect())
}

/// Totals over the trips `owner` owns. Public trips of other users are not
/// counted. A trip is upcoming when it starts after `today`.
pub async fn trip_stats(pool: &PgPool, owner: Uuid, today: NaiveDate) -> CoreResult<TripStats> {
    Ok(itinerary_queries::owner_trip_stats(pool, owner, today).await?)
}

/// Apply a patch to an itinerary. Activities are left alone, so a date
/// change that would strand activities past the new last day is rejected.
pub async fn update_itinerary(
    pool: &PgPool,
    itinerary_id: Uuid,
    caller: Uuid,
    patch: ItineraryPatch,
) -> CoreResult<ItineraryView> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let current = lock_owned(&mut tx, itinerary_id, caller, "update").await?;

    let preferences = match patch.preferences {
        Some(tags) => tags,
        None => decode_or_empty(&current.preferences, "preferences", current.id),
    };
    let notes = match patch.notes {
        Some(notes) => notes,
        None => current.notes.clone(),
    };
    let trip = TripInput::validated(NewItinerary {
        destination: patch.destination.unwrap_or(current.destination),
        start_date: patch.start_date.unwrap_or(current.start_date),
        end_date: patch.end_date.unwrap_or(current.end_date),
        budget: patch.budget.unwrap_or(current.budget),
        preferences,
        visibility: patch.visibility.unwrap_or(current.visibility),
        notes,
    })?;

    let new_span = trip.day_span();
    if let Some(last_day) = activity_queries::max_day_number(&mut *tx, itinerary_id).await? {
        if i64::from(last_day) > new_span {
            return Err(CoreError::validation(
                "end_date",
                format!(
                    "trip would span {new_span} days but activities are scheduled on day {last_day}"
                ),
            ));
        }
    }

    let row = itinerary_queries::update_itinerary(&mut *tx, itinerary_id, &trip.fields())
        .await?
        .ok_or_else(|| CoreError::not_found("itinerary", itinerary_id))?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(itinerary_id = %row.id, budget = row.budget, "itinerary updated");
    Ok(ItineraryView::from(&row))
}

/// Delete an itinerary and, through the cascade, its activities.
pub async fn delete_itinerary(pool: &PgPool, itinerary_id: Uuid, caller: Uuid) -> CoreResult<()> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    lock_owned(&mut tx, itinerary_id, caller, "delete").await?;
    itinerary_queries::delete_itinerary(&mut *tx, itinerary_id).await?;
    tx.commit().await.context("failed to commit transaction")?;

    info!(%itinerary_id, "itinerary deleted");
    Ok(())
}

/// Replace the activity set with a fresh schedule for the itinerary's
/// current destination, dates and budget, and record the budget used.
pub async fn regenerate_activities<R: Rng + Send + ?Sized>(
    pool: &PgPool,
    planner: &Planner,
    itinerary_id: Uuid,
    caller: Uuid,
    rng: &mut R,
) -> CoreResult<Vec<Activity>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    let itinerary = lock_owned(&mut tx, itinerary_id, caller, "regenerate activities").await?;

    let days = itinerary.day_span();
    let drafts = planner.generate(&itinerary.destination, days, itinerary.budget, rng)?;
    let valid = validate_drafts(drafts, itinerary_id, days)?;

    let activities = write_activity_set(&mut tx, itinerary_id, &valid).await?;
    itinerary_queries::set_generated_budget(&mut *tx, itinerary_id, Some(itinerary.budget))
        .await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        %itinerary_id,
        budget = itinerary.budget,
        activities = activities.len(),
        "activities regenerated"
    );
    Ok(activities)
}

/// Cost of the current activity set against the budget.
pub async fn budget_summary(
    pool: &PgPool,
    itinerary_id: Uuid,
    caller: Option<Uuid>,
) -> CoreResult<BudgetSummary> {
    let detail = get_itinerary(pool, itinerary_id, caller).await?;
    Ok(detail.summary)
}

