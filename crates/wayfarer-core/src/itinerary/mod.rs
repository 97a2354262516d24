//! Itineraries and the consistency rules for their activity sets.
//!
//! Every mutation runs in one transaction that locks the itinerary row
//! first. Ownership is checked under that lock, and a request that fails
//! validation is rejected before anything is written.

pub mod access;
pub mod activities;
pub mod import;
pub mod service;
pub mod summary;
pub mod validate;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use wayfarer_db::models::{Activity, Itinerary, Visibility};

use crate::decode::decode_or_empty;

pub use activities::{
    add_activity, delete_activity, delete_all_activities, list_activities, replace_activities,
    update_activity,
};
pub use import::{ImportReport, import_legacy};
pub use service::{
    budget_summary, create_itinerary, create_planned_itinerary, delete_itinerary, get_itinerary,
    list_itineraries, list_public_itineraries, regenerate_activities, trip_stats,
    update_itinerary,
};
pub use summary::{BudgetSummary, DayCost};
pub use wayfarer_db::queries::itineraries::{ItineraryFilter, TripStats};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in patch bodies.
fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Input for creating an itinerary.
#[derive(Debug, Clone, Deserialize)]
pub struct NewItinerary {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update of an itinerary. Absent fields keep their value; a blank
/// or `null` `notes` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItineraryPatch {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub preferences: Option<Vec<String>>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

/// Input for adding one activity. Omitted `duration_minutes`,
/// `estimated_cost` and `order_index` get defaults: 60 minutes, free, and
/// the end of the day.
#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
    pub itinerary_id: Uuid,
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

/// Partial update of an activity.
///
/// There is no way to express a change of `id`, `itinerary_id` or
/// `created_at`; such keys in a JSON body are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityPatch {
    #[serde(default)]
    pub day_number: Option<i32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_time: Option<Option<String>>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub order_index: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub photo_url: Option<Option<String>>,
}

/// An itinerary as returned to callers, with preferences decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItineraryView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub day_count: i64,
    pub budget: f64,
    pub preferences: Vec<String>,
    pub visibility: Visibility,
    pub notes: Option<String>,
    pub generated_budget: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Itinerary> for ItineraryView {
    fn from(row: &Itinerary) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            destination: row.destination.clone(),
            start_date: row.start_date,
            end_date: row.end_date,
            day_count: row.day_span(),
            budget: row.budget,
            preferences: decode_or_empty(&row.preferences, "preferences", row.id),
            visibility: row.visibility,
            notes: row.notes.clone(),
            generated_budget: row.generated_budget,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// An itinerary with its activities in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItineraryDetail {
    #[serde(flatten)]
    pub itinerary: ItineraryView,
    pub activities: Vec<Activity>,
    pub summary: BudgetSummary,
}

impl ItineraryDetail {
    pub(crate) fn new(row: &Itinerary, activities: Vec<Activity>) -> Self {
        let summary = summary::summarize(row, &activities);
        Self {
            itinerary: ItineraryView::from(row),
            activities,
            summary,
        }
    }
}
