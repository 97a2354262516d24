use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Who may read an itinerary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Only the owner can see it.
    #[default]
    Private,
    /// Listed for everyone, still editable only by the owner.
    Public,
}

impl Visibility {
    /// Map the legacy `is_public` flag onto a visibility.
    pub fn from_public_flag(is_public: bool) -> Self {
        if is_public {
            Self::Public
        } else {
            Self::Private
        }
    }

    pub fn is_public(self) -> bool {
        self == Self::Public
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Private => "private",
            Self::Public => "public",
        };
        f.write_str(s)
    }
}

impl FromStr for Visibility {
    type Err = VisibilityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            other => Err(VisibilityParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Visibility`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid visibility: {0:?}")]
pub struct VisibilityParseError(pub String);

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// An itinerary row.
///
/// `preferences` is kept as raw JSON: rows written by older clients may hold
/// a string-encoded array or something else entirely, so decoding happens in
/// the service layer where a bad value can be tolerated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Itinerary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    pub preferences: serde_json::Value,
    pub visibility: Visibility,
    pub notes: Option<String>,
    pub generated_budget: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Itinerary {
    /// Number of calendar days covered, counting both ends.
    pub fn day_span(&self) -> i64 {
        day_span(self.start_date, self.end_date)
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Inclusive number of days between two dates. Zero or negative when
/// `end` precedes `start`.
pub fn day_span(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// An activity row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub itinerary_id: Uuid,
    pub day_number: i32,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: Option<String>,
    pub duration_minutes: i32,
    pub estimated_cost: f64,
    pub order_index: i32,
    pub notes: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An activity joined with the owner of its itinerary.
#[derive(Debug, Clone, FromRow)]
pub struct OwnedActivity {
    #[sqlx(flatten)]
    pub activity: Activity,
    pub owner_id: Uuid,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
