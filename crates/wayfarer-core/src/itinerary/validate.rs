//! Field-level validation for itineraries and activities.
//!
//! Everything here is pure: callers validate a whole batch before touching
//! the store, so a rejected request never leaves partial writes behind.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use uuid::Uuid;

use wayfarer_db::queries::activities::ActivityFields;
use wayfarer_db::queries::itineraries::ItineraryFilter;

use crate::error::{CoreError, CoreResult};
use crate::planner::ActivityDraft;

/// Check the trip-level fields shared by create and update.
pub fn validate_trip(
    destination: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    budget: f64,
) -> CoreResult<()> {
    if destination.trim().is_empty() {
        return Err(CoreError::validation("destination", "must not be empty"));
    }
    if start_date > end_date {
        return Err(CoreError::validation(
            "end_date",
            format!("{end_date} is before start date {start_date}"),
        ));
    }
    if !budget.is_finite() || budget <= 0.0 {
        return Err(CoreError::validation("budget", "must be a positive amount"));
    }
    Ok(())
}

/// Normalize listing criteria: a blank destination matches everything,
/// and each range must be finite and ordered.
pub fn normalize_filter(filter: ItineraryFilter) -> CoreResult<ItineraryFilter> {
    let bounds = [
        ("min_budget", filter.min_budget),
        ("max_budget", filter.max_budget),
    ];
    for (field, bound) in bounds {
        if bound.is_some_and(|b| !b.is_finite()) {
            return Err(CoreError::validation(field, "must be a finite amount"));
        }
    }
    if let (Some(min), Some(max)) = (filter.min_budget, filter.max_budget) {
        if min > max {
            return Err(CoreError::validation(
                "max_budget",
                format!("{max} is below min_budget {min}"),
            ));
        }
    }
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(CoreError::validation("to", format!("{to} is before from {from}")));
        }
    }
    Ok(ItineraryFilter {
        destination: normalize_text(filter.destination),
        ..filter
    })
}

/// Trim tags, drop empty ones and duplicates. First occurrence wins.
pub fn normalize_preferences<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter_map(|t| {
            let t = t.as_ref().trim();
            (!t.is_empty() && seen.insert(t.to_owned())).then(|| t.to_owned())
        })
        .collect()
}

/// Trim free text; blank becomes absent.
pub fn normalize_text(text: Option<String>) -> Option<String> {
    text.and_then(|t| {
        let trimmed = t.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_owned())
    })
}

/// Canonical `HH:MM` for a start time.
///
/// Accepts a one-digit hour (`9:30`) and a trailing seconds field
/// (`09:30:00`) as written by older clients.
pub fn normalize_start_time(raw: &str) -> Option<String> {
    let mut parts = raw.trim().split(':');
    let hour = parts.next()?;
    let minute = parts.next()?;
    if let Some(seconds) = parts.next() {
        if seconds.len() != 2 || !seconds.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    if parts.next().is_some() {
        return None;
    }

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(hour) || hour.len() > 2 || !digits(minute) || minute.len() != 2 {
        return None;
    }
    let h: u32 = hour.parse().ok()?;
    let m: u32 = minute.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(format!("{h:02}:{m:02}"))
}

/// An activity whose fields passed validation, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidActivity {
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
}

impl ValidActivity {
    pub fn fields(&self) -> ActivityFields<'_> {
        ActivityFields {
            day_number: self.day_number,
            title: &self.title,
            description: self.description.as_deref(),
            location: self.location.as_deref(),
            start_time: self.start_time.as_deref(),
            duration_minutes: self.duration_minutes,
            estimated_cost: self.estimated_cost,
            order_index: self.order_index,
            notes: self.notes.as_deref(),
            photo_url: self.photo_url.as_deref(),
        }
    }
}

/// Unvalidated activity fields with the order already resolved.
#[derive(Debug, Clone)]
pub struct ActivityInput {
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
}

/// Validate one activity against an itinerary spanning `days` days.
///
/// `prefix` is prepended to field names in errors, e.g. `activities[2].`.
pub fn validate_activity(
    input: ActivityInput,
    days: i64,
    prefix: &str,
) -> CoreResult<ValidActivity> {
    let field = |name: &str| format!("{prefix}{name}");

    let title = input.title.trim();
    if title.is_empty() {
        return Err(CoreError::validation(field("title"), "must not be empty"));
    }
    if input.day_number < 1 || i64::from(input.day_number) > days {
        return Err(CoreError::validation(
            field("day_number"),
            format!("{} is outside 1..={days}", input.day_number),
        ));
    }
    if input.duration_minutes <= 0 {
        return Err(CoreError::validation(
            field("duration_minutes"),
            "must be positive",
        ));
    }
    if !input.estimated_cost.is_finite() || input.estimated_cost < 0.0 {
        return Err(CoreError::validation(
            field("estimated_cost"),
            "must be a non-negative amount",
        ));
    }
    if input.order_index < 0 {
        return Err(CoreError::validation(
            field("order_index"),
            "must not be negative",
        ));
    }
    let start_time = match normalize_text(input.start_time) {
        None => None,
        Some(raw) => Some(normalize_start_time(&raw).ok_or_else(|| {
            CoreError::validation(field("start_time"), format!("{raw:?} is not HH:MM"))
        })?),
    };

    Ok(ValidActivity {
        day_number: input.day_number,
        title: title.to_owned(),
        description: normalize_text(input.description),
        location: normalize_text(input.location),
        start_time,
        duration_minutes: input.duration_minutes,
        estimated_cost: input.estimated_cost,
        order_index: input.order_index,
        notes: normalize_text(input.notes),
        photo_url: normalize_text(input.photo_url),
    })
}

/// Validate a replacement batch for one itinerary.
///
/// Drafts without an `order_index` are placed after the highest index seen
/// so far on their day. The result keeps the batch order.
pub fn validate_drafts(
    drafts: Vec<ActivityDraft>,
    itinerary_id: Uuid,
    days: i64,
) -> CoreResult<Vec<ValidActivity>> {
    let mut next_on_day: HashMap<i32, i32> = HashMap::new();
    let mut slots: HashSet<(i32, i32)> = HashSet::with_capacity(drafts.len());
    let mut valid = Vec::with_capacity(drafts.len());

    for (i, draft) in drafts.into_iter().enumerate() {
        let prefix = format!("activities[{i}].");

        if let Some(other) = draft.itinerary_id.filter(|&other| other != itinerary_id) {
            return Err(CoreError::validation(
                format!("{prefix}itinerary_id"),
                format!("{other} does not match target itinerary {itinerary_id}"),
            ));
        }

        let next = next_on_day.entry(draft.day_number).or_insert(0);
        let order_index = draft.order_index.unwrap_or(*next);
        *next = (*next).max(order_index.saturating_add(1));

        let activity = validate_activity(
            ActivityInput {
                day_number: draft.day_number,
                title: draft.title,
                description: draft.description,
                location: draft.location,
                start_time: draft.start_time,
                duration_minutes: draft.duration_minutes,
                estimated_cost: draft.estimated_cost,
                order_index,
                notes: draft.notes,
                photo_url: draft.photo_url,
            },
            days,
            &prefix,
        )?;

        if !slots.insert((activity.day_number, activity.order_index)) {
            return Err(CoreError::validation(
                format!("{prefix}order_index"),
                format!(
                    "day {} already has an activity at position {}",
                    activity.day_number, activity.order_index
                ),
            ));
        }
        valid.push(activity);
    }

    Ok(valid)
}
