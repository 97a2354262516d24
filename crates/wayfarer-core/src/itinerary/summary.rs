//! Budget summary: what the activity set costs against the stated budget.
//!
//! The total is advisory. Going over budget is reported, never rejected.

use serde::Serialize;

use wayfarer_db::models::{Activity, Itinerary};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCost {
    pub day_number: i32,
    pub activities: usize,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub budget: f64,
    pub total_estimated_cost: f64,
    /// `budget - total_estimated_cost`; negative when over budget.
    pub remaining: f64,
    pub over_budget: bool,
    pub daily_budget: f64,
    /// One entry per trip day, including days without activities.
    pub per_day: Vec<DayCost>,
    pub generated_budget: Option<f64>,
    /// The budget moved since the activities were last generated.
    pub budget_changed: bool,
}

pub fn summarize(itinerary: &Itinerary, activities: &[Activity]) -> BudgetSummary {
    let days = itinerary.day_span().max(1);

    let mut per_day: Vec<DayCost> = (1..=days as i32)
        .map(|day_number| DayCost {
            day_number,
            activities: 0,
            total_cost: 0.0,
        })
        .collect();

    let mut total = 0.0;
    for activity in activities {
        total += activity.estimated_cost;
        if let Some(slot) = usize::try_from(activity.day_number - 1)
            .ok()
            .and_then(|i| per_day.get_mut(i))
        {
            slot.activities += 1;
            slot.total_cost += activity.estimated_cost;
        }
    }

    let remaining = itinerary.budget - total;
    BudgetSummary {
        budget: itinerary.budget,
        total_estimated_cost: total,
        remaining,
        over_budget: remaining < 0.0,
        daily_budget: itinerary.budget / days as f64,
        per_day,
        generated_budget: itinerary.generated_budget,
        budget_changed: itinerary
            .generated_budget
            .is_some_and(|generated| generated != itinerary.budget),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use serde_json::json;
    use uuid::Uuid;
    use wayfarer_db::models::Visibility;

    use super::*;

    fn itinerary(budget: f64, generated_budget: Option<f64>) -> Itinerary {
        Itinerary {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            destination: "Paris".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            budget,
            preferences: json!([]),
            visibility: Visibility::Private,
            notes: None,
            generated_budget,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn activity(itinerary_id: Uuid, day: i32, order: i32, cost: f64) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            itinerary_id,
            day_number: day,
            title: format!("day {day} #{order}"),
            description: None,
            location: None,
            start_time: None,
            duration_minutes: 60,
            estimated_cost: cost,
            order_index: order,
            notes: None,
            photo_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn totals_and_remaining() {
        let it = itinerary(300.0, Some(300.0));
        let acts = vec![
            activity(it.id, 1, 0, 12.0),
            activity(it.id, 1, 1, 8.0),
            activity(it.id, 3, 0, 15.0),
        ];
        let s = summarize(&it, &acts);

        assert_eq!(s.total_estimated_cost, 35.0);
        assert_eq!(s.remaining, 265.0);
        assert!(!s.over_budget);
        assert_eq!(s.daily_budget, 100.0);
        assert!(!s.budget_changed);

        let per_day: Vec<_> = s
            .per_day
            .iter()
            .map(|d| (d.day_number, d.activities, d.total_cost))
            .collect();
        assert_eq!(per_day, vec![(1, 2, 20.0), (2, 0, 0.0), (3, 1, 15.0)]);
    }

    #[test]
    fn overspend_is_reported_not_rejected() {
        let it = itinerary(10.0, None);
        let s = summarize(&it, &[activity(it.id, 2, 0, 25.0)]);
        assert_eq!(s.remaining, -15.0);
        assert!(s.over_budget);
    }

    #[test]
    fn budget_change_is_detected_only_after_generation() {
        assert!(summarize(&itinerary(500.0, Some(300.0)), &[]).budget_changed);
        assert!(!summarize(&itinerary(500.0, None), &[]).budget_changed);
    }
}
