//! Ownership and visibility rules.

use uuid::Uuid;

use wayfarer_db::models::Itinerary;

use crate::error::{CoreError, CoreResult};

pub fn is_owner(user_id: Uuid, itinerary: &Itinerary) -> bool {
    itinerary.is_owned_by(user_id)
}

/// Public itineraries are readable by anyone, private ones by their owner.
pub fn can_view(caller: Option<Uuid>, itinerary: &Itinerary) -> bool {
    itinerary.visibility.is_public() || caller.is_some_and(|c| is_owner(c, itinerary))
}

/// Fail with [`CoreError::Authorization`] unless `caller` owns the itinerary.
/// `action` completes the sentence "not authorized to ...".
pub fn require_owner(caller: Uuid, itinerary: &Itinerary, action: &str) -> CoreResult<()> {
    if is_owner(caller, itinerary) {
        Ok(())
    } else {
        Err(CoreError::Authorization(format!(
            "{action} of itinerary {}",
            itinerary.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use wayfarer_db::models::Visibility;

    use super::*;

    fn itinerary(owner: Uuid, visibility: Visibility) -> Itinerary {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        Itinerary {
            id: Uuid::new_v4(),
            user_id: owner,
            destination: "Lisbon".into(),
            start_date: day,
            end_date: day,
            budget: 100.0,
            preferences: serde_json::json!([]),
            visibility,
            notes: None,
            generated_budget: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owner_checks() {
        let owner = Uuid::new_v4();
        let it = itinerary(owner, Visibility::Private);
        assert!(is_owner(owner, &it));
        assert!(!is_owner(Uuid::new_v4(), &it));
        assert!(require_owner(owner, &it, "edit activities").is_ok());

        let err = require_owner(Uuid::new_v4(), &it, "edit activities").unwrap_err();
        assert!(err.is_authorization());
        assert!(err.to_string().contains("edit activities"));
    }

    #[test]
    fn private_itineraries_are_visible_to_owner_only() {
        let owner = Uuid::new_v4();
        let it = itinerary(owner, Visibility::Private);
        assert!(can_view(Some(owner), &it));
        assert!(!can_view(Some(Uuid::new_v4()), &it));
        assert!(!can_view(None, &it));
    }

    #[test]
    fn public_itineraries_are_visible_to_everyone() {
        let it = itinerary(Uuid::new_v4(), Visibility::Public);
        assert!(can_view(None, &it));
        assert!(can_view(Some(Uuid::new_v4()), &it));
    }
}
