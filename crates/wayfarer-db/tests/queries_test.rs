//! Integration tests for itinerary and activity query functions.

use uuid::Uuid;

use wayfarer_db::models::Visibility;
use wayfarer_db::queries::activities::{self, ActivityFields};
use wayfarer_db::queries::itineraries::{self, ItineraryFields, ItineraryFilter, TripStats};
use wayfarer_test_utils::{create_test_db, date, drop_test_db, seed_itinerary};

fn fields(day_number: i32, order_index: i32, title: &str) -> ActivityFields<'_> {
    ActivityFields {
        day_number,
        title,
        description: None,
        location: None,
        start_time: Some("09:00"),
        duration_minutes: 60,
        estimated_cost: 10.0,
        order_index,
        notes: None,
        photo_url: None,
    }
}

#[tokio::test]
async fn insert_and_get_itinerary_with_preferences() {
    let (pool, db_name) = create_test_db().await;

    let owner = Uuid::new_v4();
    let prefs = vec!["food".to_string(), "museums".to_string()];
    let new = ItineraryFields {
        destination: "Rome",
        start_date: date(2025, 5, 1),
        end_date: date(2025, 5, 4),
        budget: 1200.0,
        preferences: &prefs,
        visibility: Visibility::Public,
        notes: Some("anniversary"),
    };
    let inserted = itineraries::insert_itinerary(&pool, owner, &new)
        .await
        .expect("insert should succeed");

    assert_eq!(inserted.user_id, owner);
    assert_eq!(inserted.day_span(), 4);
    assert_eq!(inserted.visibility, Visibility::Public);
    assert_eq!(inserted.preferences, serde_json::json!(["food", "museums"]));
    assert!(inserted.generated_budget.is_none());

    let fetched = itineraries::get_itinerary(&pool, inserted.id)
        .await
        .expect("get should not error")
        .expect("itinerary should exist");
    assert_eq!(fetched.destination, "Rome");
    assert_eq!(fetched.notes.as_deref(), Some("anniversary"));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn visible_itineraries_include_own_and_public() {
    let (pool, db_name) = create_test_db().await;

    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let (start, end) = (date(2025, 1, 1), date(2025, 1, 2));
    let own = seed_itinerary(&pool, alice, "Paris", start, end, 300.0).await;
    let hidden = seed_itinerary(&pool, bob, "Berlin", start, end, 300.0).await;
    let shared = seed_itinerary(&pool, bob, "Vienna", start, end, 300.0).await;

    let prefs: Vec<String> = Vec::new();
    itineraries::update_itinerary(
        &pool,
        shared.id,
        &ItineraryFields {
            destination: "Vienna",
            start_date: shared.start_date,
            end_date: shared.end_date,
            budget: shared.budget,
            preferences: &prefs,
            visibility: Visibility::Public,
            notes: None,
        },
    )
    .await
    .expect("update should succeed")
    .expect("row should exist");

    let visible = itineraries::list_visible_itineraries(&pool, alice, &ItineraryFilter::default())
        .await
        .expect("list visible");
    let ids: Vec<Uuid> = visible.iter().map(|i| i.id).collect();
    assert!(ids.contains(&own.id));
    assert!(ids.contains(&shared.id));
    assert!(!ids.contains(&hidden.id));

    let public = itineraries::list_public_itineraries(&pool, &ItineraryFilter::default())
        .await
        .expect("list public");
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].id, shared.id);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn list_activities_orders_by_day_then_position() {
    let (pool, db_name) = create_test_db().await;

    let (start, end) = (date(2025, 3, 1), date(2025, 3, 2));
    let itinerary = seed_itinerary(&pool, Uuid::new_v4(), "Lima", start, end, 200.0).await;

    let slots = [
        (2, 1, "d2-b"),
        (1, 2, "d1-c"),
        (2, 0, "d2-a"),
        (1, 0, "d1-a"),
        (1, 1, "d1-b"),
    ];
    for (day, order, title) in slots {
        activities::insert_activity(&pool, itinerary.id, &fields(day, order, title))
            .await
            .expect("insert activity");
    }

    let listed = activities::list_activities_for_itinerary(&pool, itinerary.id)
        .await
        .expect("list activities");
    let titles: Vec<&str> = listed.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["d1-a", "d1-b", "d1-c", "d2-a", "d2-b"]);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn duplicate_slot_is_rejected_by_unique_constraint() {
    let (pool, db_name) = create_test_db().await;

    let day = date(2025, 3, 1);
    let itinerary = seed_itinerary(&pool, Uuid::new_v4(), "Quito", day, day, 90.0).await;
    activities::insert_activity(&pool, itinerary.id, &fields(1, 0, "first"))
        .await
        .expect("first insert");

    let dup = activities::insert_activity(&pool, itinerary.id, &fields(1, 0, "second")).await;
    assert!(dup.is_err());

    assert!(
        activities::slot_taken(&pool, itinerary.id, 1, 0, None)
            .await
            .unwrap()
    );
    assert!(
        !activities::slot_taken(&pool, itinerary.id, 1, 1, None)
            .await
            .unwrap()
    );
    assert_eq!(
        activities::next_order_index(&pool, itinerary.id, 1)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        activities::next_order_index(&pool, itinerary.id, 2)
            .await
            .unwrap(),
        0
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn lock_activity_with_owner_resolves_itinerary_owner() {
    let (pool, db_name) = create_test_db().await;

    let owner = Uuid::new_v4();
    let (start, end) = (date(2025, 9, 1), date(2025, 9, 3));
    let itinerary = seed_itinerary(&pool, owner, "Seoul", start, end, 900.0).await;
    let activity = activities::insert_activity(&pool, itinerary.id, &fields(3, 0, "Palace"))
        .await
        .expect("insert activity");

    let mut tx = pool.begin().await.unwrap();
    let owned = activities::lock_activity_with_owner(&mut *tx, activity.id)
        .await
        .expect("lookup should not error")
        .expect("activity should resolve");
    tx.commit().await.unwrap();

    assert_eq!(owned.owner_id, owner);
    assert_eq!(owned.activity.itinerary_id, itinerary.id);
    assert_eq!(
        activities::max_day_number(&pool, itinerary.id).await.unwrap(),
        Some(3)
    );

    let mut tx = pool.begin().await.unwrap();
    let missing = activities::lock_activity_with_owner(&mut *tx, Uuid::new_v4())
        .await
        .expect("lookup should not error");
    assert!(missing.is_none());
    tx.rollback().await.unwrap();

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn delete_activities_for_itinerary_removes_all() {
    let (pool, db_name) = create_test_db().await;

    let day = date(2025, 2, 1);
    let itinerary = seed_itinerary(&pool, Uuid::new_v4(), "Cairo", day, day, 50.0).await;
    for order in 0..3 {
        activities::insert_activity(&pool, itinerary.id, &fields(1, order, "stop"))
            .await
            .expect("insert activity");
    }

    let removed = activities::delete_activities_for_itinerary(&pool, itinerary.id)
        .await
        .expect("delete all");
    assert_eq!(removed, 3);
    assert!(
        activities::list_activities_for_itinerary(&pool, itinerary.id)
            .await
            .unwrap()
            .is_empty()
    );

    assert!(
        itineraries::delete_itinerary(&pool, itinerary.id)
            .await
            .unwrap()
    );
    assert!(
        !itineraries::delete_itinerary(&pool, itinerary.id)
            .await
            .unwrap()
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

async fn ids_matching(pool: &sqlx::PgPool, viewer: Uuid, filter: ItineraryFilter) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = itineraries::list_visible_itineraries(pool, viewer, &filter)
        .await
        .expect("filtered list")
        .iter()
        .map(|i| i.id)
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn destination_filter_is_case_insensitive_substring() {
    let (pool, db_name) = create_test_db().await;
    let owner = Uuid::new_v4();
    let (start, end) = (date(2025, 4, 1), date(2025, 4, 2));
    let paris = seed_itinerary(&pool, owner, "Paris, France", start, end, 100.0).await;
    seed_itinerary(&pool, owner, "Lyon", start, end, 100.0).await;

    let by = |needle: &str| ItineraryFilter {
        destination: Some(needle.to_owned()),
        ..ItineraryFilter::default()
    };
    assert_eq!(ids_matching(&pool, owner, by("paris")).await, vec![paris.id]);
    assert_eq!(ids_matching(&pool, owner, by("RIS, FR")).await, vec![paris.id]);
    assert!(ids_matching(&pool, owner, by("berlin")).await.is_empty());
    // LIKE wildcards are matched literally.
    assert!(ids_matching(&pool, owner, by("%")).await.is_empty());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn date_filter_matches_overlapping_trips_inclusively() {
    let (pool, db_name) = create_test_db().await;
    let owner = Uuid::new_v4();
    let (start, end) = (date(2025, 6, 10), date(2025, 6, 20));
    let trip = seed_itinerary(&pool, owner, "Oslo", start, end, 100.0).await;

    let window = |from, to| ItineraryFilter {
        from,
        to,
        ..ItineraryFilter::default()
    };
    let hit = vec![trip.id];

    // The trip's last day touches the window's first day.
    let from_end = window(Some(date(2025, 6, 20)), None);
    assert_eq!(ids_matching(&pool, owner, from_end).await, hit);
    let from_after = window(Some(date(2025, 6, 21)), None);
    assert!(ids_matching(&pool, owner, from_after).await.is_empty());

    // The trip's first day touches the window's last day.
    let to_start = window(None, Some(date(2025, 6, 10)));
    assert_eq!(ids_matching(&pool, owner, to_start).await, hit);
    let to_before = window(None, Some(date(2025, 6, 9)));
    assert!(ids_matching(&pool, owner, to_before).await.is_empty());

    let inside = window(Some(date(2025, 6, 12)), Some(date(2025, 6, 13)));
    assert_eq!(ids_matching(&pool, owner, inside).await, hit);
    let before = window(Some(date(2025, 6, 1)), Some(date(2025, 6, 9)));
    assert!(ids_matching(&pool, owner, before).await.is_empty());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn budget_filter_bounds_are_inclusive() {
    let (pool, db_name) = create_test_db().await;
    let owner = Uuid::new_v4();
    let (start, end) = (date(2025, 7, 1), date(2025, 7, 2));
    let cheap = seed_itinerary(&pool, owner, "Hanoi", start, end, 500.0).await;
    let dear = seed_itinerary(&pool, owner, "Zurich", start, end, 2_500.0).await;

    let range = |min_budget, max_budget| ItineraryFilter {
        min_budget,
        max_budget,
        ..ItineraryFilter::default()
    };

    let at_min = range(Some(500.0), None);
    let mut both = vec![cheap.id, dear.id];
    both.sort();
    assert_eq!(ids_matching(&pool, owner, at_min).await, both);
    let above_min = range(Some(500.01), None);
    assert_eq!(ids_matching(&pool, owner, above_min).await, vec![dear.id]);

    let at_max = range(None, Some(2_500.0));
    assert_eq!(ids_matching(&pool, owner, at_max).await, both);
    let below_max = range(None, Some(2_499.99));
    assert_eq!(ids_matching(&pool, owner, below_max).await, vec![cheap.id]);

    let exact = range(Some(500.0), Some(500.0));
    assert_eq!(ids_matching(&pool, owner, exact).await, vec![cheap.id]);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn filters_never_widen_visibility() {
    let (pool, db_name) = create_test_db().await;
    let owner = Uuid::new_v4();
    let (start, end) = (date(2025, 8, 1), date(2025, 8, 3));
    seed_itinerary(&pool, owner, "Lagos", start, end, 100.0).await;

    let filter = ItineraryFilter {
        destination: Some("lagos".into()),
        ..ItineraryFilter::default()
    };
    assert!(ids_matching(&pool, Uuid::new_v4(), filter.clone()).await.is_empty());
    assert!(
        itineraries::list_public_itineraries(&pool, &filter)
            .await
            .unwrap()
            .is_empty()
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn owner_trip_stats_splits_upcoming_from_started() {
    let (pool, db_name) = create_test_db().await;
    let owner = Uuid::new_v4();
    let today = date(2025, 6, 15);

    let owned = [
        ("Past", date(2025, 6, 1), date(2025, 6, 3), 100.0),
        ("Today", today, date(2025, 6, 16), 250.0),
        ("Soon", date(2025, 6, 16), date(2025, 6, 18), 650.0),
    ];
    for (destination, start, end, budget) in owned {
        seed_itinerary(&pool, owner, destination, start, end, budget).await;
    }
    seed_itinerary(&pool, Uuid::new_v4(), "Elsewhere", today, today, 9_999.0).await;

    let stats = itineraries::owner_trip_stats(&pool, owner, today)
        .await
        .expect("stats");
    assert_eq!(
        stats,
        TripStats {
            total_trips: 3,
            upcoming_trips: 1,
            total_budget: 1_000.0,
        }
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}
