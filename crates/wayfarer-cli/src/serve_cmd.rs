//! `wayfarer serve`: a thin JSON adapter over the itinerary service.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use wayfarer_core::itinerary::validate::validate_trip;
use wayfarer_core::itinerary::{
    self, ActivityPatch, ItineraryFilter, ItineraryPatch, NewActivity, NewItinerary,
};
use wayfarer_core::planner::planner_rng;
use wayfarer_core::token::{TokenConfig, validate_token};
use wayfarer_core::{ActivityDraft, CoreError, Planner};
use wayfarer_db::models::day_span;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared by every handler. The token secret lives here rather than in
/// process-wide state.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub tokens: Arc<TokenConfig>,
    pub planner: Arc<Planner>,
}

impl AppState {
    pub fn new(pool: PgPool, tokens: TokenConfig, planner: Planner) -> Self {
        Self {
            pool,
            tokens: Arc::new(tokens),
            planner: Arc::new(planner),
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    field: Option<String>,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            field: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { field, message } => Self {
                status: StatusCode::BAD_REQUEST,
                message: format!("invalid {field}: {message}"),
                field: Some(field),
            },
            CoreError::Authorization(_) => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            CoreError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            CoreError::Storage(e) => {
                tracing::error!(error = %format!("{e:#}"), "request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match self.field {
            Some(field) => json!({ "error": self.message, "field": field }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// Caller identified by a valid bearer token. Rejects with 401 otherwise.
pub struct AuthUser(pub Uuid);

/// Caller identified by a bearer token, if one was sent. A token that is
/// present but invalid is still rejected.
pub struct MaybeAuthUser(pub Option<Uuid>);

fn bearer_user(parts: &Parts, tokens: &TokenConfig) -> Result<Option<Uuid>, AppError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::unauthorized("expected a Bearer token"))?;
    let claims = validate_token(tokens, token.trim())
        .map_err(|e| AppError::unauthorized(format!("invalid token: {e}")))?;
    Ok(Some(claims.user_id))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        bearer_user(parts, &state.tokens)?
            .map(AuthUser)
            .ok_or_else(|| AppError::unauthorized("missing Authorization header"))
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        bearer_user(parts, &state.tokens).map(MaybeAuthUser)
    }
}

/// `Json` whose rejections use the API's error body and status 400.
pub struct ApiJson<T>(pub T);

impl<T> FromRequest<AppState> for ApiJson<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, AppError> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateItineraryRequest {
    #[serde(flatten)]
    pub itinerary: NewItinerary,
    /// Fill the new itinerary with a generated schedule.
    #[serde(default)]
    pub generate: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct BulkActivitiesRequest {
    pub itinerary_id: Uuid,
    pub activities: Vec<ActivityDraft>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SeedParams {
    pub seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/itineraries",
            get(list_itineraries).post(create_itinerary),
        )
        .route("/api/itineraries/public", get(list_public_itineraries))
        .route("/api/itineraries/stats", get(trip_stats))
        .route(
            "/api/itineraries/{id}",
            get(get_itinerary)
                .put(update_itinerary)
                .delete(delete_itinerary),
        )
        .route(
            "/api/itineraries/{id}/regenerate",
            post(regenerate_activities),
        )
        .route("/api/itineraries/{id}/budget", get(budget_summary))
        .route("/api/activities", post(add_activity))
        .route("/api/activities/bulk", post(replace_activities))
        .route(
            "/api/activities/{id}",
            put(update_activity).delete(delete_activity),
        )
        .route(
            "/api/activities/itinerary/{id}",
            get(list_activities).delete(delete_all_activities),
        )
        .route("/api/generate", post(generate_preview))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("wayfarer serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("wayfarer serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl+C; serving until killed");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Itinerary handlers
// ---------------------------------------------------------------------------

async fn list_itineraries(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(filter): Query<ItineraryFilter>,
) -> Result<Response, AppError> {
    let itineraries = itinerary::list_itineraries(&state.pool, caller, filter).await?;
    Ok(Json(itineraries).into_response())
}

async fn list_public_itineraries(
    State(state): State<AppState>,
    Query(filter): Query<ItineraryFilter>,
) -> Result<Response, AppError> {
    let itineraries = itinerary::list_public_itineraries(&state.pool, filter).await?;
    Ok(Json(itineraries).into_response())
}

async fn trip_stats(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Response, AppError> {
    let today = Utc::now().date_naive();
    let stats = itinerary::trip_stats(&state.pool, caller, today).await?;
    Ok(Json(stats).into_response())
}

async fn create_itinerary(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(req): ApiJson<CreateItineraryRequest>,
) -> Result<Response, AppError> {
    if req.generate {
        let mut rng = planner_rng(req.seed);
        let detail = itinerary::create_planned_itinerary(
            &state.pool,
            &state.planner,
            caller,
            req.itinerary,
            &mut rng,
        )
        .await?;
        return Ok((StatusCode::CREATED, Json(detail)).into_response());
    }
    let view = itinerary::create_itinerary(&state.pool, caller, req.itinerary).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn get_itinerary(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let detail = itinerary::get_itinerary(&state.pool, id, caller).await?;
    Ok(Json(detail).into_response())
}

async fn update_itinerary(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(patch): ApiJson<ItineraryPatch>,
) -> Result<Response, AppError> {
    let view = itinerary::update_itinerary(&state.pool, id, caller, patch).await?;
    Ok(Json(view).into_response())
}

async fn delete_itinerary(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    itinerary::delete_itinerary(&state.pool, id, caller).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn regenerate_activities(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Query(params): Query<SeedParams>,
) -> Result<Response, AppError> {
    let mut rng = planner_rng(params.seed);
    let activities =
        itinerary::regenerate_activities(&state.pool, &state.planner, id, caller, &mut rng)
            .await?;
    Ok(Json(activities).into_response())
}

async fn budget_summary(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let summary = itinerary::budget_summary(&state.pool, id, caller).await?;
    Ok(Json(summary).into_response())
}

// ---------------------------------------------------------------------------
// Activity handlers
// ---------------------------------------------------------------------------

async fn list_activities(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    // Goes through the itinerary so private activity lists stay hidden.
    let detail = itinerary::get_itinerary(&state.pool, id, caller).await?;
    Ok(Json(detail.activities).into_response())
}

async fn add_activity(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(input): ApiJson<NewActivity>,
) -> Result<Response, AppError> {
    let activity = itinerary::add_activity(&state.pool, caller, input).await?;
    Ok((StatusCode::CREATED, Json(activity)).into_response())
}

async fn replace_activities(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(req): ApiJson<BulkActivitiesRequest>,
) -> Result<Response, AppError> {
    let activities =
        itinerary::replace_activities(&state.pool, req.itinerary_id, caller, req.activities)
            .await?;
    Ok((StatusCode::CREATED, Json(activities)).into_response())
}

async fn update_activity(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(patch): ApiJson<ActivityPatch>,
) -> Result<Response, AppError> {
    let activity = itinerary::update_activity(&state.pool, id, caller, patch).await?;
    Ok(Json(activity).into_response())
}

async fn delete_activity(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    itinerary::delete_activity(&state.pool, id, caller).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn delete_all_activities(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let deleted = itinerary::delete_all_activities(&state.pool, id, caller).await?;
    Ok(Json(json!({ "deleted": deleted })).into_response())
}

// ---------------------------------------------------------------------------
// Generation preview
// ---------------------------------------------------------------------------

/// Generate a schedule without storing anything.
async fn generate_preview(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GenerateRequest>,
) -> Result<Response, AppError> {
    validate_trip(&req.destination, req.start_date, req.end_date, req.budget)?;
    let days = day_span(req.start_date, req.end_date);
    let allocation = state
        .planner
        .policy
        .allocate(req.budget, days)
        .map_err(CoreError::from)?;

    let mut rng = planner_rng(req.seed);
    let activities = state
        .planner
        .generate(req.destination.trim(), days, req.budget, &mut rng)
        .map_err(CoreError::from)?;

    Ok(Json(json!({
        "day_count": days,
        "daily_budget": allocation.daily_budget,
        "band": allocation.band,
        "activities": activities,
    }))
    .into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{Value, json};
    use sqlx::PgPool;
    use tower::ServiceExt;
    use uuid::Uuid;

    use wayfarer_core::Planner;
    use wayfarer_core::token::{TokenConfig, generate_token};
    use wayfarer_test_utils::{create_test_db, drop_test_db};

    use super::{AppState, build_router};

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    fn tokens() -> TokenConfig {
        TokenConfig::new(b"serve-test-secret".to_vec())
    }

    fn bearer(user: Uuid) -> String {
        format!("Bearer {}", generate_token(&tokens(), user))
    }

    async fn send(
        pool: &PgPool,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let app = build_router(AppState::new(pool.clone(), tokens(), Planner::default()));
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("authorization", bearer(user));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.oneshot(request).await.unwrap()
    }

    async fn get(pool: &PgPool, uri: &str, user: Option<Uuid>) -> axum::response::Response {
        send(pool, Method::GET, uri, user, None).await
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn trip(generate: bool) -> Value {
        json!({
            "destination": "Paris",
            "start_date": "2025-06-01",
            "end_date": "2025-06-03",
            "budget": 300,
            "preferences": ["food"],
            "generate": generate,
            "seed": 7
        })
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn generate_preview_is_deterministic_with_seed() {
        let (pool, db_name) = create_test_db().await;

        let body = json!({
            "destination": "Paris",
            "start_date": "2025-06-01",
            "end_date": "2025-06-03",
            "budget": 300,
            "seed": 42
        });
        let first = send(&pool, Method::POST, "/api/generate", None, Some(body.clone())).await;
        assert_eq!(first.status(), StatusCode::OK);
        let first = body_json(first).await;
        assert_eq!(first["day_count"], 3);
        assert_eq!(first["daily_budget"], 100.0);
        assert_eq!(first["band"], "medium");
        assert_eq!(first["activities"].as_array().unwrap().len(), 9);
        assert_eq!(first["activities"][0]["start_time"], "09:00");

        let second = send(&pool, Method::POST, "/api/generate", None, Some(body)).await;
        let second = body_json(second).await;
        assert_eq!(first, second);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn generate_preview_rejects_bad_budget() {
        let (pool, db_name) = create_test_db().await;

        let body = json!({
            "destination": "Paris",
            "start_date": "2025-06-01",
            "end_date": "2025-06-03",
            "budget": 0
        });
        let resp = send(&pool, Method::POST, "/api/generate", None, Some(body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["field"], "budget");

        let partial = json!({"budget": 5});
        let resp = send(&pool, Method::POST, "/api/generate", None, Some(partial)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn authentication_is_required_for_mutations() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(&pool, Method::POST, "/api/itineraries", None, Some(trip(false))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let app = build_router(AppState::new(pool.clone(), tokens(), Planner::default()));
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/itineraries")
                    .header("authorization", "Bearer wf_ut_garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = send(&pool, Method::GET, "/api/itineraries", None, None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn itinerary_lifecycle() {
        let (pool, db_name) = create_test_db().await;
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        let resp = send(
            &pool,
            Method::POST,
            "/api/itineraries",
            Some(owner),
            Some(trip(true)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        let id = created["id"].as_str().unwrap().to_owned();
        assert_eq!(created["activities"].as_array().unwrap().len(), 9);
        assert_eq!(created["generated_budget"], 300.0);
        assert_eq!(created["summary"]["budget_changed"], false);

        // Private: hidden from others and from anonymous callers.
        let uri = format!("/api/itineraries/{id}");
        assert_eq!(
            send(&pool, Method::GET, &uri, Some(other), None).await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            send(&pool, Method::GET, &uri, None, None).await.status(),
            StatusCode::NOT_FOUND
        );
        let resp = send(&pool, Method::GET, &uri, Some(owner), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["destination"], "Paris");

        // Non-owner update is forbidden.
        let patch = json!({"budget": 900, "visibility": "public"});
        let resp = send(&pool, Method::PUT, &uri, Some(other), Some(patch.clone())).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = send(&pool, Method::PUT, &uri, Some(owner), Some(patch)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["budget"], 900.0);

        let resp = send(&pool, Method::GET, &format!("{uri}/budget"), None, None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let summary = body_json(resp).await;
        assert_eq!(summary["budget_changed"], true);
        assert_eq!(summary["per_day"].as_array().unwrap().len(), 3);

        let resp = send(
            &pool,
            Method::POST,
            &format!("{uri}/regenerate?seed=3"),
            Some(owner),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 9);

        let public = body_json(get(&pool, "/api/itineraries/public", None).await).await;
        assert_eq!(public.as_array().unwrap().len(), 1);

        let listed = body_json(get(&pool, "/api/itineraries", Some(other)).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        assert_eq!(
            send(&pool, Method::DELETE, &uri, Some(other), None).await.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            send(&pool, Method::DELETE, &uri, Some(owner), None).await.status(),
            StatusCode::NO_CONTENT
        );
        assert_eq!(
            send(&pool, Method::GET, &uri, Some(owner), None).await.status(),
            StatusCode::NOT_FOUND
        );

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn itinerary_search_and_stats() {
        let (pool, db_name) = create_test_db().await;
        let owner = Uuid::new_v4();

        let mut rome = trip(false);
        rome["destination"] = json!("Rome");
        rome["budget"] = json!(900);
        rome["start_date"] = json!("2099-03-01");
        rome["end_date"] = json!("2099-03-04");
        rome["visibility"] = json!("public");
        for body in [trip(false), rome] {
            let uri = "/api/itineraries";
            let resp = send(&pool, Method::POST, uri, Some(owner), Some(body)).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let count = |body: Value| body.as_array().unwrap().len();

        let resp = get(&pool, "/api/itineraries?destination=PAR", Some(owner)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let found = body_json(resp).await;
        assert_eq!(count(found.clone()), 1);
        assert_eq!(found[0]["destination"], "Paris");

        let uri = "/api/itineraries?from=2025-06-03&to=2025-06-03&min_budget=300&max_budget=300";
        assert_eq!(count(body_json(get(&pool, uri, Some(owner)).await).await), 1);
        let uri = "/api/itineraries?from=2025-06-04&to=2099-02-28";
        assert_eq!(count(body_json(get(&pool, uri, Some(owner)).await).await), 0);

        let uri = "/api/itineraries/public?min_budget=900";
        assert_eq!(count(body_json(get(&pool, uri, None).await).await), 1);
        let uri = "/api/itineraries/public?max_budget=899.99";
        assert_eq!(count(body_json(get(&pool, uri, None).await).await), 0);

        let resp = get(&pool, "/api/itineraries?min_budget=500&max_budget=100", Some(owner)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["field"], "max_budget");
        let resp = get(&pool, "/api/itineraries?from=someday", Some(owner)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        assert_eq!(
            get(&pool, "/api/itineraries/stats", None).await.status(),
            StatusCode::UNAUTHORIZED
        );
        let resp = get(&pool, "/api/itineraries/stats", Some(owner)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let stats = body_json(resp).await;
        assert_eq!(stats["total_trips"], 2);
        assert_eq!(stats["upcoming_trips"], 1);
        assert_eq!(stats["total_budget"], 1200.0);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn activity_routes() {
        let (pool, db_name) = create_test_db().await;
        let owner = Uuid::new_v4();

        let created = body_json(
            send(&pool, Method::POST, "/api/itineraries", Some(owner), Some(trip(false))).await,
        )
        .await;
        let id = created["id"].as_str().unwrap().to_owned();

        let bulk = json!({
            "itinerary_id": id,
            "activities": [
                {"day_number": 2, "title": "Louvre", "duration_minutes": 180, "estimated_cost": 22},
                {"day_number": 1, "title": "Seine walk", "start_time": "9:00"}
            ]
        });
        let resp = send(&pool, Method::POST, "/api/activities/bulk", Some(owner), Some(bulk)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let stored = body_json(resp).await;
        assert_eq!(stored[0]["title"], "Seine walk");
        assert_eq!(stored[0]["start_time"], "09:00");
        assert_eq!(stored[1]["title"], "Louvre");

        let bad = json!({
            "itinerary_id": id,
            "activities": [{"day_number": 9, "title": "Too late"}]
        });
        let resp = send(&pool, Method::POST, "/api/activities/bulk", Some(owner), Some(bad)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["field"], "activities[0].day_number");

        let add = json!({
            "itinerary_id": id,
            "day_number": 1,
            "title": "Crepes",
            "estimated_cost": 6
        });
        let resp = send(&pool, Method::POST, "/api/activities", Some(owner), Some(add)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let crepes = body_json(resp).await;
        assert_eq!(crepes["order_index"], 1);
        assert_eq!(crepes["duration_minutes"], 60);
        let crepes_id = crepes["id"].as_str().unwrap().to_owned();

        let patch = json!({"id": Uuid::new_v4(), "notes": "with nutella"});
        let resp = send(
            &pool,
            Method::PUT,
            &format!("/api/activities/{crepes_id}"),
            Some(owner),
            Some(patch),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let updated = body_json(resp).await;
        assert_eq!(updated["id"], crepes_id.as_str());
        assert_eq!(updated["notes"], "with nutella");

        let resp = send(
            &pool,
            Method::PUT,
            &format!("/api/activities/{crepes_id}"),
            Some(Uuid::new_v4()),
            Some(json!({"title": "Stolen"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let list_uri = format!("/api/activities/itinerary/{id}");
        let listed = body_json(send(&pool, Method::GET, &list_uri, Some(owner), None).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 3);
        assert_eq!(
            send(&pool, Method::GET, &list_uri, None, None).await.status(),
            StatusCode::NOT_FOUND
        );

        let resp = send(
            &pool,
            Method::DELETE,
            &format!("/api/activities/{crepes_id}"),
            Some(owner),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = send(&pool, Method::DELETE, &list_uri, Some(owner), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["deleted"], 2);

        let resp = send(
            &pool,
            Method::DELETE,
            &format!("/api/activities/{}", Uuid::new_v4()),
            Some(owner),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(
            &pool,
            Method::POST,
            "/api/itineraries",
            Some(Uuid::new_v4()),
            Some(json!({"destination": "Nowhere"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["error"].is_string());

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
