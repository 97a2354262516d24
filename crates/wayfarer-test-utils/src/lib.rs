//! Test support for wayfarer's database-backed tests.
//!
//! One PostgreSQL server is shared by every test in a binary and each test
//! gets a freshly migrated database on it. The server is whatever
//! `WAYFARER_TEST_PG_URL` points at, or a throwaway container started on
//! first use.

use std::time::Duration;

use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use wayfarer_db::config::DbConfig;
use wayfarer_db::models::{Itinerary, Visibility};
use wayfarer_db::pool;
use wayfarer_db::queries::itineraries::{self, ItineraryFields};

pub const PG_URL_ENV: &str = "WAYFARER_TEST_PG_URL";

struct TestServer {
    /// Server root, without a database name.
    root_url: String,
    _container: Option<ContainerAsync<Postgres>>,
}

static SERVER: OnceCell<TestServer> = OnceCell::const_new();

async fn start_server() -> TestServer {
    if let Ok(root_url) = std::env::var(PG_URL_ENV) {
        return TestServer {
            root_url: root_url.trim_end_matches('/').to_owned(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("17")
        .start()
        .await
        .expect("postgres container should start");
    let host = container.get_host().await.expect("container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("container port");

    TestServer {
        root_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

async fn server_root() -> &'static str {
    &SERVER.get_or_init(start_server).await.root_url
}

/// Single-connection pool on the `postgres` database, for creating and
/// dropping test databases.
async fn admin_pool() -> PgPool {
    let url = format!("{}/postgres", server_root().await);
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&url)
        .await
        .unwrap_or_else(|e| panic!("cannot reach {url}: {e}"))
}

/// Create and migrate an empty database for one test.
///
/// Returns the pool and the database name to pass to [`drop_test_db`].
pub async fn create_test_db() -> (PgPool, String) {
    let db_name = format!("wayfarer_test_{}", Uuid::new_v4().simple());

    let admin = admin_pool().await;
    admin
        .execute(format!("CREATE DATABASE {db_name}").as_str())
        .await
        .unwrap_or_else(|e| panic!("CREATE DATABASE {db_name} failed: {e}"));
    admin.close().await;

    let config = DbConfig::new(format!("{}/{db_name}", server_root().await));
    let pool = pool::create_pool(&config)
        .await
        .unwrap_or_else(|e| panic!("cannot connect to {db_name}: {e:#}"));
    pool::run_migrations(&pool)
        .await
        .expect("migrations should apply to a fresh database");

    (pool, db_name)
}

/// Drop a database made by [`create_test_db`], disconnecting any stragglers.
/// Missing databases are ignored.
pub async fn drop_test_db(db_name: &str) {
    let admin = admin_pool().await;
    let _ = admin
        .execute(format!("DROP DATABASE IF EXISTS {db_name} WITH (FORCE)").as_str())
        .await;
    admin.close().await;
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// Insert a private itinerary with no preferences, skipping the service
/// layer's validation.
pub async fn seed_itinerary(
    pool: &PgPool,
    owner: Uuid,
    destination: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    budget: f64,
) -> Itinerary {
    let fields = ItineraryFields {
        destination,
        start_date,
        end_date,
        budget,
        preferences: &[],
        visibility: Visibility::Private,
        notes: None,
    };
    itineraries::insert_itinerary(pool, owner, &fields)
        .await
        .expect("seed itinerary insert should succeed")
}
