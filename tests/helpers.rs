#![allow(dead_code)]

use pricewatch_backend::database::run_migrations;
use pricewatch_backend::models::Observation;
use pricewatch_backend::AppState;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Test database: an in-memory SQLite pool with migrations applied and
/// the full repository/service stack wired up.
pub struct TestDatabase {
    pub pool: SqlitePool,
    pub state: AppState,
}

impl TestDatabase {
    /// Create a fresh in-memory database (one per test)
    pub async fn new() -> Self {
        // A single connection keeps the in-memory database alive and
        // shared for the whole test.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test database pool");

        run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        Self {
            state: AppState::new(pool.clone()),
            pool,
        }
    }
}

/// Observation builder with the fields most tests care about
pub fn observation(site: &str, category: &str, item: &str, price: &str) -> Observation {
    Observation {
        site_name: site.to_string(),
        category_name: category.to_string(),
        item_name: item.to_string(),
        sell_price: price.to_string(),
        sell_price_value: None,
        currency: None,
        url: Some(format!("https://{}.example/{}", site, category)),
    }
}

/// Observation with a pre-parsed numeric hint, as the scrapers send
pub fn observation_with_hint(
    site: &str,
    category: &str,
    item: &str,
    price: &str,
    hint: f64,
) -> Observation {
    Observation {
        sell_price_value: Some(hint),
        ..observation(site, category, item, price)
    }
}
