//! Pricewatch Backend Service
//!
//! Entry point for the price reconciliation engine. The storefront
//! scrapers and the scheduler live outside this binary; they hand over
//! observations as JSON Lines, one object per extracted product, which
//! this binary ingests sequentially.

use pricewatch_backend::config::AppConfig;
use pricewatch_backend::database::{create_pool, run_migrations};
use pricewatch_backend::error::{AppError, AppResult};
use pricewatch_backend::models::{ArchivePolicy, Observation};
use pricewatch_backend::AppState;
use std::env;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    // Initialize tracing/logging with config
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("pricewatch_backend={},sqlx=warn", config.log_level).into()
            }),
        )
        .init();

    info!(environment = %config.environment, "starting pricewatch backend");

    let pool = create_pool(&config.database).await?;
    run_migrations(&pool).await?;
    info!(url = %config.database_url(), "database ready");

    let state = AppState::new(pool);

    let feed_path = env::args()
        .nth(1)
        .or_else(|| env::var("OBSERVATIONS_FILE").ok());
    let Some(feed_path) = feed_path else {
        warn!("no observation feed given (argument or OBSERVATIONS_FILE), nothing to ingest");
        return Ok(());
    };

    let policy = env::var("ARCHIVE_POLICY")
        .ok()
        .map(|s| ArchivePolicy::from_str(&s))
        .transpose()
        .map_err(AppError::Config)?
        .unwrap_or_default();

    let feed = tokio::fs::read_to_string(&feed_path)
        .await
        .map_err(|e| AppError::Message(format!("cannot read {}: {}", feed_path, e)))?;

    info!(path = %feed_path, policy = policy.as_str(), "ingesting observation feed");

    let mut ingested = 0usize;
    let mut skipped = 0usize;
    for (line_no, line) in feed.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let observation: Observation = match serde_json::from_str(line) {
            Ok(obs) => obs,
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "malformed observation, skipped");
                skipped += 1;
                continue;
            }
        };

        // One bad item never aborts the batch: unparsable prices are
        // dropped, persistence failures logged and the run continues.
        match state.ingest.ingest(&observation, policy).await {
            Ok(_) => ingested += 1,
            Err(e) if e.is_unparsable_price() => {
                warn!(item = %observation.item_name, error = %e, "observation skipped");
                skipped += 1;
            }
            Err(e) => {
                error!(item = %observation.item_name, error = %e, "ingestion failed");
                skipped += 1;
            }
        }
    }

    info!(ingested, skipped, "observation feed done");
    Ok(())
}
