//! Pricewatch Backend Library
//!
//! Price reconciliation engine for a small catalog of in-game currency
//! products tracked across independent storefronts: price text
//! normalization, cross-store item identity, change-tracked persistence
//! with archival, and day-bucketed history aggregation.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod normalize;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use database::Database;
use repositories::*;
use services::*;
use std::sync::Arc;

/// Application state containing all repositories and services
pub struct AppState {
    pub database: Database,
    pub item_repo: Arc<ItemRepository>,
    pub archive_repo: Arc<ArchiveRepository>,
    pub ingest: Arc<IngestService>,
    pub history: Arc<HistoryService>,
    pub catalog: Arc<CatalogService>,
}

impl AppState {
    /// Create a new AppState with initialized repositories and services
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        let database = Database::new(pool.clone());
        let item_repo = Arc::new(ItemRepository::new(pool.clone()));
        let archive_repo = Arc::new(ArchiveRepository::new(pool));

        Self {
            database,
            ingest: Arc::new(IngestService::new(item_repo.clone(), archive_repo.clone())),
            history: Arc::new(HistoryService::new(item_repo.clone(), archive_repo.clone())),
            catalog: Arc::new(CatalogService::new(item_repo.clone())),
            item_repo,
            archive_repo,
        }
    }
}
