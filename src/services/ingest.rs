use crate::error::{AppError, AppResult};
use crate::models::{ArchivePolicy, ArchivedItem, IngestOutcome, Observation};
use crate::normalize::{parse_price, squash_ws, Currency};
use crate::repositories::item_repository::ItemWrite;
use crate::repositories::{ArchiveRepository, ItemRepository};
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use tracing::{info, warn};

/// The single authoritative write path of the reconciliation engine.
///
/// One call ingests one observation: normalize the key fields, canonicalize
/// the price, upsert the current-state row, and archive the superseded
/// state according to the policy.
pub struct IngestService {
    item_repo: Arc<ItemRepository>,
    archive_repo: Arc<ArchiveRepository>,
}

impl IngestService {
    pub fn new(item_repo: Arc<ItemRepository>, archive_repo: Arc<ArchiveRepository>) -> Self {
        Self {
            item_repo,
            archive_repo,
        }
    }

    /// Ingest one observation under the given archival policy.
    ///
    /// Unparsable prices fail with [`AppError::UnparsablePrice`] and
    /// nothing is persisted. An archive write that fails after the
    /// current-state update committed is logged and swallowed: a gap in
    /// history is preferred over rolling back a fresh price.
    pub async fn ingest(
        &self,
        observation: &Observation,
        policy: ArchivePolicy,
    ) -> AppResult<IngestOutcome> {
        let site_name = squash_ws(&observation.site_name);
        let category_name = squash_ws(&observation.category_name);
        let item_name = squash_ws(&observation.item_name);

        if site_name.is_empty() || category_name.is_empty() || item_name.is_empty() {
            return Err(AppError::Validation(
                "site, category and item names must be non-empty".to_string(),
            ));
        }

        let price = parse_price(&observation.sell_price, observation.sell_price_value)?;
        // The extractor's currency token wins over re-detection; both
        // default to the local symbol.
        let currency = observation
            .currency
            .as_deref()
            .map(Currency::from_symbol)
            .unwrap_or(price.currency);

        let sell_price = squash_ws(&observation.sell_price);
        let now = chrono::Utc::now().naive_utc();

        let previous = self
            .item_repo
            .upsert_returning_previous(
                ItemWrite {
                    site_name: &site_name,
                    category_name: &category_name,
                    item_name: &item_name,
                    sell_price: &sell_price,
                    sell_price_value: price.value.to_f64(),
                    currency: currency.symbol(),
                    url: observation.url.as_deref(),
                },
                now,
            )
            .await
            .map_err(AppError::Sqlx)?;

        let price_changed = previous
            .as_ref()
            .map(|prev| squash_ws(&prev.sell_price) != sell_price)
            .unwrap_or(false);

        let should_archive = match policy {
            ArchivePolicy::None => false,
            ArchivePolicy::PriceChange => price_changed,
            ArchivePolicy::Always => previous.is_some(),
        };

        // Best effort relative to the already-committed primary write.
        if should_archive {
            if let Some(prev) = &previous {
                let snapshot = ArchivedItem::snapshot_of(prev, now);
                if let Err(e) = self.archive_repo.insert(&snapshot).await {
                    let err = AppError::Archival(e.to_string());
                    warn!(
                        site = %site_name,
                        category = %category_name,
                        item = %item_name,
                        error = %err,
                        "archive write failed, current state already updated"
                    );
                }
            }
        }

        info!(
            site = %site_name,
            category = %category_name,
            item = %item_name,
            price = %sell_price,
            currency = %currency,
            inserted = previous.is_none(),
            archived = should_archive,
            "ingested observation"
        );

        Ok(IngestOutcome {
            inserted: previous.is_none(),
            updated: previous.is_some(),
            previous,
        })
    }
}
