use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::Item;

/// Immutable snapshot of an [`Item`] taken just before an overwrite
/// superseded it. Append-only; the snapshots for a key, ordered by
/// `archived_at`, plus the live row replay the full price history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ArchivedItem {
    pub id: i64,
    pub site_name: String,
    pub category_name: String,
    pub item_name: String,
    pub sell_price: String,
    pub sell_price_value: Option<f64>,
    pub currency: String,
    pub url: Option<String>,
    pub archived_at: NaiveDateTime,
}

impl ArchivedItem {
    /// Capture the pre-overwrite state of a live record.
    pub fn snapshot_of(item: &Item, archived_at: NaiveDateTime) -> Self {
        Self {
            id: 0,
            site_name: item.site_name.clone(),
            category_name: item.category_name.clone(),
            item_name: item.item_name.clone(),
            sell_price: item.sell_price.clone(),
            sell_price_value: item.sell_price_value,
            currency: item.currency.clone(),
            url: item.url.clone(),
            archived_at,
        }
    }
}
