use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Current-state record: the latest observed price for one
/// `(site, category, item)` triple.
///
/// The triple is keyed on the item name exactly as the storefront spelled
/// it (whitespace-collapsed), so the table stays an auditable mirror of
/// what was last scraped. Cross-store matching happens at read time via
/// the identity resolver, never at the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: i64,
    pub site_name: String,
    pub category_name: String,
    pub item_name: String,
    /// Exact price text as observed, e.g. "189,99". Source of truth for
    /// "did the price change" comparisons.
    pub sell_price: String,
    /// Derived float of `sell_price`, for sorting and arithmetic only.
    pub sell_price_value: Option<f64>,
    pub currency: String,
    pub url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Item {
    /// Price as a float, falling back to nothing when the stored value
    /// was unparsable at ingestion time.
    pub fn price_value(&self) -> Option<f64> {
        self.sell_price_value.filter(|v| v.is_finite())
    }
}
