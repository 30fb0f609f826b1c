use serde::{Deserialize, Serialize};

use crate::models::Item;

/// One raw scrape result for one product, handed over by a storefront
/// scraper. Ephemeral: always passed through the price normalizer and
/// identity resolver before anything is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub site_name: String,
    pub category_name: String,
    pub item_name: String,
    /// Raw price text, e.g. "189,99 TL" or "1.234,56".
    pub sell_price: String,
    /// Optional pre-parsed numeric hint from the upstream extractor.
    #[serde(default)]
    pub sell_price_value: Option<f64>,
    /// Currency token as seen on the page, if the extractor caught one.
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Archival behavior for one ingestion call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchivePolicy {
    /// Never archive the previous state.
    None,
    /// Archive only when the normalized price text changed.
    PriceChange,
    /// Archive the previous state on every overwrite.
    Always,
}

impl ArchivePolicy {
    /// Convert from the configuration string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ArchivePolicy::None),
            "price-change" => Ok(ArchivePolicy::PriceChange),
            "always" => Ok(ArchivePolicy::Always),
            _ => Err(format!("Invalid archive policy: {}", s)),
        }
    }

    /// Convert to the configuration string
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchivePolicy::None => "none",
            ArchivePolicy::PriceChange => "price-change",
            ArchivePolicy::Always => "always",
        }
    }
}

impl Default for ArchivePolicy {
    fn default() -> Self {
        ArchivePolicy::PriceChange
    }
}

/// Result of one ingestion: whether the key was inserted or updated, and
/// the record as it stood before the write.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub inserted: bool,
    pub updated: bool,
    pub previous: Option<Item>,
}
