//! Text normalization: the two leaf components of the reconciliation
//! engine. [`price`] turns locale-ambiguous price text into a canonical
//! decimal + currency; [`identity`] turns raw display names into a stable
//! cross-store join key.

pub mod identity;
pub mod price;

pub use identity::{classify_region, display_name, join_key, resolve, ItemIdentity, Region};
pub use price::{parse_price, CanonicalPrice, Currency};

/// Collapse whitespace runs to single spaces and trim.
///
/// Applied to every persisted text field and to both sides of the
/// "did the price change" comparison, so formatting jitter in the
/// scraped text never registers as a change.
pub fn squash_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
