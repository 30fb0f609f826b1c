use crate::error::{AppError, AppResult};
use crate::normalize::{join_key, parse_price};
use crate::repositories::{ArchiveRepository, ItemRepository};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Hour offset of the primary market timezone (Europe/Istanbul, which has
/// not observed DST since 2016). Day bucketing is fixed to this zone.
const MARKET_UTC_OFFSET_HOURS: i64 = 3;

/// Query for one item's price history.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// Raw or already-cleaned item name; matched via its join key.
    pub item_name: String,
    pub site_name: Option<String>,
    pub category_name: Option<String>,
    /// Inclusive first calendar day (market timezone).
    pub start: NaiveDate,
    /// Inclusive last calendar day (market timezone).
    pub end: NaiveDate,
}

/// One category's values aligned to the shared day axis.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySeries {
    pub category: String,
    pub currency: String,
    /// One entry per day on the axis; `None` marks a day with no
    /// observation for this category — an explicit gap, never
    /// interpolated or carried forward.
    pub values: Vec<Option<Decimal>>,
}

/// Chart-ready day-bucketed history: a shared ascending day axis and one
/// aligned series per category, so the presentation layer can overlay
/// stores without re-aligning anything client-side.
#[derive(Debug, Clone, Serialize)]
pub struct PriceHistory {
    pub days: Vec<NaiveDate>,
    pub series: Vec<CategorySeries>,
}

/// Time-series aggregator over the archive plus the live current state.
pub struct HistoryService {
    item_repo: Arc<ItemRepository>,
    archive_repo: Arc<ArchiveRepository>,
}

struct PricePoint {
    at: NaiveDateTime,
    category: String,
    value: Decimal,
    currency: String,
}

impl HistoryService {
    pub fn new(item_repo: Arc<ItemRepository>, archive_repo: Arc<ArchiveRepository>) -> Self {
        Self {
            item_repo,
            archive_repo,
        }
    }

    /// Build the day-bucketed price history for one logical item.
    ///
    /// Archived snapshots in range are merged with the matching current
    /// rows (treated as the most recent snapshots); within each
    /// (day, category) bucket the chronologically last record wins — the
    /// closing price of that day.
    pub async fn price_history(&self, query: &HistoryQuery) -> AppResult<PriceHistory> {
        if query.start > query.end {
            return Err(AppError::Validation(format!(
                "start {} is after end {}",
                query.start, query.end
            )));
        }

        let target_key = join_key(&query.item_name);
        if target_key.is_empty() {
            return Err(AppError::Validation("item name is empty".to_string()));
        }

        // [start, end] in market days -> [start, end) in UTC timestamps.
        let range_start = to_utc(query.start);
        let range_end = to_utc(query.end + Duration::days(1));

        let site = query.site_name.as_deref();
        let category = query.category_name.as_deref();

        let snapshots = self
            .archive_repo
            .find_for_history(range_start, range_end, site, category)
            .await
            .map_err(AppError::Sqlx)?;
        let current = self
            .item_repo
            .find_in_range(range_start, range_end, site, category)
            .await
            .map_err(AppError::Sqlx)?;

        let mut points: Vec<PricePoint> = Vec::new();
        for snap in &snapshots {
            if join_key(&snap.item_name) != target_key {
                continue;
            }
            if let Some(value) = resolve_value(snap.sell_price_value, &snap.sell_price) {
                points.push(PricePoint {
                    at: snap.archived_at,
                    category: snap.category_name.clone(),
                    value,
                    currency: snap.currency.clone(),
                });
            }
        }
        for item in &current {
            if join_key(&item.item_name) != target_key {
                continue;
            }
            if let Some(value) = resolve_value(item.sell_price_value, &item.sell_price) {
                points.push(PricePoint {
                    at: item.updated_at,
                    category: item.category_name.clone(),
                    value,
                    currency: item.currency.clone(),
                });
            }
        }

        // Closing-price collapse: last record of each (day, category) wins.
        points.sort_by(|a, b| a.at.cmp(&b.at));
        let mut buckets: BTreeMap<(NaiveDate, String), (Decimal, String)> = BTreeMap::new();
        for point in points {
            let day = market_day(point.at);
            buckets.insert((day, point.category), (point.value, point.currency));
        }

        // Shared x-axis: every day observed in any category, ascending.
        let days: Vec<NaiveDate> = buckets
            .keys()
            .map(|(day, _)| *day)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut by_category: BTreeMap<String, (String, BTreeMap<NaiveDate, Decimal>)> =
            BTreeMap::new();
        for ((day, category), (value, currency)) in buckets {
            let entry = by_category
                .entry(category)
                .or_insert_with(|| (currency.clone(), BTreeMap::new()));
            entry.0 = currency;
            entry.1.insert(day, value);
        }

        let series = by_category
            .into_iter()
            .map(|(category, (currency, values_by_day))| CategorySeries {
                category,
                currency,
                values: days
                    .iter()
                    .map(|day| values_by_day.get(day).copied())
                    .collect(),
            })
            .collect();

        Ok(PriceHistory { days, series })
    }
}

/// Calendar day of a UTC timestamp in the market timezone.
pub fn market_day(at: NaiveDateTime) -> NaiveDate {
    (at + Duration::hours(MARKET_UTC_OFFSET_HOURS)).date()
}

/// Midnight of a market-timezone day as a UTC timestamp.
pub fn to_utc(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN) - Duration::hours(MARKET_UTC_OFFSET_HOURS)
}

/// Price of a record for charting: the derived float when present,
/// otherwise a re-parse of the stored text.
fn resolve_value(stored: Option<f64>, sell_price: &str) -> Option<Decimal> {
    stored
        .filter(|v| v.is_finite())
        .and_then(Decimal::from_f64_retain)
        .or_else(|| parse_price(sell_price, None).ok().map(|p| p.value))
}
