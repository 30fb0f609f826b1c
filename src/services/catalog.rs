use crate::error::{AppError, AppResult};
use crate::normalize::{classify_region, parse_price, resolve, ItemIdentity, Region};
use crate::repositories::ItemRepository;
use crate::services::history::{market_day, to_utc};
use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Rows per page of the filtered read
const PAGE_SIZE: i64 = 25;

/// One logical game and the storefront categories tracked for it.
#[derive(Debug, Clone)]
pub struct CatalogGame {
    pub id: String,
    pub label: String,
    pub categories: Vec<String>,
}

/// The fixed set of tracked categories plus site presentation order.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub games: Vec<CatalogGame>,
    site_order: Vec<String>,
    site_labels: Vec<(String, String)>,
}

impl Catalog {
    pub fn new(
        games: Vec<CatalogGame>,
        site_order: Vec<String>,
        site_labels: Vec<(String, String)>,
    ) -> Self {
        Self {
            games,
            site_order,
            site_labels,
        }
    }

    /// The production catalog: MLBB diamonds and PUBG Mobile UC across
    /// the six tracked storefronts.
    pub fn tracked() -> Self {
        let mlbb = CatalogGame {
            id: "mlbb".to_string(),
            label: "Mobile Legends".to_string(),
            categories: [
                "gamesatis-mlbb-tr",
                "gamesatis-mlbb-global",
                "hesap-mlbb-tr",
                "hesap-mlbb-global",
                "vatangame-mlbb-tr",
                "vatangame-mlbb-global",
                "bynogame-mlbb-tr",
                "bynogame-mlbb-global",
                "perdigital-mlbb-tr",
                "perdigital-mlbb-global",
                "kabasakal-mlbb-tr",
                "kabasakal-mlbb-global",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        };
        let pubgm = CatalogGame {
            id: "pubgm".to_string(),
            label: "Pubg Mobile".to_string(),
            categories: [
                "gamesatis-pubgm",
                "hesap-pubgm-tr",
                "hesap-pubgm-global",
                "vatangame-pubgm-tr",
                "vatangame-pubgm-global",
                "bynogame-pubgm",
                "perdigital-pubgm-tr",
                "kabasakal-pubgm-tr",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        };

        let site_order = ["gamesatis", "hesapcomtr", "vatangame", "bynogame", "perdigital", "kabasakal"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let site_labels = [
            ("gamesatis", "GameSatış"),
            ("hesapcomtr", "HesapComTR"),
            ("vatangame", "VatanGame"),
            ("bynogame", "ByNoGame"),
            ("perdigital", "PerDigital"),
            ("kabasakal", "Kabasakal"),
        ]
        .iter()
        .map(|(id, label)| (id.to_string(), label.to_string()))
        .collect();

        Self::new(vec![mlbb, pubgm], site_order, site_labels)
    }

    pub fn game(&self, id: &str) -> Option<&CatalogGame> {
        self.games.iter().find(|g| g.id == id)
    }

    pub fn all_categories(&self) -> Vec<String> {
        self.games
            .iter()
            .flat_map(|g| g.categories.iter().cloned())
            .collect()
    }

    fn site_rank(&self, site_id: &str) -> usize {
        self.site_order
            .iter()
            .position(|s| s == site_id)
            .unwrap_or(self.site_order.len())
    }

    fn site_label(&self, site_id: &str) -> String {
        self.site_labels
            .iter()
            .find(|(id, _)| id == site_id)
            .map(|(_, label)| label.clone())
            .unwrap_or_else(|| site_id.to_string())
    }
}

/// One comparison row: the same logical product with its domestic and
/// global prices side by side.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRow {
    pub name: String,
    pub original_name: String,
    pub tr: Option<String>,
    pub global: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteComparison {
    pub id: String,
    pub label: String,
    pub rows: Vec<ComparisonRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameComparison {
    pub id: String,
    pub label: String,
    pub sites: Vec<SiteComparison>,
}

/// Paged filtered read query.
#[derive(Debug, Clone)]
pub struct FilterQuery {
    /// Category group id, e.g. "mlbb".
    pub group: String,
    /// Case-insensitive site name prefix.
    pub site: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub page: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilteredRow {
    pub name: String,
    pub tr: String,
    pub global: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilteredPage {
    pub rows: Vec<FilteredRow>,
    pub page: u32,
    pub total_pages: u32,
    pub total_count: i64,
}

/// Read-side service over the current-state table: the cross-store
/// comparison view and the paged filtered listing.
pub struct CatalogService {
    item_repo: Arc<ItemRepository>,
}

struct RowAcc {
    name: String,
    original_name: String,
    tr: Option<String>,
    global: Option<String>,
    tr_value: Option<f64>,
    global_value: Option<f64>,
}

impl RowAcc {
    fn sort_value(&self) -> Option<f64> {
        self.tr_value.or(self.global_value)
    }
}

impl CatalogService {
    pub fn new(item_repo: Arc<ItemRepository>) -> Self {
        Self { item_repo }
    }

    /// Build the comparison view: per game and per store, one row per
    /// resolved join key with domestic/global prices, price-sorted with a
    /// Turkish-collation name tie-break.
    ///
    /// The grouping map is built fresh per request; nothing is shared
    /// across calls.
    pub async fn comparison(&self, catalog: &Catalog) -> AppResult<Vec<GameComparison>> {
        let items = self
            .item_repo
            .find_by_categories(&catalog.all_categories())
            .await
            .map_err(AppError::Sqlx)?;

        let category_sets: Vec<HashSet<&str>> = catalog
            .games
            .iter()
            .map(|g| g.categories.iter().map(|c| c.as_str()).collect())
            .collect();

        // game index -> site id -> join key -> accumulated row
        let mut grouped: BTreeMap<usize, BTreeMap<String, BTreeMap<String, RowAcc>>> =
            BTreeMap::new();

        for item in &items {
            let game_idx = match category_sets
                .iter()
                .position(|set| set.contains(item.category_name.as_str()))
            {
                Some(idx) => idx,
                None => continue,
            };

            let ItemIdentity {
                join_key,
                display_name,
                region,
            } = resolve(&item.item_name, &item.category_name);
            let site_id = item.site_name.to_lowercase();

            let value = item
                .price_value()
                .or_else(|| parse_price(&item.sell_price, None).ok().and_then(|p| p.value.to_f64()));
            let price_str = value
                .map(format_price_tr)
                .unwrap_or_else(|| item.sell_price.replace('.', ","));

            let row = grouped
                .entry(game_idx)
                .or_default()
                .entry(site_id)
                .or_default()
                .entry(join_key)
                .or_insert_with(|| RowAcc {
                    name: display_name,
                    original_name: item.item_name.clone(),
                    tr: None,
                    global: None,
                    tr_value: None,
                    global_value: None,
                });

            match region {
                Region::Tr => {
                    row.tr = Some(price_str);
                    row.tr_value = value;
                }
                Region::Global => {
                    row.global = Some(price_str);
                    row.global_value = value;
                }
            }
        }

        let comparisons = catalog
            .games
            .iter()
            .enumerate()
            .map(|(idx, game)| {
                let sites_map = grouped.remove(&idx).unwrap_or_default();
                let mut sites: Vec<SiteComparison> = sites_map
                    .into_iter()
                    .map(|(site_id, rows_map)| {
                        let mut accs: Vec<RowAcc> = rows_map.into_values().collect();
                        accs.sort_by(compare_rows);
                        SiteComparison {
                            label: catalog.site_label(&site_id),
                            id: site_id,
                            rows: accs
                                .into_iter()
                                .map(|acc| ComparisonRow {
                                    name: acc.name,
                                    original_name: acc.original_name,
                                    tr: acc.tr,
                                    global: acc.global,
                                })
                                .collect(),
                        }
                    })
                    .collect();
                sites.sort_by_key(|s| catalog.site_rank(&s.id));

                GameComparison {
                    id: game.id.clone(),
                    label: game.label.clone(),
                    sites,
                }
            })
            .collect();

        Ok(comparisons)
    }

    /// One page of raw current-state rows for a category group and site
    /// prefix within a creation-date range, newest first.
    pub async fn filtered(
        &self,
        catalog: &Catalog,
        query: &FilterQuery,
    ) -> AppResult<FilteredPage> {
        let game = catalog
            .game(&query.group)
            .ok_or_else(|| AppError::Validation(format!("unknown category group: {}", query.group)))?;
        if query.site.trim().is_empty() {
            return Err(AppError::Validation("site is required".to_string()));
        }

        let page = query.page.max(1);
        let offset = (page as i64 - 1) * PAGE_SIZE;

        let start = query
            .start
            .map(to_utc)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        // End of the requested (or current) market day, inclusive.
        let end_day = query
            .end
            .unwrap_or_else(|| market_day(chrono::Utc::now().naive_utc()));
        let end = to_utc(end_day + Duration::days(1)) - Duration::seconds(1);

        let total_count = self
            .item_repo
            .count_filtered(&game.categories, &query.site, start, end)
            .await
            .map_err(AppError::Sqlx)?;
        let items = self
            .item_repo
            .find_filtered(&game.categories, &query.site, start, end, PAGE_SIZE, offset)
            .await
            .map_err(AppError::Sqlx)?;

        let rows = items
            .iter()
            .map(|item| {
                let region = classify_region(&item.category_name, &item.item_name);
                FilteredRow {
                    name: item.item_name.clone(),
                    tr: match region {
                        Region::Tr => item.sell_price.clone(),
                        Region::Global => "-".to_string(),
                    },
                    global: match region {
                        Region::Global => item.sell_price.clone(),
                        Region::Tr => "-".to_string(),
                    },
                }
            })
            .collect();

        let total_pages = ((total_count + PAGE_SIZE - 1) / PAGE_SIZE) as u32;

        Ok(FilteredPage {
            rows,
            page,
            total_pages,
            total_count,
        })
    }
}

fn compare_rows(a: &RowAcc, b: &RowAcc) -> Ordering {
    match (a.sort_value(), b.sort_value()) {
        (Some(x), Some(y)) => x
            .partial_cmp(&y)
            .unwrap_or(Ordering::Equal)
            .then_with(|| turkish_cmp(&a.name, &b.name)),
        _ => turkish_cmp(&a.name, &b.name),
    }
}

/// Format a price the way the storefronts display lira amounts:
/// dot-grouped thousands, comma decimal, two fraction digits.
pub fn format_price_tr(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let integer = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}{},{:02}", if negative { "-" } else { "" }, grouped, fraction)
}

// Lowercase Turkish alphabet in collation order.
const TURKISH_ORDER: &str = "abcçdefgğhıijklmnoöpqrsştuüvwxyz";

/// Compare names with Turkish letter ordering (ç after c, ı before i,
/// and so on). Characters outside the alphabet fall back to code point
/// order, which is close enough for the digit-heavy product names.
pub fn turkish_cmp(a: &str, b: &str) -> Ordering {
    turkish_sort_key(a).cmp(&turkish_sort_key(b))
}

fn turkish_sort_key(s: &str) -> Vec<u32> {
    s.to_lowercase()
        .chars()
        .map(|c| match TURKISH_ORDER.chars().position(|t| t == c) {
            Some(idx) => 0x11_0000 + idx as u32,
            None => c as u32,
        })
        .collect()
}
