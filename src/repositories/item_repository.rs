use crate::models::Item;
use chrono::NaiveDateTime;
use sqlx::{QueryBuilder, Result as SqlxResult, SqlitePool};

/// New field values for one current-state row, written by the upsert.
#[derive(Debug, Clone)]
pub struct ItemWrite<'a> {
    pub site_name: &'a str,
    pub category_name: &'a str,
    pub item_name: &'a str,
    pub sell_price: &'a str,
    pub sell_price_value: Option<f64>,
    pub currency: &'a str,
    pub url: Option<&'a str>,
}

/// Repository for current-state price records
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Create a new ItemRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or update the row for `(site, category, item)` and return
    /// the row as it stood before the write.
    ///
    /// Read-previous and write-new run in one transaction, so a
    /// concurrent ingestion of the same key can never observe a torn
    /// previous state. `created_at` is set only on first insert.
    pub async fn upsert_returning_previous(
        &self,
        write: ItemWrite<'_>,
        now: NaiveDateTime,
    ) -> SqlxResult<Option<Item>> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, site_name, category_name, item_name,
                   sell_price, sell_price_value, currency, url,
                   created_at, updated_at
            FROM items
            WHERE site_name = ? AND category_name = ? AND item_name = ?
            "#,
        )
        .bind(write.site_name)
        .bind(write.category_name)
        .bind(write.item_name)
        .fetch_optional(&mut *tx)
        .await?;

        match &previous {
            Some(prev) => {
                sqlx::query(
                    r#"
                    UPDATE items
                    SET sell_price = ?, sell_price_value = ?, currency = ?,
                        url = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(write.sell_price)
                .bind(write.sell_price_value)
                .bind(write.currency)
                .bind(write.url)
                .bind(now)
                .bind(prev.id)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO items
                        (site_name, category_name, item_name, sell_price,
                         sell_price_value, currency, url, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(write.site_name)
                .bind(write.category_name)
                .bind(write.item_name)
                .bind(write.sell_price)
                .bind(write.sell_price_value)
                .bind(write.currency)
                .bind(write.url)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(previous)
    }

    /// Find the current row for a key
    pub async fn find_by_key(
        &self,
        site_name: &str,
        category_name: &str,
        item_name: &str,
    ) -> SqlxResult<Option<Item>> {
        sqlx::query_as::<_, Item>(
            r#"
            SELECT id, site_name, category_name, item_name,
                   sell_price, sell_price_value, currency, url,
                   created_at, updated_at
            FROM items
            WHERE site_name = ? AND category_name = ? AND item_name = ?
            "#,
        )
        .bind(site_name)
        .bind(category_name)
        .bind(item_name)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find all current rows in any of the given categories
    pub async fn find_by_categories(&self, categories: &[String]) -> SqlxResult<Vec<Item>> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::new(
            "SELECT id, site_name, category_name, item_name, sell_price, \
             sell_price_value, currency, url, created_at, updated_at \
             FROM items WHERE category_name IN (",
        );
        let mut separated = qb.separated(", ");
        for category in categories {
            separated.push_bind(category);
        }
        separated.push_unseparated(")");

        qb.build_query_as::<Item>().fetch_all(&self.pool).await
    }

    /// Current rows in the given categories updated inside a time range,
    /// used by the aggregator as the most recent snapshots.
    pub async fn find_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        site_name: Option<&str>,
        category_name: Option<&str>,
    ) -> SqlxResult<Vec<Item>> {
        let mut qb = QueryBuilder::new(
            "SELECT id, site_name, category_name, item_name, sell_price, \
             sell_price_value, currency, url, created_at, updated_at \
             FROM items WHERE updated_at >= ",
        );
        qb.push_bind(start);
        qb.push(" AND updated_at < ");
        qb.push_bind(end);
        if let Some(site) = site_name {
            qb.push(" AND site_name = ");
            qb.push_bind(site);
        }
        if let Some(category) = category_name {
            qb.push(" AND category_name = ");
            qb.push_bind(category);
        }
        qb.push(" ORDER BY updated_at ASC");

        qb.build_query_as::<Item>().fetch_all(&self.pool).await
    }

    /// One page of current rows matching a category set, a
    /// case-insensitive site prefix and a creation-time range,
    /// newest first.
    pub async fn find_filtered(
        &self,
        categories: &[String],
        site_prefix: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        limit: i64,
        offset: i64,
    ) -> SqlxResult<Vec<Item>> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = Self::filtered_query(
            "SELECT id, site_name, category_name, item_name, sell_price, \
             sell_price_value, currency, url, created_at, updated_at FROM items",
            categories,
            site_prefix,
            start,
            end,
        );
        qb.push(" ORDER BY created_at DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        qb.build_query_as::<Item>().fetch_all(&self.pool).await
    }

    /// Total number of rows the filtered read matches
    pub async fn count_filtered(
        &self,
        categories: &[String],
        site_prefix: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> SqlxResult<i64> {
        if categories.is_empty() {
            return Ok(0);
        }

        let mut qb = Self::filtered_query(
            "SELECT COUNT(*) FROM items",
            categories,
            site_prefix,
            start,
            end,
        );

        qb.build_query_scalar::<i64>().fetch_one(&self.pool).await
    }

    fn filtered_query<'a>(
        select: &str,
        categories: &'a [String],
        site_prefix: &'a str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> QueryBuilder<'a, sqlx::Sqlite> {
        let mut qb = QueryBuilder::new(select);
        qb.push(" WHERE category_name IN (");
        let mut separated = qb.separated(", ");
        for category in categories {
            separated.push_bind(category);
        }
        separated.push_unseparated(")");
        qb.push(" AND LOWER(site_name) LIKE ");
        qb.push_bind(format!("{}%", escape_like(&site_prefix.to_lowercase())));
        qb.push(" ESCAPE '\\'");
        qb.push(" AND created_at >= ");
        qb.push_bind(start);
        qb.push(" AND created_at <= ");
        qb.push_bind(end);
        qb
    }
}

/// Escape LIKE metacharacters so a user-supplied prefix matches
/// literally instead of acting as a wildcard pattern.
fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
