use crate::models::ArchivedItem;
use chrono::NaiveDateTime;
use sqlx::{QueryBuilder, Result as SqlxResult, SqlitePool};

/// Repository for the append-only archive of superseded price records
pub struct ArchiveRepository {
    pool: SqlitePool,
}

impl ArchiveRepository {
    /// Create a new ArchiveRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one snapshot. Archive rows are never updated or deleted.
    pub async fn insert(&self, snapshot: &ArchivedItem) -> SqlxResult<()> {
        sqlx::query(
            r#"
            INSERT INTO archived_items
                (site_name, category_name, item_name, sell_price,
                 sell_price_value, currency, url, archived_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&snapshot.site_name)
        .bind(&snapshot.category_name)
        .bind(&snapshot.item_name)
        .bind(&snapshot.sell_price)
        .bind(snapshot.sell_price_value)
        .bind(&snapshot.currency)
        .bind(&snapshot.url)
        .bind(snapshot.archived_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All snapshots for one key, ascending by archival time. Replaying
    /// these and appending the live row reconstructs the price history.
    pub async fn find_by_key(
        &self,
        site_name: &str,
        category_name: &str,
        item_name: &str,
    ) -> SqlxResult<Vec<ArchivedItem>> {
        sqlx::query_as::<_, ArchivedItem>(
            r#"
            SELECT id, site_name, category_name, item_name,
                   sell_price, sell_price_value, currency, url, archived_at
            FROM archived_items
            WHERE site_name = ? AND category_name = ? AND item_name = ?
            ORDER BY archived_at ASC, id ASC
            "#,
        )
        .bind(site_name)
        .bind(category_name)
        .bind(item_name)
        .fetch_all(&self.pool)
        .await
    }

    /// Snapshots inside `[start, end)` passing the optional site/category
    /// filters, ascending by archival time.
    pub async fn find_for_history(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        site_name: Option<&str>,
        category_name: Option<&str>,
    ) -> SqlxResult<Vec<ArchivedItem>> {
        let mut qb = QueryBuilder::new(
            "SELECT id, site_name, category_name, item_name, sell_price, \
             sell_price_value, currency, url, archived_at \
             FROM archived_items WHERE archived_at >= ",
        );
        qb.push_bind(start);
        qb.push(" AND archived_at < ");
        qb.push_bind(end);
        if let Some(site) = site_name {
            qb.push(" AND site_name = ");
            qb.push_bind(site);
        }
        if let Some(category) = category_name {
            qb.push(" AND category_name = ");
            qb.push_bind(category);
        }
        qb.push(" ORDER BY archived_at ASC, id ASC");

        qb.build_query_as::<ArchivedItem>()
            .fetch_all(&self.pool)
            .await
    }

    /// Number of snapshots recorded for one key
    pub async fn count_by_key(
        &self,
        site_name: &str,
        category_name: &str,
        item_name: &str,
    ) -> SqlxResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM archived_items
            WHERE site_name = ? AND category_name = ? AND item_name = ?
            "#,
        )
        .bind(site_name)
        .bind(category_name)
        .bind(item_name)
        .fetch_one(&self.pool)
        .await
    }
}
