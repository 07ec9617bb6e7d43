//! # Catalog Mirrors
//!
//! Local copies of server-owned reference data (categories, locations,
//! payment methods, product groups, transaction types) for offline lookups.
//! The server is the source of truth: a save overwrites by id and the re-sync
//! flow clears these tables before pulling them again.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use till_core::{CatalogItem, CatalogKind};

use crate::error::DbResult;

const CATALOG_COLUMNS: &str = "id, name, code, active, sort_order, data";

/// Repository for one catalog mirror.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
    kind: CatalogKind,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool, kind: CatalogKind) -> Self {
        CatalogRepository { pool, kind }
    }

    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    /// Upserts a batch of entries in one transaction.
    ///
    /// Every entry is validated first; one bad entry rejects the whole batch.
    pub async fn save(&self, items: &[CatalogItem]) -> DbResult<usize> {
        for item in items {
            item.validate()?;
        }

        let sql = format!(
            "INSERT INTO {} (id, name, code, active, sort_order, data, stored_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT (id) DO UPDATE SET \
                 name = excluded.name, \
                 code = excluded.code, \
                 active = excluded.active, \
                 sort_order = excluded.sort_order, \
                 data = excluded.data, \
                 stored_at = excluded.stored_at",
            self.kind.table()
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        for item in items {
            sqlx::query(&sql)
                .bind(item.id.trim())
                .bind(item.name.trim())
                .bind(&item.code)
                .bind(item.active)
                .bind(item.sort_order)
                .bind(&item.data)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        info!(catalog = %self.kind, count = items.len(), "Catalog entries stored");
        Ok(items.len())
    }

    /// Active entries in display order.
    pub async fn list(&self) -> DbResult<Vec<CatalogItem>> {
        let sql = format!(
            "SELECT {CATALOG_COLUMNS} FROM {} WHERE active = 1 \
             ORDER BY sort_order ASC, name ASC, id ASC",
            self.kind.table()
        );
        let items = sqlx::query_as::<_, CatalogItem>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(catalog = %self.kind, count = items.len(), "Catalog listed");
        Ok(items)
    }

    /// Every entry, including inactive ones.
    pub async fn list_all(&self) -> DbResult<Vec<CatalogItem>> {
        let sql = format!(
            "SELECT {CATALOG_COLUMNS} FROM {} ORDER BY sort_order ASC, name ASC, id ASC",
            self.kind.table()
        );
        let items = sqlx::query_as::<_, CatalogItem>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CatalogItem>> {
        let sql = format!(
            "SELECT {CATALOG_COLUMNS} FROM {} WHERE id = ?1",
            self.kind.table()
        );
        let item = sqlx::query_as::<_, CatalogItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }
}
