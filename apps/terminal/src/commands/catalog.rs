//! # Catalog Commands
//!
//! Offline copies of the server's reference data. The UI pulls each catalog
//! from the server and hands the whole list to `save_*`; `get_*` returns the
//! active entries in display order.

use tracing::debug;

use till_core::{CatalogItem, CatalogKind};

use crate::error::ApiError;
use crate::state::DbState;

/// Upserts `items` into one catalog. Returns how many were stored.
pub async fn save_catalog(
    db: &DbState,
    kind: CatalogKind,
    items: Vec<CatalogItem>,
) -> Result<usize, ApiError> {
    debug!(catalog = %kind, count = items.len(), "save_catalog command");
    Ok(db.inner().catalog(kind).save(&items).await?)
}

/// Active entries of one catalog in display order.
pub async fn get_catalog(db: &DbState, kind: CatalogKind) -> Result<Vec<CatalogItem>, ApiError> {
    Ok(db.inner().catalog(kind).list().await?)
}

pub async fn save_categories(db: &DbState, items: Vec<CatalogItem>) -> Result<usize, ApiError> {
    save_catalog(db, CatalogKind::Categories, items).await
}

pub async fn get_categories(db: &DbState) -> Result<Vec<CatalogItem>, ApiError> {
    get_catalog(db, CatalogKind::Categories).await
}

pub async fn save_locations(db: &DbState, items: Vec<CatalogItem>) -> Result<usize, ApiError> {
    save_catalog(db, CatalogKind::Locations, items).await
}

pub async fn get_locations(db: &DbState) -> Result<Vec<CatalogItem>, ApiError> {
    get_catalog(db, CatalogKind::Locations).await
}

pub async fn save_payment_methods(db: &DbState, items: Vec<CatalogItem>) -> Result<usize, ApiError> {
    save_catalog(db, CatalogKind::PaymentMethods, items).await
}

pub async fn get_payment_methods(db: &DbState) -> Result<Vec<CatalogItem>, ApiError> {
    get_catalog(db, CatalogKind::PaymentMethods).await
}

pub async fn save_product_groups(db: &DbState, items: Vec<CatalogItem>) -> Result<usize, ApiError> {
    save_catalog(db, CatalogKind::ProductGroups, items).await
}

pub async fn get_product_groups(db: &DbState) -> Result<Vec<CatalogItem>, ApiError> {
    get_catalog(db, CatalogKind::ProductGroups).await
}

pub async fn save_transaction_types(
    db: &DbState,
    items: Vec<CatalogItem>,
) -> Result<usize, ApiError> {
    save_catalog(db, CatalogKind::TransactionTypes, items).await
}

pub async fn get_transaction_types(db: &DbState) -> Result<Vec<CatalogItem>, ApiError> {
    get_catalog(db, CatalogKind::TransactionTypes).await
}
