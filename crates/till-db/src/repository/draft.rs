//! # Draft Slots
//!
//! Two single-value scratch slots: the in-progress cart and the current work
//! shift. Each slot holds at most one JSON document and a save replaces it.
//! The slot kind is a type parameter, so a cart store can never read or
//! clear the work-shift slot.

use chrono::Utc;
use sqlx::SqlitePool;
use std::marker::PhantomData;
use tracing::debug;

use till_core::validation::validate_json;
use till_core::{Draft, DraftSlotKind, Payload, Slot};

use crate::error::DbResult;

/// Store for the slot named by `S`.
#[derive(Debug, Clone)]
pub struct DraftSlotStore<S: Slot> {
    pool: SqlitePool,
    _slot: PhantomData<S>,
}

impl<S: Slot> DraftSlotStore<S> {
    pub fn new(pool: SqlitePool) -> Self {
        DraftSlotStore {
            pool,
            _slot: PhantomData,
        }
    }

    pub fn kind(&self) -> DraftSlotKind {
        S::KIND
    }

    /// Replaces the slot's value.
    pub async fn save(&self, payload: Payload) -> DbResult<Draft> {
        validate_json("data", payload.as_str())?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO draft_slots (slot, data, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (slot) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(S::KIND)
        .bind(&payload)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(slot = %S::KIND, bytes = payload.as_str().len(), "Draft saved");

        Ok(Draft {
            kind: S::KIND,
            payload,
            updated_at: now,
        })
    }

    /// Returns the last saved value, or `None` if the slot is empty.
    pub async fn get(&self) -> DbResult<Option<Draft>> {
        let draft = sqlx::query_as::<_, Draft>(
            "SELECT slot, data, updated_at FROM draft_slots WHERE slot = ?1",
        )
        .bind(S::KIND)
        .fetch_optional(&self.pool)
        .await?;

        Ok(draft)
    }

    /// Empties the slot. Clearing an empty slot is not an error.
    ///
    /// Returns whether a value was removed.
    pub async fn clear(&self) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM draft_slots WHERE slot = ?1")
            .bind(S::KIND)
            .execute(&self.pool)
            .await?;

        debug!(slot = %S::KIND, removed = result.rows_affected(), "Draft cleared");
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use till_core::Payload;

    fn payload(text: &str) -> Payload {
        Payload::parse("data", text).unwrap()
    }

    #[tokio::test]
    async fn test_save_replaces_and_get_returns_last_value() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cart = db.cart_draft();

        assert!(cart.get().await.unwrap().is_none());

        cart.save(payload(r#"{"items":[1]}"#)).await.unwrap();
        cart.save(payload(r#"{"items":[1,2]}"#)).await.unwrap();

        let draft = cart.get().await.unwrap().unwrap();
        assert_eq!(draft.payload.as_str(), r#"{"items":[1,2]}"#);
        assert_eq!(draft.kind, till_core::DraftSlotKind::Cart);
    }

    #[tokio::test]
    async fn test_slots_are_independent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.cart_draft().save(payload(r#"{"cart":true}"#)).await.unwrap();
        db.work_shift_draft()
            .save(payload(r#"{"shift":"morning"}"#))
            .await
            .unwrap();

        assert!(db.cart_draft().clear().await.unwrap());

        assert!(db.cart_draft().get().await.unwrap().is_none());
        let shift = db.work_shift_draft().get().await.unwrap().unwrap();
        assert_eq!(shift.payload.as_str(), r#"{"shift":"morning"}"#);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(!db.cart_draft().clear().await.unwrap());
        assert!(!db.cart_draft().clear().await.unwrap());
    }

    #[tokio::test]
    async fn test_save_rejects_unparsable_payload() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bad: Payload = serde_json::from_str("\"{not json\"").unwrap();

        let err = db.cart_draft().save(bad).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert!(db.cart_draft().get().await.unwrap().is_none());
    }
}
