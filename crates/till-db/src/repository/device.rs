//! # Device Repository
//!
//! The terminal's own registered identity. An installation holds at most one
//! active profile; registering again requires a teardown first.
//!
//! Device profiles are sent to the server in a single call, so they follow
//! the atomic sync flow: PENDING → SYNCED or FAILED, with no in-flight state.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use till_core::validation::validate_json;
use till_core::{DeviceProfile, NewDeviceProfile, Payload, SyncEvent, SyncFlow, SyncState};

use super::lock_row;
use crate::error::{DbError, DbResult};

const DEVICE_COLUMNS: &str = "id, name, role, config, sync_status, sync_attempts, sync_error, \
     synced_at, created_at, updated_at, last_sync_at";

/// Repository for the device profile.
#[derive(Debug, Clone)]
pub struct DeviceRepository {
    pool: SqlitePool,
}

impl DeviceRepository {
    /// Creates a new DeviceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DeviceRepository { pool }
    }

    /// Registers this installation.
    ///
    /// ## Returns
    /// * `Ok(DeviceProfile)` - new profile in PENDING
    /// * `Err(DbError::Conflict)` - a profile already exists
    pub async fn register(&self, new: NewDeviceProfile) -> DbResult<DeviceProfile> {
        new.validate()?;
        validate_json("config", new.config.as_str())?;
        let now = Utc::now();

        let profile = DeviceProfile {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            role: new.role,
            config: new.config,
            sync: SyncState::new(),
            created_at: now,
            updated_at: now,
            last_sync_at: None,
        };

        // Check and insert are one statement, so two racing registrations
        // cannot both succeed.
        let result = sqlx::query(
            r#"
            INSERT INTO device_profiles (
                id, name, role, config, sync_status, sync_attempts, sync_error,
                synced_at, created_at, updated_at, last_sync_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11
            WHERE NOT EXISTS (SELECT 1 FROM device_profiles)
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.name)
        .bind(profile.role)
        .bind(&profile.config)
        .bind(profile.sync.status)
        .bind(profile.sync.attempts)
        .bind(&profile.sync.last_error)
        .bind(profile.sync.synced_at)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .bind(profile.last_sync_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(name = %profile.name, "Device registration refused: already registered");
            return Err(DbError::conflict(
                "DeviceProfile",
                "this installation already has an active device profile",
            ));
        }

        info!(device_id = %profile.id, role = %profile.role, "Device registered");
        Ok(profile)
    }

    /// The active profile, if this installation is registered.
    pub async fn get_active(&self) -> DbResult<Option<DeviceProfile>> {
        let sql = format!(
            "SELECT {DEVICE_COLUMNS} FROM device_profiles ORDER BY created_at ASC, id ASC LIMIT 1"
        );
        let profile = sqlx::query_as::<_, DeviceProfile>(&sql)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DeviceProfile>> {
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM device_profiles WHERE id = ?1");
        let profile = sqlx::query_as::<_, DeviceProfile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    /// Replaces the stored configuration. Sync state is left alone.
    pub async fn update_config(&self, id: &str, config: Payload) -> DbResult<DeviceProfile> {
        validate_json("config", config.as_str())?;

        let mut tx = self.pool.begin().await?;
        if !lock_row(&mut tx, "device_profiles", id).await? {
            return Err(DbError::not_found("DeviceProfile", id));
        }

        let sql = format!("SELECT {DEVICE_COLUMNS} FROM device_profiles WHERE id = ?1");
        let mut profile = sqlx::query_as::<_, DeviceProfile>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        profile.config = config;
        profile.touch(Utc::now());

        sqlx::query("UPDATE device_profiles SET config = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(&profile.config)
            .bind(profile.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(device_id = %id, "Device config updated");
        Ok(profile)
    }

    /// PENDING → SYNCED. Stamps `synced_at` and `last_sync_at`.
    pub async fn mark_synced(&self, id: &str) -> DbResult<DeviceProfile> {
        self.transition(id, SyncEvent::Succeed).await
    }

    /// PENDING → FAILED with `error`.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<DeviceProfile> {
        let event = SyncEvent::fail(error)?;
        self.transition(id, event).await
    }

    /// FAILED → PENDING.
    pub async fn requeue(&self, id: &str) -> DbResult<DeviceProfile> {
        self.transition(id, SyncEvent::Requeue).await
    }

    async fn transition(&self, id: &str, event: SyncEvent) -> DbResult<DeviceProfile> {
        let mut tx = self.pool.begin().await?;
        if !lock_row(&mut tx, "device_profiles", id).await? {
            return Err(DbError::not_found("DeviceProfile", id));
        }

        let sql = format!("SELECT {DEVICE_COLUMNS} FROM device_profiles WHERE id = ?1");
        let mut profile = sqlx::query_as::<_, DeviceProfile>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        let requested = event.requested_status();
        let now = Utc::now();
        if let Err(err) = profile.sync.apply("DeviceProfile", SyncFlow::Atomic, event, now) {
            warn!(
                device_id = %id,
                from = %profile.sync.status,
                to = %requested,
                "Rejected device sync transition"
            );
            return Err(err.into());
        }
        profile.touch(now);
        if profile.sync.synced_at.is_some() {
            profile.last_sync_at = profile.sync.synced_at;
        }

        sqlx::query(
            r#"
            UPDATE device_profiles SET
                sync_status = ?2,
                sync_attempts = ?3,
                sync_error = ?4,
                synced_at = ?5,
                updated_at = ?6,
                last_sync_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(profile.sync.status)
        .bind(profile.sync.attempts)
        .bind(&profile.sync.last_error)
        .bind(profile.sync.synced_at)
        .bind(profile.updated_at)
        .bind(profile.last_sync_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            device_id = %id,
            status = %profile.sync.status,
            attempts = profile.sync.attempts,
            "Device sync state updated"
        );

        Ok(profile)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::{Database, DbConfig};
    use till_core::{DeviceRole, SyncStatus};

    fn till_one() -> NewDeviceProfile {
        NewDeviceProfile {
            name: "Till-1".to_string(),
            role: DeviceRole::Pos,
            config: Payload::empty_object(),
        }
    }

    #[tokio::test]
    async fn test_register_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.devices();

        let profile = repo.register(till_one()).await.unwrap();
        assert_eq!(profile.sync.status, SyncStatus::Pending);
        assert_eq!(profile.role, DeviceRole::Pos);

        let err = repo.register(till_one()).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let active = repo.get_active().await.unwrap().unwrap();
        assert_eq!(active.id, profile.id);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_yield_one_profile() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.devices();

        let (a, b) = tokio::join!(repo.register(till_one()), repo.register(till_one()));
        assert!(a.is_ok() != b.is_ok());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM device_profiles")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_atomic_sync_flow() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.devices();
        let profile = repo.register(till_one()).await.unwrap();

        let failed = repo.mark_failed(&profile.id, "401 unauthorized").await.unwrap();
        assert_eq!(failed.sync.status, SyncStatus::Failed);
        assert_eq!(failed.sync.attempts, 1);
        assert!(failed.last_sync_at.is_none());

        // No edge from FAILED straight to SYNCED
        let err = repo.mark_synced(&profile.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        repo.requeue(&profile.id).await.unwrap();
        let synced = repo.mark_synced(&profile.id).await.unwrap();
        assert_eq!(synced.sync.status, SyncStatus::Synced);
        assert!(synced.sync.synced_at.is_some());
        assert_eq!(synced.last_sync_at, synced.sync.synced_at);
        assert!(synced.sync.last_error.is_none());

        let err = repo.mark_failed(&profile.id, "late").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }

    #[tokio::test]
    async fn test_update_config() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.devices();
        let profile = repo.register(till_one()).await.unwrap();

        let config = Payload::parse("config", r#"{"printer":"kitchen-1"}"#).unwrap();
        let updated = repo.update_config(&profile.id, config.clone()).await.unwrap();
        assert_eq!(updated.config, config);
        assert_eq!(updated.sync.status, SyncStatus::Pending);

        let stored = repo.get_by_id(&profile.id).await.unwrap().unwrap();
        assert_eq!(stored.config, config);

        let err = repo
            .update_config("missing", Payload::empty_object())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_register_rejects_blank_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut new = till_one();
        new.name = String::new();

        let err = db.devices().register(new).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(db.devices().get_active().await.unwrap().is_none());
    }
}
