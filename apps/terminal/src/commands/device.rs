//! # Device Commands
//!
//! Registration of this installation and the upload state of its profile.
//! A profile goes to the server in one call, so it is PENDING until the
//! outcome is known, then SYNCED or FAILED.

use tracing::debug;

use till_core::{DeviceProfile, DeviceRole, NewDeviceProfile, Payload};

use crate::error::ApiError;
use crate::state::DbState;

/// Registers this terminal. Fails with `CONFLICT` if it already is.
///
/// ## Arguments
/// * `name` - Display name, e.g. "Till-1"
/// * `role` - What the terminal is used as
/// * `config` - Device settings as a JSON document (default `{}`)
pub async fn register_device(
    db: &DbState,
    name: String,
    role: DeviceRole,
    config: Option<String>,
) -> Result<DeviceProfile, ApiError> {
    debug!(name = %name, role = %role, "register_device command");

    let config = match config {
        Some(text) => Payload::parse("config", text)?,
        None => Payload::empty_object(),
    };

    Ok(db
        .inner()
        .devices()
        .register(NewDeviceProfile { name, role, config })
        .await?)
}

/// The registered profile, if this terminal has one.
pub async fn get_active_device(db: &DbState) -> Result<Option<DeviceProfile>, ApiError> {
    Ok(db.inner().devices().get_active().await?)
}

pub async fn update_device_config(
    db: &DbState,
    id: String,
    config: String,
) -> Result<DeviceProfile, ApiError> {
    debug!(device_id = %id, "update_device_config command");
    let config = Payload::parse("config", config)?;
    Ok(db.inner().devices().update_config(&id, config).await?)
}

pub async fn mark_device_synced(db: &DbState, id: String) -> Result<DeviceProfile, ApiError> {
    debug!(device_id = %id, "mark_device_synced command");
    Ok(db.inner().devices().mark_synced(&id).await?)
}

pub async fn mark_device_failed(
    db: &DbState,
    id: String,
    error: String,
) -> Result<DeviceProfile, ApiError> {
    debug!(device_id = %id, "mark_device_failed command");
    Ok(db.inner().devices().mark_failed(&id, &error).await?)
}

pub async fn requeue_device(db: &DbState, id: String) -> Result<DeviceProfile, ApiError> {
    debug!(device_id = %id, "requeue_device command");
    Ok(db.inner().devices().requeue(&id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::db_state;
    use crate::error::ErrorCode;
    use till_core::SyncStatus;

    #[tokio::test]
    async fn test_register_once() {
        let db = db_state().await;
        let device = register_device(&db, "Till-1".to_string(), DeviceRole::Pos, None)
            .await
            .unwrap();
        assert_eq!(device.sync.status, SyncStatus::Pending);
        assert_eq!(device.config.as_str(), "{}");

        let err = register_device(&db, "Till-2".to_string(), DeviceRole::Kiosk, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        let active = get_active_device(&db).await.unwrap().unwrap();
        assert_eq!(active.id, device.id);
    }

    #[tokio::test]
    async fn test_failed_registration_upload_is_recorded() {
        let db = db_state().await;
        let device = register_device(
            &db,
            "Kitchen".to_string(),
            DeviceRole::Kds,
            Some(r#"{"screen":"grill"}"#.to_string()),
        )
        .await
        .unwrap();

        let failed = mark_device_failed(&db, device.id.clone(), "401 Unauthorized".to_string())
            .await
            .unwrap();
        assert_eq!(failed.sync.status, SyncStatus::Failed);
        assert_eq!(failed.sync.attempts, 1);

        // FAILED cannot jump to SYNCED
        let err = mark_device_synced(&db, device.id.clone()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);

        requeue_device(&db, device.id.clone()).await.unwrap();
        let synced = mark_device_synced(&db, device.id).await.unwrap();
        assert_eq!(synced.sync.status, SyncStatus::Synced);
        assert!(synced.last_sync_at.is_some());
    }

    #[tokio::test]
    async fn test_update_config() {
        let db = db_state().await;
        let device = register_device(&db, "Till-1".to_string(), DeviceRole::Pos, None)
            .await
            .unwrap();

        let updated = update_device_config(&db, device.id.clone(), r#"{"drawer":true}"#.to_string())
            .await
            .unwrap();
        assert_eq!(updated.config.as_str(), r#"{"drawer":true}"#);

        let err = update_device_config(&db, device.id, "drawer=true".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
