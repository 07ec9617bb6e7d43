//! # Device Profiles
//!
//! The terminal's own registered identity. At most one profile is active per
//! installation and its role never changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::sync::SyncState;
use crate::types::{DeviceRole, Payload};
use crate::validation::{validate_label, ValidationResult};

/// The registered identity of this terminal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DeviceProfile {
    pub id: String,
    pub name: String,
    pub role: DeviceRole,

    /// Device configuration as the setup screen serialized it.
    pub config: Payload,

    /// Registration sync. Never enters SYNCING.
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub sync: SyncState,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// When the registration was last confirmed by the server.
    #[ts(as = "Option<String>")]
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl DeviceProfile {
    /// Stamps `updated_at`, never moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.updated_at).max(self.created_at);
    }
}

/// Caller input for `register`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewDeviceProfile {
    pub name: String,
    pub role: DeviceRole,
    #[serde(default = "Payload::empty_object")]
    pub config: Payload,
}

impl NewDeviceProfile {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_label("name", &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_defaults_config() {
        let new: NewDeviceProfile =
            serde_json::from_str(r#"{"name":"Till-1","role":"POS"}"#).unwrap();
        assert_eq!(new.role, DeviceRole::Pos);
        assert_eq!(new.config.as_str(), "{}");
        assert!(new.validate().is_ok());
    }

    #[test]
    fn test_new_profile_requires_name() {
        let new = NewDeviceProfile {
            name: "".to_string(),
            role: DeviceRole::Kds,
            config: Payload::empty_object(),
        };
        assert!(new.validate().is_err());
    }
}
