//! # Session State
//!
//! Who the terminal is acting for: the tenant, the bearer credential the
//! remote API client uses, the selected location and the device role.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   (none) ──init──► active ──select_location──► active                  │
//! │     ▲                 │                                                 │
//! │     └──── reset ──────┘   (once, after clear_all_data succeeds)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session is held in memory only; it is rebuilt by logging in again.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use till_core::validation::validate_label;
use till_core::{DeviceRole, ValidationError};

use crate::error::{ApiError, ErrorCode};

/// Everything known about the signed-in tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub tenant_domain: String,

    /// Bearer credential for the remote API. Never logged.
    pub access_token: String,

    #[serde(default)]
    pub selected_location_id: Option<String>,

    #[serde(default)]
    pub brand_id: Option<String>,

    #[serde(default)]
    pub order_mode_ids: Vec<String>,

    #[serde(default)]
    pub device_role: Option<DeviceRole>,
}

impl SessionContext {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_label("tenant_domain", &self.tenant_domain)?;
        if self.access_token.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "access_token".to_string(),
            });
        }
        if let Some(location) = &self.selected_location_id {
            validate_label("selected_location_id", location)?;
        }
        Ok(())
    }
}

/// Holder of the current session, if any.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    session: Arc<RwLock<Option<SessionContext>>>,
}

impl SessionState {
    /// Creates an empty (signed-out) session state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session. Fails if one is already active.
    pub fn init(&self, context: SessionContext) -> Result<SessionContext, ApiError> {
        context.validate()?;

        let mut slot = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(ApiError::new(
                ErrorCode::Conflict,
                "A session is already active; log out first",
            ));
        }

        info!(
            tenant = %context.tenant_domain,
            role = ?context.device_role,
            "Session started"
        );
        *slot = Some(context.clone());
        Ok(context)
    }

    /// The active session, if any.
    pub fn current(&self) -> Option<SessionContext> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The active session, or a session error.
    pub fn require(&self) -> Result<SessionContext, ApiError> {
        self.current()
            .ok_or_else(|| ApiError::session("No active session"))
    }

    /// Changes the selected location of the active session.
    pub fn select_location(&self, location_id: &str) -> Result<SessionContext, ApiError> {
        validate_label("location_id", location_id)?;

        let mut slot = self.session.write().unwrap_or_else(PoisonError::into_inner);
        let context = slot
            .as_mut()
            .ok_or_else(|| ApiError::session("No active session"))?;

        context.selected_location_id = Some(location_id.trim().to_string());
        debug!(location_id = %location_id, "Location selected");
        Ok(context.clone())
    }

    /// The location commands default to when the caller names none.
    pub fn location(&self) -> Result<String, ApiError> {
        self.require()?
            .selected_location_id
            .ok_or_else(|| ApiError::session("No location selected"))
    }

    /// Ends the session. Returns whether one was active.
    pub fn reset(&self) -> bool {
        let previous = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            info!("Session reset");
        }
        previous.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SessionContext {
        SessionContext {
            tenant_domain: "burgers.example".to_string(),
            access_token: "secret".to_string(),
            selected_location_id: None,
            brand_id: None,
            order_mode_ids: vec!["dine-in".to_string()],
            device_role: Some(DeviceRole::Pos),
        }
    }

    #[test]
    fn test_init_once() {
        let session = SessionState::new();
        assert!(session.current().is_none());

        session.init(context()).unwrap();
        let err = session.init(context()).unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_select_location_requires_session() {
        let session = SessionState::new();
        assert_eq!(
            session.select_location("L1").unwrap_err().code,
            ErrorCode::SessionError
        );

        session.init(context()).unwrap();
        assert_eq!(session.location().unwrap_err().code, ErrorCode::SessionError);

        session.select_location(" L1 ").unwrap();
        assert_eq!(session.location().unwrap(), "L1");
    }

    #[test]
    fn test_reset_then_init_again() {
        let session = SessionState::new();
        session.init(context()).unwrap();

        assert!(session.reset());
        assert!(!session.reset());
        assert!(session.current().is_none());
        assert!(session.init(context()).is_ok());
    }

    #[test]
    fn test_blank_credentials_rejected() {
        let session = SessionState::new();
        let mut bad = context();
        bad.access_token = "  ".to_string();

        assert_eq!(
            session.init(bad).unwrap_err().code,
            ErrorCode::ValidationError
        );
        assert!(session.current().is_none());
    }
}
