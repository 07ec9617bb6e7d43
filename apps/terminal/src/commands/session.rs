//! # Session Commands
//!
//! Login hands the session to the terminal; logout is `clear_all_data`.

use tracing::debug;

use crate::error::ApiError;
use crate::state::{SessionContext, SessionState};

/// Starts a session after the UI has authenticated against the server.
pub fn init_session(session: &SessionState, context: SessionContext) -> Result<SessionContext, ApiError> {
    debug!(tenant = %context.tenant_domain, "init_session command");
    session.init(context)
}

pub fn get_session(session: &SessionState) -> Option<SessionContext> {
    session.current()
}

/// Selects the location that queue commands default to.
pub fn select_location(session: &SessionState, location_id: String) -> Result<SessionContext, ApiError> {
    debug!(location_id = %location_id, "select_location command");
    session.select_location(&location_id)
}
