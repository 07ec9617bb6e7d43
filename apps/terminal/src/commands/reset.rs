//! # Reset Commands
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  clear_resync_data          clear_all_data (logout)                     │
//! │  ─────────────────          ───────────────────────                     │
//! │  [reset] business_data      every ledger                                │
//! │  session untouched          session reset once, after success           │
//! │                                                                         │
//! │  Both are all-or-nothing. On failure nothing is cleared and the         │
//! │  session is left as it was.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{info, warn};

use till_db::ResetReport;

use crate::error::ApiError;
use crate::state::{ConfigState, DbState, SessionState};

/// Empties the server-owned ledgers before they are pulled again.
pub async fn clear_resync_data(db: &DbState, config: &ConfigState) -> Result<ResetReport, ApiError> {
    let scope = config.business_data_scope();
    info!(ledgers = scope.len(), "clear_resync_data command");
    Ok(db.inner().teardown().clear(&scope).await?)
}

/// Logout: empties every ledger, then ends the session.
pub async fn clear_all_data(db: &DbState, session: &SessionState) -> Result<ResetReport, ApiError> {
    info!("clear_all_data command");

    let report = db.inner().teardown().clear_all().await.map_err(|e| {
        warn!(error = %e, "Logout teardown failed; session kept");
        ApiError::from(e)
    })?;

    session.reset();
    Ok(report)
}
