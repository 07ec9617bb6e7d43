//! # Sync Status Machine
//!
//! State, attempt and error tracking shared by tickets and device profiles.
//!
//! ## Edges
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Staged flow (tickets)                                                  │
//! │                                                                         │
//! │             Start                Succeed                                │
//! │  PENDING ──────────► SYNCING ──────────────► SYNCED  (terminal)        │
//! │     ▲                 │    ▲                                            │
//! │     │           Fail  │    │ Start                                      │
//! │     │                 ▼    │                                            │
//! │     └───── Requeue ── FAILED                                            │
//! │                                                                         │
//! │  Atomic flow (device profiles): no SYNCING                              │
//! │                                                                         │
//! │  PENDING ── Succeed ──► SYNCED                                          │
//! │  PENDING ── Fail ─────► FAILED ── Requeue ──► PENDING                   │
//! │                                                                         │
//! │  Every edge into FAILED increments `attempts` and records the error.   │
//! │  Nothing decrements `attempts`.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests that match no edge return a [`TransitionError`] and leave the
//! state untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use ts_rs::TS;

use crate::error::{TransitionError, ValidationError};
use crate::validation::{normalize_sync_error, ValidationResult};

// =============================================================================
// Sync Status
// =============================================================================

/// Whether an entity has been transmitted to and confirmed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    /// Not yet attempted.
    Pending,
    /// Attempt in flight.
    Syncing,
    /// Confirmed by the server.
    Synced,
    /// Last attempt failed or was rejected.
    Failed,
}

impl SyncStatus {
    pub const ALL: [SyncStatus; 4] = [
        SyncStatus::Pending,
        SyncStatus::Syncing,
        SyncStatus::Synced,
        SyncStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "PENDING",
            SyncStatus::Syncing => "SYNCING",
            SyncStatus::Synced => "SYNCED",
            SyncStatus::Failed => "FAILED",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Pending
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: SyncStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

// =============================================================================
// Flows and Events
// =============================================================================

/// Which edge set an entity uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFlow {
    /// PENDING/FAILED → SYNCING → SYNCED/FAILED. Used by tickets.
    Staged,
    /// A single remote call: PENDING → SYNCED/FAILED. Used by device profiles.
    Atomic,
}

/// A requested status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// An upload attempt started.
    Start,
    /// The server confirmed the entity.
    Succeed,
    /// The attempt failed with the given message.
    Fail(String),
    /// The caller re-queues a failed entity.
    Requeue,
}

impl SyncEvent {
    /// Builds a `Fail` event with a trimmed, bounded, non-empty message.
    pub fn fail(message: &str) -> ValidationResult<Self> {
        Ok(SyncEvent::Fail(normalize_sync_error(message)?))
    }

    /// The status this event asks for.
    pub fn requested_status(&self) -> SyncStatus {
        match self {
            SyncEvent::Start => SyncStatus::Syncing,
            SyncEvent::Succeed => SyncStatus::Synced,
            SyncEvent::Fail(_) => SyncStatus::Failed,
            SyncEvent::Requeue => SyncStatus::Pending,
        }
    }
}

impl SyncFlow {
    /// Looks up the edge for `event` out of `from`, if one is declared.
    pub fn target(&self, from: SyncStatus, event: &SyncEvent) -> Option<SyncStatus> {
        use SyncStatus::*;

        match (self, from, event) {
            (SyncFlow::Staged, Pending | Failed, SyncEvent::Start) => Some(Syncing),
            (SyncFlow::Staged, Syncing, SyncEvent::Succeed) => Some(Synced),
            (SyncFlow::Staged, Syncing, SyncEvent::Fail(_)) => Some(Failed),
            (SyncFlow::Atomic, Pending, SyncEvent::Succeed) => Some(Synced),
            (SyncFlow::Atomic, Pending, SyncEvent::Fail(_)) => Some(Failed),
            (_, Failed, SyncEvent::Requeue) => Some(Pending),
            _ => None,
        }
    }
}

// =============================================================================
// Sync State
// =============================================================================

/// Sync bookkeeping embedded in a ticket or device profile.
///
/// ## Invariants
/// - `synced_at` is set if and only if `status` is SYNCED
/// - `attempts` never decreases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SyncState {
    #[cfg_attr(feature = "sqlx", sqlx(rename = "sync_status"))]
    pub status: SyncStatus,

    #[cfg_attr(feature = "sqlx", sqlx(rename = "sync_attempts"))]
    pub attempts: i64,

    #[cfg_attr(feature = "sqlx", sqlx(rename = "sync_error"))]
    pub last_error: Option<String>,

    #[ts(as = "Option<String>")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl SyncState {
    /// A fresh state: PENDING, no attempts, no error.
    pub fn new() -> Self {
        SyncState {
            status: SyncStatus::Pending,
            attempts: 0,
            last_error: None,
            synced_at: None,
        }
    }

    /// Applies `event` along `flow`.
    ///
    /// ## Returns
    /// * `Ok(())` - the state moved along a declared edge
    /// * `Err(TransitionError)` - no such edge; `self` is unchanged
    ///
    /// ## Example
    /// ```rust
    /// use chrono::Utc;
    /// use till_core::{SyncEvent, SyncFlow, SyncState, SyncStatus};
    ///
    /// let mut state = SyncState::new();
    /// state.apply("Ticket", SyncFlow::Staged, SyncEvent::Start, Utc::now()).unwrap();
    /// assert_eq!(state.status, SyncStatus::Syncing);
    ///
    /// // PENDING → SYNCED skips the in-flight state and is refused for tickets
    /// let mut other = SyncState::new();
    /// assert!(other.apply("Ticket", SyncFlow::Staged, SyncEvent::Succeed, Utc::now()).is_err());
    /// ```
    pub fn apply(
        &mut self,
        entity: &str,
        flow: SyncFlow,
        event: SyncEvent,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        let target = flow
            .target(self.status, &event)
            .ok_or_else(|| TransitionError::new(entity, self.status, event.requested_status()))?;

        match event {
            SyncEvent::Succeed => {
                self.synced_at = Some(now);
                self.last_error = None;
            }
            SyncEvent::Fail(message) => {
                self.attempts = self.attempts.saturating_add(1);
                self.last_error = Some(message);
            }
            SyncEvent::Start | SyncEvent::Requeue => {}
        }

        self.status = target;
        Ok(())
    }

    /// Checks the stored invariants (used on records received from callers).
    pub fn is_consistent(&self) -> bool {
        self.attempts >= 0 && (self.status == SyncStatus::Synced) == self.synced_at.is_some()
    }
}

impl Default for SyncState {
    fn default() -> Self {
        SyncState::new()
    }
}

/// Per-status counts for a ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncStats {
    pub pending: i64,
    pub syncing: i64,
    pub synced: i64,
    pub failed: i64,
}

impl SyncStats {
    pub fn record(&mut self, status: SyncStatus, count: i64) {
        match status {
            SyncStatus::Pending => self.pending += count,
            SyncStatus::Syncing => self.syncing += count,
            SyncStatus::Synced => self.synced += count,
            SyncStatus::Failed => self.failed += count,
        }
    }

    /// Entities the server has not confirmed yet.
    pub fn outstanding(&self) -> i64 {
        self.pending + self.syncing + self.failed
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Tunable parameters an external retry scheduler applies to ledger state.
///
/// The engine never schedules anything itself; these values only shape the
/// "what is due?" queries it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Give up after this many failed attempts. `0` means never give up.
    pub max_attempts: u32,
    /// Minimum time between a failure and the next attempt.
    pub retry_interval: Duration,
    /// A SYNCING entity untouched for this long is presumed abandoned.
    pub stale_after: Duration,
}

impl SyncPolicy {
    /// Whether `state` still has attempts left under this policy.
    pub fn has_budget(&self, state: &SyncState) -> bool {
        self.max_attempts == 0 || state.attempts < i64::from(self.max_attempts)
    }

    /// Whether a FAILED entity last touched at `updated_at` may be retried now.
    pub fn retry_due(&self, state: &SyncState, updated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        state.status == SyncStatus::Failed
            && self.has_budget(state)
            && elapsed_at_least(updated_at, now, self.retry_interval)
    }

    /// Whether a SYNCING entity last touched at `updated_at` looks abandoned.
    pub fn is_stale(&self, state: &SyncState, updated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        state.status == SyncStatus::Syncing && elapsed_at_least(updated_at, now, self.stale_after)
    }

    /// The `updated_at` cutoff for FAILED entities that are due again.
    pub fn retry_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        cutoff(now, self.retry_interval)
    }

    /// The `updated_at` cutoff for stale SYNCING entities.
    pub fn stale_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        cutoff(now, self.stale_after)
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        SyncPolicy {
            max_attempts: 10,
            retry_interval: Duration::from_secs(30),
            stale_after: Duration::from_secs(120),
        }
    }
}

fn cutoff(now: DateTime<Utc>, age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn elapsed_at_least(since: DateTime<Utc>, now: DateTime<Utc>, interval: Duration) -> bool {
    now.signed_duration_since(since)
        .to_std()
        .map_or(interval.is_zero(), |elapsed| elapsed >= interval)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(state: &mut SyncState, event: SyncEvent) -> Result<(), TransitionError> {
        state.apply("Ticket", SyncFlow::Staged, event, Utc::now())
    }

    fn atomic(state: &mut SyncState, event: SyncEvent) -> Result<(), TransitionError> {
        state.apply("DeviceProfile", SyncFlow::Atomic, event, Utc::now())
    }

    #[test]
    fn test_new_state() {
        let state = SyncState::new();
        assert_eq!(state.status, SyncStatus::Pending);
        assert_eq!(state.attempts, 0);
        assert!(state.last_error.is_none());
        assert!(state.synced_at.is_none());
        assert!(state.is_consistent());
    }

    #[test]
    fn test_staged_happy_path_with_one_failure() {
        let mut state = SyncState::new();

        staged(&mut state, SyncEvent::Start).unwrap();
        assert_eq!(state.status, SyncStatus::Syncing);

        staged(&mut state, SyncEvent::fail("network timeout").unwrap()).unwrap();
        assert_eq!(state.status, SyncStatus::Failed);
        assert_eq!(state.attempts, 1);
        assert_eq!(state.last_error.as_deref(), Some("network timeout"));

        staged(&mut state, SyncEvent::Start).unwrap();
        assert_eq!(state.status, SyncStatus::Syncing);

        staged(&mut state, SyncEvent::Succeed).unwrap();
        assert_eq!(state.status, SyncStatus::Synced);
        assert!(state.synced_at.is_some());
        assert!(state.last_error.is_none());
        assert_eq!(state.attempts, 1);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_synced_is_terminal() {
        let mut state = SyncState::new();
        staged(&mut state, SyncEvent::Start).unwrap();
        staged(&mut state, SyncEvent::Succeed).unwrap();
        let before = state.clone();

        for event in [
            SyncEvent::Start,
            SyncEvent::Succeed,
            SyncEvent::Fail("late".to_string()),
            SyncEvent::Requeue,
        ] {
            let err = staged(&mut state, event).unwrap_err();
            assert_eq!(err.from, "SYNCED");
        }
        assert_eq!(state, before);
    }

    #[test]
    fn test_staged_rejects_undeclared_edges() {
        let mut state = SyncState::new();
        assert!(staged(&mut state, SyncEvent::Succeed).is_err());
        assert!(staged(&mut state, SyncEvent::Fail("x".to_string())).is_err());
        assert!(staged(&mut state, SyncEvent::Requeue).is_err());

        staged(&mut state, SyncEvent::Start).unwrap();
        assert!(staged(&mut state, SyncEvent::Start).is_err());
        assert!(staged(&mut state, SyncEvent::Requeue).is_err());
        assert_eq!(state.status, SyncStatus::Syncing);
    }

    #[test]
    fn test_attempts_survive_requeue() {
        let mut state = SyncState::new();
        for n in 1..=3 {
            staged(&mut state, SyncEvent::Start).unwrap();
            staged(&mut state, SyncEvent::Fail(format!("attempt {n}"))).unwrap();
            assert_eq!(state.attempts, n);
            staged(&mut state, SyncEvent::Requeue).unwrap();
            assert_eq!(state.status, SyncStatus::Pending);
            assert_eq!(state.attempts, n);
        }
    }

    #[test]
    fn test_atomic_flow() {
        let mut state = SyncState::new();
        let err = atomic(&mut state, SyncEvent::Start).unwrap_err();
        assert_eq!(err.to.as_str(), "SYNCING");

        atomic(&mut state, SyncEvent::Fail("rejected".to_string())).unwrap();
        assert_eq!(state.status, SyncStatus::Failed);
        assert_eq!(state.attempts, 1);

        assert!(atomic(&mut state, SyncEvent::Succeed).is_err());
        atomic(&mut state, SyncEvent::Requeue).unwrap();
        atomic(&mut state, SyncEvent::Succeed).unwrap();
        assert_eq!(state.status, SyncStatus::Synced);
        assert!(state.synced_at.is_some());
    }

    #[test]
    fn test_fail_event_requires_message() {
        assert!(SyncEvent::fail("   ").is_err());
        assert_eq!(
            SyncEvent::fail("  boom ").unwrap(),
            SyncEvent::Fail("boom".to_string())
        );
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("failed".parse::<SyncStatus>().unwrap(), SyncStatus::Failed);
        assert!("DONE".parse::<SyncStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&SyncStatus::Syncing).unwrap(),
            "\"SYNCING\""
        );
    }

    #[test]
    fn test_policy_budget_and_due() {
        let policy = SyncPolicy {
            max_attempts: 2,
            retry_interval: Duration::from_secs(60),
            stale_after: Duration::from_secs(300),
        };
        let now = Utc::now();
        let mut state = SyncState::new();
        staged(&mut state, SyncEvent::Start).unwrap();
        staged(&mut state, SyncEvent::Fail("x".to_string())).unwrap();

        assert!(!policy.retry_due(&state, now, now));
        assert!(policy.retry_due(&state, now - chrono::Duration::seconds(61), now));

        staged(&mut state, SyncEvent::Start).unwrap();
        assert!(policy.is_stale(&state, now - chrono::Duration::seconds(301), now));
        assert!(!policy.is_stale(&state, now, now));

        staged(&mut state, SyncEvent::Fail("y".to_string())).unwrap();
        assert!(!policy.has_budget(&state));
        assert!(!policy.retry_due(&state, now - chrono::Duration::hours(1), now));

        let unlimited = SyncPolicy {
            max_attempts: 0,
            ..policy
        };
        assert!(unlimited.has_budget(&state));
    }
}
