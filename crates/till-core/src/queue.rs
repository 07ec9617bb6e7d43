//! # Queue Tokens
//!
//! Numbered service tokens shown on the queue display.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   issue ──► WAITING ── call ──► CALLED ── serve ──► SERVED             │
//! │                                                                         │
//! │   Forward only. CALLED → WAITING and anything out of SERVED are        │
//! │   rejected. created_at ≤ called_at ≤ served_at always holds.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Numbering
//! Token numbers count up from 1 per `(location, epoch)`. The epoch key is
//! `<base>#<generation>`: the base comes from the [`EpochPolicy`] (a local
//! calendar day, or a fixed key for manual numbering) and the generation is
//! bumped when an operator restarts numbering for a location.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{TransitionError, ValidationError};
use crate::types::DeviceRole;
use crate::validation::{validate_label, ValidationResult};

// =============================================================================
// Queue Status
// =============================================================================

/// Ordered by progress: `WAITING < CALLED < SERVED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Waiting,
    Called,
    Served,
}

impl QueueStatus {
    pub const ALL: [QueueStatus; 3] = [QueueStatus::Waiting, QueueStatus::Called, QueueStatus::Served];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Waiting => "WAITING",
            QueueStatus::Called => "CALLED",
            QueueStatus::Served => "SERVED",
        }
    }

    /// The only status a token may move to from this one.
    pub fn next(&self) -> Option<QueueStatus> {
        match self {
            QueueStatus::Waiting => Some(QueueStatus::Called),
            QueueStatus::Called => Some(QueueStatus::Served),
            QueueStatus::Served => None,
        }
    }

    /// The status a token must be in to move to `self`.
    pub fn previous(&self) -> Option<QueueStatus> {
        QueueStatus::ALL.into_iter().find(|s| s.next() == Some(*self))
    }

    #[inline]
    pub fn can_advance_to(&self, target: QueueStatus) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueueStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: QueueStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

// =============================================================================
// Queue Token
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct QueueToken {
    pub id: String,

    /// Weak reference to the ticket this token was issued for.
    pub ticket_id: String,

    /// Display form of the ticket number, e.g. `A-100`.
    pub ticket_number: String,

    pub token_number: i64,
    pub status: QueueStatus,

    /// Kind of terminal that issued the token.
    pub source: DeviceRole,

    pub location_id: String,
    pub order_mode: String,

    /// Numbering epoch the token number belongs to.
    pub epoch: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub called_at: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    pub served_at: Option<DateTime<Utc>>,
}

impl QueueToken {
    /// Moves the token one step forward, stamping the matching timestamp.
    ///
    /// The stamp is clamped so it never precedes an earlier stamp, even if the
    /// wall clock stepped backwards.
    pub fn advance_to(&mut self, target: QueueStatus, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if !self.status.can_advance_to(target) {
            return Err(TransitionError::new("QueueToken", self.status, target));
        }

        let floor = self.called_at.unwrap_or(self.created_at).max(self.created_at);
        let stamp = now.max(floor);

        match target {
            QueueStatus::Called => self.called_at = Some(stamp),
            QueueStatus::Served => self.served_at = Some(stamp),
            QueueStatus::Waiting => {}
        }

        self.status = target;
        Ok(())
    }

    /// Checks a token received from elsewhere before it is stored.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_label("id", &self.id)?;
        validate_label("ticket_id", &self.ticket_id)?;
        validate_label("ticket_number", &self.ticket_number)?;
        validate_label("location_id", &self.location_id)?;
        validate_label("order_mode", &self.order_mode)?;
        validate_label("epoch", &self.epoch)?;

        if self.token_number < 1 {
            return Err(ValidationError::OutOfRange {
                field: "token_number".to_string(),
                min: 1,
                max: i64::MAX,
            });
        }

        let called_expected = self.status != QueueStatus::Waiting;
        let served_expected = self.status == QueueStatus::Served;
        if self.called_at.is_some() != called_expected {
            return Err(ValidationError::inconsistent(
                "called_at",
                format!("must be {} for a {} token", presence(called_expected), self.status),
            ));
        }
        if self.served_at.is_some() != served_expected {
            return Err(ValidationError::inconsistent(
                "served_at",
                format!("must be {} for a {} token", presence(served_expected), self.status),
            ));
        }

        if let Some(called_at) = self.called_at {
            if called_at < self.created_at {
                return Err(ValidationError::inconsistent("called_at", "precedes created_at"));
            }
            if let Some(served_at) = self.served_at {
                if served_at < called_at {
                    return Err(ValidationError::inconsistent("served_at", "precedes called_at"));
                }
            }
        }

        Ok(())
    }
}

fn presence(expected: bool) -> &'static str {
    if expected {
        "set"
    } else {
        "absent"
    }
}

/// Caller input for `issue`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewQueueToken {
    pub ticket_id: String,
    pub ticket_number: String,
    pub location_id: String,
    pub order_mode: String,
    pub source: DeviceRole,
}

impl NewQueueToken {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_label("ticket_id", &self.ticket_id)?;
        validate_label("ticket_number", &self.ticket_number)?;
        validate_label("location_id", &self.location_id)?;
        validate_label("order_mode", &self.order_mode)
    }
}

// =============================================================================
// Numbering Epochs
// =============================================================================

/// When token numbering starts over at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochPolicy {
    /// A new epoch every local calendar day.
    Daily {
        /// Offset of the store's local time from UTC.
        utc_offset_minutes: i32,
    },
    /// Only an explicit operator restart begins a new epoch.
    Manual,
}

impl EpochPolicy {
    /// The policy-derived part of the epoch key at `now`.
    pub fn base_key(&self, now: DateTime<Utc>) -> String {
        match self {
            EpochPolicy::Daily { utc_offset_minutes } => {
                let local = now + chrono::Duration::minutes(i64::from(*utc_offset_minutes));
                local.format("%Y-%m-%d").to_string()
            }
            EpochPolicy::Manual => "manual".to_string(),
        }
    }

    /// Full epoch key for a location whose operator generation is `generation`.
    pub fn epoch_key(&self, now: DateTime<Utc>, generation: i64) -> String {
        format!("{}#{}", self.base_key(now), generation)
    }
}

impl Default for EpochPolicy {
    fn default() -> Self {
        EpochPolicy::Daily {
            utc_offset_minutes: 0,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn token(status: QueueStatus) -> QueueToken {
        QueueToken {
            id: "q1".to_string(),
            ticket_id: "t1".to_string(),
            ticket_number: "A-100".to_string(),
            token_number: 1,
            status,
            source: DeviceRole::Pos,
            location_id: "L1".to_string(),
            order_mode: "dine-in".to_string(),
            epoch: "2026-10-15#0".to_string(),
            created_at: Utc::now(),
            called_at: None,
            served_at: None,
        }
    }

    #[test]
    fn test_forward_only() {
        let mut t = token(QueueStatus::Waiting);
        assert!(t.advance_to(QueueStatus::Served, Utc::now()).is_err());

        t.advance_to(QueueStatus::Called, Utc::now()).unwrap();
        assert!(t.advance_to(QueueStatus::Waiting, Utc::now()).is_err());
        assert!(t.advance_to(QueueStatus::Called, Utc::now()).is_err());

        t.advance_to(QueueStatus::Served, Utc::now()).unwrap();
        for target in QueueStatus::ALL {
            let err = t.advance_to(target, Utc::now()).unwrap_err();
            assert_eq!(err.from, "SERVED");
        }
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_stamps_are_causally_ordered_under_clock_skew() {
        let mut t = token(QueueStatus::Waiting);
        let created = t.created_at;

        t.advance_to(QueueStatus::Called, created - chrono::Duration::minutes(5))
            .unwrap();
        let called = t.called_at.unwrap();
        assert!(called >= created);

        t.advance_to(QueueStatus::Served, created - chrono::Duration::minutes(10))
            .unwrap();
        assert!(t.served_at.unwrap() >= called);
    }

    #[test]
    fn test_validate_rejects_inconsistent_stamps() {
        let mut t = token(QueueStatus::Called);
        assert!(t.validate().is_err());

        t.called_at = Some(t.created_at);
        assert!(t.validate().is_ok());

        t.served_at = Some(t.created_at);
        assert!(t.validate().is_err());

        let mut t = token(QueueStatus::Served);
        t.called_at = Some(t.created_at + chrono::Duration::seconds(10));
        t.served_at = Some(t.created_at + chrono::Duration::seconds(5));
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_previous_and_next() {
        assert_eq!(QueueStatus::Called.previous(), Some(QueueStatus::Waiting));
        assert_eq!(QueueStatus::Served.previous(), Some(QueueStatus::Called));
        assert_eq!(QueueStatus::Waiting.previous(), None);
        assert_eq!(QueueStatus::Served.next(), None);
    }

    #[test]
    fn test_daily_epoch_uses_local_day() {
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 22, 30, 0).unwrap();
        let utc = EpochPolicy::Daily {
            utc_offset_minutes: 0,
        };
        let plus_five = EpochPolicy::Daily {
            utc_offset_minutes: 300,
        };
        assert_eq!(utc.epoch_key(now, 0), "2026-10-15#0");
        assert_eq!(plus_five.epoch_key(now, 2), "2026-10-16#2");
        assert_eq!(EpochPolicy::Manual.epoch_key(now, 3), "manual#3");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("called".parse::<QueueStatus>().unwrap(), QueueStatus::Called);
        assert!("DONE".parse::<QueueStatus>().is_err());
    }
}
