use serde::Serialize;
use thiserror::Error;

use crate::models::slot::SlotKey;

// The specific precondition a rejected mutation failed. Serialized into
// error responses so the consoles can show a targeted message instead of
// a generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionRule {
    EmptySelection,
    TooFewSlots,
    MultipleCourts,
    NotContiguous,
    NotAvailable,
    AlreadyLocked,
    AlreadyPaid,
    NotLocked,
    NotMerged,
    MisalignedDuration,
    UnknownRecord,
}

impl RejectionRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionRule::EmptySelection => "selection is empty",
            RejectionRule::TooFewSlots => "merge needs at least two slots",
            RejectionRule::MultipleCourts => "selection spans more than one court",
            RejectionRule::NotContiguous => "slots are not contiguous",
            RejectionRule::NotAvailable => "slot is not available",
            RejectionRule::AlreadyLocked => "slot is already locked",
            RejectionRule::AlreadyPaid => "slot is already booked",
            RejectionRule::NotLocked => "slot is not locked",
            RejectionRule::NotMerged => "slot is not a merged slot",
            RejectionRule::MisalignedDuration => "duration is not a multiple of the booking granularity",
            RejectionRule::UnknownRecord => "no such schedule record",
        }
    }
}

/// Error taxonomy for the scheduling engine and its service surface.
///
/// Configuration problems belong to the venue owner tooling and are never
/// silently corrected. Rejections carry the failed rule and the offending
/// slots so callers can surface a specific message. Conflicts mean the
/// caller's view of the slot set is stale and must be re-fetched.
#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("schedule configuration invalid: {0}")]
    Configuration(String),

    #[error("merge rejected: {}", .rule.as_str())]
    MergeRejected {
        rule: RejectionRule,
        slots: Vec<SlotKey>,
    },

    #[error("unmerge rejected: {}", .rule.as_str())]
    UnmergeRejected {
        rule: RejectionRule,
        slots: Vec<SlotKey>,
    },

    #[error("lock rejected: {}", .rule.as_str())]
    LockRejected {
        rule: RejectionRule,
        slots: Vec<SlotKey>,
    },

    #[error("unlock rejected: {}", .rule.as_str())]
    UnlockRejected {
        rule: RejectionRule,
        slots: Vec<SlotKey>,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("platform api error: {0}")]
    PlatformApi(String),

    #[error("store error: {0}")]
    Store(String),
}

impl SchedulingError {
    /// The failed rule, for rejection variants.
    pub fn rule(&self) -> Option<RejectionRule> {
        match self {
            SchedulingError::MergeRejected { rule, .. }
            | SchedulingError::UnmergeRejected { rule, .. }
            | SchedulingError::LockRejected { rule, .. }
            | SchedulingError::UnlockRejected { rule, .. } => Some(*rule),
            _ => None,
        }
    }

    /// The slots a rejection refers to, empty for non-rejection errors.
    pub fn slots(&self) -> &[SlotKey] {
        match self {
            SchedulingError::MergeRejected { slots, .. }
            | SchedulingError::UnmergeRejected { slots, .. }
            | SchedulingError::LockRejected { slots, .. }
            | SchedulingError::UnlockRejected { slots, .. } => slots,
            _ => &[],
        }
    }
}

pub type SchedulingResult<T> = Result<T, SchedulingError>;
