use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};

use crate::errors::{RejectionRule, SchedulingError, SchedulingResult};
use crate::models::slot::{
    LockCourtSelection, LockRequest, MergeCourtSelection, MergeRequest, SlotKey, SlotSpan,
    SlotStatus, UnlockRequest,
};

/// One picked slot, as much of it as the consoles know when the user
/// clicks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEntry {
    pub key: SlotKey,
    pub end_time: NaiveTime,
    pub status: SlotStatus,
    /// Persisted record id for merged or locked slots.
    pub record_id: Option<String>,
}

impl SelectionEntry {
    pub fn new(
        court_id: &str,
        start_time: NaiveTime,
        end_time: NaiveTime,
        status: SlotStatus,
        record_id: Option<String>,
    ) -> Self {
        Self {
            key: SlotKey::new(court_id, start_time),
            end_time,
            status,
            record_id,
        }
    }
}

/// A user's tentative multi-slot pick, validated before a mutation
/// request is built.
///
/// The value is immutable: `add`, `remove` and `clear` return a new
/// selection, so no view component can mutate another's state behind its
/// back. Entries are keyed by court id plus start time, which is unique
/// within a date. These checks run client-side to short-circuit bad
/// requests, and the store-side handlers repeat every one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    entries: BTreeMap<SlotKey, SelectionEntry>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, entry: SelectionEntry) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(entry.key.clone(), entry);
        Self { entries }
    }

    pub fn remove(&self, key: &SlotKey) -> Self {
        let mut entries = self.entries.clone();
        entries.remove(key);
        Self { entries }
    }

    pub fn clear(&self) -> Self {
        Self::new()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &SlotKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Entries in court then start-time order.
    pub fn entries(&self) -> impl Iterator<Item = &SelectionEntry> {
        self.entries.values()
    }

    fn court_ids(&self) -> Vec<&str> {
        let mut courts: Vec<&str> = self
            .entries
            .values()
            .map(|e| e.key.court_id.as_str())
            .collect();
        courts.dedup();
        courts
    }

    /// Check the preconditions for a merge: exactly one court, two or
    /// more slots, all available, contiguous once sorted by start time.
    pub fn validate_for_merge(&self) -> SchedulingResult<()> {
        if self.entries.is_empty() {
            return Err(SchedulingError::MergeRejected {
                rule: RejectionRule::EmptySelection,
                slots: Vec::new(),
            });
        }

        let courts = self.court_ids();
        if courts.len() > 1 {
            return Err(SchedulingError::MergeRejected {
                rule: RejectionRule::MultipleCourts,
                slots: self.entries.keys().cloned().collect(),
            });
        }

        if self.entries.len() < 2 {
            return Err(SchedulingError::MergeRejected {
                rule: RejectionRule::TooFewSlots,
                slots: self.entries.keys().cloned().collect(),
            });
        }

        let unavailable: Vec<SlotKey> = self
            .entries
            .values()
            .filter(|e| e.status != SlotStatus::Available)
            .map(|e| e.key.clone())
            .collect();
        if !unavailable.is_empty() {
            return Err(SchedulingError::MergeRejected {
                rule: RejectionRule::NotAvailable,
                slots: unavailable,
            });
        }

        // BTreeMap iteration is already sorted by start time within the
        // single court
        let ordered: Vec<&SelectionEntry> = self.entries.values().collect();
        for pair in ordered.windows(2) {
            if pair[0].end_time != pair[1].key.start_time {
                return Err(SchedulingError::MergeRejected {
                    rule: RejectionRule::NotContiguous,
                    slots: vec![pair[0].key.clone(), pair[1].key.clone()],
                });
            }
        }

        Ok(())
    }

    /// Check the preconditions for a lock: non-empty and no slot already
    /// paid. Locks may span courts.
    pub fn validate_for_lock(&self) -> SchedulingResult<()> {
        if self.entries.is_empty() {
            return Err(SchedulingError::LockRejected {
                rule: RejectionRule::EmptySelection,
                slots: Vec::new(),
            });
        }

        let paid: Vec<SlotKey> = self
            .entries
            .values()
            .filter(|e| e.status == SlotStatus::Paid)
            .map(|e| e.key.clone())
            .collect();
        if !paid.is_empty() {
            return Err(SchedulingError::LockRejected {
                rule: RejectionRule::AlreadyPaid,
                slots: paid,
            });
        }

        let locked: Vec<SlotKey> = self
            .entries
            .values()
            .filter(|e| e.status == SlotStatus::Locked)
            .map(|e| e.key.clone())
            .collect();
        if !locked.is_empty() {
            return Err(SchedulingError::LockRejected {
                rule: RejectionRule::AlreadyLocked,
                slots: locked,
            });
        }

        Ok(())
    }

    /// Check the preconditions for an unlock: non-empty and every slot
    /// currently locked.
    pub fn validate_for_unlock(&self) -> SchedulingResult<()> {
        if self.entries.is_empty() {
            return Err(SchedulingError::UnlockRejected {
                rule: RejectionRule::EmptySelection,
                slots: Vec::new(),
            });
        }

        let not_locked: Vec<SlotKey> = self
            .entries
            .values()
            .filter(|e| e.status != SlotStatus::Locked)
            .map(|e| e.key.clone())
            .collect();
        if !not_locked.is_empty() {
            return Err(SchedulingError::UnlockRejected {
                rule: RejectionRule::NotLocked,
                slots: not_locked,
            });
        }

        Ok(())
    }

    /// Build the merge request for this selection after validation.
    pub fn to_merge_request(
        &self,
        date: NaiveDate,
        field_id: &str,
        price: Option<i64>,
    ) -> SchedulingResult<MergeRequest> {
        self.validate_for_merge()?;

        let court_id = self.court_ids()[0].to_string();
        let time_slots: Vec<SlotSpan> = self
            .entries
            .values()
            .map(|e| SlotSpan {
                id: e.record_id.clone(),
                start_time: e.key.start_time,
                end_time: e.end_time,
            })
            .collect();

        Ok(MergeRequest {
            date,
            field_id: field_id.to_string(),
            courts: vec![MergeCourtSelection {
                id: court_id,
                time_slots,
            }],
            price,
        })
    }

    /// Build the lock request for this selection after validation,
    /// grouping slots per court.
    pub fn to_lock_request(&self, date: NaiveDate, field_id: &str) -> SchedulingResult<LockRequest> {
        self.validate_for_lock()?;

        let mut courts: Vec<LockCourtSelection> = Vec::new();
        for entry in self.entries.values() {
            let span = SlotSpan {
                id: entry.record_id.clone(),
                start_time: entry.key.start_time,
                end_time: entry.end_time,
            };
            match courts.iter_mut().find(|c| c.id == entry.key.court_id) {
                Some(court) => court.time_slots.push(span),
                None => courts.push(LockCourtSelection {
                    id: entry.key.court_id.clone(),
                    time_slots: vec![span],
                }),
            }
        }

        Ok(LockRequest {
            date,
            field_id: field_id.to_string(),
            courts,
        })
    }

    /// Build the unlock request for this selection after validation.
    /// Every locked slot carries its lock record id on the timeline.
    pub fn to_unlock_request(
        &self,
        date: NaiveDate,
        field_id: &str,
    ) -> SchedulingResult<UnlockRequest> {
        self.validate_for_unlock()?;

        let mut record_ids = Vec::with_capacity(self.entries.len());
        for entry in self.entries.values() {
            let Some(record_id) = &entry.record_id else {
                return Err(SchedulingError::UnlockRejected {
                    rule: RejectionRule::UnknownRecord,
                    slots: vec![entry.key.clone()],
                });
            };
            record_ids.push(record_id.clone());
        }

        Ok(UnlockRequest {
            date,
            field_id: field_id.to_string(),
            record_ids,
        })
    }
}

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;
