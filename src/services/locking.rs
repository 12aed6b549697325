use chrono::NaiveTime;
use tracing::debug;

use crate::errors::{RejectionRule, SchedulingError, SchedulingResult};
use crate::models::clock;
use crate::models::slot::{LockRequest, SlotKey, SlotSetResponse, SlotStatus};
use crate::services::database::{RecordStatus, RecordType, ScheduleRecord};

/// One slot to be locked, resolved against the current timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTarget {
    pub court_id: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Validate a lock request against the current slot set.
///
/// Locking is the only mutation that may span several courts in one
/// request, for field-wide maintenance closures. The whole batch is
/// validated before anything is persisted: paid slots are rejected
/// unconditionally, already locked slots are rejected, and references
/// that miss the current timeline are conflicts.
pub fn plan_locks(
    slot_set: &SlotSetResponse,
    request: &LockRequest,
) -> SchedulingResult<Vec<LockTarget>> {
    let mut targets = Vec::new();

    for court_selection in &request.courts {
        let Some(court) = slot_set.court(&court_selection.id) else {
            return Err(SchedulingError::Conflict(format!(
                "court {} is not part of field {}",
                court_selection.id, slot_set.field_id
            )));
        };

        for span in &court_selection.time_slots {
            let key = SlotKey::new(&court_selection.id, span.start_time);

            let Some(slot) = court.slots.iter().find(|s| s.start_time == span.start_time)
            else {
                return Err(SchedulingError::Conflict(format!(
                    "no slot starts at {} on court {}, re-fetch the slot set",
                    clock::format_time_of_day(span.start_time),
                    court_selection.id
                )));
            };
            if slot.end_time != span.end_time {
                return Err(SchedulingError::Conflict(format!(
                    "slot at {} on court {} now ends at {}, re-fetch the slot set",
                    clock::format_time_of_day(span.start_time),
                    court_selection.id,
                    clock::format_time_of_day(slot.end_time)
                )));
            }

            match slot.status {
                SlotStatus::Paid => {
                    return Err(SchedulingError::LockRejected {
                        rule: RejectionRule::AlreadyPaid,
                        slots: vec![key],
                    });
                }
                SlotStatus::Locked => {
                    return Err(SchedulingError::LockRejected {
                        rule: RejectionRule::AlreadyLocked,
                        slots: vec![key],
                    });
                }
                SlotStatus::Available => {}
            }

            targets.push(LockTarget {
                court_id: court_selection.id.clone(),
                start_time: slot.start_time,
                end_time: slot.end_time,
            });
        }
    }

    if targets.is_empty() {
        return Err(SchedulingError::LockRejected {
            rule: RejectionRule::EmptySelection,
            slots: Vec::new(),
        });
    }

    debug!(
        "Lock plan for field {} on {}: {} slots",
        slot_set.field_id,
        slot_set.date,
        targets.len()
    );
    Ok(targets)
}

/// Validate an unlock batch: every record must be an active lock record
/// of this field and date, and its slot must still be locked on the
/// current timeline.
pub fn validate_unlock(
    slot_set: &SlotSetResponse,
    record_ids: &[String],
    records: &[Option<ScheduleRecord>],
) -> SchedulingResult<()> {
    if record_ids.is_empty() {
        return Err(SchedulingError::UnlockRejected {
            rule: RejectionRule::EmptySelection,
            slots: Vec::new(),
        });
    }

    for (record_id, record) in record_ids.iter().zip(records) {
        let Some(record) = record else {
            return Err(SchedulingError::UnlockRejected {
                rule: RejectionRule::UnknownRecord,
                slots: Vec::new(),
            });
        };
        let key = SlotKey::new(&record.court_id, record.start_time);

        if record.record_type != RecordType::Lock || record.status != RecordStatus::Active {
            return Err(SchedulingError::UnlockRejected {
                rule: RejectionRule::UnknownRecord,
                slots: vec![key],
            });
        }
        if record.field_id != slot_set.field_id || record.date != slot_set.date {
            return Err(SchedulingError::Conflict(format!(
                "record {} belongs to a different field or date",
                record_id
            )));
        }

        let locked = slot_set.court(&record.court_id).and_then(|court| {
            court
                .slots
                .iter()
                .find(|s| s.id.as_deref() == Some(record.record_id.as_str()))
        });
        match locked {
            Some(slot) if slot.status == SlotStatus::Locked => {}
            _ => {
                return Err(SchedulingError::UnlockRejected {
                    rule: RejectionRule::NotLocked,
                    slots: vec![key],
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "locking_test.rs"]
mod locking_test;
