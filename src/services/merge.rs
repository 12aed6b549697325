use chrono::NaiveTime;
use tracing::{debug, info};

use crate::errors::{RejectionRule, SchedulingError, SchedulingResult};
use crate::models::clock;
use crate::models::slot::{AbsorbedSlot, Slot, SlotKey, SlotSpan, SlotStatus};
use crate::services::database::{RecordStatus, RecordType, ScheduleRecord};

/// The validated outcome of a merge request, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    pub court_id: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Spans of the slots absorbed by this merge, in timeline order.
    pub absorbed: Vec<AbsorbedSlot>,
    /// Sum of the absorbed slots' prices, the fallback when the caller
    /// does not set an explicit merged price.
    pub combined_price: i64,
}

impl MergePlan {
    pub fn merged_price(&self, explicit: Option<i64>) -> i64 {
        explicit.unwrap_or(self.combined_price)
    }
}

/// Validate a merge selection against the court's current timeline.
///
/// The selection must reference 2+ slots of one court, all available,
/// forming a contiguous chain once sorted by start time. References that
/// do not match the current timeline mean the caller is working from a
/// stale slot set and get a conflict, not a rejection.
pub fn plan_merge(
    court_id: &str,
    slots: &[Slot],
    selection: &[SlotSpan],
    step_minutes: u32,
) -> SchedulingResult<MergePlan> {
    if selection.len() < 2 {
        return Err(SchedulingError::MergeRejected {
            rule: RejectionRule::TooFewSlots,
            slots: selection
                .iter()
                .map(|s| SlotKey::new(court_id, s.start_time))
                .collect(),
        });
    }

    let mut ordered: Vec<&SlotSpan> = selection.iter().collect();
    ordered.sort_by_key(|s| s.start_time);

    // Resolve every reference against the current timeline
    let mut resolved: Vec<&Slot> = Vec::with_capacity(ordered.len());
    for span in &ordered {
        let Some(slot) = slots.iter().find(|s| s.start_time == span.start_time) else {
            return Err(SchedulingError::Conflict(format!(
                "no slot starts at {} on court {}, re-fetch the slot set",
                clock::format_time_of_day(span.start_time),
                court_id
            )));
        };
        if slot.end_time != span.end_time {
            return Err(SchedulingError::Conflict(format!(
                "slot at {} on court {} now ends at {}, re-fetch the slot set",
                clock::format_time_of_day(span.start_time),
                court_id,
                clock::format_time_of_day(slot.end_time)
            )));
        }
        resolved.push(slot);
    }

    let unavailable: Vec<SlotKey> = resolved
        .iter()
        .filter(|s| s.status != SlotStatus::Available)
        .map(|s| SlotKey::new(court_id, s.start_time))
        .collect();
    if !unavailable.is_empty() {
        return Err(SchedulingError::MergeRejected {
            rule: RejectionRule::NotAvailable,
            slots: unavailable,
        });
    }

    for pair in resolved.windows(2) {
        if pair[0].end_time != pair[1].start_time {
            return Err(SchedulingError::MergeRejected {
                rule: RejectionRule::NotContiguous,
                slots: vec![
                    SlotKey::new(court_id, pair[0].start_time),
                    SlotKey::new(court_id, pair[1].start_time),
                ],
            });
        }
    }

    let start_time = resolved.first().expect("two or more slots").start_time;
    let end_time = resolved.last().expect("two or more slots").end_time;

    // Guaranteed when the inputs are grid slots, checked anyway
    let duration = clock::minutes_between(start_time, end_time);
    if duration % i64::from(step_minutes) != 0 {
        return Err(SchedulingError::MergeRejected {
            rule: RejectionRule::MisalignedDuration,
            slots: resolved
                .iter()
                .map(|s| SlotKey::new(court_id, s.start_time))
                .collect(),
        });
    }

    let absorbed: Vec<AbsorbedSlot> = resolved
        .iter()
        .map(|s| AbsorbedSlot {
            start_time: s.start_time,
            end_time: s.end_time,
        })
        .collect();
    let combined_price: i64 = resolved.iter().map(|s| s.price).sum();

    debug!(
        "Merge plan for court {}: {} slots into {}-{}, combined price {}",
        court_id,
        absorbed.len(),
        clock::format_time_of_day(start_time),
        clock::format_time_of_day(end_time),
        combined_price
    );

    Ok(MergePlan {
        court_id: court_id.to_string(),
        start_time,
        end_time,
        absorbed,
        combined_price,
    })
}

/// Validate an unmerge against the merge record and the court's current
/// timeline. The record must be an active merge product and the merged
/// slot must still be available; the restored boundaries come from the
/// absorbed list persisted at merge time, never re-derived from the grid.
pub fn validate_unmerge(record: &ScheduleRecord, slots: &[Slot]) -> SchedulingResult<Vec<AbsorbedSlot>> {
    let key = SlotKey::new(&record.court_id, record.start_time);

    if record.record_type != RecordType::Merge {
        return Err(SchedulingError::UnmergeRejected {
            rule: RejectionRule::NotMerged,
            slots: vec![key],
        });
    }
    if record.status != RecordStatus::Active {
        return Err(SchedulingError::UnmergeRejected {
            rule: RejectionRule::UnknownRecord,
            slots: vec![key],
        });
    }

    // Match by span, not by slot id: a lock taken on the merged slot
    // replaces its visible id with the lock record id.
    let Some(slot) = slots
        .iter()
        .find(|s| s.start_time == record.start_time && s.end_time == record.end_time)
    else {
        // The record exists but its slot is not on the timeline, which
        // means the field configuration moved under it
        return Err(SchedulingError::Conflict(format!(
            "merged slot for record {} is not on the current timeline",
            record.record_id
        )));
    };
    if !slot.is_merged {
        return Err(SchedulingError::Conflict(format!(
            "slot for record {} is no longer a merged slot",
            record.record_id
        )));
    }

    if slot.status != SlotStatus::Available {
        return Err(SchedulingError::UnmergeRejected {
            rule: RejectionRule::NotAvailable,
            slots: vec![key],
        });
    }

    let absorbed = record.absorbed()?;
    if absorbed.len() < 2 {
        return Err(SchedulingError::UnmergeRejected {
            rule: RejectionRule::NotMerged,
            slots: vec![key],
        });
    }

    info!(
        "Unmerge of record {} will restore {} slots between {} and {}",
        record.record_id,
        absorbed.len(),
        clock::format_time_of_day(record.start_time),
        clock::format_time_of_day(record.end_time)
    );
    Ok(absorbed)
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod merge_test;
