use crate::errors::{RejectionRule, SchedulingError};
use crate::models::slot::{SlotKey, SlotStatus};
use crate::services::selection::{Selection, SelectionEntry};
use crate::tests::common::fixtures::{monday, t};

fn entry(court: &str, start: (u32, u32), end: (u32, u32), status: SlotStatus) -> SelectionEntry {
    SelectionEntry::new(court, t(start.0, start.1), t(end.0, end.1), status, None)
}

#[test]
fn test_add_remove_clear_return_new_values() {
    let empty = Selection::new();
    let one = empty.add(entry("court-1", (6, 0), (6, 30), SlotStatus::Available));
    let two = one.add(entry("court-1", (6, 30), (7, 0), SlotStatus::Available));

    // The originals are untouched
    assert!(empty.is_empty());
    assert_eq!(one.len(), 1);
    assert_eq!(two.len(), 2);

    let key = SlotKey::new("court-1", t(6, 0));
    let removed = two.remove(&key);
    assert_eq!(removed.len(), 1);
    assert!(!removed.contains(&key));
    assert_eq!(two.len(), 2);

    assert!(two.clear().is_empty());
}

#[test]
fn test_adding_same_slot_twice_keeps_one_entry() {
    let selection = Selection::new()
        .add(entry("court-1", (6, 0), (6, 30), SlotStatus::Available))
        .add(entry("court-1", (6, 0), (6, 30), SlotStatus::Available));
    assert_eq!(selection.len(), 1);
}

#[test]
fn test_merge_validation_accepts_contiguous_run() {
    let selection = Selection::new()
        .add(entry("court-1", (6, 30), (7, 0), SlotStatus::Available))
        .add(entry("court-1", (7, 0), (7, 30), SlotStatus::Available));
    selection.validate_for_merge().unwrap();
}

#[test]
fn test_merge_validation_rejects_single_entry() {
    let selection =
        Selection::new().add(entry("court-1", (6, 30), (7, 0), SlotStatus::Available));
    let result = selection.validate_for_merge();
    assert!(matches!(
        result,
        Err(SchedulingError::MergeRejected {
            rule: RejectionRule::TooFewSlots,
            ..
        })
    ));
}

#[test]
fn test_merge_validation_rejects_two_courts() {
    let selection = Selection::new()
        .add(entry("court-1", (6, 30), (7, 0), SlotStatus::Available))
        .add(entry("court-2", (7, 0), (7, 30), SlotStatus::Available));
    let result = selection.validate_for_merge();
    assert!(matches!(
        result,
        Err(SchedulingError::MergeRejected {
            rule: RejectionRule::MultipleCourts,
            ..
        })
    ));
}

#[test]
fn test_merge_validation_rejects_gap() {
    let selection = Selection::new()
        .add(entry("court-1", (6, 0), (6, 30), SlotStatus::Available))
        .add(entry("court-1", (7, 0), (7, 30), SlotStatus::Available));
    let result = selection.validate_for_merge();
    assert!(matches!(
        result,
        Err(SchedulingError::MergeRejected {
            rule: RejectionRule::NotContiguous,
            ..
        })
    ));
}

#[test]
fn test_merge_validation_rejects_locked_entry() {
    let selection = Selection::new()
        .add(entry("court-1", (6, 30), (7, 0), SlotStatus::Available))
        .add(entry("court-1", (7, 0), (7, 30), SlotStatus::Locked));
    let result = selection.validate_for_merge();
    match result {
        Err(SchedulingError::MergeRejected {
            rule: RejectionRule::NotAvailable,
            slots,
        }) => {
            assert_eq!(slots, vec![SlotKey::new("court-1", t(7, 0))]);
        }
        other => panic!("expected availability rejection, got {:?}", other),
    }
}

#[test]
fn test_lock_validation_allows_multiple_courts() {
    let selection = Selection::new()
        .add(entry("court-1", (12, 0), (12, 30), SlotStatus::Available))
        .add(entry("court-2", (12, 0), (12, 30), SlotStatus::Available));
    selection.validate_for_lock().unwrap();
}

#[test]
fn test_lock_validation_rejects_paid_entry() {
    let selection = Selection::new()
        .add(entry("court-1", (12, 0), (12, 30), SlotStatus::Available))
        .add(entry("court-2", (12, 0), (12, 30), SlotStatus::Paid));
    let result = selection.validate_for_lock();
    assert!(matches!(
        result,
        Err(SchedulingError::LockRejected {
            rule: RejectionRule::AlreadyPaid,
            ..
        })
    ));
}

#[test]
fn test_unlock_validation_requires_all_locked() {
    let good = Selection::new()
        .add(entry("court-1", (12, 0), (12, 30), SlotStatus::Locked))
        .add(entry("court-2", (12, 0), (12, 30), SlotStatus::Locked));
    good.validate_for_unlock().unwrap();

    let mixed = good.add(entry("court-1", (13, 0), (13, 30), SlotStatus::Available));
    assert!(matches!(
        mixed.validate_for_unlock(),
        Err(SchedulingError::UnlockRejected {
            rule: RejectionRule::NotLocked,
            ..
        })
    ));
}

#[test]
fn test_empty_selection_blocks_every_action() {
    let selection = Selection::new();
    assert!(selection.validate_for_merge().is_err());
    assert!(selection.validate_for_lock().is_err());
    assert!(selection.validate_for_unlock().is_err());
}

#[test]
fn test_to_merge_request_builds_sorted_single_court_payload() {
    // Added out of order, the request comes out sorted by start time
    let selection = Selection::new()
        .add(entry("court-1", (7, 0), (7, 30), SlotStatus::Available))
        .add(entry("court-1", (6, 30), (7, 0), SlotStatus::Available));

    let request = selection
        .to_merge_request(monday(), "field-1", Some(4500))
        .unwrap();

    assert_eq!(request.field_id, "field-1");
    assert_eq!(request.price, Some(4500));
    assert_eq!(request.courts.len(), 1);
    let court = &request.courts[0];
    assert_eq!(court.id, "court-1");
    assert_eq!(court.time_slots.len(), 2);
    assert_eq!(court.time_slots[0].start_time, t(6, 30));
    assert_eq!(court.time_slots[1].start_time, t(7, 0));
}

#[test]
fn test_to_lock_request_groups_by_court() {
    let selection = Selection::new()
        .add(entry("court-1", (12, 0), (12, 30), SlotStatus::Available))
        .add(entry("court-1", (12, 30), (13, 0), SlotStatus::Available))
        .add(entry("court-2", (12, 0), (12, 30), SlotStatus::Available));

    let request = selection.to_lock_request(monday(), "field-1").unwrap();
    assert_eq!(request.courts.len(), 2);

    let court_1 = request.courts.iter().find(|c| c.id == "court-1").unwrap();
    assert_eq!(court_1.time_slots.len(), 2);
    let court_2 = request.courts.iter().find(|c| c.id == "court-2").unwrap();
    assert_eq!(court_2.time_slots.len(), 1);
}

#[test]
fn test_to_unlock_request_collects_record_ids() {
    let selection = Selection::new()
        .add(SelectionEntry::new(
            "court-1",
            t(12, 0),
            t(12, 30),
            SlotStatus::Locked,
            Some("lock-1".to_string()),
        ))
        .add(SelectionEntry::new(
            "court-2",
            t(12, 0),
            t(12, 30),
            SlotStatus::Locked,
            Some("lock-2".to_string()),
        ));

    let request = selection.to_unlock_request(monday(), "field-1").unwrap();
    assert_eq!(
        request.record_ids,
        vec!["lock-1".to_string(), "lock-2".to_string()]
    );
}

#[test]
fn test_to_unlock_request_requires_record_ids() {
    // A locked slot without a record id cannot be addressed
    let selection = Selection::new().add(entry("court-1", (12, 0), (12, 30), SlotStatus::Locked));
    let result = selection.to_unlock_request(monday(), "field-1");
    assert!(matches!(
        result,
        Err(SchedulingError::UnlockRejected {
            rule: RejectionRule::UnknownRecord,
            ..
        })
    ));
}
