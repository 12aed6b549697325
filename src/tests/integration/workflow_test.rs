//! End-to-end engine walkthroughs on the two-hour fixture field:
//! open 06:00, close 08:00, 30 minute granularity, so the elementary
//! timeline is 06:00-06:30, 06:30-07:00, 07:00-07:30, 07:30-08:00.

use chrono::Utc;
use tempfile::tempdir;

use crate::errors::{RejectionRule, SchedulingError};
use crate::models::field::FieldScheduleConfig;
use crate::models::slot::{Slot, SlotSpan, SlotStatus};
use crate::services::database::{
    generate_record_id, DatabaseService, RecordStatus, RecordType, ScheduleRecord,
};
use crate::services::locking::plan_locks;
use crate::services::merge::{plan_merge, validate_unmerge};
use crate::services::selection::{Selection, SelectionEntry};
use crate::services::slot_set::{build_court_slots, build_slot_set};
use crate::tests::common::fixtures::{monday, paid_booking, small_config, t};

// Store-backed harness mirroring what the mutation handlers do
struct Harness {
    _dir: tempfile::TempDir,
    db: DatabaseService,
    config: FieldScheduleConfig,
}

impl Harness {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("records.csv");
        Self {
            _dir: dir,
            db: DatabaseService::new(csv_path.to_str().unwrap()),
            config: small_config(),
        }
    }

    fn slots(&self) -> Vec<Slot> {
        let records = self.db.active_records_for("field-1", monday()).unwrap();
        build_court_slots(
            &self.config.field,
            &self.config.courts[0],
            monday(),
            &records,
            &[],
        )
        .unwrap()
    }

    fn merge(&self, spans: &[(u32, u32, u32, u32)], price: Option<i64>) -> Result<String, SchedulingError> {
        let selection: Vec<SlotSpan> = spans
            .iter()
            .map(|(sh, sm, eh, em)| SlotSpan {
                id: None,
                start_time: t(*sh, *sm),
                end_time: t(*eh, *em),
            })
            .collect();

        let slots = self.slots();
        let plan = plan_merge("court-1", &slots, &selection, 30)?;

        let record = ScheduleRecord {
            record_id: generate_record_id("merge"),
            record_type: RecordType::Merge,
            field_id: "field-1".to_string(),
            court_id: "court-1".to_string(),
            date: monday(),
            start_time: plan.start_time,
            end_time: plan.end_time,
            price: Some(plan.merged_price(price)),
            absorbed_slots: ScheduleRecord::encode_absorbed(&plan.absorbed)?,
            status: RecordStatus::Active,
            created_at: Utc::now(),
            released_at: None,
            operator_name: "Test Owner".to_string(),
            operator_id: "owner-1".to_string(),
        };
        self.db.insert_record(&record)?;
        Ok(record.record_id)
    }

    fn unmerge(&self, record_id: &str) -> Result<(), SchedulingError> {
        let record = self.db.find_record(record_id)?.ok_or_else(|| {
            SchedulingError::UnmergeRejected {
                rule: RejectionRule::UnknownRecord,
                slots: Vec::new(),
            }
        })?;
        validate_unmerge(&record, &self.slots())?;
        self.db.release_record(record_id)?;
        Ok(())
    }

    fn lock(&self, start: (u32, u32), end: (u32, u32)) -> Result<String, SchedulingError> {
        let records = self.db.active_records_for("field-1", monday()).unwrap();
        let slot_set = build_slot_set(&self.config, monday(), &records, &[]).unwrap();

        let selection = Selection::new().add(SelectionEntry::new(
            "court-1",
            t(start.0, start.1),
            t(end.0, end.1),
            SlotStatus::Available,
            None,
        ));
        selection.validate_for_lock()?;
        let request = selection.to_lock_request(monday(), "field-1")?;
        let targets = plan_locks(&slot_set, &request)?;

        let record = ScheduleRecord {
            record_id: generate_record_id("lock"),
            record_type: RecordType::Lock,
            field_id: "field-1".to_string(),
            court_id: targets[0].court_id.clone(),
            date: monday(),
            start_time: targets[0].start_time,
            end_time: targets[0].end_time,
            price: None,
            absorbed_slots: String::new(),
            status: RecordStatus::Active,
            created_at: Utc::now(),
            released_at: None,
            operator_name: "Test Owner".to_string(),
            operator_id: "owner-1".to_string(),
        };
        self.db.insert_record(&record)?;
        Ok(record.record_id)
    }

    fn unlock(&self, record_id: &str) -> Result<(), SchedulingError> {
        self.db.release_record(record_id)?;
        Ok(())
    }
}

#[test]
fn test_merge_middle_slots_leaves_three_entries() {
    let harness = Harness::new();

    let before = harness.slots();
    assert_eq!(before.len(), 4);

    harness.merge(&[(6, 30, 7, 0), (7, 0, 7, 30)], None).unwrap();

    let after = harness.slots();
    assert_eq!(after.len(), 3);
    assert_eq!(after[0].start_time, t(6, 0));
    assert!(after[1].is_merged);
    assert_eq!(after[1].start_time, t(6, 30));
    assert_eq!(after[1].end_time, t(7, 30));
    assert_eq!(after[2].start_time, t(7, 30));
}

#[test]
fn test_unmerge_is_the_inverse_of_merge() {
    let harness = Harness::new();

    let before = harness.slots();
    let record_id = harness
        .merge(&[(6, 30, 7, 0), (7, 0, 7, 30)], Some(9000))
        .unwrap();
    harness.unmerge(&record_id).unwrap();

    // Same boundaries, same resolved prices, all available again
    let after = harness.slots();
    assert_eq!(before, after);
}

#[test]
fn test_merge_skipping_a_slot_is_rejected() {
    let harness = Harness::new();

    let result = harness.merge(&[(6, 0, 6, 30), (7, 0, 7, 30)], None);
    assert!(matches!(
        result,
        Err(SchedulingError::MergeRejected {
            rule: RejectionRule::NotContiguous,
            ..
        })
    ));

    // Nothing persisted, the timeline is unchanged
    assert_eq!(harness.slots().len(), 4);
}

#[test]
fn test_merge_with_locked_neighbour_is_rejected() {
    let harness = Harness::new();

    harness.lock((7, 30), (8, 0)).unwrap();
    let result = harness.merge(&[(7, 0, 7, 30), (7, 30, 8, 0)], None);
    assert!(matches!(
        result,
        Err(SchedulingError::MergeRejected {
            rule: RejectionRule::NotAvailable,
            ..
        })
    ));
}

#[test]
fn test_lock_then_unlock_restores_the_slot() {
    let harness = Harness::new();

    let before = harness.slots();
    let record_id = harness.lock((7, 30), (8, 0)).unwrap();

    let locked = harness.slots();
    assert_eq!(locked[3].status, SlotStatus::Locked);
    assert_eq!(locked[3].start_time, t(7, 30));
    assert_eq!(locked[3].end_time, t(8, 0));
    assert_eq!(locked[3].price, 2000);

    harness.unlock(&record_id).unwrap();
    assert_eq!(harness.slots(), before);
}

#[test]
fn test_lock_of_paid_slot_is_rejected() {
    let harness = Harness::new();

    let bookings = vec![paid_booking("booking-1", "court-1", monday(), t(7, 30), t(8, 0))];
    let slot_set = build_slot_set(&harness.config, monday(), &[], &bookings).unwrap();

    let selection = Selection::new().add(SelectionEntry::new(
        "court-1",
        t(7, 30),
        t(8, 0),
        SlotStatus::Available,
        None,
    ));
    let request = selection.to_lock_request(monday(), "field-1").unwrap();

    let result = plan_locks(&slot_set, &request);
    assert!(matches!(
        result,
        Err(SchedulingError::LockRejected {
            rule: RejectionRule::AlreadyPaid,
            ..
        })
    ));
}

#[test]
fn test_merge_unmerge_inverse_law_across_run_lengths() {
    // The inverse law holds for every contiguous run on the grid
    for (first, count) in [(0u32, 2u32), (0, 3), (0, 4), (1, 2), (1, 3), (2, 2)] {
        let harness = Harness::new();
        let before = harness.slots();

        let spans: Vec<(u32, u32, u32, u32)> = (first..first + count)
            .map(|i| {
                let start = 6 * 60 + i * 30;
                let end = start + 30;
                (start / 60, start % 60, end / 60, end % 60)
            })
            .collect();

        let record_id = harness.merge(&spans, None).unwrap();
        assert_eq!(harness.slots().len(), (4 - count + 1) as usize);

        harness.unmerge(&record_id).unwrap();
        assert_eq!(harness.slots(), before, "run at {} len {}", first, count);
    }
}

#[test]
fn test_remerging_after_unmerge_works() {
    let harness = Harness::new();

    let record_id = harness.merge(&[(6, 0, 6, 30), (6, 30, 7, 0)], None).unwrap();
    harness.unmerge(&record_id).unwrap();

    // The same span can be merged again after the release
    let second = harness.merge(&[(6, 0, 6, 30), (6, 30, 7, 0)], Some(7000)).unwrap();
    assert_ne!(record_id, second);

    let slots = harness.slots();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0].price, 7000);
}

#[test]
fn test_merged_slot_can_be_locked_and_survives_replay() {
    let harness = Harness::new();

    harness.merge(&[(6, 30, 7, 0), (7, 0, 7, 30)], None).unwrap();
    let lock_id = harness.lock((6, 30), (7, 30)).unwrap();

    let slots = harness.slots();
    assert_eq!(slots.len(), 3);
    assert!(slots[1].is_merged);
    assert_eq!(slots[1].status, SlotStatus::Locked);

    harness.unlock(&lock_id).unwrap();
    let slots = harness.slots();
    assert!(slots[1].is_merged);
    assert_eq!(slots[1].status, SlotStatus::Available);
}
