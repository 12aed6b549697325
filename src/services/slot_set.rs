use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::errors::{SchedulingError, SchedulingResult};
use crate::models::clock;
use crate::models::field::{Court, DayOfWeek, DaySchedule, Field, FieldScheduleConfig, PaidBooking};
use crate::models::slot::{CourtSlots, Slot, SlotSetResponse, SlotStatus};
use crate::services::database::{RecordType, ScheduleRecord};
use crate::services::pricing::resolve_price;
use crate::services::time_grid::TimeGrid;

/// Derive one court's slot timeline for a date.
///
/// This is an order-sensitive fold: elementary slots from the grid, then
/// active merge records in creation order, then active lock records, then
/// paid bookings. Merges must be applied before locks because a lock taken
/// on a merged slot references the merged span. Records that no longer
/// line up with the grid (the field was reconfigured under them) are
/// skipped with a warning rather than corrupting the timeline.
pub fn build_court_slots(
    field: &Field,
    court: &Court,
    date: NaiveDate,
    records: &[ScheduleRecord],
    bookings: &[PaidBooking],
) -> SchedulingResult<Vec<Slot>> {
    let day = DayOfWeek::from_date(date);
    let schedule = field.day_schedule(day);
    let grid = TimeGrid::from_day_schedule(&schedule)?;

    // Elementary slots with resolved prices
    let mut slots: Vec<Slot> = Vec::with_capacity(grid.slot_count());
    for (start, end) in grid.intervals() {
        slots.push(Slot {
            id: None,
            start_time: start,
            end_time: end,
            price: resolve_price(court, day, start, end)?,
            status: SlotStatus::Available,
            is_merged: false,
        });
    }

    // Replay merges
    for record in records
        .iter()
        .filter(|r| r.record_type == RecordType::Merge && r.court_id == court.court_id)
    {
        apply_merge_record(&mut slots, record);
    }

    // Replay locks
    for record in records
        .iter()
        .filter(|r| r.record_type == RecordType::Lock && r.court_id == court.court_id)
    {
        apply_lock_record(&mut slots, record);
    }

    // Mark booked slots
    for booking in bookings.iter().filter(|b| b.court_id == court.court_id) {
        apply_paid_booking(&mut slots, booking);
    }

    verify_court_slots(&slots, &schedule)?;
    Ok(slots)
}

fn apply_merge_record(slots: &mut Vec<Slot>, record: &ScheduleRecord) {
    // The run of slots covered by the merged span
    let Some(first) = slots.iter().position(|s| s.start_time == record.start_time) else {
        warn!(
            "Merge record {} start {} not on the current grid, skipping",
            record.record_id,
            clock::format_time_of_day(record.start_time)
        );
        return;
    };
    let Some(last) = slots.iter().position(|s| s.end_time == record.end_time) else {
        warn!(
            "Merge record {} end {} not on the current grid, skipping",
            record.record_id,
            clock::format_time_of_day(record.end_time)
        );
        return;
    };
    if last < first {
        warn!(
            "Merge record {} spans an inverted range, skipping",
            record.record_id
        );
        return;
    }

    // Previously merged slots may be absorbed again (a merge of merges),
    // but locked and paid slots never are.
    let run = &slots[first..=last];
    if run.iter().any(|s| s.status != SlotStatus::Available) {
        warn!(
            "Merge record {} covers slots that are not available, skipping",
            record.record_id
        );
        return;
    }

    let fallback: i64 = run.iter().map(|s| s.price).sum();
    let merged = Slot {
        id: Some(record.record_id.clone()),
        start_time: record.start_time,
        end_time: record.end_time,
        price: record.price.unwrap_or(fallback),
        status: SlotStatus::Available,
        is_merged: true,
    };

    debug!(
        "Applied merge record {} replacing {} slots with {}-{}",
        record.record_id,
        last - first + 1,
        clock::format_time_of_day(merged.start_time),
        clock::format_time_of_day(merged.end_time)
    );
    slots.splice(first..=last, std::iter::once(merged));
}

fn apply_lock_record(slots: &mut [Slot], record: &ScheduleRecord) {
    let Some(slot) = slots.iter_mut().find(|s| {
        s.start_time == record.start_time && s.end_time == record.end_time
    }) else {
        warn!(
            "Lock record {} targets {}-{} which is not on the current timeline, skipping",
            record.record_id,
            clock::format_time_of_day(record.start_time),
            clock::format_time_of_day(record.end_time)
        );
        return;
    };

    match slot.status {
        SlotStatus::Available => {
            slot.status = SlotStatus::Locked;
            slot.id = Some(record.record_id.clone());
        }
        SlotStatus::Locked => {
            warn!(
                "Lock record {} targets an already locked slot, skipping",
                record.record_id
            );
        }
        SlotStatus::Paid => {
            warn!(
                "Lock record {} targets a paid slot, skipping",
                record.record_id
            );
        }
    }
}

fn apply_paid_booking(slots: &mut [Slot], booking: &PaidBooking) {
    // A booking always covers exactly one slot as it stood at booking
    // time, so an exact span match is expected.
    let Some(slot) = slots.iter_mut().find(|s| {
        s.start_time == booking.start_time && s.end_time == booking.end_time
    }) else {
        warn!(
            "Booking {} for {}-{} does not match any slot on the timeline, skipping",
            booking.booking_id,
            clock::format_time_of_day(booking.start_time),
            clock::format_time_of_day(booking.end_time)
        );
        return;
    };

    slot.status = SlotStatus::Paid;
    if slot.id.is_none() {
        slot.id = Some(booking.booking_id.clone());
    }
}

/// Check the at-rest invariants of a court's slot timeline: coverage from
/// open to close without gaps, no overlap, and every duration a positive
/// multiple of the granularity. Violations mean a bug in the fold or
/// corrupt records, reported as configuration errors.
pub fn verify_court_slots(slots: &[Slot], schedule: &DaySchedule) -> SchedulingResult<()> {
    let Some(first) = slots.first() else {
        return Err(SchedulingError::Configuration(
            "slot timeline is empty".to_string(),
        ));
    };
    let last = slots.last().expect("non-empty");

    if first.start_time != schedule.open {
        return Err(SchedulingError::Configuration(format!(
            "timeline starts at {} instead of the open time {}",
            clock::format_time_of_day(first.start_time),
            clock::format_time_of_day(schedule.open)
        )));
    }
    if last.end_time != schedule.close {
        return Err(SchedulingError::Configuration(format!(
            "timeline ends at {} instead of the close time {}",
            clock::format_time_of_day(last.end_time),
            clock::format_time_of_day(schedule.close)
        )));
    }

    let step = i64::from(schedule.step_minutes);
    for slot in slots {
        let duration = slot.duration_minutes();
        if duration <= 0 || duration % step != 0 {
            return Err(SchedulingError::Configuration(format!(
                "slot {}-{} has a duration of {} minutes, not a positive multiple of {}",
                clock::format_time_of_day(slot.start_time),
                clock::format_time_of_day(slot.end_time),
                duration,
                step
            )));
        }
    }

    for pair in slots.windows(2) {
        if pair[0].end_time != pair[1].start_time {
            return Err(SchedulingError::Configuration(format!(
                "gap or overlap between {} and {}",
                clock::format_time_of_day(pair[0].end_time),
                clock::format_time_of_day(pair[1].start_time)
            )));
        }
    }

    Ok(())
}

/// Build the full slot set response for a field on one date.
pub fn build_slot_set(
    config: &FieldScheduleConfig,
    date: NaiveDate,
    records: &[ScheduleRecord],
    bookings: &[PaidBooking],
) -> SchedulingResult<SlotSetResponse> {
    let day = DayOfWeek::from_date(date);
    let schedule = config.field.day_schedule(day);

    let mut courts = Vec::with_capacity(config.courts.len());
    for court in &config.courts {
        let slots = build_court_slots(&config.field, court, date, records, bookings)?;
        courts.push(CourtSlots {
            id: court.court_id.clone(),
            name: court.name.clone(),
            slots,
        });
    }

    Ok(SlotSetResponse {
        field_id: config.field.field_id.clone(),
        date,
        open_time: schedule.open,
        close_time: schedule.close,
        min_booking_minutes: config.field.min_booking_minutes,
        courts,
    })
}

#[cfg(test)]
#[path = "slot_set_test.rs"]
mod slot_set_test;
