use chrono::{NaiveDate, NaiveTime, Utc};

use crate::models::field::{
    Court, CourtPricingDay, DayOfWeek, Field, FieldScheduleConfig, OpeningHoursEntry, PaidBooking,
    PriceWindow,
};
use crate::models::slot::AbsorbedSlot;
use crate::services::database::{RecordStatus, RecordType, ScheduleRecord};

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// 2025-04-07, a Monday. Most fixture tests run on this date.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 7).unwrap()
}

fn all_week(open: NaiveTime, close: NaiveTime) -> Vec<OpeningHoursEntry> {
    [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ]
    .into_iter()
    .map(|day| OpeningHoursEntry {
        day_of_week: day,
        open_time: open,
        close_time: close,
    })
    .collect()
}

/// A two-hour field with a single court: open 06:00, close 08:00, 30
/// minute granularity. Produces the four elementary slots used by the
/// scheduling scenarios.
pub fn small_config() -> FieldScheduleConfig {
    FieldScheduleConfig {
        field: Field {
            field_id: "field-1".to_string(),
            name: "Padel Hall".to_string(),
            open_time: t(6, 0),
            close_time: t(8, 0),
            min_booking_minutes: 30,
            month_limit: 3,
            opening_hours: all_week(t(6, 0), t(8, 0)),
        },
        courts: vec![Court {
            court_id: "court-1".to_string(),
            name: "Court 1".to_string(),
            default_price: 2000,
            daily_pricing: Vec::new(),
        }],
    }
}

/// A full-day field with two courts. Court 1 has an evening price window
/// on Mondays, court 2 prices everything at its default.
pub fn standard_config() -> FieldScheduleConfig {
    FieldScheduleConfig {
        field: Field {
            field_id: "field-1".to_string(),
            name: "Riverside Arena".to_string(),
            open_time: t(6, 0),
            close_time: t(22, 0),
            min_booking_minutes: 30,
            month_limit: 3,
            opening_hours: all_week(t(6, 0), t(22, 0)),
        },
        courts: vec![
            Court {
                court_id: "court-1".to_string(),
                name: "Court 1".to_string(),
                default_price: 2000,
                daily_pricing: vec![CourtPricingDay {
                    day_of_week: DayOfWeek::Monday,
                    windows: vec![PriceWindow {
                        start_time: t(18, 0),
                        end_time: t(22, 0),
                        price: 3000,
                    }],
                }],
            },
            Court {
                court_id: "court-2".to_string(),
                name: "Court 2".to_string(),
                default_price: 2500,
                daily_pricing: Vec::new(),
            },
        ],
    }
}

/// Build an active merge record over the given elementary spans.
pub fn merge_record(
    record_id: &str,
    config: &FieldScheduleConfig,
    court_id: &str,
    date: NaiveDate,
    spans: &[(NaiveTime, NaiveTime)],
    price: Option<i64>,
) -> ScheduleRecord {
    let absorbed: Vec<AbsorbedSlot> = spans
        .iter()
        .map(|(start, end)| AbsorbedSlot {
            start_time: *start,
            end_time: *end,
        })
        .collect();

    ScheduleRecord {
        record_id: record_id.to_string(),
        record_type: RecordType::Merge,
        field_id: config.field.field_id.clone(),
        court_id: court_id.to_string(),
        date,
        start_time: spans.first().unwrap().0,
        end_time: spans.last().unwrap().1,
        price,
        absorbed_slots: ScheduleRecord::encode_absorbed(&absorbed).unwrap(),
        status: RecordStatus::Active,
        created_at: Utc::now(),
        released_at: None,
        operator_name: "Test Owner".to_string(),
        operator_id: "owner-1".to_string(),
    }
}

/// Build an active lock record for one slot span.
pub fn lock_record(
    record_id: &str,
    config: &FieldScheduleConfig,
    court_id: &str,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> ScheduleRecord {
    ScheduleRecord {
        record_id: record_id.to_string(),
        record_type: RecordType::Lock,
        field_id: config.field.field_id.clone(),
        court_id: court_id.to_string(),
        date,
        start_time: start,
        end_time: end,
        price: None,
        absorbed_slots: String::new(),
        status: RecordStatus::Active,
        created_at: Utc::now(),
        released_at: None,
        operator_name: "Test Owner".to_string(),
        operator_id: "owner-1".to_string(),
    }
}

/// Build a paid booking covering one slot span.
pub fn paid_booking(
    booking_id: &str,
    court_id: &str,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> PaidBooking {
    PaidBooking {
        booking_id: booking_id.to_string(),
        court_id: court_id.to_string(),
        date,
        start_time: start,
        end_time: end,
    }
}
