use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::{SchedulingError, SchedulingResult};
use crate::models::clock::{self, serde_hms};

// Day of week as exchanged with the platform API (lowercase strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            chrono::Weekday::Mon => DayOfWeek::Monday,
            chrono::Weekday::Tue => DayOfWeek::Tuesday,
            chrono::Weekday::Wed => DayOfWeek::Wednesday,
            chrono::Weekday::Thu => DayOfWeek::Thursday,
            chrono::Weekday::Fri => DayOfWeek::Friday,
            chrono::Weekday::Sat => DayOfWeek::Saturday,
            chrono::Weekday::Sun => DayOfWeek::Sunday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

// Opening hours for one day of the week, validated independently
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningHoursEntry {
    pub day_of_week: DayOfWeek,
    #[serde(with = "serde_hms")]
    pub open_time: NaiveTime,
    #[serde(with = "serde_hms")]
    pub close_time: NaiveTime,
}

/// A field is a venue's group of courts sharing opening hours and the
/// minimum booking granularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub field_id: String,
    pub name: String,
    #[serde(with = "serde_hms")]
    pub open_time: NaiveTime,
    #[serde(with = "serde_hms")]
    pub close_time: NaiveTime,
    pub min_booking_minutes: u32,
    pub month_limit: u32,
    pub opening_hours: Vec<OpeningHoursEntry>,
}

/// Effective open/close pair and granularity for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySchedule {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub step_minutes: u32,
}

impl Field {
    /// Opening hours that apply on the given day of week, falling back to
    /// the field-level pair when no per-day entry exists.
    pub fn day_schedule(&self, day: DayOfWeek) -> DaySchedule {
        let entry = self.opening_hours.iter().find(|e| e.day_of_week == day);
        match entry {
            Some(e) => DaySchedule {
                open: e.open_time,
                close: e.close_time,
                step_minutes: self.min_booking_minutes,
            },
            None => DaySchedule {
                open: self.open_time,
                close: self.close_time,
                step_minutes: self.min_booking_minutes,
            },
        }
    }
}

// One pricing window inside a day's opening hours
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceWindow {
    #[serde(with = "serde_hms")]
    pub start_time: NaiveTime,
    #[serde(with = "serde_hms")]
    pub end_time: NaiveTime,
    pub price: i64,
}

// Pricing windows for one day of the week
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtPricingDay {
    pub day_of_week: DayOfWeek,
    pub windows: Vec<PriceWindow>,
}

/// One physical court within a field, with its own pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Court {
    pub court_id: String,
    pub name: String,
    pub default_price: i64,
    pub daily_pricing: Vec<CourtPricingDay>,
}

impl Court {
    /// Price windows configured for the given day of week, empty if none.
    pub fn windows_for(&self, day: DayOfWeek) -> &[PriceWindow] {
        self.daily_pricing
            .iter()
            .find(|d| d.day_of_week == day)
            .map(|d| d.windows.as_slice())
            .unwrap_or(&[])
    }
}

/// Field plus court configuration as served by the platform core API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldScheduleConfig {
    pub field: Field,
    pub courts: Vec<Court>,
}

/// A confirmed booking fetched from the platform API. Marks its covering
/// slot as paid on the read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaidBooking {
    pub booking_id: String,
    pub court_id: String,
    pub date: NaiveDate,
    #[serde(with = "serde_hms")]
    pub start_time: NaiveTime,
    #[serde(with = "serde_hms")]
    pub end_time: NaiveTime,
}

fn check_day_pair(
    context: &str,
    open: NaiveTime,
    close: NaiveTime,
    step_minutes: u32,
) -> SchedulingResult<()> {
    if open >= close {
        return Err(SchedulingError::Configuration(format!(
            "{}: open time {} is not before close time {}",
            context,
            clock::format_time_of_day(open),
            clock::format_time_of_day(close)
        )));
    }
    let span = clock::minutes_between(open, close);
    if span % i64::from(step_minutes) != 0 {
        return Err(SchedulingError::Configuration(format!(
            "{}: opening span of {} minutes is not a multiple of the {} minute granularity",
            context, span, step_minutes
        )));
    }
    Ok(())
}

fn check_court_day(
    court: &Court,
    day: DayOfWeek,
    schedule: &DaySchedule,
) -> SchedulingResult<()> {
    let windows = court.windows_for(day);
    let step = i64::from(schedule.step_minutes);
    let mut previous_end: Option<NaiveTime> = None;

    for window in windows {
        let context = format!(
            "court {} pricing on {} ({}-{})",
            court.court_id,
            day.as_str(),
            clock::format_time_of_day(window.start_time),
            clock::format_time_of_day(window.end_time)
        );
        if window.start_time >= window.end_time {
            return Err(SchedulingError::Configuration(format!(
                "{}: window start is not before its end",
                context
            )));
        }
        if window.start_time < schedule.open || window.end_time > schedule.close {
            return Err(SchedulingError::Configuration(format!(
                "{}: window lies outside opening hours",
                context
            )));
        }
        if let Some(prev) = previous_end {
            if window.start_time < prev {
                return Err(SchedulingError::Configuration(format!(
                    "{}: window overlaps or is out of order with the previous one",
                    context
                )));
            }
        }
        let duration = clock::minutes_between(window.start_time, window.end_time);
        if duration % step != 0 {
            return Err(SchedulingError::Configuration(format!(
                "{}: window duration of {} minutes is not a multiple of the granularity",
                context, duration
            )));
        }
        let offset = clock::minutes_between(schedule.open, window.start_time);
        if offset % step != 0 {
            return Err(SchedulingError::Configuration(format!(
                "{}: window start is not aligned to the slot grid",
                context
            )));
        }
        previous_end = Some(window.end_time);
    }
    Ok(())
}

/// Validate a field schedule configuration before deriving slots from it.
///
/// Misaligned opening hours or pricing windows are configuration defects
/// owned by the venue tooling and are rejected here rather than silently
/// truncated at query time.
pub fn validate_schedule_config(config: &FieldScheduleConfig) -> SchedulingResult<()> {
    let field = &config.field;
    if field.min_booking_minutes == 0 {
        return Err(SchedulingError::Configuration(format!(
            "field {}: min_booking_minutes must be positive",
            field.field_id
        )));
    }

    check_day_pair(
        &format!("field {}", field.field_id),
        field.open_time,
        field.close_time,
        field.min_booking_minutes,
    )?;

    for entry in &field.opening_hours {
        check_day_pair(
            &format!("field {} on {}", field.field_id, entry.day_of_week.as_str()),
            entry.open_time,
            entry.close_time,
            field.min_booking_minutes,
        )?;
    }

    const ALL_DAYS: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    for court in &config.courts {
        for day in ALL_DAYS {
            let schedule = field.day_schedule(day);
            check_court_day(court, day, &schedule)?;
        }
    }

    Ok(())
}
