use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::errors::{SchedulingError, SchedulingResult};

// Wire format for all time-of-day values. Clients may send "HH:mm" as well;
// everything is normalized to this before comparison or persistence.
pub const TIME_FORMAT: &str = "%H:%M:%S";
const SHORT_TIME_FORMAT: &str = "%H:%M";

/// Parse a time-of-day string, accepting both "HH:mm" and "HH:mm:ss".
pub fn parse_time_of_day(value: &str) -> SchedulingResult<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, SHORT_TIME_FORMAT))
        .map_err(|_| {
            SchedulingError::InvalidRequest(format!(
                "invalid time of day '{}', expected HH:mm or HH:mm:ss",
                value
            ))
        })
}

/// Normalized "HH:mm:ss" rendering of a time of day.
pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Whole minutes from midnight. Sub-minute components are rejected by
/// parsing, so this is exact for every accepted input.
pub fn minutes_from_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Minutes between two times of day on the same date, negative if `end`
/// precedes `start`.
pub fn minutes_between(start: NaiveTime, end: NaiveTime) -> i64 {
    i64::from(minutes_from_midnight(end)) - i64::from(minutes_from_midnight(start))
}

/// Parse a calendar date in ISO "YYYY-MM-DD" form.
pub fn parse_date(value: &str) -> SchedulingResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        SchedulingError::InvalidRequest(format!(
            "invalid date '{}', expected YYYY-MM-DD",
            value
        ))
    })
}

// Serde adapter for time-of-day fields: serializes "HH:mm:ss", accepts
// "HH:mm" or "HH:mm:ss" on input. Used with #[serde(with = ...)].
pub mod serde_hms {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_time_of_day(*time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_time_of_day(&raw).map_err(de::Error::custom)
    }
}
