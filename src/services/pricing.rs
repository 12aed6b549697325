use chrono::NaiveTime;
use tracing::{debug, warn};

use crate::errors::{SchedulingError, SchedulingResult};
use crate::models::clock;
use crate::models::field::{Court, DayOfWeek};

/// Resolve the price of a time range on one court for a given day of week.
///
/// The range must lie fully inside exactly one configured window, in which
/// case that window's price applies. A range covered by no window falls
/// back to the court's default price. A range that straddles a window
/// boundary means the pricing data no longer lines up with the slot grid,
/// which is reported as a configuration error rather than guessed around.
pub fn resolve_price(
    court: &Court,
    day: DayOfWeek,
    start: NaiveTime,
    end: NaiveTime,
) -> SchedulingResult<i64> {
    if start >= end {
        return Err(SchedulingError::Configuration(format!(
            "price lookup for court {} with empty range {}-{}",
            court.court_id,
            clock::format_time_of_day(start),
            clock::format_time_of_day(end)
        )));
    }

    for window in court.windows_for(day) {
        let contains = window.start_time <= start && end <= window.end_time;
        if contains {
            debug!(
                "Court {} {} {}-{} priced {} by window {}-{}",
                court.court_id,
                day.as_str(),
                clock::format_time_of_day(start),
                clock::format_time_of_day(end),
                window.price,
                clock::format_time_of_day(window.start_time),
                clock::format_time_of_day(window.end_time)
            );
            return Ok(window.price);
        }

        // Overlap without containment: the range straddles a window edge
        let overlaps = window.start_time < end && start < window.end_time;
        if overlaps {
            warn!(
                "Court {} {} range {}-{} partially overlaps pricing window {}-{}",
                court.court_id,
                day.as_str(),
                clock::format_time_of_day(start),
                clock::format_time_of_day(end),
                clock::format_time_of_day(window.start_time),
                clock::format_time_of_day(window.end_time)
            );
            return Err(SchedulingError::Configuration(format!(
                "court {} pricing on {} is misaligned: range {}-{} straddles window {}-{}",
                court.court_id,
                day.as_str(),
                clock::format_time_of_day(start),
                clock::format_time_of_day(end),
                clock::format_time_of_day(window.start_time),
                clock::format_time_of_day(window.end_time)
            )));
        }
    }

    debug!(
        "Court {} {} {}-{} has no pricing window, using default price {}",
        court.court_id,
        day.as_str(),
        clock::format_time_of_day(start),
        clock::format_time_of_day(end),
        court.default_price
    );
    Ok(court.default_price)
}

#[cfg(test)]
#[path = "pricing_test.rs"]
mod pricing_test;
