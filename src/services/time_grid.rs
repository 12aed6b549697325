use chrono::{Duration, NaiveTime};
use tracing::debug;

use crate::errors::{SchedulingError, SchedulingResult};
use crate::models::clock;
use crate::models::field::DaySchedule;

/// The ordered sequence of elementary time boundaries between a day's open
/// and close time at a fixed step.
///
/// The grid is lazy and restartable: `boundaries()` hands out a fresh
/// iterator each call. Construction fails when the open/close span is not
/// an exact multiple of the step, so a misconfigured field is rejected up
/// front instead of silently truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeGrid {
    open: NaiveTime,
    close: NaiveTime,
    step_minutes: u32,
}

impl TimeGrid {
    pub fn new(open: NaiveTime, close: NaiveTime, step_minutes: u32) -> SchedulingResult<Self> {
        if step_minutes == 0 {
            return Err(SchedulingError::Configuration(
                "grid step must be positive".to_string(),
            ));
        }
        if open >= close {
            return Err(SchedulingError::Configuration(format!(
                "grid open time {} is not before close time {}",
                clock::format_time_of_day(open),
                clock::format_time_of_day(close)
            )));
        }
        let span = clock::minutes_between(open, close);
        if span % i64::from(step_minutes) != 0 {
            return Err(SchedulingError::Configuration(format!(
                "opening span of {} minutes does not divide into {} minute steps",
                span, step_minutes
            )));
        }

        debug!(
            "Time grid {}-{} at {} minute steps ({} slots)",
            clock::format_time_of_day(open),
            clock::format_time_of_day(close),
            step_minutes,
            span / i64::from(step_minutes)
        );

        Ok(Self {
            open,
            close,
            step_minutes,
        })
    }

    pub fn from_day_schedule(schedule: &DaySchedule) -> SchedulingResult<Self> {
        Self::new(schedule.open, schedule.close, schedule.step_minutes)
    }

    /// Boundary instants from open to close inclusive.
    pub fn boundaries(&self) -> Boundaries {
        Boundaries {
            next: Some(self.open),
            close: self.close,
            step: Duration::minutes(i64::from(self.step_minutes)),
        }
    }

    /// Consecutive boundary pairs, one per elementary slot.
    pub fn intervals(&self) -> Vec<(NaiveTime, NaiveTime)> {
        let boundaries: Vec<NaiveTime> = self.boundaries().collect();
        boundaries
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }

    pub fn slot_count(&self) -> usize {
        (clock::minutes_between(self.open, self.close) / i64::from(self.step_minutes)) as usize
    }

    pub fn step_minutes(&self) -> u32 {
        self.step_minutes
    }
}

/// Iterator over grid boundaries. Finite: stops after yielding the close
/// time.
pub struct Boundaries {
    next: Option<NaiveTime>,
    close: NaiveTime,
    step: Duration,
}

impl Iterator for Boundaries {
    type Item = NaiveTime;

    fn next(&mut self) -> Option<NaiveTime> {
        let current = self.next?;
        self.next = if current < self.close {
            // Overflow past midnight cannot happen for a validated grid,
            // but overflowing_add_signed keeps the arithmetic total.
            let (advanced, wrapped) = current.overflowing_add_signed(self.step);
            if wrapped > 0 || advanced > self.close {
                None
            } else {
                Some(advanced)
            }
        } else {
            None
        };
        Some(current)
    }
}

#[cfg(test)]
#[path = "time_grid_test.rs"]
mod time_grid_test;
