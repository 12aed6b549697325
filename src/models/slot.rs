use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::clock::{self, serde_hms};

// Slot lifecycle states as exchanged with the consoles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    #[serde(rename = "AVAILABLE")]
    Available,
    #[serde(rename = "LOCK")]
    Locked,
    #[serde(rename = "PAID")]
    Paid,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "AVAILABLE",
            SlotStatus::Locked => "LOCK",
            SlotStatus::Paid => "PAID",
        }
    }
}

/// One bookable time unit on one court on one date.
///
/// `id` is the persisted record id for merged or locked slots; elementary
/// slots that have never been touched by a mutation carry no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: Option<String>,
    #[serde(with = "serde_hms")]
    pub start_time: NaiveTime,
    #[serde(with = "serde_hms")]
    pub end_time: NaiveTime,
    pub price: i64,
    pub status: SlotStatus,
    pub is_merged: bool,
}

impl Slot {
    pub fn duration_minutes(&self) -> i64 {
        clock::minutes_between(self.start_time, self.end_time)
    }
}

/// Composite selection identity for a slot: the court it belongs to plus
/// its start time. Slots never overlap within a court, so the pair is
/// unique for a given date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SlotKey {
    pub court_id: String,
    #[serde(with = "serde_hms")]
    pub start_time: NaiveTime,
}

impl SlotKey {
    pub fn new(court_id: &str, start_time: NaiveTime) -> Self {
        Self {
            court_id: court_id.to_string(),
            start_time,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            self.court_id,
            clock::format_time_of_day(self.start_time)
        )
    }
}

/// Boundaries of one elementary slot absorbed by a merge. Persisted with
/// the merge record so unmerge can restore the exact original slots even
/// if the field configuration changed in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsorbedSlot {
    #[serde(with = "serde_hms")]
    pub start_time: NaiveTime,
    #[serde(with = "serde_hms")]
    pub end_time: NaiveTime,
}

// A slot reference inside a mutation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSpan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(with = "serde_hms")]
    pub start_time: NaiveTime,
    #[serde(with = "serde_hms")]
    pub end_time: NaiveTime,
}

// ── Slot set responses ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtSlots {
    pub id: String,
    pub name: String,
    pub slots: Vec<Slot>,
}

/// The full per-field slot timeline for one date, one entry per court.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSetResponse {
    pub field_id: String,
    pub date: NaiveDate,
    #[serde(with = "serde_hms")]
    pub open_time: NaiveTime,
    #[serde(with = "serde_hms")]
    pub close_time: NaiveTime,
    pub min_booking_minutes: u32,
    pub courts: Vec<CourtSlots>,
}

impl SlotSetResponse {
    pub fn court(&self, court_id: &str) -> Option<&CourtSlots> {
        self.courts.iter().find(|c| c.id == court_id)
    }
}

// ── Mutation requests ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeCourtSelection {
    pub id: String,
    pub time_slots: Vec<SlotSpan>,
}

/// Merge a contiguous run of available slots in one court into a single
/// priced slot. The request carries a court list for symmetry with the
/// lock request, but exactly one court entry is valid per call. `price`
/// overrides the default combined price (the sum of the absorbed slots'
/// prices).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequest {
    pub date: NaiveDate,
    pub field_id: String,
    pub courts: Vec<MergeCourtSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockCourtSelection {
    pub id: String,
    pub time_slots: Vec<SlotSpan>,
}

/// Take slots out of sale. The only mutation that may span several courts
/// in one request, for field-wide maintenance closures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRequest {
    pub date: NaiveDate,
    pub field_id: String,
    pub courts: Vec<LockCourtSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockRequest {
    pub date: NaiveDate,
    pub field_id: String,
    pub record_ids: Vec<String>,
}

// Acknowledgement for lock and unlock requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockActionResponse {
    pub success: bool,
    pub message: String,
    pub record_ids: Vec<String>,
}
