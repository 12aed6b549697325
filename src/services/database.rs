use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::errors::{SchedulingError, SchedulingResult};
use crate::models::clock::serde_hms;
use crate::models::slot::AbsorbedSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Merge,
    Lock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Released,
}

/// A persisted schedule mutation: either a merge of elementary slots or a
/// lock taking one slot out of sale. The read path replays active records
/// onto the elementary grid; releasing a record undoes its effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub record_id: String,
    pub record_type: RecordType,
    pub field_id: String,
    pub court_id: String,
    pub date: NaiveDate,
    #[serde(with = "serde_hms")]
    pub start_time: NaiveTime,
    #[serde(with = "serde_hms")]
    pub end_time: NaiveTime,
    // Merged price, unused for lock records
    pub price: Option<i64>,
    // JSON list of absorbed elementary boundaries, empty for lock records
    pub absorbed_slots: String,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub operator_name: String,
    pub operator_id: String,
}

impl ScheduleRecord {
    /// Decode the absorbed boundary list persisted at merge time.
    pub fn absorbed(&self) -> SchedulingResult<Vec<AbsorbedSlot>> {
        if self.absorbed_slots.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&self.absorbed_slots).map_err(|e| {
            SchedulingError::Store(format!(
                "record {} has corrupt absorbed slot data: {}",
                self.record_id, e
            ))
        })
    }

    pub fn encode_absorbed(absorbed: &[AbsorbedSlot]) -> SchedulingResult<String> {
        serde_json::to_string(absorbed)
            .map_err(|e| SchedulingError::Store(format!("failed to encode absorbed slots: {}", e)))
    }
}

/// Generate a record identifier. Millisecond timestamp plus a random
/// suffix keeps ids unique across restarts without coordination.
pub fn generate_record_id(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(1000..10000);
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), suffix)
}

// CSV-backed store for schedule records
pub struct DatabaseService {
    csv_path: String,
    file_mutex: Mutex<()>,
}

const HEADERS: [&str; 14] = [
    "record_id",
    "record_type",
    "field_id",
    "court_id",
    "date",
    "start_time",
    "end_time",
    "price",
    "absorbed_slots",
    "status",
    "created_at",
    "released_at",
    "operator_name",
    "operator_id",
];

impl DatabaseService {
    pub fn new(csv_path: &str) -> Self {
        // Create the CSV file if it doesn't exist with proper headers
        if !Path::new(csv_path).exists() {
            info!("Creating new schedule records file at {}", csv_path);

            let file = File::create(csv_path).unwrap_or_else(|e| {
                error!("Failed to create schedule records file: {}", e);
                panic!("Failed to create schedule records file: {}", e)
            });

            let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

            if let Err(e) = writer.write_record(HEADERS) {
                error!("Failed to write headers: {}", e);
                panic!("Failed to write headers: {}", e);
            }

            if let Err(e) = writer.flush() {
                error!("Failed to flush headers: {}", e);
                panic!("Failed to flush headers: {}", e);
            }
        }

        Self {
            csv_path: csv_path.to_string(),
            file_mutex: Mutex::new(()),
        }
    }

    // Load every record. Caller must hold the file mutex.
    fn read_all(&self) -> SchedulingResult<Vec<ScheduleRecord>> {
        let file = File::open(&self.csv_path)
            .map_err(|e| SchedulingError::Store(format!("failed to open records file: {}", e)))?;

        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
        let mut records = Vec::new();
        for result in reader.deserialize() {
            let record: ScheduleRecord = result
                .map_err(|e| SchedulingError::Store(format!("failed to read record: {}", e)))?;
            records.push(record);
        }
        Ok(records)
    }

    // Overwrite the file with the given records. Caller must hold the
    // file mutex.
    fn write_all(&self, records: &[ScheduleRecord]) -> SchedulingResult<()> {
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.csv_path)
            .map_err(|e| {
                SchedulingError::Store(format!("failed to open records file for writing: {}", e))
            })?;

        let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
        for record in records {
            writer
                .serialize(record)
                .map_err(|e| SchedulingError::Store(format!("failed to write record: {}", e)))?;
        }
        writer
            .flush()
            .map_err(|e| SchedulingError::Store(format!("failed to flush records: {}", e)))
    }

    /// Append new schedule records in one flush. An identical active
    /// record (same type, court, date and span) is skipped so a replayed
    /// request does not double-apply.
    pub fn insert_records(&self, records: &[ScheduleRecord]) -> SchedulingResult<()> {
        let _lock = self
            .file_mutex
            .lock()
            .map_err(|e| SchedulingError::Store(format!("failed to acquire store mutex: {}", e)))?;

        let existing = self.read_all()?;
        let mut to_insert: Vec<&ScheduleRecord> = Vec::with_capacity(records.len());
        for record in records {
            let is_duplicate = existing.iter().any(|r| {
                r.status == RecordStatus::Active
                    && r.record_type == record.record_type
                    && r.court_id == record.court_id
                    && r.date == record.date
                    && r.start_time == record.start_time
                    && r.end_time == record.end_time
            });
            if is_duplicate {
                info!(
                    "Active {:?} record for court {} on {} at {} already exists, skipping insertion",
                    record.record_type, record.court_id, record.date, record.start_time
                );
            } else {
                to_insert.push(record);
            }
        }

        if to_insert.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .map_err(|e| {
                SchedulingError::Store(format!("failed to open records file for append: {}", e))
            })?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        for record in &to_insert {
            writer
                .serialize(record)
                .map_err(|e| SchedulingError::Store(format!("failed to append record: {}", e)))?;
        }
        writer
            .flush()
            .map_err(|e| SchedulingError::Store(format!("failed to flush records: {}", e)))?;

        for record in &to_insert {
            info!(
                "Stored {:?} record {} for court {} on {}",
                record.record_type, record.record_id, record.court_id, record.date
            );
        }
        Ok(())
    }

    /// Append a single schedule record.
    pub fn insert_record(&self, record: &ScheduleRecord) -> SchedulingResult<()> {
        self.insert_records(std::slice::from_ref(record))
    }

    /// Active records for one field and date, in creation order. Replay
    /// order matters: merges are applied before locks so lock targets can
    /// reference merged spans.
    pub fn active_records_for(
        &self,
        field_id: &str,
        date: NaiveDate,
    ) -> SchedulingResult<Vec<ScheduleRecord>> {
        let _lock = self
            .file_mutex
            .lock()
            .map_err(|e| SchedulingError::Store(format!("failed to acquire store mutex: {}", e)))?;

        let mut records: Vec<ScheduleRecord> = self
            .read_all()?
            .into_iter()
            .filter(|r| {
                r.status == RecordStatus::Active && r.field_id == field_id && r.date == date
            })
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    /// Look up a single record by id.
    pub fn find_record(&self, record_id: &str) -> SchedulingResult<Option<ScheduleRecord>> {
        let _lock = self
            .file_mutex
            .lock()
            .map_err(|e| SchedulingError::Store(format!("failed to acquire store mutex: {}", e)))?;

        Ok(self
            .read_all()?
            .into_iter()
            .find(|r| r.record_id == record_id))
    }

    /// Release a batch of records in one rewrite. Fails without touching
    /// the file when any id is unknown or already released, so a partial
    /// unlock can never be persisted.
    pub fn release_records(&self, record_ids: &[String]) -> SchedulingResult<Vec<ScheduleRecord>> {
        let _lock = self
            .file_mutex
            .lock()
            .map_err(|e| SchedulingError::Store(format!("failed to acquire store mutex: {}", e)))?;

        let mut records = self.read_all()?;
        let now = Utc::now();
        let mut released = Vec::new();

        for record_id in record_ids {
            let Some(record) = records.iter_mut().find(|r| &r.record_id == record_id) else {
                warn!("No record found with id {}", record_id);
                return Err(SchedulingError::Conflict(format!(
                    "record {} does not exist",
                    record_id
                )));
            };
            if record.status != RecordStatus::Active {
                warn!("Record {} is already released", record_id);
                return Err(SchedulingError::Conflict(format!(
                    "record {} is already released",
                    record_id
                )));
            }
            record.status = RecordStatus::Released;
            record.released_at = Some(now);
            released.push(record.clone());
        }

        self.write_all(&records)?;

        for record in &released {
            info!(
                "Released {:?} record {} for court {} on {}",
                record.record_type, record.record_id, record.court_id, record.date
            );
        }
        Ok(released)
    }

    /// Release a single record.
    pub fn release_record(&self, record_id: &str) -> SchedulingResult<ScheduleRecord> {
        let released = self.release_records(&[record_id.to_string()])?;
        Ok(released.into_iter().next().expect("one record released"))
    }
}

// Convenience constructor used by main
pub fn create_database_service(csv_path: &str) -> std::sync::Arc<DatabaseService> {
    std::sync::Arc::new(DatabaseService::new(csv_path))
}

#[cfg(test)]
#[path = "database_test.rs"]
mod database_test;
