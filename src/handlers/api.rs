use axum::{
    extract::{Json as ExtractJson, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{Months, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::client::PlatformApi;
use crate::errors::{RejectionRule, SchedulingError, SchedulingResult};
use crate::models::common::{ErrorResponse, SlotSetParams};
use crate::models::field::{validate_schedule_config, FieldScheduleConfig};
use crate::models::slot::{
    LockActionResponse, LockRequest, MergeRequest, SlotSetResponse, UnlockRequest,
};
use crate::services::database::{
    generate_record_id, DatabaseService, RecordStatus, RecordType, ScheduleRecord,
};
use crate::services::locking::{plan_locks, validate_unlock};
use crate::services::merge::{plan_merge, validate_unmerge};
use crate::services::slot_set::build_slot_set;

// AppState struct containing shared resources
pub struct AppState {
    pub client: Arc<dyn PlatformApi>,
    pub database: Arc<DatabaseService>,
}

// Error responses carry the failed rule and slots where applicable
type ApiError = (StatusCode, Json<ErrorResponse>);

fn into_response(err: SchedulingError) -> ApiError {
    let status = match &err {
        SchedulingError::MergeRejected { .. }
        | SchedulingError::UnmergeRejected { .. }
        | SchedulingError::LockRejected { .. }
        | SchedulingError::UnlockRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SchedulingError::Conflict(_) => StatusCode::CONFLICT,
        SchedulingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        SchedulingError::PlatformApi(_) => StatusCode::BAD_GATEWAY,
        SchedulingError::Configuration(_) | SchedulingError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }

    (status, Json(ErrorResponse::from_error(&err)))
}

// Fetch configuration and derive the current slot set for a field+date
async fn load_slot_set(
    state: &AppState,
    field_id: &str,
    date: NaiveDate,
) -> SchedulingResult<(FieldScheduleConfig, SlotSetResponse)> {
    let config = state.client.get_schedule_config(field_id).await?;
    validate_schedule_config(&config)?;

    let records = state.database.active_records_for(field_id, date)?;
    let bookings = state.client.list_paid_bookings(field_id, date).await?;
    let slot_set = build_slot_set(&config, date, &records, &bookings)?;
    Ok((config, slot_set))
}

fn check_booking_window(config: &FieldScheduleConfig, date: NaiveDate) -> SchedulingResult<()> {
    let today = Utc::now().date_naive();
    if date < today {
        return Err(SchedulingError::InvalidRequest(format!(
            "date {} is in the past",
            date
        )));
    }
    let horizon = today
        .checked_add_months(Months::new(config.field.month_limit))
        .ok_or_else(|| {
            SchedulingError::Configuration("booking horizon overflows the calendar".to_string())
        })?;
    if date > horizon {
        return Err(SchedulingError::InvalidRequest(format!(
            "date {} is more than {} months ahead",
            date, config.field.month_limit
        )));
    }
    Ok(())
}

fn check_field_id(path_field_id: &str, body_field_id: &str) -> SchedulingResult<()> {
    if path_field_id != body_field_id {
        return Err(SchedulingError::InvalidRequest(format!(
            "field id {} in the body does not match {} in the path",
            body_field_id, path_field_id
        )));
    }
    Ok(())
}

// Slot set read endpoint
pub async fn get_slot_set(
    State(state): State<Arc<AppState>>,
    Path(field_id): Path<String>,
    Query(params): Query<SlotSetParams>,
) -> Result<Json<SlotSetResponse>, ApiError> {
    info!(
        "Received request for slot set of field {} on {}",
        field_id, params.date
    );

    let result = async {
        let (config, slot_set) = load_slot_set(&state, &field_id, params.date).await?;
        check_booking_window(&config, params.date)?;
        Ok(slot_set)
    }
    .await;

    match result {
        Ok(slot_set) => {
            info!(
                "Returning slot set for field {} with {} courts",
                field_id,
                slot_set.courts.len()
            );
            Ok(Json(slot_set))
        }
        Err(err) => Err(into_response(err)),
    }
}

// Merge endpoint: replace a contiguous run of available slots in one
// court with a single priced slot
pub async fn merge_slots(
    State(state): State<Arc<AppState>>,
    Path(field_id): Path<String>,
    ExtractJson(request): ExtractJson<MergeRequest>,
) -> Result<Json<SlotSetResponse>, ApiError> {
    info!(
        "Received merge request for field {} on {}",
        field_id, request.date
    );

    match merge_slots_inner(&state, &field_id, &request).await {
        Ok(slot_set) => {
            info!("Merge completed for field {} on {}", field_id, request.date);
            Ok(Json(slot_set))
        }
        Err(err) => Err(into_response(err)),
    }
}

async fn merge_slots_inner(
    state: &AppState,
    field_id: &str,
    request: &MergeRequest,
) -> SchedulingResult<SlotSetResponse> {
    check_field_id(field_id, &request.field_id)?;

    // Exactly one court entry is valid per merge call
    if request.courts.is_empty() {
        return Err(SchedulingError::MergeRejected {
            rule: RejectionRule::EmptySelection,
            slots: Vec::new(),
        });
    }
    if request.courts.len() > 1 {
        return Err(SchedulingError::MergeRejected {
            rule: RejectionRule::MultipleCourts,
            slots: Vec::new(),
        });
    }
    let selection = &request.courts[0];

    let (config, slot_set) = load_slot_set(state, field_id, request.date).await?;
    let Some(court) = slot_set.court(&selection.id) else {
        return Err(SchedulingError::Conflict(format!(
            "court {} is not part of field {}",
            selection.id, field_id
        )));
    };

    let plan = plan_merge(
        &selection.id,
        &court.slots,
        &selection.time_slots,
        config.field.min_booking_minutes,
    )?;

    let record = ScheduleRecord {
        record_id: generate_record_id("merge"),
        record_type: RecordType::Merge,
        field_id: field_id.to_string(),
        court_id: plan.court_id.clone(),
        date: request.date,
        start_time: plan.start_time,
        end_time: plan.end_time,
        price: Some(plan.merged_price(request.price)),
        absorbed_slots: ScheduleRecord::encode_absorbed(&plan.absorbed)?,
        status: RecordStatus::Active,
        created_at: Utc::now(),
        released_at: None,
        operator_name: state.client.get_operator_name().to_string(),
        operator_id: state.client.get_operator_id().to_string(),
    };
    state.database.insert_record(&record)?;

    // Re-derive the timeline with the new record applied
    let records = state.database.active_records_for(field_id, request.date)?;
    let bookings = state
        .client
        .list_paid_bookings(field_id, request.date)
        .await?;
    build_slot_set(&config, request.date, &records, &bookings)
}

// Unmerge endpoint: release a merge record and restore the absorbed
// elementary slots
pub async fn unmerge_slot(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
) -> Result<Json<SlotSetResponse>, ApiError> {
    info!("Received unmerge request for record {}", record_id);

    match unmerge_slot_inner(&state, &record_id).await {
        Ok(slot_set) => {
            info!("Unmerge of record {} completed", record_id);
            Ok(Json(slot_set))
        }
        Err(err) => Err(into_response(err)),
    }
}

async fn unmerge_slot_inner(
    state: &AppState,
    record_id: &str,
) -> SchedulingResult<SlotSetResponse> {
    let Some(record) = state.database.find_record(record_id)? else {
        return Err(SchedulingError::UnmergeRejected {
            rule: RejectionRule::UnknownRecord,
            slots: Vec::new(),
        });
    };

    let (config, slot_set) = load_slot_set(state, &record.field_id, record.date).await?;
    let Some(court) = slot_set.court(&record.court_id) else {
        return Err(SchedulingError::Conflict(format!(
            "court {} is not part of field {}",
            record.court_id, record.field_id
        )));
    };

    let absorbed = validate_unmerge(&record, &court.slots)?;
    info!(
        "Restoring {} elementary slots for record {}",
        absorbed.len(),
        record.record_id
    );

    state.database.release_record(record_id)?;

    let records = state
        .database
        .active_records_for(&record.field_id, record.date)?;
    let bookings = state
        .client
        .list_paid_bookings(&record.field_id, record.date)
        .await?;
    build_slot_set(&config, record.date, &records, &bookings)
}

// Lock endpoint: take slots out of sale, possibly across courts
pub async fn lock_slots(
    State(state): State<Arc<AppState>>,
    Path(field_id): Path<String>,
    ExtractJson(request): ExtractJson<LockRequest>,
) -> Result<Json<LockActionResponse>, ApiError> {
    info!(
        "Received lock request for field {} on {} covering {} courts",
        field_id,
        request.date,
        request.courts.len()
    );

    match lock_slots_inner(&state, &field_id, &request).await {
        Ok(record_ids) => {
            info!(
                "Locked {} slots for field {} on {}",
                record_ids.len(),
                field_id,
                request.date
            );
            Ok(Json(LockActionResponse {
                success: true,
                message: format!("{} slots locked", record_ids.len()),
                record_ids,
            }))
        }
        Err(err) => Err(into_response(err)),
    }
}

async fn lock_slots_inner(
    state: &AppState,
    field_id: &str,
    request: &LockRequest,
) -> SchedulingResult<Vec<String>> {
    check_field_id(field_id, &request.field_id)?;

    let (_, slot_set) = load_slot_set(state, field_id, request.date).await?;
    let targets = plan_locks(&slot_set, request)?;

    let now = Utc::now();
    let records: Vec<ScheduleRecord> = targets
        .iter()
        .map(|target| ScheduleRecord {
            record_id: generate_record_id("lock"),
            record_type: RecordType::Lock,
            field_id: field_id.to_string(),
            court_id: target.court_id.clone(),
            date: request.date,
            start_time: target.start_time,
            end_time: target.end_time,
            price: None,
            absorbed_slots: String::new(),
            status: RecordStatus::Active,
            created_at: now,
            released_at: None,
            operator_name: state.client.get_operator_name().to_string(),
            operator_id: state.client.get_operator_id().to_string(),
        })
        .collect();

    state.database.insert_records(&records)?;
    Ok(records.into_iter().map(|r| r.record_id).collect())
}

// Unlock endpoint: release lock records, restoring their slots to sale
pub async fn unlock_slots(
    State(state): State<Arc<AppState>>,
    Path(field_id): Path<String>,
    ExtractJson(request): ExtractJson<UnlockRequest>,
) -> Result<Json<LockActionResponse>, ApiError> {
    info!(
        "Received unlock request for field {} on {} with {} records",
        field_id,
        request.date,
        request.record_ids.len()
    );

    match unlock_slots_inner(&state, &field_id, &request).await {
        Ok(record_ids) => {
            info!(
                "Unlocked {} slots for field {} on {}",
                record_ids.len(),
                field_id,
                request.date
            );
            Ok(Json(LockActionResponse {
                success: true,
                message: format!("{} slots unlocked", record_ids.len()),
                record_ids,
            }))
        }
        Err(err) => Err(into_response(err)),
    }
}

async fn unlock_slots_inner(
    state: &AppState,
    field_id: &str,
    request: &UnlockRequest,
) -> SchedulingResult<Vec<String>> {
    check_field_id(field_id, &request.field_id)?;

    let (_, slot_set) = load_slot_set(state, field_id, request.date).await?;

    let mut records = Vec::with_capacity(request.record_ids.len());
    for record_id in &request.record_ids {
        records.push(state.database.find_record(record_id)?);
    }
    validate_unlock(&slot_set, &request.record_ids, &records)?;

    let released = state.database.release_records(&request.record_ids)?;
    Ok(released.into_iter().map(|r| r.record_id).collect())
}

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;
