use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{RejectionRule, SchedulingError};
use crate::models::slot::SlotKey;

// Query parameters for the slot set read endpoint
#[derive(Debug, Deserialize)]
pub struct SlotSetParams {
    pub date: NaiveDate,
}

// Error body returned for rejected or failed requests
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RejectionRule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<SlotKey>,
}

impl ErrorResponse {
    pub fn from_error(err: &SchedulingError) -> Self {
        Self {
            error: err.to_string(),
            rule: err.rule(),
            slots: err.slots().to_vec(),
        }
    }
}
