use async_trait::async_trait;
use chrono::NaiveDate;
use dotenv::dotenv;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use tracing::{debug, info};

use crate::auth::PlatformAuth;
use crate::errors::{SchedulingError, SchedulingResult};
use crate::models::field::{FieldScheduleConfig, PaidBooking};

// Paid bookings response from the platform API
#[derive(Debug, Deserialize)]
pub struct PaidBookingsResponse {
    pub total_count: i32,
    pub bookings: Vec<PaidBooking>,
}

/// The slice of the platform core API this service depends on. The real
/// client signs HTTP requests; tests substitute a mock.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Field and court configuration for one field.
    async fn get_schedule_config(&self, field_id: &str) -> SchedulingResult<FieldScheduleConfig>;

    /// Paid bookings for one field and date.
    async fn list_paid_bookings(
        &self,
        field_id: &str,
        date: NaiveDate,
    ) -> SchedulingResult<Vec<PaidBooking>>;

    /// Operator the service acts as when persisting schedule records.
    fn get_operator_id(&self) -> &str;

    fn get_operator_name(&self) -> &str;
}

/// Client for the venue platform core API
pub struct VenuePlatformClient {
    client: Client,
    app_id: String,
    secret_id: String,
    secret_key: String,
    endpoint: String,
    operator_id: String,
    operator_name: String,
}

impl VenuePlatformClient {
    /// Create a new platform client from environment variables
    pub fn new() -> Self {
        dotenv().ok();

        Self {
            client: Client::new(),
            app_id: env::var("VENUE_PLATFORM_APP_ID")
                .expect("VENUE_PLATFORM_APP_ID must be set in environment"),
            secret_id: env::var("VENUE_PLATFORM_SECRET_ID")
                .expect("VENUE_PLATFORM_SECRET_ID must be set in environment"),
            secret_key: env::var("VENUE_PLATFORM_SECRET_KEY")
                .expect("VENUE_PLATFORM_SECRET_KEY must be set in environment"),
            endpoint: env::var("VENUE_PLATFORM_API_ENDPOINT")
                .unwrap_or_else(|_| "https://api.venue-platform.example.com".to_string()),
            operator_id: env::var("VENUE_PLATFORM_OPERATOR_ID")
                .unwrap_or_else(|_| "scheduler".to_string()),
            operator_name: env::var("VENUE_PLATFORM_OPERATOR_NAME")
                .unwrap_or_else(|_| "Court Scheduler".to_string()),
        }
    }

    /// Generate signature for platform API requests
    fn generate_signature(
        &self,
        method: &str,
        uri: &str,
        timestamp: i64,
        nonce: &str,
        body: &str,
    ) -> String {
        PlatformAuth::generate_signature(
            &self.secret_id,
            &self.secret_key,
            method,
            uri,
            timestamp,
            nonce,
            body,
        )
    }

    // Signed GET request against the platform API
    async fn signed_get<T: serde::de::DeserializeOwned>(
        &self,
        full_uri: &str,
    ) -> SchedulingResult<T> {
        let url = format!("{}{}", self.endpoint, full_uri);

        let timestamp = PlatformAuth::get_timestamp();
        let nonce = PlatformAuth::generate_nonce();
        let request_body = ""; // Empty for GET request

        let signature = self.generate_signature("GET", full_uri, timestamp, &nonce, request_body);

        debug!("Platform API URL: {}", url);

        let res = self
            .client
            .get(&url)
            .header("Content-Type", "application/json")
            .header("X-Vp-Key", &self.secret_id)
            .header("X-Vp-Timestamp", timestamp.to_string())
            .header("X-Vp-Nonce", &nonce)
            .header("X-Vp-Signature", signature)
            .header("AppId", &self.app_id)
            .send()
            .await
            .map_err(|e| SchedulingError::PlatformApi(e.to_string()))?;

        info!("Platform API response status: {}", res.status());

        if !res.status().is_success() {
            return Err(SchedulingError::PlatformApi(format!(
                "platform API returned status {} for {}",
                res.status(),
                full_uri
            )));
        }

        res.json::<T>()
            .await
            .map_err(|e| SchedulingError::PlatformApi(e.to_string()))
    }
}

#[async_trait]
impl PlatformApi for VenuePlatformClient {
    async fn get_schedule_config(&self, field_id: &str) -> SchedulingResult<FieldScheduleConfig> {
        let uri = format!("/v1/fields/{}/schedule-config", field_id);

        info!("Fetching schedule config for field {}", field_id);
        self.signed_get(&uri).await
    }

    async fn list_paid_bookings(
        &self,
        field_id: &str,
        date: NaiveDate,
    ) -> SchedulingResult<Vec<PaidBooking>> {
        let uri = format!("/v1/bookings?field_id={}&date={}", field_id, date);

        info!("Fetching paid bookings for field {} on {}", field_id, date);
        let response: PaidBookingsResponse = self.signed_get(&uri).await?;

        info!(
            "Retrieved {} paid bookings for field {}",
            response.total_count, field_id
        );
        Ok(response.bookings)
    }

    fn get_operator_id(&self) -> &str {
        &self.operator_id
    }

    fn get_operator_name(&self) -> &str {
        &self.operator_name
    }
}
