use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::mock;

use crate::client::PlatformApi;
use crate::errors::SchedulingResult;
use crate::models::field::{FieldScheduleConfig, PaidBooking};

// Mock platform API client for handler and workflow tests
mock! {
    pub VenuePlatformClient {}

    #[async_trait]
    impl PlatformApi for VenuePlatformClient {
        async fn get_schedule_config(&self, field_id: &str) -> SchedulingResult<FieldScheduleConfig>;

        async fn list_paid_bookings(
            &self,
            field_id: &str,
            date: NaiveDate,
        ) -> SchedulingResult<Vec<PaidBooking>>;

        fn get_operator_id(&self) -> &str;

        fn get_operator_name(&self) -> &str;
    }
}

/// Set up a mock client that serves the given configuration for any
/// field id, with a fixed set of paid bookings.
pub fn setup_mock_client(
    config: FieldScheduleConfig,
    bookings: Vec<PaidBooking>,
) -> MockVenuePlatformClient {
    let mut client = MockVenuePlatformClient::new();

    client
        .expect_get_schedule_config()
        .returning(move |_| Ok(config.clone()));
    client
        .expect_list_paid_bookings()
        .returning(move |_, date| {
            Ok(bookings
                .iter()
                .filter(|b| b.date == date)
                .cloned()
                .collect())
        });
    client
        .expect_get_operator_id()
        .return_const("owner-1".to_string());
    client
        .expect_get_operator_name()
        .return_const("Test Owner".to_string());

    client
}
