use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::info;

use crate::handlers::api::{
    get_slot_set, lock_slots, merge_slots, unlock_slots, unmerge_slot, AppState,
};
use crate::handlers::test::{health_check, sample_requests};

pub fn create_router(app_state: Arc<AppState>, is_production: bool) -> Router {
    let mut router = Router::new();

    // Health check is always available
    let health_route = Router::new().route("/health", get(health_check));
    router = router.merge(health_route);

    // Scheduling engine routes are always available
    let scheduling_routes = Router::new()
        .route("/fields/:field_id/slots", get(get_slot_set))
        .route("/fields/:field_id/slots/merge", post(merge_slots))
        .route("/slots/:record_id/unmerge", post(unmerge_slot))
        .route("/fields/:field_id/slots/lock", post(lock_slots))
        .route("/fields/:field_id/slots/unlock", post(unlock_slots));
    router = router.merge(scheduling_routes);

    // Only expose sample payload routes outside production
    if !is_production {
        let sample_routes = Router::new().route("/test/sample-requests", get(sample_requests));
        router = router.merge(sample_routes);

        info!("Sample request routes enabled - server running in development mode");
    } else {
        info!("Running in production mode - only scheduling and health endpoints exposed");
    }

    router.with_state(app_state)
}
