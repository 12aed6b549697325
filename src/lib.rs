//! Court Scheduling Service
//!
//! This library implements the court time-slot scheduling engine of the
//! venue booking platform: deriving a gapless, non-overlapping timeline of
//! bookable units per court per day, and the controlled mutations over it
//! (merging contiguous units, splitting them back, locking units out of
//! sale).
//!
//! # Modules
//!
//! - `client`: VenuePlatformClient for field configuration and bookings
//! - `auth`: request signing for the platform core API
//! - `services`: the scheduling engine (grid, pricing, slot sets, merge,
//!   locking, selection) and the schedule record store
//! - `handlers`: HTTP surface for the consoles
//!
//! # Authentication
//!
//! Outbound requests use AKSK (AppId, SecretId, SecretKey) authentication
//! with HMAC-SHA256 signatures as required by the platform core API. The
//! signing logic is encapsulated in the `auth` module.

pub mod auth;
pub mod client;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
pub mod client_mock;
#[cfg(test)]
mod tests;

// Re-export the main API types for ease of use
pub use client::{PlatformApi, VenuePlatformClient};
pub use errors::{RejectionRule, SchedulingError, SchedulingResult};
pub use handlers::api::AppState;
pub use routes::create_router;
