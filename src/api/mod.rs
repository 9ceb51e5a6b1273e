//! HTTP API Module
//!
//! The only sanctioned caller of the ledger. Validates input, maps ledger
//! outcomes to status codes and serializes badges as JSON.
//!
//! ## Endpoints
//! - `POST /api/badges`: record a badge (201 created, 200 already held, 400 invalid).
//! - `GET /api/badges/:username`: list one user's badges.
//! - `GET /api/status`: service status and ledger totals.
//!
//! Storage failures surface as 500 with a `{"message": ...}` body.

pub mod handlers;
pub mod types;

use crate::ledger::Ledger;
use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use handlers::{handle_create_badge, handle_get_badges, handle_status};

pub const ENDPOINT_BADGES: &str = "/api/badges";
pub const ENDPOINT_USER_BADGES: &str = "/api/badges/:username";
pub const ENDPOINT_STATUS: &str = "/api/status";

pub fn router(ledger: Ledger) -> Router {
    Router::new()
        .route(ENDPOINT_BADGES, post(handle_create_badge))
        .route(ENDPOINT_USER_BADGES, get(handle_get_badges))
        .route(ENDPOINT_STATUS, get(handle_status))
        .layer(Extension(ledger))
}
