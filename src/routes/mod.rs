pub mod announcements;
pub mod auth;
pub mod bookings;
pub mod health;
pub mod metrics;
pub mod stats;
pub mod users;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use crate::models::auth::AuthenticatedUser;

/// Error shape returned by every handler: `{ "error": "..." }`.
pub type ApiError = (StatusCode, Json<Value>);

pub fn api_error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (status, Json(json!({ "error": message.to_string() })))
}

pub fn internal(e: impl std::fmt::Display) -> ApiError {
    tracing::error!("request failed: {e}");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
}

pub fn require_admin(user: &AuthenticatedUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(api_error(StatusCode::FORBIDDEN, "Access denied"))
    }
}
