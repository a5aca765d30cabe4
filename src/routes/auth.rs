use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;

use crate::{
    models::{
        auth::AuthenticatedUser,
        user::{LoginRequest, UserProfile},
    },
    routes::{api_error, internal, ApiError},
    services::{auth::AuthService, metrics::LOGINS_COUNTER, users::UserService},
    AppState,
};

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    match AuthService::login(
        &state.db,
        &body.email,
        &body.password,
        &state.config.jwt_secret,
        state.config.jwt_expiry_seconds,
    )
    .await
    {
        Ok(response) => {
            LOGINS_COUNTER.with_label_values(&["success"]).inc();
            Ok(Json(serde_json::to_value(response).map_err(internal)?))
        }
        Err(e) => {
            LOGINS_COUNTER.with_label_values(&["failure"]).inc();
            tracing::warn!("Failed login for {}: {}", body.email, e);
            Err(api_error(StatusCode::UNAUTHORIZED, e))
        }
    }
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let found = UserService::get(&state.db, user.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "User not found"))?;
    Ok(Json(
        serde_json::to_value(UserProfile::from(found)).map_err(internal)?,
    ))
}
