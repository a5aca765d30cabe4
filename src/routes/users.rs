use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        user::{CreateUserRequest, UpdateUserRequest, UserProfile},
    },
    routes::{api_error, internal, require_admin, ApiError},
    services::users::UserService,
    AppState,
};

/// GET /users, admin only
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    require_admin(&user)?;
    let users: Vec<UserProfile> = UserService::list(&state.db)
        .await
        .map_err(internal)?
        .into_iter()
        .map(UserProfile::from)
        .collect();
    Ok(Json(json!(users)))
}

/// POST /users, admin only
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_admin(&user)?;
    UserService::create(&state.db, &body)
        .await
        .map(|created| (StatusCode::CREATED, Json(json!(UserProfile::from(created)))))
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))
}

/// PUT /users/{id}, admin only
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&user)?;
    UserService::update(&state.db, id, &body)
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?
        .map(|updated| Json(json!(UserProfile::from(updated))))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "User not found"))
}

/// DELETE /users/{id}, admin only, never oneself
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&user)?;
    if id == user.user_id {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "You cannot delete your own account",
        ));
    }
    if !UserService::delete(&state.db, id).await.map_err(internal)? {
        return Err(api_error(StatusCode::NOT_FOUND, "User not found"));
    }
    tracing::info!("User {id} deleted by {}", user.user_id);
    Ok(Json(json!({ "ok": true })))
}
