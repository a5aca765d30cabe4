use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{announcement::CreateAnnouncementRequest, auth::AuthenticatedUser},
    routes::{api_error, internal, require_admin, ApiError},
    services::announcements::{validate_announcement, AnnouncementService},
    AppState,
};

/// GET /announcements, every bulletin, flagged with whether it is valid today.
pub async fn list_announcements(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    let today = state.clock.today();
    let rows = AnnouncementService::list(&state.db)
        .await
        .map_err(internal)?;
    let result: Vec<Value> = rows
        .iter()
        .map(|a| {
            let mut value = json!(a);
            value["active"] = json!(a.is_valid_on(today));
            value
        })
        .collect();
    Ok(Json(json!(result)))
}

/// GET /announcements/current, bulletins valid today, latest first.
pub async fn current_announcements(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    AnnouncementService::current(&state.db, state.clock.today())
        .await
        .map(|rows| Json(json!(rows)))
        .map_err(internal)
}

/// POST /announcements, admin only
pub async fn create_announcement(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_admin(&user)?;
    validate_announcement(&body).map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    AnnouncementService::create(&state.db, &body, user.user_id)
        .await
        .map(|a| (StatusCode::CREATED, Json(json!(a))))
        .map_err(internal)
}

/// DELETE /announcements/{id}, admin only
pub async fn delete_announcement(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&user)?;
    if !AnnouncementService::delete(&state.db, id)
        .await
        .map_err(internal)?
    {
        return Err(api_error(StatusCode::NOT_FOUND, "Announcement not found"));
    }
    tracing::info!("Announcement {id} deleted");
    Ok(Json(json!({ "ok": true })))
}
