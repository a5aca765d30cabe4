use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        booking::{Booking, BookingQuery, BookingRequest, SummaryQuery},
    },
    routes::{api_error, internal, require_admin, ApiError},
    services::{
        bookings::{BookingError, BookingService},
        export::{export_file_name, week_csv_bytes},
        metrics::{BOOKINGS_CREATED_COUNTER, BOOKING_DECISIONS_COUNTER, EXPORTS_COUNTER},
        summary,
        week::WeekBucket,
    },
    AppState,
};

fn booking_error(e: BookingError) -> ApiError {
    match e {
        BookingError::NotFound => api_error(StatusCode::NOT_FOUND, e),
        BookingError::NotPending(_) | BookingError::Rejected | BookingError::Conflict => {
            api_error(StatusCode::CONFLICT, e)
        }
        BookingError::Invalid(_) => api_error(StatusCode::BAD_REQUEST, e),
        BookingError::Database(_) | BookingError::Other(_) => internal(e),
    }
}

/// 400 unless `week_number` names a week of `year`.
fn check_week(year: i32, week_number: i32) -> Result<WeekBucket, ApiError> {
    let week = u32::try_from(week_number).map_err(|_| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("Week {week_number} does not exist in {year}"),
        )
    })?;
    WeekBucket::new(year, week).map_err(|e| api_error(StatusCode::BAD_REQUEST, e))
}

fn to_json(booking: &Booking) -> Result<Json<Value>, ApiError> {
    serde_json::to_value(booking).map(Json).map_err(internal)
}

/// Load a booking the caller may see. Other users' bookings look missing.
async fn load_owned(
    state: &AppState,
    user: &AuthenticatedUser,
    id: Uuid,
) -> Result<Booking, ApiError> {
    let booking = BookingService::get(&state.db, id)
        .await
        .map_err(booking_error)?;
    if !user.can_access_code(&booking.code) {
        return Err(booking_error(BookingError::NotFound));
    }
    Ok(booking)
}

/// GET /bookings?year=&week_number=&code=&status=
pub async fn list_bookings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<BookingQuery>,
) -> Result<Json<Value>, ApiError> {
    let only_code = (!user.is_admin()).then_some(user.code.as_str());
    let bookings = BookingService::list(&state.db, &params, only_code)
        .await
        .map_err(internal)?;
    Ok(Json(json!(bookings)))
}

/// POST /bookings
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let booking = BookingService::create(&state.db, &body, &user, state.clock.now())
        .await
        .map_err(booking_error)?;
    BOOKINGS_CREATED_COUNTER
        .with_label_values(&[booking.customer_group.to_string().as_str()])
        .inc();
    Ok((StatusCode::CREATED, to_json(&booking)?))
}

/// GET /bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let booking = load_owned(&state, &user, id).await?;
    to_json(&booking)
}

/// PUT /bookings/{id}, owner or admin
pub async fn update_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<BookingRequest>,
) -> Result<Json<Value>, ApiError> {
    load_owned(&state, &user, id).await?;
    let booking = BookingService::update(&state.db, id, &body, &user, state.clock.now())
        .await
        .map_err(booking_error)?;
    to_json(&booking)
}

/// DELETE /bookings/{id}, owner or admin
pub async fn delete_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    load_owned(&state, &user, id).await?;
    BookingService::delete(&state.db, id)
        .await
        .map_err(booking_error)?;
    Ok(Json(json!({ "ok": true })))
}

/// POST /bookings/{id}/approve, admin only
pub async fn approve_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&user)?;
    let booking = BookingService::approve(&state.db, id, state.clock.now())
        .await
        .map_err(booking_error)?;
    BOOKING_DECISIONS_COUNTER.with_label_values(&["approved"]).inc();
    to_json(&booking)
}

/// POST /bookings/{id}/reject, admin only
pub async fn reject_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&user)?;
    let booking = BookingService::reject(&state.db, id, user.user_id, state.clock.now())
        .await
        .map_err(booking_error)?;
    BOOKING_DECISIONS_COUNTER.with_label_values(&["rejected"]).inc();
    to_json(&booking)
}

/// POST /bookings/{id}/copy-next-week
pub async fn copy_next_week(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let booking = BookingService::copy_to_next_week(&state.db, id, &user, state.clock.now())
        .await
        .map_err(booking_error)?;
    BOOKINGS_CREATED_COUNTER
        .with_label_values(&[booking.customer_group.to_string().as_str()])
        .inc();
    Ok((StatusCode::CREATED, to_json(&booking)?))
}

/// GET /bookings/rejections, admin only
pub async fn list_rejections(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    require_admin(&user)?;
    let logs = BookingService::list_rejections(&state.db)
        .await
        .map_err(internal)?;
    Ok(Json(json!(logs)))
}

/// GET /bookings/summary?year=, per-week tables for the year
pub async fn get_summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<Value>, ApiError> {
    let year = params.year.unwrap_or_else(|| state.clock.current_year());
    if let Some(week_number) = params.week_number {
        check_week(year, week_number)?;
    }
    let query = BookingQuery {
        year: Some(year),
        week_number: params.week_number,
        ..Default::default()
    };
    let only_code = (!user.is_admin()).then_some(user.code.as_str());
    let bookings = BookingService::list(&state.db, &query, only_code)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "year": year,
        "weeks": summary::project(&bookings),
    })))
}

/// GET /bookings/export?year=&week_number=, one week as a CSV download, admin only
pub async fn export_week(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<SummaryQuery>,
) -> Result<Response, ApiError> {
    require_admin(&user)?;
    let year = params.year.unwrap_or_else(|| state.clock.current_year());
    let week_number = params
        .week_number
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "week_number is required"))?;
    check_week(year, week_number)?;

    let bookings = BookingService::list_year(&state.db, year)
        .await
        .map_err(internal)?;
    let week = summary::project_one(&bookings, week_number).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("No bookings for week {week_number} of {year}"),
        )
    })?;
    let bytes = week_csv_bytes(&week).map_err(internal)?;
    EXPORTS_COUNTER.inc();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                export_file_name(year, week_number)
            ),
        )
        .body(Body::from(bytes))
        .map_err(internal)
}
