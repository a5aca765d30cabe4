use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    models::auth::AuthenticatedUser,
    routes::{api_error, internal, ApiError},
    services::{bookings::BookingService, stats, week::WeekRule},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Defaults to the current year.
    pub year: Option<i32>,
    pub week_rule: Option<String>,
}

/// GET /stats?year=&week_rule=monday|day_of_year
///
/// Answers `{ "status": "no_data" }` when the year has no bookings.
pub async fn get_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<StatsQuery>,
) -> Result<Json<Value>, ApiError> {
    let rule: WeekRule = match params.week_rule.as_deref() {
        Some(s) => s
            .parse()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?,
        None => WeekRule::default(),
    };
    let year = params.year.unwrap_or_else(|| state.clock.current_year());

    // By creation date: early-January bookings filed under last year's final
    // week still belong to this year's report.
    let only_code = (!user.is_admin()).then_some(user.code.as_str());
    let bookings = BookingService::list_created_in(&state.db, year, only_code)
        .await
        .map_err(internal)?;

    match stats::summarize(&bookings, year, rule).map_err(internal)? {
        Some(report) => Ok(Json(json!({ "status": "ok", "stats": report }))),
        None => Ok(Json(json!({ "status": "no_data", "year": year }))),
    }
}
