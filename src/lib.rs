// Library exports for binary tools and tests
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use middleware::auth::JwtSecret;
use services::clock::Clock;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
}

/// Allow the configured frontend origin, plus localhost for development.
fn cors_layer(base_url: String) -> CorsLayer {
    let origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let o = match origin.to_str() {
            Ok(s) => s,
            Err(_) => return false,
        };
        o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") || o == base_url
    });

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_origin(origin)
}

pub fn app(state: AppState) -> Router {
    let jwt_secret = JwtSecret(state.config.jwt_secret.clone());
    let cors = cors_layer(state.config.app_base_url.clone());

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Auth
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/me", get(routes::auth::me))
        // Users (admin)
        .route("/users", get(routes::users::list_users).post(routes::users::create_user))
        .route("/users/{id}", put(routes::users::update_user).delete(routes::users::delete_user))
        // Bookings
        .route("/bookings", get(routes::bookings::list_bookings).post(routes::bookings::create_booking))
        .route("/bookings/summary", get(routes::bookings::get_summary))
        .route("/bookings/export", get(routes::bookings::export_week))
        .route("/bookings/rejections", get(routes::bookings::list_rejections))
        .route(
            "/bookings/{id}",
            get(routes::bookings::get_booking)
                .put(routes::bookings::update_booking)
                .delete(routes::bookings::delete_booking),
        )
        .route("/bookings/{id}/approve", post(routes::bookings::approve_booking))
        .route("/bookings/{id}/reject", post(routes::bookings::reject_booking))
        .route("/bookings/{id}/copy-next-week", post(routes::bookings::copy_next_week))
        // Statistics
        .route("/stats", get(routes::stats::get_stats))
        // Price announcements
        .route(
            "/announcements",
            get(routes::announcements::list_announcements)
                .post(routes::announcements::create_announcement),
        )
        .route("/announcements/current", get(routes::announcements::current_announcements))
        .route("/announcements/{id}", delete(routes::announcements::delete_announcement))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
