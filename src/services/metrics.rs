use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Gauge,
};
use sqlx::PgPool;
use tracing::{info, warn};

lazy_static! {
    // ── Event counters ──────────────────────────────────────────────────────
    pub static ref BOOKINGS_CREATED_COUNTER: CounterVec = register_counter_vec!(
        "api_bookings_created_total",
        "Bookings submitted, by customer group",
        &["customer_group"]
    ).unwrap();

    pub static ref BOOKING_DECISIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_booking_decisions_total",
        "Booking approvals and rejections",
        &["status"]
    ).unwrap();

    pub static ref EXPORTS_COUNTER: Counter = register_counter!(
        "api_booking_exports_total",
        "Weekly CSV exports downloaded"
    ).unwrap();

    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by status",
        &["status"]
    ).unwrap();

    // ── Business metrics ────────────────────────────────────────────────────
    pub static ref BOOKINGS_GAUGE: Gauge = register_gauge!(
        "fishbook_bookings_total",
        "Bookings stored"
    ).unwrap();

    pub static ref PENDING_BOOKINGS_GAUGE: Gauge = register_gauge!(
        "fishbook_bookings_pending_total",
        "Bookings waiting for an admin decision"
    ).unwrap();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        if let Err(e) = collect(&pool).await {
            warn!("Metrics: initial collection failed: {}", e);
        }
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
        }
    });
}

async fn collect(pool: &PgPool) -> anyhow::Result<()> {
    let (total, pending): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*)::BIGINT,
                COUNT(*) FILTER (WHERE status = 'pending')::BIGINT
         FROM bookings",
    )
    .fetch_one(pool)
    .await?;

    BOOKINGS_GAUGE.set(total as f64);
    PENDING_BOOKINGS_GAUGE.set(pending as f64);

    info!("Metrics: {} bookings ({} pending)", total, pending);
    Ok(())
}
