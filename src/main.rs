use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fishbook_api::{
    app,
    config::Config,
    db,
    services::{clock::SystemClock, metrics, users::UserService},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => {
            UserService::ensure_bootstrap_admin(&pool, email, password).await?;
        }
        _ => info!("ADMIN_EMAIL/ADMIN_PASSWORD not set; skipping admin bootstrap"),
    }

    metrics::start(pool.clone());

    let state = AppState {
        db: pool,
        config: config.clone(),
        clock: Arc::new(SystemClock),
    };

    let addr = format!("{}:{}", config.host, config.port);
    info!("fishbook API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
