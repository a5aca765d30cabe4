//! Write the weekly booking tables of a year as CSV files.
//! Same layout as GET /bookings/export, one file per week.
//!
//! Usage: export-bookings --year YEAR [--week N] [--out DIR]

use std::path::PathBuf;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use fishbook_api::services::{
    bookings::BookingService,
    export::{export_file_name, write_week_csv},
    summary,
    week::WeekBucket,
};

#[derive(Parser)]
#[command(name = "export-bookings", about = "Export weekly booking summaries as CSV")]
struct Args {
    /// Booking year
    #[arg(long)]
    year: i32,

    /// Only this week number (all weeks of the year if not specified)
    #[arg(long)]
    week: Option<i32>,

    /// Output directory (defaults to EXPORT_DIR, then ./exports)
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    if let Some(week) = args.week {
        WeekBucket::new(args.year, u32::try_from(week)?)?;
    }

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;
    let out_dir = args
        .out
        .or_else(|| std::env::var("EXPORT_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./exports"));

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    let bookings = BookingService::list_year(&pool, args.year).await?;
    tracing::info!("Loaded {} bookings for {}", bookings.len(), args.year);

    let weeks = match args.week {
        Some(week) => summary::project_one(&bookings, week).into_iter().collect(),
        None => summary::project(&bookings),
    };
    if weeks.is_empty() {
        tracing::warn!("Nothing to export");
        return Ok(());
    }

    std::fs::create_dir_all(&out_dir)?;
    for week in &weeks {
        let path = out_dir.join(export_file_name(args.year, week.week_number));
        let file = std::fs::File::create(&path)?;
        write_week_csv(week, file)?;
        tracing::info!(
            "Week {} ({} bookings) -> {}",
            week.week_number,
            week.rows.len(),
            path.display()
        );
    }

    tracing::info!("Export completed: {} file(s)", weeks.len());
    Ok(())
}
