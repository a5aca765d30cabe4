use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        booking::{
            Booking, BookingQuery, BookingRequest, BookingRow, BookingStatus, DailyQuantities,
            RejectedBookingLog, FISH_SIZES, FISH_TYPES,
        },
    },
    services::{
        quantities::{shift_daily_quantities, validate_week_quantities},
        week::{calendar_year_range, week_of, WeekBucket},
    },
};

const BOOKING_COLUMNS: &str = "id, code, team_name, customer_group, customer_name, fish_size, \
     fish_type, price, daily_quantities, week_number, year, status, created_by, created_at, \
     updated_at";

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Booking not found")]
    NotFound,

    #[error("Booking is already {0}")]
    NotPending(BookingStatus),

    #[error("Rejected bookings cannot be edited")]
    Rejected,

    #[error("Booking was modified by another request, reload and retry")]
    Conflict,

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Check a price given as decimal text.
pub fn validate_price(price: &str) -> anyhow::Result<()> {
    let value: f64 = price
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid price: {price}"))?;
    anyhow::ensure!(
        value.is_finite() && value >= 0.0,
        "Price must be a non-negative number: {price}"
    );
    Ok(())
}

pub fn validate_fish(fish_type: &str, fish_size: &str) -> anyhow::Result<()> {
    anyhow::ensure!(
        FISH_TYPES.contains(&fish_type),
        "Invalid fish type: {fish_type}"
    );
    anyhow::ensure!(
        FISH_SIZES.contains(&fish_size),
        "Invalid fish size: {fish_size}"
    );
    Ok(())
}

/// Validate a submission; returns the week its daily quantities cover.
pub fn validate_request(req: &BookingRequest) -> anyhow::Result<WeekBucket> {
    anyhow::ensure!(!req.team_name.trim().is_empty(), "team_name is required");
    if let Some(code) = &req.code {
        anyhow::ensure!(!code.trim().is_empty(), "code must not be blank");
    }
    validate_fish(&req.fish_type, &req.fish_size)?;
    validate_price(&req.price)?;
    validate_week_quantities(&req.daily_quantities)
}

/// Only pending bookings can be approved or rejected.
pub fn ensure_pending(status: BookingStatus) -> Result<(), BookingError> {
    match status {
        BookingStatus::Pending => Ok(()),
        other => Err(BookingError::NotPending(other)),
    }
}

/// Error for a decision whose conditional update matched no pending row,
/// given the status the booking has now.
fn decision_conflict(current: Option<BookingStatus>) -> BookingError {
    match current {
        None => BookingError::NotFound,
        Some(BookingStatus::Pending) => BookingError::Conflict,
        Some(status) => BookingError::NotPending(status),
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> anyhow::Result<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

pub struct BookingService;

impl BookingService {
    /// List bookings, optionally filtered by year / week number / code / status.
    /// `only_code` narrows the list to one submitter regardless of the query.
    pub async fn list(
        pool: &PgPool,
        query: &BookingQuery,
        only_code: Option<&str>,
    ) -> anyhow::Result<Vec<Booking>> {
        let code = only_code.or(query.code.as_deref());
        let status = query.status.map(|s| s.to_string());
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"SELECT {BOOKING_COLUMNS}
               FROM bookings
               WHERE ($1::INT IS NULL OR year = $1)
                 AND ($2::INT IS NULL OR week_number = $2)
                 AND ($3::TEXT IS NULL OR code = $3)
                 AND ($4::TEXT IS NULL OR status = $4)
               ORDER BY year, week_number, created_at"#
        ))
        .bind(query.year)
        .bind(query.week_number)
        .bind(code)
        .bind(status)
        .fetch_all(pool)
        .await?;
        into_bookings(rows)
    }

    /// Every booking stamped with `year`, in creation order.
    pub async fn list_year(pool: &PgPool, year: i32) -> anyhow::Result<Vec<Booking>> {
        let query = BookingQuery {
            year: Some(year),
            ..Default::default()
        };
        Self::list(pool, &query, None).await
    }

    /// Bookings created during calendar `year` (UTC), whichever week year they
    /// were filed under.
    pub async fn list_created_in(
        pool: &PgPool,
        year: i32,
        only_code: Option<&str>,
    ) -> anyhow::Result<Vec<Booking>> {
        let (from, to) = calendar_year_range(year)?;
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"SELECT {BOOKING_COLUMNS}
               FROM bookings
               WHERE created_at >= $1 AND created_at < $2
                 AND ($3::TEXT IS NULL OR code = $3)
               ORDER BY created_at"#
        ))
        .bind(from)
        .bind(to)
        .bind(only_code)
        .fetch_all(pool)
        .await?;
        into_bookings(rows)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Booking, BookingError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(BookingError::NotFound)?;
        Ok(Booking::try_from(row)?)
    }

    /// Insert a new booking bucketed by `now` under the Monday rule.
    pub async fn create(
        pool: &PgPool,
        req: &BookingRequest,
        user: &AuthenticatedUser,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        validate_request(req).map_err(|e| BookingError::Invalid(e.to_string()))?;

        let code = match &req.code {
            Some(code) if user.can_access_code(code) => code.trim().to_string(),
            Some(_) => {
                return Err(BookingError::Invalid(
                    "Only admins can book for another code".into(),
                ))
            }
            None => user.code.clone(),
        };

        Self::insert(
            pool,
            &code,
            req,
            DailyQuantities::from(req.daily_quantities.clone()),
            Some(user.user_id),
            now,
        )
        .await
    }

    async fn insert(
        pool: &PgPool,
        code: &str,
        req: &BookingRequest,
        daily_quantities: DailyQuantities,
        created_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let bucket = week_of(now.date_naive()).map_err(anyhow::Error::from)?;
        let status = req.customer_group.initial_status();

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"INSERT INTO bookings
                   (code, team_name, customer_group, customer_name, fish_size, fish_type,
                    price, daily_quantities, week_number, year, status, created_by,
                    created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
               RETURNING {BOOKING_COLUMNS}"#
        ))
        .bind(code)
        .bind(req.team_name.trim())
        .bind(req.customer_group.to_string())
        .bind(req.customer_name.as_deref().map(str::trim))
        .bind(&req.fish_size)
        .bind(&req.fish_type)
        .bind(req.price.trim())
        .bind(Json(&daily_quantities))
        .bind(bucket.week as i32)
        .bind(bucket.year)
        .bind(status.to_string())
        .bind(created_by)
        .bind(now)
        .fetch_one(pool)
        .await?;

        let booking = Booking::try_from(row)?;
        tracing::info!(
            "Booking {} created for code {} ({}, {})",
            booking.id,
            booking.code,
            bucket,
            booking.status
        );
        Ok(booking)
    }

    /// Replace every mutable field. Week number and year stay as created.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &BookingRequest,
        user: &AuthenticatedUser,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        validate_request(req).map_err(|e| BookingError::Invalid(e.to_string()))?;

        let existing = Self::get(pool, id).await?;
        if existing.status == BookingStatus::Rejected {
            return Err(BookingError::Rejected);
        }
        let code = match &req.code {
            Some(code) if user.is_admin() => code.trim().to_string(),
            _ => existing.code.clone(),
        };

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"UPDATE bookings SET
                   code             = $2,
                   team_name        = $3,
                   customer_group   = $4,
                   customer_name    = $5,
                   fish_size        = $6,
                   fish_type        = $7,
                   price            = $8,
                   daily_quantities = $9,
                   updated_at       = $10
               WHERE id = $1
               RETURNING {BOOKING_COLUMNS}"#
        ))
        .bind(id)
        .bind(&code)
        .bind(req.team_name.trim())
        .bind(req.customer_group.to_string())
        .bind(req.customer_name.as_deref().map(str::trim))
        .bind(&req.fish_size)
        .bind(&req.fish_type)
        .bind(req.price.trim())
        .bind(Json(DailyQuantities::from(req.daily_quantities.clone())))
        .bind(now)
        .fetch_optional(pool)
        .await?
        .ok_or(BookingError::NotFound)?;

        Ok(Booking::try_from(row)?)
    }

    /// Permanent delete.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), BookingError> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BookingError::NotFound);
        }
        tracing::info!("Booking {id} deleted");
        Ok(())
    }

    pub async fn approve(
        pool: &PgPool,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let existing = Self::get(pool, id).await?;
        ensure_pending(existing.status)?;

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"UPDATE bookings SET status = 'approved', updated_at = $2
               WHERE id = $1 AND status = 'pending'
               RETURNING {BOOKING_COLUMNS}"#
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(pool)
        .await?;
        let Some(row) = row else {
            return Err(decision_conflict(Self::current_status(pool, id).await?));
        };

        tracing::info!("Booking {id} approved");
        Ok(Booking::try_from(row)?)
    }

    /// Reject a pending booking and append a rejection log entry.
    pub async fn reject(
        pool: &PgPool,
        id: Uuid,
        rejected_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let existing = Self::get(pool, id).await?;
        ensure_pending(existing.status)?;

        let mut tx = pool.begin().await?;
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"UPDATE bookings SET status = 'rejected', updated_at = $2
               WHERE id = $1 AND status = 'pending'
               RETURNING {BOOKING_COLUMNS}"#
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Err(decision_conflict(Self::current_status(pool, id).await?));
        };

        sqlx::query(
            "INSERT INTO rejected_booking_logs (booking_id, code, price, rejected_by, rejected_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(row.id)
        .bind(&row.code)
        .bind(&row.price)
        .bind(rejected_by)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!("Booking {id} rejected");
        Ok(Booking::try_from(row)?)
    }

    async fn current_status(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<BookingStatus>, BookingError> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(status.map(|s| s.parse::<BookingStatus>()).transpose()?)
    }

    /// Copy a booking into a new one with every date moved one week later.
    pub async fn copy_to_next_week(
        pool: &PgPool,
        id: Uuid,
        user: &AuthenticatedUser,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let source = Self::get(pool, id).await?;
        if !user.can_access_code(&source.code) {
            return Err(BookingError::NotFound);
        }
        let shifted = shift_daily_quantities(&source.daily_quantities, 7)
            .map_err(|e| BookingError::Invalid(e.to_string()))?;

        let req = BookingRequest {
            code: Some(source.code.clone()),
            team_name: source.team_name.clone(),
            customer_group: source.customer_group,
            customer_name: source.customer_name.clone(),
            fish_size: source.fish_size.clone(),
            fish_type: source.fish_type.clone(),
            price: source.price.clone(),
            daily_quantities: Default::default(),
        };
        Self::insert(pool, &source.code, &req, shifted, Some(user.user_id), now).await
    }

    pub async fn list_rejections(pool: &PgPool) -> anyhow::Result<Vec<RejectedBookingLog>> {
        let logs = sqlx::query_as::<_, RejectedBookingLog>(
            "SELECT id, booking_id, code, price, rejected_by, rejected_at
             FROM rejected_booking_logs
             ORDER BY rejected_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::CustomerGroup;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn request() -> BookingRequest {
        let mut daily = BTreeMap::new();
        daily.insert(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(), 3);
        daily.insert(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(), 2);
        BookingRequest {
            code: None,
            team_name: "Team A".into(),
            customer_group: CustomerGroup::Regular,
            customer_name: Some("Harbor Fish".into()),
            fish_size: "3-4".into(),
            fish_type: "Norway".into(),
            price: "12.50".into(),
            daily_quantities: daily,
        }
    }

    #[test]
    fn test_validate_request_ok() {
        assert_eq!(
            validate_request(&request()).unwrap(),
            WeekBucket { year: 2025, week: 1 }
        );
    }

    #[test]
    fn test_validate_request_rejects_unknown_fish() {
        let mut req = request();
        req.fish_type = "Tuna".into();
        assert!(validate_request(&req).is_err());

        let mut req = request();
        req.fish_size = "10-12".into();
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price("12.50").is_ok());
        assert!(validate_price("0").is_ok());
        assert!(validate_price("-1").is_err());
        assert!(validate_price("abc").is_err());
        assert!(validate_price("NaN").is_err());
        assert!(validate_price("inf").is_err());
    }

    #[test]
    fn test_validate_request_rejects_two_weeks() {
        let mut req = request();
        req.daily_quantities
            .insert(NaiveDate::from_ymd_opt(2025, 1, 13).unwrap(), 1);
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_validate_request_rejects_blank_team() {
        let mut req = request();
        req.team_name = "  ".into();
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_ensure_pending() {
        assert!(ensure_pending(BookingStatus::Pending).is_ok());
        assert!(matches!(
            ensure_pending(BookingStatus::Approved),
            Err(BookingError::NotPending(BookingStatus::Approved))
        ));
        assert!(ensure_pending(BookingStatus::Rejected).is_err());
    }

    #[test]
    fn test_decision_conflict_reports_current_status() {
        // Approve lost to a concurrent reject: report what the booking is now.
        assert!(matches!(
            decision_conflict(Some(BookingStatus::Rejected)),
            BookingError::NotPending(BookingStatus::Rejected)
        ));
        assert!(matches!(
            decision_conflict(Some(BookingStatus::Approved)),
            BookingError::NotPending(BookingStatus::Approved)
        ));
        assert!(matches!(
            decision_conflict(Some(BookingStatus::Pending)),
            BookingError::Conflict
        ));
        assert!(matches!(decision_conflict(None), BookingError::NotFound));
    }
}
