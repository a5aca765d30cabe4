use chrono::NaiveDate;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    models::announcement::{Announcement, CreateAnnouncementRequest},
    services::bookings::{validate_fish, validate_price},
};

pub fn validate_announcement(req: &CreateAnnouncementRequest) -> anyhow::Result<()> {
    anyhow::ensure!(!req.title.trim().is_empty(), "title is required");
    anyhow::ensure!(
        req.valid_from <= req.valid_to,
        "valid_from must not be after valid_to"
    );
    anyhow::ensure!(!req.entries.is_empty(), "At least one price entry is required");
    for entry in &req.entries {
        validate_fish(&entry.fish_type, &entry.size)?;
        validate_price(&entry.price)?;
    }
    Ok(())
}

pub struct AnnouncementService;

impl AnnouncementService {
    pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<Announcement>> {
        let rows = sqlx::query_as::<_, Announcement>(
            "SELECT * FROM announcements ORDER BY valid_from DESC, created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Bulletins whose validity range contains `today`, latest first.
    pub async fn current(pool: &PgPool, today: NaiveDate) -> anyhow::Result<Vec<Announcement>> {
        let rows = sqlx::query_as::<_, Announcement>(
            "SELECT * FROM announcements
             WHERE valid_from <= $1 AND valid_to >= $1
             ORDER BY created_at DESC",
        )
        .bind(today)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(
        pool: &PgPool,
        req: &CreateAnnouncementRequest,
        created_by: Uuid,
    ) -> anyhow::Result<Announcement> {
        validate_announcement(req)?;
        let announcement = sqlx::query_as::<_, Announcement>(
            "INSERT INTO announcements (title, valid_from, valid_to, entries, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(req.title.trim())
        .bind(req.valid_from)
        .bind(req.valid_to)
        .bind(Json(&req.entries))
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        tracing::info!(
            "Announcement {} published ({}..{})",
            announcement.id,
            announcement.valid_from,
            announcement.valid_to
        );
        Ok(announcement)
    }

    /// Returns false when no such announcement exists.
    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::announcement::PriceEntry;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn request() -> CreateAnnouncementRequest {
        CreateAnnouncementRequest {
            title: "Week 2 prices".into(),
            valid_from: d(2025, 1, 6),
            valid_to: d(2025, 1, 12),
            entries: vec![PriceEntry {
                fish_type: "Norway".into(),
                size: "4-5".into(),
                price: "10.40".into(),
            }],
        }
    }

    #[test]
    fn test_valid_announcement() {
        assert!(validate_announcement(&request()).is_ok());
    }

    #[test]
    fn test_inverted_range() {
        let mut req = request();
        req.valid_to = d(2025, 1, 5);
        assert!(validate_announcement(&req).is_err());
    }

    #[test]
    fn test_entries_required_and_checked() {
        let mut req = request();
        req.entries.clear();
        assert!(validate_announcement(&req).is_err());

        let mut req = request();
        req.entries[0].price = "-2".into();
        assert!(validate_announcement(&req).is_err());
    }

    #[test]
    fn test_is_valid_on() {
        let a = Announcement {
            id: Uuid::new_v4(),
            title: "t".into(),
            valid_from: d(2025, 1, 6),
            valid_to: d(2025, 1, 12),
            entries: Json(vec![]),
            created_by: None,
            created_at: chrono::Utc::now(),
        };
        assert!(a.is_valid_on(d(2025, 1, 6)));
        assert!(a.is_valid_on(d(2025, 1, 12)));
        assert!(!a.is_valid_on(d(2025, 1, 13)));
    }
}
