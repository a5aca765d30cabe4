use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

/// One line of a price bulletin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub fish_type: String,
    pub size: String,
    pub price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    pub entries: Json<Vec<PriceEntry>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Announcement {
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && date <= self.valid_to
    }
}

/// Body for POST /announcements.
#[derive(Debug, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    pub entries: Vec<PriceEntry>,
}
