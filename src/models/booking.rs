use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

/// Valid values for the fish_type field.
pub const FISH_TYPES: &[&str] = &["Norway", "Trout", "Scotland", "Faroe", "Iceland"];

/// Valid values for the fish_size field (kilograms).
pub const FISH_SIZES: &[&str] = &["1-2", "2-3", "3-4", "4-5", "5-6", "6-7", "7-8", "8-9"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CustomerGroup {
    /// Fixed price list, approved on submission.
    Regular,
    /// Negotiated price, needs an admin decision.
    Negotiated,
}

impl CustomerGroup {
    pub fn initial_status(&self) -> BookingStatus {
        match self {
            CustomerGroup::Regular => BookingStatus::Approved,
            CustomerGroup::Negotiated => BookingStatus::Pending,
        }
    }
}

impl std::fmt::Display for CustomerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CustomerGroup::Regular => "regular",
            CustomerGroup::Negotiated => "negotiated",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for CustomerGroup {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(CustomerGroup::Regular),
            "negotiated" => Ok(CustomerGroup::Negotiated),
            _ => Err(anyhow::anyhow!("Unknown customer group: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "approved" => Ok(BookingStatus::Approved),
            "rejected" => Ok(BookingStatus::Rejected),
            _ => Err(anyhow::anyhow!("Unknown booking status: {s}")),
        }
    }
}

/// Per-date quantities exactly as stored: ISO date keys, JSON values.
///
/// Reads are lenient: any value that is not a non-negative integer (or a
/// string holding one) counts as 0. Values are capped at [`MAX_QUANTITY`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyQuantities(pub BTreeMap<String, Value>);

impl DailyQuantities {
    pub fn quantity(&self, date: &str) -> i64 {
        self.0.get(date).map(coerce_quantity).unwrap_or(0)
    }

    pub fn total(&self) -> i64 {
        self.0
            .values()
            .map(coerce_quantity)
            .fold(0, i64::saturating_add)
    }

    /// Date keys in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<BTreeMap<NaiveDate, u32>> for DailyQuantities {
    fn from(map: BTreeMap<NaiveDate, u32>) -> Self {
        DailyQuantities(
            map.into_iter()
                .map(|(date, qty)| (date.format("%Y-%m-%d").to_string(), Value::from(qty)))
                .collect(),
        )
    }
}

/// Largest quantity a submission can carry for one day.
pub const MAX_QUANTITY: i64 = u32::MAX as i64;

fn coerce_quantity(value: &Value) -> i64 {
    let n = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    n.filter(|n| *n >= 0).unwrap_or(0).min(MAX_QUANTITY)
}

/// DB row. Enum columns are stored as TEXT.
#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub code: String,
    pub team_name: String,
    pub customer_group: String,
    pub customer_name: Option<String>,
    pub fish_size: String,
    pub fish_type: String,
    pub price: String,
    pub daily_quantities: Json<DailyQuantities>,
    pub week_number: i32,
    pub year: i32,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub code: String,
    pub team_name: String,
    pub customer_group: CustomerGroup,
    pub customer_name: Option<String>,
    pub fish_size: String,
    pub fish_type: String,
    pub price: String,
    pub daily_quantities: DailyQuantities,
    pub week_number: i32,
    pub year: i32,
    pub status: BookingStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn total_quantity(&self) -> i64 {
        self.daily_quantities.total()
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = anyhow::Error;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            code: row.code,
            team_name: row.team_name,
            customer_group: row.customer_group.parse()?,
            customer_name: row.customer_name,
            fish_size: row.fish_size,
            fish_type: row.fish_type,
            price: row.price,
            daily_quantities: row.daily_quantities.0,
            week_number: row.week_number,
            year: row.year,
            status: row.status.parse()?,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Body for POST /bookings and PUT /bookings/{id}.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    /// Defaults to the caller's own code.
    pub code: Option<String>,
    pub team_name: String,
    pub customer_group: CustomerGroup,
    pub customer_name: Option<String>,
    pub fish_size: String,
    pub fish_type: String,
    pub price: String,
    pub daily_quantities: BTreeMap<NaiveDate, u32>,
}

/// Query params for GET /bookings.
#[derive(Debug, Default, Deserialize)]
pub struct BookingQuery {
    pub year: Option<i32>,
    pub week_number: Option<i32>,
    pub code: Option<String>,
    pub status: Option<BookingStatus>,
}

/// Query params for GET /bookings/summary and GET /bookings/export.
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub year: Option<i32>,
    pub week_number: Option<i32>,
}

/// Audit record written when a booking is rejected. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RejectedBookingLog {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub code: String,
    pub price: String,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: DateTime<Utc>,
}
