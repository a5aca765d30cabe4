//! Per-week tables shared by the on-screen summary and the CSV export.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use uuid::Uuid;

use crate::models::booking::{Booking, BookingStatus, CustomerGroup};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub booking_id: Uuid,
    pub code: String,
    pub team_name: String,
    pub customer_group: CustomerGroup,
    pub customer_name: Option<String>,
    pub fish_type: String,
    pub fish_size: String,
    pub price: String,
    pub status: BookingStatus,
    /// One cell per entry of [`WeekSummary::dates`], zero when the booking has no value.
    pub quantities: Vec<i64>,
    pub total_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekSummary {
    pub week_number: i32,
    /// Sorted union of the date keys of every booking in the week.
    pub dates: Vec<String>,
    /// `first..last`, absent when no booking in the week has a date.
    pub date_range: Option<String>,
    pub rows: Vec<SummaryRow>,
    pub daily_totals: Vec<i64>,
    pub total_quantity: i64,
}

/// Group bookings by week number (ascending) and lay each group out as a table.
///
/// Rows keep the input order within a week.
pub fn project(bookings: &[Booking]) -> Vec<WeekSummary> {
    let mut weeks: BTreeMap<i32, Vec<&Booking>> = BTreeMap::new();
    for booking in bookings {
        weeks.entry(booking.week_number).or_default().push(booking);
    }
    weeks
        .into_iter()
        .map(|(week_number, group)| project_week(week_number, &group))
        .collect()
}

/// Projection of a single week, or `None` if no booking carries that week number.
pub fn project_one(bookings: &[Booking], week_number: i32) -> Option<WeekSummary> {
    let group: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.week_number == week_number)
        .collect();
    if group.is_empty() {
        return None;
    }
    Some(project_week(week_number, &group))
}

fn project_week(week_number: i32, group: &[&Booking]) -> WeekSummary {
    // ISO date keys sort lexicographically in date order.
    let dates: Vec<String> = group
        .iter()
        .copied()
        .flat_map(|b| b.daily_quantities.dates())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect();

    let rows: Vec<SummaryRow> = group
        .iter()
        .map(|b| SummaryRow {
            booking_id: b.id,
            code: b.code.clone(),
            team_name: b.team_name.clone(),
            customer_group: b.customer_group,
            customer_name: b.customer_name.clone(),
            fish_type: b.fish_type.clone(),
            fish_size: b.fish_size.clone(),
            price: b.price.clone(),
            status: b.status,
            quantities: dates
                .iter()
                .map(|d| b.daily_quantities.quantity(d))
                .collect(),
            total_quantity: b.total_quantity(),
        })
        .collect();

    let daily_totals: Vec<i64> = (0..dates.len())
        .map(|i| rows.iter().map(|r| r.quantities[i]).sum())
        .collect();

    let date_range = match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => Some(format!("{first}..{last}")),
        _ => None,
    };

    WeekSummary {
        week_number,
        total_quantity: rows.iter().map(|r| r.total_quantity).sum(),
        dates,
        date_range,
        rows,
        daily_totals,
    }
}
