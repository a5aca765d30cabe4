use std::io::Write;

use crate::services::summary::WeekSummary;

const LEADING_COLUMNS: &[&str] = &[
    "Code",
    "Team",
    "Group",
    "Customer",
    "Fish type",
    "Size",
    "Price",
];

/// Write one week as CSV: a row per booking, then a `Total` row.
///
/// Day columns follow `summary.dates`, the same order the summary table uses.
pub fn write_week_csv<W: Write>(summary: &WeekSummary, writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = LEADING_COLUMNS.to_vec();
    header.extend(summary.dates.iter().map(String::as_str));
    header.push("Total");
    wtr.write_record(&header)?;

    for row in &summary.rows {
        let mut record = vec![
            row.code.clone(),
            row.team_name.clone(),
            row.customer_group.to_string(),
            row.customer_name.clone().unwrap_or_default(),
            row.fish_type.clone(),
            row.fish_size.clone(),
            row.price.clone(),
        ];
        record.extend(row.quantities.iter().map(i64::to_string));
        record.push(row.total_quantity.to_string());
        wtr.write_record(&record)?;
    }

    let mut footer: Vec<String> = vec![String::new(); LEADING_COLUMNS.len()];
    footer[0] = "Total".to_string();
    footer.extend(summary.daily_totals.iter().map(i64::to_string));
    footer.push(summary.total_quantity.to_string());
    wtr.write_record(&footer)?;

    wtr.flush()?;
    Ok(())
}

pub fn week_csv_bytes(summary: &WeekSummary) -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_week_csv(summary, &mut buf)?;
    Ok(buf)
}

/// File name used by both the HTTP download and the export CLI.
pub fn export_file_name(year: i32, week_number: i32) -> String {
    format!("bookings-{year}-week-{week_number:02}.csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::{Booking, BookingStatus, CustomerGroup, DailyQuantities};
    use crate::services::summary::project_one;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn booking(code: &str, customer: Option<&str>, daily: serde_json::Value) -> Booking {
        let created_at = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();
        Booking {
            id: Uuid::new_v4(),
            code: code.into(),
            team_name: "Team A".into(),
            customer_group: CustomerGroup::Regular,
            customer_name: customer.map(String::from),
            fish_size: "3-4".into(),
            fish_type: "Trout".into(),
            price: "9.90".into(),
            daily_quantities: serde_json::from_value::<DailyQuantities>(daily).unwrap(),
            week_number: 1,
            year: 2025,
            status: BookingStatus::Approved,
            created_by: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_csv_layout_matches_summary() {
        let bookings = vec![
            booking("A1", Some("Harbor Fish"), json!({ "2025-01-06": 2 })),
            booking("B2", None, json!({ "2025-01-07": 1, "2025-01-06": 4 })),
        ];
        let summary = project_one(&bookings, 1).unwrap();
        let csv = String::from_utf8(week_csv_bytes(&summary).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "Code,Team,Group,Customer,Fish type,Size,Price,2025-01-06,2025-01-07,Total"
        );
        assert_eq!(lines[1], "A1,Team A,regular,Harbor Fish,Trout,3-4,9.90,2,0,2");
        assert_eq!(lines[2], "B2,Team A,regular,,Trout,3-4,9.90,4,1,5");
        assert_eq!(lines[3], "Total,,,,,,,6,1,7");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name(2025, 3), "bookings-2025-week-03.csv");
        assert_eq!(export_file_name(2024, 53), "bookings-2024-week-53.csv");
    }
}
