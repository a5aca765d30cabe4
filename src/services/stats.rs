//! Booking statistics: weekly and monthly totals, growth, fish and customer rankings.
//!
//! Everything here is a pure function of the booking slice plus the explicit
//! `year` window. Empty input yields `None`, never a zeroed report.

use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;
use serde::Serialize;

use crate::{
    models::booking::Booking,
    services::week::{CalendarError, WeekBucket, WeekRule},
};

/// Label used for bookings without a customer name.
pub const UNKNOWN_CUSTOMER: &str = "Unknown";

const TOP_CUSTOMERS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyTotal {
    pub year: i32,
    pub week: u32,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedShare {
    pub name: String,
    pub total: i64,
    /// Percentage of the ranking's grand total.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingStats {
    pub year: i32,
    pub booking_count: usize,
    pub total_quantity: i64,
    pub weekly_totals: Vec<WeeklyTotal>,
    pub growth_rate: f64,
    pub fish_ranking: Vec<RankedShare>,
    pub most_popular_fish: Option<String>,
    pub top_customers: Vec<RankedShare>,
    pub customer_distribution: Vec<RankedShare>,
    /// Index 0 is January.
    pub monthly_totals: [i64; 12],
}

/// Run the full statistics pipeline.
///
/// Returns `Ok(None)` when there are no bookings.
pub fn summarize(
    bookings: &[Booking],
    year: i32,
    rule: WeekRule,
) -> Result<Option<BookingStats>, CalendarError> {
    if bookings.is_empty() {
        return Ok(None);
    }

    let weekly_totals = weekly_totals(bookings, rule)?;
    let fish_ranking = fish_ranking(bookings);
    let customer_distribution = customer_distribution(bookings);

    Ok(Some(BookingStats {
        year,
        booking_count: bookings.len(),
        total_quantity: bookings.iter().map(Booking::total_quantity).sum(),
        growth_rate: growth_rate(&weekly_totals),
        most_popular_fish: most_popular(&fish_ranking),
        top_customers: customer_distribution
            .iter()
            .take(TOP_CUSTOMERS)
            .cloned()
            .collect(),
        weekly_totals,
        fish_ranking,
        customer_distribution,
        monthly_totals: monthly_totals(bookings, year),
    }))
}

/// Sum quantities per week of `created_at`, ascending by week.
pub fn weekly_totals(
    bookings: &[Booking],
    rule: WeekRule,
) -> Result<Vec<WeeklyTotal>, CalendarError> {
    let mut buckets: BTreeMap<WeekBucket, i64> = BTreeMap::new();
    for booking in bookings {
        let bucket = rule.bucket(booking.created_at.date_naive())?;
        *buckets.entry(bucket).or_insert(0) += booking.total_quantity();
    }
    Ok(buckets
        .into_iter()
        .map(|(bucket, total)| WeeklyTotal {
            year: bucket.year,
            week: bucket.week,
            total,
        })
        .collect())
}

/// Percentage change between the last two weekly buckets.
///
/// 0 with fewer than two buckets or when the earlier bucket is 0.
pub fn growth_rate(weekly: &[WeeklyTotal]) -> f64 {
    match weekly {
        [.., previous, latest] if previous.total != 0 => {
            (latest.total - previous.total) as f64 / previous.total as f64 * 100.0
        }
        _ => 0.0,
    }
}

pub fn fish_ranking(bookings: &[Booking]) -> Vec<RankedShare> {
    rank_by(bookings, |b| b.fish_type.clone())
}

/// Customers ranked by quantity; missing names are grouped under [`UNKNOWN_CUSTOMER`].
pub fn customer_distribution(bookings: &[Booking]) -> Vec<RankedShare> {
    rank_by(bookings, |b| {
        b.customer_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_CUSTOMER)
            .to_string()
    })
}

/// Highest total; ties go to the first one seen.
pub fn most_popular(ranking: &[RankedShare]) -> Option<String> {
    ranking.first().map(|r| r.name.clone())
}

/// Quantities of bookings created in calendar `year`, per month.
///
/// Filters on `created_at`, not on the stored week year.
pub fn monthly_totals(bookings: &[Booking], year: i32) -> [i64; 12] {
    let mut months = [0i64; 12];
    for booking in bookings {
        let created = booking.created_at.date_naive();
        if created.year() == year {
            months[created.month0() as usize] += booking.total_quantity();
        }
    }
    months
}

/// Group by `key` in first-seen order, then stable-sort descending by total.
fn rank_by<F>(bookings: &[Booking], key: F) -> Vec<RankedShare>
where
    F: Fn(&Booking) -> String,
{
    let mut order: Vec<(String, i64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for booking in bookings {
        let name = key(booking);
        let qty = booking.total_quantity();
        match index.get(&name) {
            Some(&i) => order[i].1 += qty,
            None => {
                index.insert(name.clone(), order.len());
                order.push((name, qty));
            }
        }
    }

    let grand_total: i64 = order.iter().map(|(_, t)| t).sum();
    // sort_by is stable, so equal totals keep first-seen order
    order.sort_by(|a, b| b.1.cmp(&a.1));

    order
        .into_iter()
        .map(|(name, total)| RankedShare {
            name,
            total,
            share: if grand_total == 0 {
                0.0
            } else {
                total as f64 / grand_total as f64 * 100.0
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::{BookingStatus, CustomerGroup, DailyQuantities};
    use crate::services::week::{calendar_year_range, week_of};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    fn booking(
        fish: &str,
        customer: Option<&str>,
        created_at: DateTime<Utc>,
        daily: serde_json::Value,
    ) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            code: "C001".into(),
            team_name: "Team A".into(),
            customer_group: CustomerGroup::Regular,
            customer_name: customer.map(String::from),
            fish_size: "3-4".into(),
            fish_type: fish.into(),
            price: "12.50".into(),
            daily_quantities: serde_json::from_value::<DailyQuantities>(daily).unwrap(),
            week_number: 1,
            year: created_at.year(),
            status: BookingStatus::Approved,
            created_by: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_empty_input_is_no_data() {
        assert_eq!(summarize(&[], 2025, WeekRule::Monday).unwrap(), None);
    }

    #[test]
    fn test_all_zero_report_is_still_a_report() {
        let bookings = vec![booking("Norway", None, at(2025, 1, 6), json!({ "2025-01-06": 0 }))];
        let stats = summarize(&bookings, 2025, WeekRule::Monday).unwrap().unwrap();
        assert_eq!(stats.total_quantity, 0);
        assert_eq!(stats.fish_ranking[0].share, 0.0);
    }

    #[test]
    fn test_fish_ranking_tie_keeps_first_seen() {
        let bookings = vec![
            booking("Norway", None, at(2025, 1, 6), json!({ "2025-01-06": 3, "2025-01-07": 2 })),
            booking("Trout", None, at(2025, 1, 6), json!({ "2025-01-06": 5 })),
        ];
        let ranking = fish_ranking(&bookings);
        assert_eq!(
            ranking,
            vec![
                RankedShare { name: "Norway".into(), total: 5, share: 50.0 },
                RankedShare { name: "Trout".into(), total: 5, share: 50.0 },
            ]
        );

        let stats = summarize(&bookings, 2025, WeekRule::Monday).unwrap().unwrap();
        assert_eq!(stats.total_quantity, 10);
        assert_eq!(stats.most_popular_fish.as_deref(), Some("Norway"));
    }

    #[test]
    fn test_fish_ranking_sorted_descending() {
        let bookings = vec![
            booking("Trout", None, at(2025, 1, 6), json!({ "2025-01-06": 1 })),
            booking("Norway", None, at(2025, 1, 6), json!({ "2025-01-06": 6 })),
            booking("Trout", None, at(2025, 1, 7), json!({ "2025-01-07": 1 })),
        ];
        let ranking = fish_ranking(&bookings);
        assert_eq!(ranking[0].name, "Norway");
        assert_eq!(ranking[0].total, 6);
        assert_eq!(ranking[1].total, 2);
        assert_eq!(ranking[1].share, 25.0);
    }

    #[test]
    fn test_growth_rate() {
        let weekly = vec![
            WeeklyTotal { year: 2025, week: 1, total: 50 },
            WeeklyTotal { year: 2025, week: 2, total: 75 },
        ];
        assert_eq!(growth_rate(&weekly), 50.0);
    }

    #[test]
    fn test_growth_rate_zero_previous_week() {
        let weekly = vec![
            WeeklyTotal { year: 2025, week: 1, total: 0 },
            WeeklyTotal { year: 2025, week: 2, total: 10 },
        ];
        assert_eq!(growth_rate(&weekly), 0.0);
    }

    #[test]
    fn test_growth_rate_single_bucket() {
        let weekly = vec![WeeklyTotal { year: 2025, week: 1, total: 10 }];
        assert_eq!(growth_rate(&weekly), 0.0);
        assert_eq!(growth_rate(&[]), 0.0);
    }

    #[test]
    fn test_weekly_totals_sorted_across_year_boundary() {
        let bookings = vec![
            booking("Norway", None, at(2025, 1, 14), json!({ "2025-01-14": 4 })),
            booking("Norway", None, at(2025, 1, 2), json!({ "2025-01-02": 1 })),
            booking("Norway", None, at(2025, 1, 6), json!({ "2025-01-06": 2 })),
            booking("Trout", None, at(2025, 1, 8), json!({ "2025-01-08": 3 })),
        ];
        let weekly = weekly_totals(&bookings, WeekRule::Monday).unwrap();
        assert_eq!(
            weekly,
            vec![
                WeeklyTotal { year: 2024, week: 53, total: 1 },
                WeeklyTotal { year: 2025, week: 1, total: 5 },
                WeeklyTotal { year: 2025, week: 2, total: 4 },
            ]
        );
    }

    #[test]
    fn test_weekly_totals_day_of_year_rule() {
        let bookings = vec![
            booking("Norway", None, at(2025, 1, 2), json!({ "2025-01-02": 1 })),
            booking("Norway", None, at(2025, 1, 6), json!({ "2025-01-06": 2 })),
        ];
        // Jan 2 and Jan 6 share day-of-year week 1 but not the Monday week.
        let weekly = weekly_totals(&bookings, WeekRule::DayOfYear).unwrap();
        assert_eq!(weekly, vec![WeeklyTotal { year: 2025, week: 1, total: 3 }]);
    }

    #[test]
    fn test_customer_distribution_unknown_bucket() {
        let bookings = vec![
            booking("Norway", Some("Harbor Fish"), at(2025, 1, 6), json!({ "2025-01-06": 2 })),
            booking("Norway", None, at(2025, 1, 6), json!({ "2025-01-06": 3 })),
            booking("Norway", Some("  "), at(2025, 1, 6), json!({ "2025-01-06": 1 })),
        ];
        let dist = customer_distribution(&bookings);
        assert_eq!(dist[0].name, UNKNOWN_CUSTOMER);
        assert_eq!(dist[0].total, 4);
        assert_eq!(dist[1].name, "Harbor Fish");
    }

    #[test]
    fn test_top_customers_limited_to_three() {
        let bookings: Vec<Booking> = ["A", "B", "C", "D", "E"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                booking("Trout", Some(name), at(2025, 2, 3), json!({ "2025-02-03": i + 1 }))
            })
            .collect();
        let stats = summarize(&bookings, 2025, WeekRule::Monday).unwrap().unwrap();
        assert_eq!(stats.customer_distribution.len(), 5);
        let top: Vec<&str> = stats.top_customers.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(top, vec!["E", "D", "C"]);
    }

    #[test]
    fn test_monthly_totals_only_count_requested_year() {
        let bookings = vec![
            booking("Norway", None, at(2025, 1, 20), json!({ "2025-01-20": 2 })),
            booking("Norway", None, at(2025, 3, 3), json!({ "2025-03-03": 5 })),
            booking("Norway", None, at(2024, 3, 4), json!({ "2024-03-04": 7 })),
        ];
        let months = monthly_totals(&bookings, 2025);
        assert_eq!(months[0], 2);
        assert_eq!(months[2], 5);
        assert_eq!(months.iter().sum::<i64>(), 7);
        assert_eq!(monthly_totals(&bookings, 2024)[2], 7);
    }

    /// Same selection as `BookingService::list_created_in`.
    fn created_in(bookings: &[Booking], year: i32) -> Vec<Booking> {
        let (from, to) = calendar_year_range(year).unwrap();
        bookings
            .iter()
            .filter(|b| from <= b.created_at && b.created_at < to)
            .cloned()
            .collect()
    }

    #[test]
    fn test_early_january_booking_counts_in_its_creation_year() {
        // 2025-01-03 is filed under 2024-W53 but created in 2025.
        let created_at = at(2025, 1, 3);
        let bucket = week_of(created_at.date_naive()).unwrap();
        let mut early = booking("Norway", None, created_at, json!({ "2025-01-03": 10 }));
        early.year = bucket.year;
        early.week_number = bucket.week as i32;
        assert_eq!(early.year, 2024);

        let bookings = vec![
            early,
            booking("Trout", None, at(2025, 3, 3), json!({ "2025-03-03": 5 })),
        ];

        let stats = summarize(&created_in(&bookings, 2025), 2025, WeekRule::Monday)
            .unwrap()
            .unwrap();
        assert_eq!(stats.monthly_totals[0], 10);
        assert_eq!(stats.monthly_totals.iter().sum::<i64>(), 15);
        assert_eq!(stats.total_quantity, 15);
        assert_eq!(
            stats.weekly_totals[0],
            WeeklyTotal { year: 2024, week: 53, total: 10 }
        );

        assert_eq!(
            summarize(&created_in(&bookings, 2024), 2024, WeekRule::Monday).unwrap(),
            None
        );
    }
}
