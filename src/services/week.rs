//! Monday-anchored week numbering.
//!
//! Week 1 of a year starts on the first Monday on or after January 1st. Days
//! before that Monday belong to the last week of the previous year.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Year out of supported range: {0}")]
    YearOutOfRange(i32),

    #[error("Week {week} does not exist in {year}")]
    WeekOutOfRange { year: i32, week: u32 },
}

/// A `(year, week)` pair identifying which week a booking belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeekBucket {
    pub year: i32,
    pub week: u32,
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| CalendarError::InvalidDate(s.to_string()))
}

/// First Monday on or after January 1st of `year`.
pub fn first_monday(year: i32) -> Result<NaiveDate, CalendarError> {
    let jan_first =
        NaiveDate::from_ymd_opt(year, 1, 1).ok_or(CalendarError::YearOutOfRange(year))?;
    let offset = (7 - jan_first.weekday().num_days_from_monday()) % 7;
    jan_first
        .checked_add_signed(Duration::days(offset as i64))
        .ok_or(CalendarError::YearOutOfRange(year))
}

/// Bucket a date under the Monday-anchored rule.
pub fn week_of(date: NaiveDate) -> Result<WeekBucket, CalendarError> {
    let year = date.year();
    let start = first_monday(year)?;

    if date < start {
        // Jan 1st..first Monday: still inside the previous year's last week.
        let prev = year - 1;
        let prev_start = first_monday(prev)?;
        return Ok(WeekBucket {
            year: prev,
            week: weeks_between(prev_start, date) + 1,
        });
    }

    let next_start = first_monday(year + 1)?;
    if date >= next_start {
        return Ok(WeekBucket { year: year + 1, week: 1 });
    }

    Ok(WeekBucket {
        year,
        week: weeks_between(start, date) + 1,
    })
}

/// Bucket of the week immediately before the one containing `date`.
pub fn previous_week(date: NaiveDate) -> Result<WeekBucket, CalendarError> {
    week_of(date)?.previous()
}

/// `[January 1st of year, January 1st of year + 1)` as UTC instants.
///
/// Early-January days filed under the previous year's last week still fall
/// inside this range.
pub fn calendar_year_range(year: i32) -> Result<(DateTime<Utc>, DateTime<Utc>), CalendarError> {
    let bound = |y: i32| {
        NaiveDate::from_ymd_opt(y, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or(CalendarError::YearOutOfRange(y))
    };
    Ok((bound(year)?, bound(year + 1)?))
}

fn weeks_between(start: NaiveDate, date: NaiveDate) -> u32 {
    ((date - start).num_days() / 7) as u32
}

impl WeekBucket {
    pub fn new(year: i32, week: u32) -> Result<Self, CalendarError> {
        let bucket = WeekBucket { year, week };
        if week == 0 || week > Self::weeks_in_year(year)? {
            return Err(CalendarError::WeekOutOfRange { year, week });
        }
        Ok(bucket)
    }

    /// Number of Monday-anchored weeks in `year` (52 or 53).
    pub fn weeks_in_year(year: i32) -> Result<u32, CalendarError> {
        let start = first_monday(year)?;
        let next_start = first_monday(year + 1)?;
        Ok(weeks_between(start, next_start))
    }

    /// Monday of this week.
    pub fn start(&self) -> Result<NaiveDate, CalendarError> {
        let monday = first_monday(self.year)?;
        monday
            .checked_add_signed(Duration::weeks(self.week as i64 - 1))
            .ok_or(CalendarError::YearOutOfRange(self.year))
    }

    /// Sunday of this week.
    pub fn end(&self) -> Result<NaiveDate, CalendarError> {
        Ok(self.start()? + Duration::days(6))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match (self.start(), self.end()) {
            (Ok(start), Ok(end)) => start <= date && date <= end,
            _ => false,
        }
    }

    pub fn previous(&self) -> Result<WeekBucket, CalendarError> {
        if self.week > 1 {
            return Ok(WeekBucket {
                year: self.year,
                week: self.week - 1,
            });
        }
        let day_before = first_monday(self.year)?
            .pred_opt()
            .ok_or(CalendarError::YearOutOfRange(self.year))?;
        week_of(day_before)
    }
}

impl std::fmt::Display for WeekBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Which week numbering the analytics pipeline buckets creation dates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekRule {
    /// Same rule bookings are stored with.
    #[default]
    Monday,
    /// `ceil(day_of_year / 7)`, ignoring weekdays. Kept for parity with older reports.
    DayOfYear,
}

impl WeekRule {
    pub fn bucket(&self, date: NaiveDate) -> Result<WeekBucket, CalendarError> {
        match self {
            WeekRule::Monday => week_of(date),
            WeekRule::DayOfYear => Ok(WeekBucket {
                year: date.year(),
                week: date.ordinal().div_ceil(7),
            }),
        }
    }
}

impl std::str::FromStr for WeekRule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monday" => Ok(WeekRule::Monday),
            "day_of_year" => Ok(WeekRule::DayOfYear),
            _ => Err(anyhow::anyhow!("Unknown week rule: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_first_monday() {
        // 2025-01-01 is a Wednesday
        assert_eq!(first_monday(2025).unwrap(), d("2025-01-06"));
        // 2024-01-01 is itself a Monday
        assert_eq!(first_monday(2024).unwrap(), d("2024-01-01"));
        // 2023-01-01 is a Sunday
        assert_eq!(first_monday(2023).unwrap(), d("2023-01-02"));
        for year in 1990..2100 {
            assert_eq!(first_monday(year).unwrap().weekday(), Weekday::Mon);
        }
    }

    #[test]
    fn test_first_monday_is_week_one() {
        for year in 1990..2100 {
            let bucket = week_of(first_monday(year).unwrap()).unwrap();
            assert_eq!(bucket, WeekBucket { year, week: 1 });
        }
    }

    #[test]
    fn test_days_before_first_monday_belong_to_previous_year() {
        for year in 1990..2100 {
            let start = first_monday(year).unwrap();
            let mut date = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
            while date < start {
                let bucket = week_of(date).unwrap();
                assert_eq!(bucket.year, year - 1);
                assert!(bucket.week >= 52);
                date = date.succ_opt().unwrap();
            }
        }
    }

    #[test]
    fn test_week_of_known_dates() {
        assert_eq!(week_of(d("2025-01-01")).unwrap(), WeekBucket { year: 2024, week: 53 });
        assert_eq!(week_of(d("2025-01-05")).unwrap(), WeekBucket { year: 2024, week: 53 });
        assert_eq!(week_of(d("2025-01-12")).unwrap(), WeekBucket { year: 2025, week: 1 });
        assert_eq!(week_of(d("2025-01-13")).unwrap(), WeekBucket { year: 2025, week: 2 });
        assert_eq!(week_of(d("2025-12-31")).unwrap(), WeekBucket { year: 2025, week: 52 });
        // 2026-01-05 is the first Monday of 2026
        assert_eq!(week_of(d("2026-01-04")).unwrap(), WeekBucket { year: 2025, week: 52 });
        assert_eq!(week_of(d("2026-01-05")).unwrap(), WeekBucket { year: 2026, week: 1 });
    }

    #[test]
    fn test_weeks_in_year() {
        assert_eq!(WeekBucket::weeks_in_year(2024).unwrap(), 53);
        assert_eq!(WeekBucket::weeks_in_year(2025).unwrap(), 52);
        assert!(WeekBucket::new(2025, 53).is_err());
        assert!(WeekBucket::new(2025, 0).is_err());
        assert!(WeekBucket::new(2024, 53).is_ok());
    }

    #[test]
    fn test_previous_week_rolls_into_prior_year() {
        let bucket = WeekBucket { year: 2025, week: 1 };
        assert_eq!(bucket.previous().unwrap(), WeekBucket { year: 2024, week: 53 });
        assert_eq!(previous_week(d("2025-01-08")).unwrap(), WeekBucket { year: 2024, week: 53 });
        assert_eq!(previous_week(d("2025-01-15")).unwrap(), WeekBucket { year: 2025, week: 1 });
    }

    #[test]
    fn test_previous_walks_backward_without_gaps() {
        let mut bucket = week_of(d("2026-03-02")).unwrap();
        let mut monday = bucket.start().unwrap();
        for _ in 0..200 {
            let prev = bucket.previous().unwrap();
            let prev_monday = prev.start().unwrap();
            assert_eq!(monday - prev_monday, Duration::days(7));
            assert!(prev < bucket);
            bucket = prev;
            monday = prev_monday;
        }
    }

    #[test]
    fn test_bucket_days() {
        let bucket = WeekBucket { year: 2025, week: 1 };
        assert_eq!(bucket.start().unwrap(), d("2025-01-06"));
        assert_eq!(bucket.end().unwrap(), d("2025-01-12"));
        assert!(bucket.contains(d("2025-01-09")));
        assert!(!bucket.contains(d("2025-01-13")));
        assert_eq!(bucket.to_string(), "2025-W01");
    }

    #[test]
    fn test_calendar_year_range_covers_early_january() {
        let (from, to) = calendar_year_range(2025).unwrap();
        assert_eq!(from.date_naive(), d("2025-01-01"));
        assert_eq!(to.date_naive(), d("2026-01-01"));
        // Filed under 2024-W53, created in 2025.
        assert_eq!(week_of(d("2025-01-03")).unwrap().year, 2024);
        assert!(instant_in(from, to, d("2025-01-03")));
        assert!(!instant_in(from, to, d("2024-12-31")));
    }

    fn instant_in(from: DateTime<Utc>, to: DateTime<Utc>, date: NaiveDate) -> bool {
        let at = date.and_hms_opt(12, 0, 0).unwrap().and_utc();
        from <= at && at < to
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(matches!(parse_date("not-a-date"), Err(CalendarError::InvalidDate(_))));
        assert!(parse_date("2025-02-30").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_day_of_year_rule_differs_from_monday_rule() {
        // Known discrepancy: the day-of-year rule never looks at weekdays.
        let date = d("2025-01-03");
        assert_eq!(WeekRule::DayOfYear.bucket(date).unwrap(), WeekBucket { year: 2025, week: 1 });
        assert_eq!(WeekRule::Monday.bucket(date).unwrap(), WeekBucket { year: 2024, week: 53 });
        assert_eq!(WeekRule::DayOfYear.bucket(d("2025-01-08")).unwrap().week, 2);
    }
}
