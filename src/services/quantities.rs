use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::{
    models::booking::DailyQuantities,
    services::week::{parse_date, week_of, CalendarError, WeekBucket},
};

/// Move every date key by `days`, keeping each quantity as-is.
///
/// Keys are shifted independently; gaps and irregular key sets survive
/// untouched. A key that is not a date is rejected.
pub fn shift_daily_quantities(
    quantities: &DailyQuantities,
    days: i64,
) -> Result<DailyQuantities, CalendarError> {
    let mut shifted = BTreeMap::new();
    for (key, value) in &quantities.0 {
        let date = parse_date(key)?
            .checked_add_signed(Duration::days(days))
            .ok_or_else(|| CalendarError::InvalidDate(key.clone()))?;
        shifted.insert(date.format("%Y-%m-%d").to_string(), value.clone());
    }
    Ok(DailyQuantities(shifted))
}

/// Check a submitted quantity map and return the single week it covers.
pub fn validate_week_quantities(
    quantities: &BTreeMap<NaiveDate, u32>,
) -> anyhow::Result<WeekBucket> {
    anyhow::ensure!(
        quantities.len() <= 7,
        "daily_quantities covers more than one week"
    );

    let mut dates = quantities.keys();
    let Some(first) = dates.next() else {
        anyhow::bail!("daily_quantities must not be empty");
    };
    let first = week_of(*first)?;
    for date in dates {
        anyhow::ensure!(
            first.contains(*date),
            "All dates must fall in the same week ({date} is outside {first})"
        );
    }
    Ok(first)
}
