use crate::error::{AnalyticsError, Result};
use crate::schema::PeriodBucket;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .unwrap_or(NaiveDate::MAX)
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as u64;
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn year_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

/// Floors a date to the first day of the bucket it belongs to.
pub fn bucket_start(date: NaiveDate, granularity: PeriodBucket) -> NaiveDate {
    match granularity {
        PeriodBucket::Day => date,
        PeriodBucket::Week => week_start(date),
        PeriodBucket::Month => month_start(date),
        PeriodBucket::Year => year_start(date),
    }
}

/// Splits `[start, end]` into half-open `[from, to)` windows of at most `batch_days` days.
/// The last window ends at `end + 1`.
pub fn batch_windows(start: NaiveDate, end: NaiveDate, batch_days: u32) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    if end < start || batch_days == 0 {
        return windows;
    }

    let stop = end.checked_add_days(Days::new(1)).unwrap_or(end);
    let mut current = start;
    while current < stop {
        let next = current
            .checked_add_days(Days::new(u64::from(batch_days)))
            .map_or(stop, |d| d.min(stop));
        windows.push((current, next));
        current = next;
    }

    windows
}

/// Parses the date shapes upstream clients hand back: plain ISO dates,
/// ISO timestamps (with `T` or a space) and RFC 3339 strings.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(ts.date());
        }
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.date_naive());
    }

    Err(AnalyticsError::DateError(format!(
        "Invalid date '{}'. Expected YYYY-MM-DD",
        raw
    )))
}

/// Parses a period string in the format "YYYY-MM" or "YYYY-MM:YYYY-MM"
/// Returns (first day of the start month, last day of the end month)
pub fn parse_period_string(period: &str) -> Result<(NaiveDate, NaiveDate)> {
    let parts: Vec<&str> = period.split(':').collect();

    let parse_month = |part: &str, which: &str| -> Result<NaiveDate> {
        NaiveDate::parse_from_str(&format!("{}-01", part.trim()), "%Y-%m-%d").map_err(|_| {
            AnalyticsError::DateError(format!(
                "Invalid {} month in period: {}. Expected YYYY-MM",
                which, part
            ))
        })
    };

    match parts.len() {
        1 => {
            let start = parse_month(parts[0], "start")?;
            Ok((start, last_day_of_month(start.year(), start.month())))
        }
        2 => {
            let start = parse_month(parts[0], "start")?;
            let end_ref = parse_month(parts[1], "end")?;
            Ok((start, last_day_of_month(end_ref.year(), end_ref.month())))
        }
        _ => Err(AnalyticsError::DateError(format!(
            "Invalid period format: {}. Expected 'YYYY-MM' or 'YYYY-MM:YYYY-MM'",
            period
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2023, 2), d(2023, 2, 28));
        assert_eq!(last_day_of_month(2024, 2), d(2024, 2, 29));
        assert_eq!(last_day_of_month(2023, 12), d(2023, 12, 31));
    }

    #[test]
    fn test_bucket_start_per_granularity() {
        // 2021-06-02 is a Wednesday
        let date = d(2021, 6, 2);
        assert_eq!(bucket_start(date, PeriodBucket::Day), date);
        assert_eq!(bucket_start(date, PeriodBucket::Week), d(2021, 5, 31));
        assert_eq!(bucket_start(date, PeriodBucket::Month), d(2021, 6, 1));
        assert_eq!(bucket_start(date, PeriodBucket::Year), d(2021, 1, 1));
    }

    #[test]
    fn test_week_start_on_monday_and_sunday() {
        assert_eq!(week_start(d(2021, 5, 31)), d(2021, 5, 31));
        assert_eq!(week_start(d(2021, 6, 6)), d(2021, 5, 31));
        assert_eq!(week_start(d(2021, 6, 7)), d(2021, 6, 7));
    }

    #[test]
    fn test_batch_windows_cover_range() {
        let windows = batch_windows(d(2021, 1, 1), d(2021, 3, 1), 30);
        assert_eq!(
            windows,
            vec![
                (d(2021, 1, 1), d(2021, 1, 31)),
                (d(2021, 1, 31), d(2021, 3, 2)),
            ]
        );

        let single = batch_windows(d(2021, 6, 1), d(2021, 6, 1), 30);
        assert_eq!(single, vec![(d(2021, 6, 1), d(2021, 6, 2))]);

        assert!(batch_windows(d(2021, 6, 2), d(2021, 6, 1), 30).is_empty());
    }

    #[test]
    fn test_parse_date_variants() {
        assert_eq!(parse_date("2021-06-01").unwrap(), d(2021, 6, 1));
        assert_eq!(parse_date("2021-06-01T00:00:00").unwrap(), d(2021, 6, 1));
        assert_eq!(parse_date("2021-06-01 00:00:00.000").unwrap(), d(2021, 6, 1));
        assert_eq!(parse_date("2021-06-01T00:00:00+07:00").unwrap(), d(2021, 6, 1));
        assert!(parse_date("01/06/2021").is_err());
    }

    #[test]
    fn test_parse_period_string_month_and_range() {
        let (start, end) = parse_period_string("2023-02").unwrap();
        assert_eq!(start, d(2023, 2, 1));
        assert_eq!(end, d(2023, 2, 28));

        let (start, end) = parse_period_string("2020-01:2021-07").unwrap();
        assert_eq!(start, d(2020, 1, 1));
        assert_eq!(end, d(2021, 7, 31));

        assert!(parse_period_string("2021-01:2021-02:2021-03").is_err());
    }
}
