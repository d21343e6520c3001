// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Week bucket calculation.
//!
//! Weeks start on Sunday. Week 0 is the partial week before the first Sunday
//! of the year, which is empty when the year starts on a Sunday. This is the
//! numbering produced by `strftime("%U")`, so buckets range from 0 to 53.
//!
//! All arithmetic happens on the UTC calendar date of an instant.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

/// Number of trailing weeks shown in the dashboard trend.
pub const DEFAULT_TREND_PERIODS: usize = 4;

/// Storage format for timestamps, compatible with SQLite's `CURRENT_TIMESTAMP`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WeekError {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Sunday-started week index of a calendar date.
fn week_of_year(date: NaiveDate) -> u32 {
    (date.ordinal0() + 7 - date.weekday().num_days_from_sunday()) / 7
}

fn date_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), week_of_year(date))
}

/// Days scanned backwards to find `periods` full weeks before the current one.
fn lookback_days(periods: usize) -> i64 {
    7 * (periods as i64 + 1)
}

/// Week bucket of `now`, in `0..=53`.
pub fn current_week_index(now: DateTime<Utc>) -> u32 {
    week_of_year(now.date_naive())
}

/// Week bucket of the week before the one containing `now`.
///
/// Inside week 0 the previous week is the last bucket of the prior year, the
/// one containing its Dec 31.
pub fn previous_week_index(now: DateTime<Utc>) -> u32 {
    match current_week_index(now) {
        0 => last_week_of_prior_year(now.date_naive()),
        week => week - 1,
    }
}

fn last_week_of_prior_year(date: NaiveDate) -> u32 {
    date.with_ordinal(1)
        .and_then(|new_year| new_year.pred_opt())
        .map(week_of_year)
        .unwrap_or(0)
}

/// Sortable `YYYY-WW` key identifying a week across years.
pub fn year_week_key(instant: DateTime<Utc>) -> String {
    date_key(instant.date_naive())
}

/// Key of the week a calendar date falls in.
pub fn year_week_key_for_date(date: NaiveDate) -> String {
    date_key(date)
}

/// The `periods` most recent week keys before the week containing `now`,
/// in ascending order.
pub fn trend_window(now: DateTime<Utc>, periods: usize) -> Vec<String> {
    trend_window_since(now, periods, None)
}

/// Like [`trend_window`], but days before `history_start` are not scanned, so
/// a short history yields fewer keys.
pub fn trend_window_since(
    now: DateTime<Utc>,
    periods: usize,
    history_start: Option<DateTime<Utc>>,
) -> Vec<String> {
    let today = now.date_naive();
    let current = date_key(today);
    let earliest = history_start.map(|start| start.date_naive());

    let mut keys: Vec<String> = Vec::with_capacity(periods);
    for offset in 1..=lookback_days(periods) {
        if keys.len() == periods {
            break;
        }
        let Some(day) = today.checked_sub_signed(Duration::days(offset)) else {
            break;
        };
        if earliest.is_some_and(|earliest| day < earliest) {
            break;
        }

        let key = date_key(day);
        if key != current && !keys.contains(&key) {
            keys.push(key);
        }
    }

    keys.reverse();
    keys
}

/// First calendar date covered by the trend lookback for `now`.
pub fn window_start(now: DateTime<Utc>, periods: usize) -> NaiveDate {
    let today = now.date_naive();
    today
        .checked_sub_signed(Duration::days(lookback_days(periods)))
        .unwrap_or(NaiveDate::MIN)
}

/// Parse a stored timestamp. Accepts the storage format and RFC 3339.
pub fn parse_timestamp(raw: Option<&str>) -> Result<DateTime<Utc>, WeekError> {
    let raw = raw.ok_or_else(|| WeekError::InvalidTimestamp("null".to_string()))?;

    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)))
        .map_err(|_| WeekError::InvalidTimestamp(raw.to_string()))
}

pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_matches_strftime_numbering() {
        let mut date = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2031, 1, 1).unwrap();

        while date < end {
            let expected: u32 = date.format("%U").to_string().parse().unwrap();
            assert_eq!(week_of_year(date), expected, "week of {date}");
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_year_boundary_buckets() {
        // 2024-12-31 is a Tuesday, 2025-01-05 the first Sunday of 2025.
        assert_eq!(current_week_index(at(2024, 12, 31)), 52);
        assert_eq!(current_week_index(at(2025, 1, 1)), 0);
        assert_eq!(current_week_index(at(2025, 1, 4)), 0);
        assert_eq!(current_week_index(at(2025, 1, 5)), 1);

        // 2023 starts on a Sunday, so it has no week 0.
        assert_eq!(current_week_index(at(2023, 1, 1)), 1);
    }

    #[test]
    fn test_previous_week_is_decrement_inside_year() {
        let mut now = at(2024, 1, 1);
        let end = at(2027, 1, 1);

        while now < end {
            let current = current_week_index(now);
            if current > 0 {
                assert_eq!(previous_week_index(now), current - 1, "previous of {now}");
            }
            now += Duration::days(1);
        }
    }

    #[test]
    fn test_previous_week_wraps_to_prior_year() {
        // Week 0 of 2025 is Jan 1-4; Dec 29-31 2024 closes week 52.
        assert_eq!(current_week_index(at(2024, 12, 29)), 52);
        assert_eq!(previous_week_index(at(2025, 1, 1)), 52);
        assert_eq!(previous_week_index(at(2025, 1, 4)), 52);

        // Dec 31 2000 is a Sunday and opens week 53 on its own.
        assert_eq!(current_week_index(at(2000, 12, 31)), 53);
        assert_eq!(previous_week_index(at(2001, 1, 1)), 53);

        for year in 2000..2040 {
            let new_year = at(year, 1, 1);
            if current_week_index(new_year) == 0 {
                let last_day = at(year - 1, 12, 31);
                assert_eq!(previous_week_index(new_year), current_week_index(last_day));
            }
        }
    }

    #[test]
    fn test_every_bucket_is_reported_the_following_week() {
        // Each bucket a record can land in is some later day's previous week.
        let mut day = at(2000, 1, 1);
        let end = at(2040, 1, 1);

        while day < end {
            let bucket = current_week_index(day);
            let next_new_year = at(day.year() + 1, 1, 1);
            if next_new_year - day <= Duration::days(7) && current_week_index(next_new_year) == 1 {
                // The next year has no week 0; its week 1 looks at bucket 0.
                day += Duration::days(1);
                continue;
            }
            let reported = (1..=7)
                .map(|offset| day + Duration::days(offset))
                .any(|later| previous_week_index(later) == bucket);
            assert!(reported, "bucket {bucket} of {day} is never reported");
            day += Duration::days(1);
        }
    }

    #[test]
    fn test_year_week_key_increases_across_years() {
        assert_eq!(year_week_key(at(2024, 12, 30)), "2024-52");
        assert_eq!(year_week_key(at(2025, 1, 2)), "2025-00");
        assert!("2024-52" < "2025-00");

        let mut now = at(2019, 6, 5);
        let mut previous = year_week_key(now);
        for _ in 0..600 {
            now += Duration::days(7);
            let key = year_week_key(now);
            assert!(previous < key, "{previous} should sort before {key}");
            previous = key;
        }
    }

    #[test]
    fn test_trend_window_mid_year() {
        // 2025-06-18 is a Wednesday in week 24.
        let keys = trend_window(at(2025, 6, 18), 4);
        assert_eq!(keys, vec!["2025-20", "2025-21", "2025-22", "2025-23"]);
    }

    #[test]
    fn test_trend_window_across_year_boundary() {
        // 2025-01-15 sits in week 2; Dec 29-31 and Jan 1-4 are distinct keys.
        let keys = trend_window(at(2025, 1, 15), DEFAULT_TREND_PERIODS);
        assert_eq!(keys, vec!["2024-51", "2024-52", "2025-00", "2025-01"]);
    }

    #[test]
    fn test_trend_window_always_full_with_history() {
        let mut now = at(2023, 11, 1);
        let end = at(2026, 3, 1);

        while now < end {
            let keys = trend_window(now, 4);
            assert_eq!(keys.len(), 4, "window at {now}");
            assert!(keys.windows(2).all(|pair| pair[0] < pair[1]), "{keys:?}");
            assert!(!keys.contains(&year_week_key(now)));
            now += Duration::days(1);
        }
    }

    #[test]
    fn test_trend_window_short_history() {
        let now = at(2025, 1, 15);
        let keys = trend_window_since(now, 4, Some(at(2025, 1, 3)));
        assert_eq!(keys, vec!["2025-00", "2025-01"]);

        let keys = trend_window_since(now, 4, Some(now));
        assert!(keys.is_empty());

        assert!(trend_window(now, 0).is_empty());
    }

    #[test]
    fn test_window_start() {
        assert_eq!(
            window_start(at(2025, 1, 15), 4),
            NaiveDate::from_ymd_opt(2024, 12, 11).unwrap()
        );
    }

    #[test]
    fn test_parse_timestamp() {
        let parsed = parse_timestamp(Some("2025-01-01 00:00:05")).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 5).unwrap());

        let parsed = parse_timestamp(Some("2025-01-01T02:00:05+02:00")).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 5).unwrap());

        assert_eq!(
            parse_timestamp(Some("yesterday")),
            Err(WeekError::InvalidTimestamp("yesterday".to_string()))
        );
        assert!(parse_timestamp(None).is_err());
    }

    #[test]
    fn test_format_round_trips_through_parse() {
        let instant = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        assert_eq!(
            parse_timestamp(Some(&format_timestamp(instant))).unwrap(),
            instant
        );
    }
}
