// src/working_days.rs
use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::calendar::{is_weekend, is_working_day_with, Exclusions};
use crate::models::AnalysisPeriod;

/// Spans longer than this use the fast path. Performance only, both paths give the same answer.
pub const FAST_PATH_THRESHOLD_DAYS: i64 = 90;

/// Counts working days in `[start, end]`, picking the strategy by span length.
/// `start > end` yields 0.
pub fn count_working_days<E: Exclusions + ?Sized>(
    start: NaiveDate,
    end: NaiveDate,
    exclusions: &E,
) -> u32 {
    let period = AnalysisPeriod::new(start, end);
    if period.is_empty() {
        return 0;
    }
    let span = period.total_days();
    if span > FAST_PATH_THRESHOLD_DAYS {
        debug!("Counting {} days from {} via fast path", span, start);
        count_working_days_fast(start, end, exclusions)
    } else {
        debug!("Counting {} days from {} via exact scan", span, start);
        count_working_days_exact(start, end, exclusions)
    }
}

/// Reference implementation: classify every day.
pub fn count_working_days_exact<E: Exclusions + ?Sized>(
    start: NaiveDate,
    end: NaiveDate,
    exclusions: &E,
) -> u32 {
    let count = AnalysisPeriod::new(start, end)
        .days()
        .filter(|day| is_working_day_with(*day, exclusions))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Weekend days are counted arithmetically, then a second pass removes holidays and
/// absences that land on weekdays.
///
/// The exclusion pass still visits every day, so this is O(days) like the exact scan.
/// It only saves the weekend branch per day; it is not a closed-form count.
pub fn count_working_days_fast<E: Exclusions + ?Sized>(
    start: NaiveDate,
    end: NaiveDate,
    exclusions: &E,
) -> u32 {
    let period = AnalysisPeriod::new(start, end);
    let total_days = period.total_days();
    if total_days == 0 {
        return 0;
    }
    let weekend_days = weekend_days_in_span(start, total_days);

    // Weekend collisions were already removed above; counting them again would double-subtract.
    let excluded_days = period
        .days()
        .filter(|day| !is_weekend(*day) && exclusions.excludes(*day))
        .count() as i64;

    let working = (total_days - weekend_days - excluded_days).max(0);
    u32::try_from(working).unwrap_or(u32::MAX)
}

/// Saturdays and Sundays among `total_days` consecutive days starting at `start`.
pub fn weekend_days_in_span(start: NaiveDate, total_days: i64) -> i64 {
    if total_days <= 0 {
        return 0;
    }
    let full_weeks = total_days / 7;
    let remainder = total_days % 7;
    let mut weekend_days = full_weeks * 2;

    // The leftover days begin on the same weekday as `start`.
    let first_weekday = i64::from(start.weekday().num_days_from_monday());
    for offset in 0..remainder {
        if (first_weekday + offset) % 7 >= 5 {
            weekend_days += 1;
        }
    }
    weekend_days
}
