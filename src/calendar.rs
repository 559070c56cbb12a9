// src/calendar.rs
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashSet;
use tracing::debug;

use crate::models::{Absence, AnalysisPeriod, PublicHoliday};

/// Answers whether a weekday is taken out of the working calendar by a holiday or an absence.
/// Weekend handling lives in the counters, not here.
pub trait Exclusions {
    fn is_holiday(&self, date: NaiveDate) -> bool;
    fn is_absent(&self, date: NaiveDate) -> bool;

    fn excludes(&self, date: NaiveDate) -> bool {
        self.is_holiday(date) || self.is_absent(date)
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Classifies one date for one employee. `absences` must already be narrowed to that employee.
pub fn is_working_day(date: NaiveDate, holidays: &[PublicHoliday], absences: &[Absence]) -> bool {
    is_working_day_with(date, &CalendarData::new(holidays, absences))
}

pub fn is_working_day_with<E: Exclusions + ?Sized>(date: NaiveDate, exclusions: &E) -> bool {
    if is_weekend(date) {
        return false;
    }
    !exclusions.excludes(date)
}

/// Linear view over the raw records.
#[derive(Debug, Clone, Copy)]
pub struct CalendarData<'a> {
    holidays: &'a [PublicHoliday],
    absences: &'a [Absence],
}

impl<'a> CalendarData<'a> {
    pub fn new(holidays: &'a [PublicHoliday], absences: &'a [Absence]) -> Self {
        Self { holidays, absences }
    }
}

impl Exclusions for CalendarData<'_> {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.iter().any(|holiday| holiday.applies_on(date))
    }

    fn is_absent(&self, date: NaiveDate) -> bool {
        self.absences
            .iter()
            .any(|absence| absence.is_approved() && absence.covers(date))
    }
}

/// Hashed holiday and absence lookups for one employee over one period.
///
/// Absence days are expanded only inside the period, so an unbounded absence record
/// costs no more than the period itself.
#[derive(Debug, Clone, Default)]
pub struct ExclusionIndex {
    dated_holidays: HashSet<NaiveDate>,
    recurring_holidays: HashSet<(u32, u32)>,
    absence_days: HashSet<NaiveDate>,
}

impl ExclusionIndex {
    pub fn build<'a, I>(holidays: &[PublicHoliday], absences: I, period: &AnalysisPeriod) -> Self
    where
        I: IntoIterator<Item = &'a Absence>,
    {
        let mut index = Self::default();

        for holiday in holidays.iter().filter(|holiday| holiday.is_active) {
            let month_day = (holiday.date.month(), holiday.date.day());
            match holiday.year {
                None => {
                    index.recurring_holidays.insert(month_day);
                }
                // Feb 29 pinned to a non-leap year has no date to exclude.
                Some(year) => {
                    if let Some(date) = NaiveDate::from_ymd_opt(year, month_day.0, month_day.1) {
                        index.dated_holidays.insert(date);
                    }
                }
            }
        }

        if !period.is_empty() {
            for absence in absences.into_iter().filter(|absence| absence.is_approved()) {
                let first = absence.start_date.max(period.start);
                let last = absence.end_date.min(period.end);
                if first > last {
                    continue;
                }
                index
                    .absence_days
                    .extend(AnalysisPeriod::new(first, last).days());
            }
        }

        debug!(
            "Built exclusion index: {} dated holidays, {} recurring holidays, {} absence days",
            index.dated_holidays.len(),
            index.recurring_holidays.len(),
            index.absence_days.len()
        );
        index
    }
}

impl Exclusions for ExclusionIndex {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.dated_holidays.contains(&date)
            || self
                .recurring_holidays
                .contains(&(date.month(), date.day()))
    }

    fn is_absent(&self, date: NaiveDate) -> bool {
        self.absence_days.contains(&date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AbsenceCategory, AbsenceStatus};

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    #[test]
    fn test_plain_weekday_is_working() {
        assert!(is_working_day(d("2024-05-08"), &[], &[]));
    }

    #[test]
    fn test_weekend_is_never_working() {
        // Holiday and absence data on the weekend must not change the answer.
        let holidays = vec![PublicHoliday::fixed("Weekend holiday", d("2024-05-11"))];
        let absences = vec![Absence::approved(
            "E1",
            d("2024-05-11"),
            d("2024-05-12"),
            AbsenceCategory::Vacation,
        )];
        assert!(!is_working_day(d("2024-05-11"), &[], &[]));
        assert!(!is_working_day(d("2024-05-12"), &holidays, &absences));
    }

    #[test]
    fn test_active_holiday_blocks_day() {
        let holidays = vec![PublicHoliday::fixed("Ascension", d("2024-05-09"))];
        assert!(!is_working_day(d("2024-05-09"), &holidays, &[]));
    }

    #[test]
    fn test_inactive_or_other_year_holiday_does_not_block() {
        let holidays = vec![
            PublicHoliday::fixed("Old Ascension", d("2023-05-09")),
            PublicHoliday::fixed("Cancelled", d("2024-05-08")).inactive(),
        ];
        assert!(is_working_day(d("2024-05-09"), &holidays, &[]));
        assert!(is_working_day(d("2024-05-08"), &holidays, &[]));
    }

    #[test]
    fn test_recurring_holiday_blocks_every_year() {
        let holidays = vec![PublicHoliday::recurring("National Day", d("2000-06-06"))];
        assert!(!is_working_day(d("2024-06-06"), &holidays, &[]));
        assert!(!is_working_day(d("2025-06-06"), &holidays, &[]));
    }

    #[test]
    fn test_only_approved_absences_block() {
        let absence = Absence::approved(
            "E1",
            d("2024-05-06"),
            d("2024-05-08"),
            AbsenceCategory::Sick,
        );
        let pending = vec![absence.clone().with_status(AbsenceStatus::Pending)];
        let rejected = vec![absence.clone().with_status(AbsenceStatus::Rejected)];
        let approved = vec![absence];

        assert!(is_working_day(d("2024-05-07"), &[], &pending));
        assert!(is_working_day(d("2024-05-07"), &[], &rejected));
        assert!(!is_working_day(d("2024-05-06"), &[], &approved));
        assert!(!is_working_day(d("2024-05-08"), &[], &approved));
        assert!(is_working_day(d("2024-05-09"), &[], &approved));
    }

    #[test]
    fn test_index_agrees_with_linear_lookup() {
        let holidays = vec![
            PublicHoliday::fixed("Ascension", d("2024-05-09")),
            PublicHoliday::recurring("May Day", d("1990-05-01")),
            PublicHoliday::fixed("Cancelled", d("2024-05-15")).inactive(),
            PublicHoliday::fixed("Next year", d("2025-05-20")),
        ];
        let absences = vec![
            Absence::approved("E1", d("2024-04-25"), d("2024-05-03"), AbsenceCategory::Vacation),
            Absence::approved("E1", d("2024-05-21"), d("2024-05-22"), AbsenceCategory::Personal)
                .with_status(AbsenceStatus::Pending),
            Absence::approved("E1", d("2024-05-28"), d("2024-06-30"), AbsenceCategory::Other),
        ];
        let period = AnalysisPeriod::new(d("2024-05-01"), d("2024-05-31"));
        let linear = CalendarData::new(&holidays, &absences);
        let index = ExclusionIndex::build(&holidays, &absences, &period);

        for day in period.days() {
            assert_eq!(
                linear.excludes(day),
                index.excludes(day),
                "lookup mismatch on {}",
                day
            );
        }
    }

    #[test]
    fn test_index_skips_leap_day_in_non_leap_year() {
        let holidays = vec![PublicHoliday {
            name: "Leap".to_string(),
            date: d("2024-02-29"),
            year: Some(2023),
            is_active: true,
        }];
        let period = AnalysisPeriod::new(d("2023-02-01"), d("2023-03-31"));
        let index = ExclusionIndex::build(&holidays, std::iter::empty(), &period);
        assert!(period.days().all(|day| !index.is_holiday(day)));
    }
}
