// src/capacity.rs
use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::calendar::ExclusionIndex;
use crate::models::{
    week_start, Absence, AnalysisPeriod, CapacityResult, Employee, PublicHoliday, WeeklyCapacity,
    WORKDAYS_PER_WEEK,
};
use crate::working_days::count_working_days;

/// Hours available on `working_days` days at `weekly_hours` per 5-day week.
/// Saturates at the `Decimal` bounds when the product does not fit.
pub fn capacity_hours(working_days: u32, weekly_hours: Decimal) -> Decimal {
    let days = Decimal::from(working_days);
    days.checked_mul(weekly_hours)
        .and_then(|total| total.checked_div(WORKDAYS_PER_WEEK))
        .or_else(|| {
            weekly_hours
                .checked_div(WORKDAYS_PER_WEEK)
                .and_then(|daily| daily.checked_mul(days))
        })
        .unwrap_or_else(|| {
            warn!(
                "Capacity of {} days at {} h/week is out of range, saturating",
                working_days, weekly_hours
            );
            if weekly_hours.is_sign_negative() {
                Decimal::MIN
            } else {
                Decimal::MAX
            }
        })
}

/// Absences owned by the employee, matched on either the employee id or the linked account.
pub fn absences_for<'a>(
    employee: &'a Employee,
    absences: &'a [Absence],
) -> impl Iterator<Item = &'a Absence> + 'a {
    absences
        .iter()
        .filter(move |absence| employee.is_owner(&absence.employee_id))
}

pub fn calculate_available_capacity(
    employee: &Employee,
    start: NaiveDate,
    end: NaiveDate,
    holidays: &[PublicHoliday],
    absences: &[Absence],
) -> CapacityResult {
    let period = AnalysisPeriod::new(start, end);
    if period.is_empty() {
        debug!(
            "Empty period {}..{} for employee {}, capacity is zero",
            start, end, employee.id
        );
        return CapacityResult::zero(employee);
    }

    let index = ExclusionIndex::build(holidays, absences_for(employee, absences), &period);
    let working_days = count_working_days(start, end, &index);
    let weekly_hours = employee.weekly_capacity();
    let total_days = u32::try_from(period.total_days()).unwrap_or(u32::MAX);

    let result = CapacityResult {
        employee_id: employee.id.clone(),
        total_days,
        working_days,
        capacity_hours: capacity_hours(working_days, weekly_hours),
        capacity_hours_per_week: weekly_hours,
    };
    debug!(
        "Capacity for {} over {}..{}: {} of {} days, {} hours",
        employee.id, start, end, result.working_days, result.total_days, result.capacity_hours
    );
    result
}

/// Capacity over the contiguous span covering every week in `weeks`.
/// An empty bucket gives a zero result, not an error.
pub fn calculate_weekly_capacity(
    employee: &Employee,
    weeks: &[NaiveDate],
    holidays: &[PublicHoliday],
    absences: &[Absence],
) -> CapacityResult {
    match AnalysisPeriod::from_weeks(weeks) {
        Some(period) => {
            calculate_available_capacity(employee, period.start, period.end, holidays, absences)
        }
        None => CapacityResult::zero(employee),
    }
}

/// One row per distinct week in the bucket, Monday through Sunday, in calendar order.
pub fn weekly_breakdown(
    employee: &Employee,
    weeks: &[NaiveDate],
    holidays: &[PublicHoliday],
    absences: &[Absence],
) -> Vec<WeeklyCapacity> {
    let Some(span) = AnalysisPeriod::from_weeks(weeks) else {
        return Vec::new();
    };
    let index = ExclusionIndex::build(holidays, absences_for(employee, absences), &span);
    let weekly_hours = employee.weekly_capacity();

    let mut mondays: Vec<NaiveDate> = weeks.iter().map(|date| week_start(*date)).collect();
    mondays.sort();
    mondays.dedup();

    mondays
        .into_iter()
        .map(|monday| {
            let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
            let working_days = count_working_days(monday, sunday, &index);
            let iso_week = monday.iso_week();
            WeeklyCapacity {
                week_start: monday,
                iso_year: iso_week.year(),
                iso_week: iso_week.week(),
                working_days,
                capacity_hours: capacity_hours(working_days, weekly_hours),
            }
        })
        .collect()
}

pub fn calculate_team_capacity(
    employees: &[Employee],
    start: NaiveDate,
    end: NaiveDate,
    holidays: &[PublicHoliday],
    absences: &[Absence],
) -> Vec<CapacityResult> {
    employees
        .iter()
        .map(|employee| calculate_available_capacity(employee, start, end, holidays, absences))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AbsenceCategory, AbsenceStatus};
    use rust_decimal_macros::dec;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn employee() -> Employee {
        Employee::new("E1").linked_account("U1").weekly_hours(dec!(35))
    }

    #[test]
    fn test_full_week_without_exclusions() {
        let result =
            calculate_available_capacity(&employee(), d("2024-05-06"), d("2024-05-10"), &[], &[]);
        assert_eq!(result.total_days, 5);
        assert_eq!(result.working_days, 5);
        assert_eq!(result.capacity_hours, dec!(35));
        assert_eq!(result.capacity_hours_per_week, dec!(35));
    }

    #[test]
    fn test_wednesday_holiday_removes_one_day() {
        let holidays = vec![PublicHoliday::fixed("Midweek", d("2024-05-08"))];
        let result = calculate_available_capacity(
            &employee(),
            d("2024-05-06"),
            d("2024-05-10"),
            &holidays,
            &[],
        );
        assert_eq!(result.working_days, 4);
        assert_eq!(result.capacity_hours, dec!(28));
    }

    #[test]
    fn test_approved_absence_covering_week_zeroes_capacity() {
        let absences = vec![Absence::approved(
            "E1",
            d("2024-05-06"),
            d("2024-05-10"),
            AbsenceCategory::Vacation,
        )];
        let result = calculate_available_capacity(
            &employee(),
            d("2024-05-06"),
            d("2024-05-10"),
            &[],
            &absences,
        );
        assert_eq!(result.total_days, 5);
        assert_eq!(result.working_days, 0);
        assert_eq!(result.capacity_hours, dec!(0));
    }

    #[test]
    fn test_absence_matched_through_linked_account() {
        let absences = vec![
            Absence::approved("U1", d("2024-05-06"), d("2024-05-07"), AbsenceCategory::Sick),
            // Someone else's absence must not count.
            Absence::approved("E2", d("2024-05-08"), d("2024-05-10"), AbsenceCategory::Sick),
            Absence::approved("E1", d("2024-05-09"), d("2024-05-09"), AbsenceCategory::Personal)
                .with_status(AbsenceStatus::Rejected),
        ];
        let result = calculate_available_capacity(
            &employee(),
            d("2024-05-06"),
            d("2024-05-10"),
            &[],
            &absences,
        );
        assert_eq!(result.working_days, 3);
        assert_eq!(result.capacity_hours, dec!(21));
    }

    #[test]
    fn test_default_weekly_capacity_applies() {
        let result = calculate_available_capacity(
            &Employee::new("E9"),
            d("2024-05-06"),
            d("2024-05-08"),
            &[],
            &[],
        );
        assert_eq!(result.capacity_hours_per_week, dec!(35));
        assert_eq!(result.capacity_hours, dec!(21));
    }

    #[test]
    fn test_fractional_weekly_hours() {
        let part_time = Employee::new("E3").weekly_hours(dec!(37.5));
        let result =
            calculate_available_capacity(&part_time, d("2024-05-06"), d("2024-05-08"), &[], &[]);
        assert_eq!(result.capacity_hours, dec!(22.5));
    }

    #[test]
    fn test_inverted_range_gives_zero_result() {
        let result =
            calculate_available_capacity(&employee(), d("2024-05-10"), d("2024-05-06"), &[], &[]);
        assert_eq!(result, CapacityResult::zero(&employee()));
    }

    #[test]
    fn test_weekly_capacity_normalizes_weeks() {
        // Thursday anchors in consecutive weeks, listed out of order.
        let result = calculate_weekly_capacity(
            &employee(),
            &[d("2024-05-16"), d("2024-05-09")],
            &[PublicHoliday::fixed("Ascension", d("2024-05-09"))],
            &[],
        );
        assert_eq!(result.total_days, 14);
        assert_eq!(result.working_days, 9);
        assert_eq!(result.capacity_hours, dec!(63));
    }

    #[test]
    fn test_weekly_capacity_empty_bucket() {
        let part_time = Employee::new("E4").weekly_hours(dec!(20));
        let result = calculate_weekly_capacity(&part_time, &[], &[], &[]);
        assert_eq!(result.working_days, 0);
        assert_eq!(result.total_days, 0);
        assert_eq!(result.capacity_hours, dec!(0));
        assert_eq!(result.capacity_hours_per_week, dec!(20));
    }

    #[test]
    fn test_breakdown_rows_sum_to_weekly_total() {
        let weeks = [d("2024-05-06"), d("2024-05-13"), d("2024-05-15"), d("2024-05-20")];
        let holidays = vec![PublicHoliday::fixed("Ascension", d("2024-05-09"))];
        let absences = vec![Absence::approved(
            "E1",
            d("2024-05-20"),
            d("2024-05-21"),
            AbsenceCategory::Vacation,
        )];

        let rows = weekly_breakdown(&employee(), &weeks, &holidays, &absences);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].week_start, d("2024-05-06"));
        assert_eq!(rows[0].iso_week, 19);
        assert_eq!(rows[0].working_days, 4);
        assert_eq!(rows[1].working_days, 5);
        assert_eq!(rows[2].working_days, 3);

        let total = calculate_weekly_capacity(&employee(), &weeks, &holidays, &absences);
        let summed: Decimal = rows.iter().map(|row| row.capacity_hours).sum();
        assert_eq!(summed, total.capacity_hours);
    }

    #[test]
    fn test_huge_weekly_hours_do_not_overflow() {
        let huge = Decimal::from_i128_with_scale(70_000_000_000_000_000_000_000_000_000, 0);
        let employee = Employee::new("E5").weekly_hours(huge);

        // Mon-Fri still fits once the weekly figure is split per day.
        let week = calculate_available_capacity(&employee, d("2024-05-06"), d("2024-05-10"), &[], &[]);
        assert_eq!(week.working_days, 5);
        assert_eq!(week.capacity_hours, huge);

        let fortnight =
            calculate_available_capacity(&employee, d("2024-05-06"), d("2024-05-17"), &[], &[]);
        assert_eq!(fortnight.working_days, 10);
        assert_eq!(fortnight.capacity_hours, Decimal::MAX);

        assert_eq!(capacity_hours(10, -huge), Decimal::MIN);
        assert_eq!(capacity_hours(0, huge), Decimal::ZERO);
    }

    #[test]
    fn test_team_capacity_covers_every_employee() {
        let employees = vec![employee(), Employee::new("E2").weekly_hours(dec!(20))];
        let results =
            calculate_team_capacity(&employees, d("2024-05-06"), d("2024-05-10"), &[], &[]);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].employee_id, "E2");
        assert_eq!(results[1].capacity_hours, dec!(20));
    }
}
