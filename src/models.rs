// src/models.rs
use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

// --- Constants ---

/// Weekly capacity assumed when an employee record carries none.
pub const DEFAULT_CAPACITY_HOURS_PER_WEEK: Decimal = dec!(35);

/// Capacity is always spread over a 5-day week, whatever the actual schedule.
pub const WORKDAYS_PER_WEEK: Decimal = dec!(5);

pub type EmployeeId = String;

// --- Hour Arithmetic ---

fn saturate(toward_negative: bool) -> Decimal {
    if toward_negative {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

/// `a + b`, pinned to the `Decimal` range instead of overflowing.
pub fn add_hours(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or_else(|| {
        warn!("Hour sum {} + {} is out of range, saturating", a, b);
        saturate(b.is_sign_negative())
    })
}

/// `a - b`, pinned to the `Decimal` range instead of overflowing.
pub fn sub_hours(a: Decimal, b: Decimal) -> Decimal {
    a.checked_sub(b).unwrap_or_else(|| {
        warn!("Hour difference {} - {} is out of range, saturating", a, b);
        saturate(!b.is_sign_negative())
    })
}

pub fn sum_hours<I: IntoIterator<Item = Decimal>>(values: I) -> Decimal {
    values.into_iter().fold(Decimal::ZERO, add_hours)
}

// --- Input Records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    /// Reference to a user account. Employees without an account are valid.
    #[serde(default)]
    pub linked_account_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capacity_hours_per_week: Option<Decimal>,
}

impl Employee {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            linked_account_id: None,
            name: None,
            capacity_hours_per_week: None,
        }
    }

    pub fn linked_account(mut self, account_id: &str) -> Self {
        self.linked_account_id = Some(account_id.to_string());
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn weekly_hours(mut self, hours: Decimal) -> Self {
        self.capacity_hours_per_week = Some(hours);
        self
    }

    /// Nominal weekly capacity with the 35h default applied.
    pub fn weekly_capacity(&self) -> Decimal {
        self.capacity_hours_per_week
            .unwrap_or(DEFAULT_CAPACITY_HOURS_PER_WEEK)
    }

    /// True when `owner_id` refers to this employee, either directly or through the linked account.
    pub fn is_owner(&self, owner_id: &str) -> bool {
        self.id == owner_id || self.linked_account_id.as_deref() == Some(owner_id)
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicHoliday {
    pub name: String,
    pub date: NaiveDate,
    /// `None` means the holiday recurs every year on the same month/day.
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl PublicHoliday {
    pub fn fixed(name: &str, date: NaiveDate) -> Self {
        Self {
            name: name.to_string(),
            date,
            year: Some(date.year()),
            is_active: true,
        }
    }

    pub fn recurring(name: &str, date: NaiveDate) -> Self {
        Self {
            name: name.to_string(),
            date,
            year: None,
            is_active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Whether this record takes `date` out of the working calendar.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.date.month() == date.month()
            && self.date.day() == date.day()
            && self.year.map_or(true, |year| year == date.year())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsenceCategory {
    Vacation,
    Sick,
    Personal,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsenceStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Absence {
    #[serde(default)]
    pub id: Option<String>,
    pub employee_id: EmployeeId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub category: AbsenceCategory,
    pub status: AbsenceStatus,
}

impl Absence {
    pub fn approved(
        employee_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        category: AbsenceCategory,
    ) -> Self {
        Self {
            id: None,
            employee_id: employee_id.to_string(),
            start_date,
            end_date,
            category,
            status: AbsenceStatus::Approved,
        }
    }

    pub fn with_status(mut self, status: AbsenceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_approved(&self) -> bool {
        self.status == AbsenceStatus::Approved
    }

    /// Inclusive on both ends.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// A unit of assigned work. Only the fields the engine reads are modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Matched against linked account ids first, then employee ids.
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub estimated_hours: Option<Decimal>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl Task {
    pub fn assigned(assignee_id: &str, hours: Decimal) -> Self {
        Self {
            assignee_id: Some(assignee_id.to_string()),
            estimated_hours: Some(hours),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }
}

/// Everything a source hands over for one analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub holidays: Vec<PublicHoliday>,
    #[serde(default)]
    pub absences: Vec<Absence>,
}

// --- Analysis Period ---

/// Inclusive calendar span. `start > end` is allowed and counts as empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AnalysisPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Normalizes week anchors (any date inside each week) to Monday of the earliest
    /// week through Sunday of the latest. Returns `None` for an empty list.
    pub fn from_weeks(weeks: &[NaiveDate]) -> Option<Self> {
        let earliest = weeks.iter().min()?;
        let latest = weeks.iter().max()?;
        Some(Self {
            start: week_start(*earliest),
            end: week_end(*latest),
        })
    }

    /// Week anchors win over explicit bounds; both bounds are needed otherwise.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        weeks: &[NaiveDate],
    ) -> Option<Self> {
        if !weeks.is_empty() {
            return Self::from_weeks(weeks);
        }
        match (start, end) {
            (Some(start), Some(end)) => Some(Self::new(start, end)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Inclusive number of calendar days, 0 when empty.
    pub fn total_days(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start).num_days() + 1
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Sunday of the week containing `date`.
pub fn week_end(date: NaiveDate) -> NaiveDate {
    let monday = week_start(date);
    monday.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX)
}

// --- Results ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityResult {
    pub employee_id: EmployeeId,
    pub total_days: u32,
    pub working_days: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub capacity_hours: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub capacity_hours_per_week: Decimal,
}

impl CapacityResult {
    pub fn zero(employee: &Employee) -> Self {
        Self {
            employee_id: employee.id.clone(),
            total_days: 0,
            working_days: 0,
            capacity_hours: Decimal::ZERO,
            capacity_hours_per_week: employee.weekly_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCapacity {
    pub week_start: NaiveDate,
    pub iso_year: i32,
    pub iso_week: u32,
    pub working_days: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub capacity_hours: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilizationStatus {
    Under,
    Optimal,
    Over,
}

impl std::fmt::Display for UtilizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            UtilizationStatus::Under => "under",
            UtilizationStatus::Optimal => "optimal",
            UtilizationStatus::Over => "over",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationResult {
    pub employee_id: EmployeeId,
    pub name: Option<String>,
    pub working_days: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub capacity_hours: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub workload_hours: Decimal,
    /// Negative when the employee is over-allocated.
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining_hours: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub utilization_percent: Decimal,
    pub status: UtilizationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub average_utilization_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_capacity_hours: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_workload_hours: Decimal,
    pub under_count: usize,
    pub optimal_count: usize,
    pub over_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationReport {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub employees: Vec<UtilizationResult>,
    pub team: TeamSummary,
    /// Workload items whose assignee matched no employee.
    pub unattributed_items: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    #[test]
    fn test_from_weeks_spans_monday_to_sunday() {
        // Wednesday of one week, Tuesday two weeks later, listed out of order.
        let period = AnalysisPeriod::from_weeks(&[d("2024-05-21"), d("2024-05-08")]).unwrap();
        assert_eq!(period.start, d("2024-05-06"));
        assert_eq!(period.end, d("2024-05-26"));
        assert_eq!(period.total_days(), 21);
    }

    #[test]
    fn test_from_weeks_empty_is_none() {
        assert!(AnalysisPeriod::from_weeks(&[]).is_none());
    }

    #[test]
    fn test_week_bounds_for_sunday_anchor() {
        assert_eq!(week_start(d("2024-05-12")), d("2024-05-06"));
        assert_eq!(week_end(d("2024-05-12")), d("2024-05-12"));
    }

    #[test]
    fn test_inverted_period_is_empty() {
        let period = AnalysisPeriod::new(d("2024-05-10"), d("2024-05-06"));
        assert!(period.is_empty());
        assert_eq!(period.total_days(), 0);
        assert_eq!(period.days().count(), 0);
    }

    #[test]
    fn test_resolve_prefers_weeks() {
        let period = AnalysisPeriod::resolve(
            Some(d("2024-01-01")),
            Some(d("2024-12-31")),
            &[d("2024-05-08")],
        )
        .unwrap();
        assert_eq!(period, AnalysisPeriod::new(d("2024-05-06"), d("2024-05-12")));
        assert!(AnalysisPeriod::resolve(Some(d("2024-01-01")), None, &[]).is_none());
    }

    #[test]
    fn test_recurring_holiday_matches_any_year() {
        let holiday = PublicHoliday::recurring("May Day", d("2020-05-01"));
        assert!(holiday.applies_on(d("2024-05-01")));
        assert!(holiday.applies_on(d("1999-05-01")));
        assert!(!holiday.applies_on(d("2024-05-02")));
    }

    #[test]
    fn test_fixed_holiday_matches_its_year_only() {
        let holiday = PublicHoliday::fixed("Ascension", d("2024-05-09"));
        assert!(holiday.applies_on(d("2024-05-09")));
        assert!(!holiday.applies_on(d("2025-05-09")));
        assert!(!holiday.inactive().applies_on(d("2024-05-09")));
    }

    #[test]
    fn test_employee_defaults_and_ownership() {
        let employee = Employee::new("E1").linked_account("U1");
        assert_eq!(employee.weekly_capacity(), dec!(35));
        assert!(employee.is_owner("E1"));
        assert!(employee.is_owner("U1"));
        assert!(!employee.is_owner("E2"));
    }

    #[test]
    fn test_hour_arithmetic_saturates() {
        let huge = Decimal::from_i128_with_scale(70_000_000_000_000_000_000_000_000_000, 0);
        assert_eq!(add_hours(huge, huge), Decimal::MAX);
        assert_eq!(add_hours(-huge, -huge), Decimal::MIN);
        assert_eq!(sub_hours(-huge, huge), Decimal::MIN);
        assert_eq!(sub_hours(dec!(35), huge), dec!(35) - huge);
        assert_eq!(sum_hours([dec!(1.5), dec!(2), huge, huge]), Decimal::MAX);
        assert_eq!(sum_hours(Vec::new()), Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_deserializes_camel_case_with_defaults() {
        let json = r#"{
            "employees": [{"id": "E1", "linkedAccountId": "U1", "capacityHoursPerWeek": 37.5}],
            "absences": [{"employeeId": "U1", "startDate": "2024-05-06", "endDate": "2024-05-07",
                          "category": "sick", "status": "approved"}],
            "holidays": [{"name": "Midsummer", "date": "2024-06-21"}]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.employees[0].weekly_capacity(), dec!(37.5));
        assert_eq!(snapshot.absences[0].category, AbsenceCategory::Sick);
        assert!(snapshot.holidays[0].is_active);
        assert_eq!(snapshot.holidays[0].year, None);
        assert!(snapshot.tasks.is_empty());
    }
}
