// src/validation.rs
//! Data-entry guards. None of these run inside the capacity computation; callers use them
//! before records are stored and decide themselves whether a failure blocks the action.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::warn;

use crate::models::Snapshot;

// --- Limits ---

/// Sanity ceiling meant to catch typos, not a business rule.
pub const MAX_ESTIMATED_HOURS: f64 = 10_000.0;
pub const MAX_CAPACITY_HOURS_PER_WEEK: f64 = 168.0;
/// Longest accepted absence, measured as end minus start.
pub const MAX_ABSENCE_SPAN_DAYS: i64 = 365;
pub const MIN_HOLIDAY_YEAR: i32 = 1900;
pub const MAX_HOLIDAY_YEAR: i32 = 2100;

const DATE_FORMAT: &str = "%Y-%m-%d";

// --- Error Types ---

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationErrorReason {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} cannot be negative")]
    Negative { field: &'static str },
    #[error("{field} cannot exceed {max}")]
    AboveMaximum { field: &'static str, max: f64 },
    #[error("Mandatory field missing: {field}")]
    MissingField { field: &'static str },
    #[error("{field} is not a valid date (expected YYYY-MM-DD): '{value}'")]
    InvalidDate { field: &'static str, value: String },
    #[error("Start date {start} is after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },
    #[error("Absence spans {days} days, the maximum is {MAX_ABSENCE_SPAN_DAYS}")]
    SpanTooLong { days: i64 },
    #[error("Holiday year {year} is outside {MIN_HOLIDAY_YEAR}-{MAX_HOLIDAY_YEAR}")]
    YearOutOfRange { year: i32 },
}

fn serialize_reason<S>(reason: &Option<ValidationErrorReason>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match reason {
        Some(reason) => serializer.serialize_some(&reason.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Result of one guard. Never raised; shown as field feedback by the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(serialize_with = "serialize_reason", skip_serializing_if = "Option::is_none")]
    pub error: Option<ValidationErrorReason>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn fail(reason: ValidationErrorReason) -> Self {
        Self {
            valid: false,
            error: Some(reason),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl From<Result<(), ValidationErrorReason>> for ValidationOutcome {
    fn from(result: Result<(), ValidationErrorReason>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(reason) => Self::fail(reason),
        }
    }
}

// --- Guards ---

fn check_bounded_hours(field: &'static str, value: f64, max: f64) -> Result<(), ValidationErrorReason> {
    if !value.is_finite() {
        return Err(ValidationErrorReason::NotFinite { field });
    }
    if value < 0.0 {
        return Err(ValidationErrorReason::Negative { field });
    }
    if value > max {
        return Err(ValidationErrorReason::AboveMaximum { field, max });
    }
    Ok(())
}

/// Absent estimates are valid and count as zero downstream.
pub fn validate_estimated_hours(value: Option<f64>) -> ValidationOutcome {
    match value {
        None => ValidationOutcome::ok(),
        Some(hours) => check_bounded_hours("Estimated hours", hours, MAX_ESTIMATED_HOURS).into(),
    }
}

/// Absent values are valid and default to 35.
pub fn validate_capacity_hours_per_week(value: Option<f64>) -> ValidationOutcome {
    match value {
        None => ValidationOutcome::ok(),
        Some(hours) => {
            check_bounded_hours("Capacity hours per week", hours, MAX_CAPACITY_HOURS_PER_WEEK)
                .into()
        }
    }
}

fn parse_required_date(field: &'static str, value: Option<&str>) -> Result<NaiveDate, ValidationErrorReason> {
    let raw = value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or(ValidationErrorReason::MissingField { field })?;
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| ValidationErrorReason::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

pub fn check_absence_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationErrorReason> {
    if start > end {
        return Err(ValidationErrorReason::StartAfterEnd { start, end });
    }
    let days = (end - start).num_days();
    if days > MAX_ABSENCE_SPAN_DAYS {
        return Err(ValidationErrorReason::SpanTooLong { days });
    }
    Ok(())
}

pub fn validate_absence_dates(start: Option<&str>, end: Option<&str>) -> ValidationOutcome {
    let result = parse_required_date("Start date", start).and_then(|start| {
        let end = parse_required_date("End date", end)?;
        check_absence_range(start, end)
    });
    result.into()
}

pub fn check_holiday_year(year: Option<i32>) -> Result<(), ValidationErrorReason> {
    match year {
        Some(year) if !(MIN_HOLIDAY_YEAR..=MAX_HOLIDAY_YEAR).contains(&year) => {
            Err(ValidationErrorReason::YearOutOfRange { year })
        }
        _ => Ok(()),
    }
}

pub fn validate_public_holiday(
    name: Option<&str>,
    date: Option<&str>,
    year: Option<i32>,
) -> ValidationOutcome {
    if name.map_or(true, |name| name.trim().is_empty()) {
        return ValidationOutcome::fail(ValidationErrorReason::MissingField { field: "Name" });
    }
    parse_required_date("Date", date)
        .and_then(|_| check_holiday_year(year))
        .into()
}

// --- Guard Requests ---

/// One guard invocation as submitted by a form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationRequest {
    #[serde(rename_all = "camelCase")]
    EstimatedHours { value: Option<f64> },
    #[serde(rename_all = "camelCase")]
    CapacityHoursPerWeek { value: Option<f64> },
    #[serde(rename_all = "camelCase")]
    AbsenceDates {
        start_date: Option<String>,
        end_date: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    PublicHoliday {
        name: Option<String>,
        date: Option<String>,
        year: Option<i32>,
    },
}

impl ValidationRequest {
    pub fn evaluate(&self) -> ValidationOutcome {
        match self {
            ValidationRequest::EstimatedHours { value } => validate_estimated_hours(*value),
            ValidationRequest::CapacityHoursPerWeek { value } => {
                validate_capacity_hours_per_week(*value)
            }
            ValidationRequest::AbsenceDates {
                start_date,
                end_date,
            } => validate_absence_dates(start_date.as_deref(), end_date.as_deref()),
            ValidationRequest::PublicHoliday { name, date, year } => {
                validate_public_holiday(name.as_deref(), date.as_deref(), *year)
            }
        }
    }
}

// --- Snapshot Audit ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    Employee,
    Task,
    Holiday,
    Absence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFinding {
    pub kind: RecordKind,
    /// Record id, or its position in the snapshot when it has none.
    pub record: String,
    #[serde(serialize_with = "serialize_finding_reason")]
    pub reason: ValidationErrorReason,
}

fn serialize_finding_reason<S>(reason: &ValidationErrorReason, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&reason.to_string())
}

/// Runs the record-level guards over an already-parsed snapshot.
pub fn validate_snapshot(snapshot: &Snapshot) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();
    let mut record = |kind: RecordKind, record: String, outcome: ValidationOutcome| {
        if let Some(reason) = outcome.error {
            warn!("Invalid {:?} record {}: {}", kind, record, reason);
            findings.push(ValidationFinding {
                kind,
                record,
                reason,
            });
        }
    };

    for employee in &snapshot.employees {
        let hours = employee.capacity_hours_per_week.and_then(|hours| hours.to_f64());
        record(
            RecordKind::Employee,
            employee.id.clone(),
            validate_capacity_hours_per_week(hours),
        );
    }

    for (position, task) in snapshot.tasks.iter().enumerate() {
        let hours = task.estimated_hours.and_then(|hours| hours.to_f64());
        let label = task.id.clone().unwrap_or_else(|| format!("#{}", position));
        record(RecordKind::Task, label, validate_estimated_hours(hours));
    }

    for holiday in &snapshot.holidays {
        let outcome = if holiday.name.trim().is_empty() {
            ValidationOutcome::fail(ValidationErrorReason::MissingField { field: "Name" })
        } else {
            check_holiday_year(holiday.year).into()
        };
        record(RecordKind::Holiday, holiday.date.to_string(), outcome);
    }

    for (position, absence) in snapshot.absences.iter().enumerate() {
        let label = absence.id.clone().unwrap_or_else(|| format!("#{}", position));
        record(
            RecordKind::Absence,
            label,
            check_absence_range(absence.start_date, absence.end_date).into(),
        );
    }

    findings
}
