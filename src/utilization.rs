// src/utilization.rs
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

use crate::models::{sum_hours, TeamSummary, UtilizationResult, UtilizationStatus};

/// Above this percentage an employee is optimally loaded.
pub const OPTIMAL_THRESHOLD_PERCENT: Decimal = dec!(80);
/// Above this percentage an employee is over-allocated.
pub const OVER_THRESHOLD_PERCENT: Decimal = dec!(100);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Utilization {
    pub percent: Decimal,
    pub status: UtilizationStatus,
}

/// Workload as a percentage of capacity. Zero capacity yields 0% rather than a division error;
/// a percentage too large for `Decimal` saturates.
pub fn utilization_percent(capacity_hours: Decimal, workload_hours: Decimal) -> Decimal {
    if capacity_hours <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    workload_hours
        .checked_div(capacity_hours)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .unwrap_or_else(|| {
            warn!(
                "Utilization of {} h against {} h is out of range, saturating",
                workload_hours, capacity_hours
            );
            if workload_hours.is_sign_negative() {
                Decimal::MIN
            } else {
                Decimal::MAX
            }
        })
}

pub fn status_for_percent(percent: Decimal) -> UtilizationStatus {
    if percent > OVER_THRESHOLD_PERCENT {
        UtilizationStatus::Over
    } else if percent > OPTIMAL_THRESHOLD_PERCENT {
        UtilizationStatus::Optimal
    } else {
        UtilizationStatus::Under
    }
}

pub fn classify(capacity_hours: Decimal, workload_hours: Decimal) -> Utilization {
    let percent = utilization_percent(capacity_hours, workload_hours);
    Utilization {
        percent,
        status: status_for_percent(percent),
    }
}

/// Unweighted mean of per-employee percentages. Zero-capacity employees are included at 0%.
pub fn average_utilization(results: &[UtilizationResult]) -> Decimal {
    if results.is_empty() {
        return Decimal::ZERO;
    }
    let sum = sum_hours(results.iter().map(|result| result.utilization_percent));
    sum.checked_div(Decimal::from(results.len()))
        .unwrap_or(Decimal::ZERO)
}

pub fn summarize_team(results: &[UtilizationResult]) -> TeamSummary {
    let count_status = |status: UtilizationStatus| {
        results
            .iter()
            .filter(|result| result.status == status)
            .count()
    };
    TeamSummary {
        average_utilization_percent: average_utilization(results),
        total_capacity_hours: sum_hours(results.iter().map(|result| result.capacity_hours)),
        total_workload_hours: sum_hours(results.iter().map(|result| result.workload_hours)),
        under_count: count_status(UtilizationStatus::Under),
        optimal_count: count_status(UtilizationStatus::Optimal),
        over_count: count_status(UtilizationStatus::Over),
    }
}
