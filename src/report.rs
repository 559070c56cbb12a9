// src/report.rs
use tracing::info;

use crate::capacity::calculate_available_capacity;
use crate::models::{sub_hours, AnalysisPeriod, Snapshot, UtilizationReport, UtilizationResult};
use crate::utilization::{classify, summarize_team};
use crate::workload::aggregate_workload;

/// Runs capacity, workload and utilization for every employee in the snapshot.
///
/// An empty period is not an error: every employee reports zero capacity.
pub fn build_utilization_report(snapshot: &Snapshot, period: AnalysisPeriod) -> UtilizationReport {
    let workload = aggregate_workload(&snapshot.tasks, &snapshot.employees, &period);

    let employees: Vec<UtilizationResult> = snapshot
        .employees
        .iter()
        .map(|employee| {
            let capacity = calculate_available_capacity(
                employee,
                period.start,
                period.end,
                &snapshot.holidays,
                &snapshot.absences,
            );
            let workload_hours = workload.hours_for(&employee.id);
            let utilization = classify(capacity.capacity_hours, workload_hours);
            UtilizationResult {
                employee_id: employee.id.clone(),
                name: employee.name.clone(),
                working_days: capacity.working_days,
                capacity_hours: capacity.capacity_hours,
                workload_hours,
                remaining_hours: sub_hours(capacity.capacity_hours, workload_hours),
                utilization_percent: utilization.percent,
                status: utilization.status,
            }
        })
        .collect();

    let team = summarize_team(&employees);
    info!(
        "Utilization report {}..{}: {} employees, team average {}%, {} over, {} unattributed items",
        period.start,
        period.end,
        employees.len(),
        team.average_utilization_percent.round_dp(1),
        team.over_count,
        workload.unattributed_items
    );

    UtilizationReport {
        period_start: period.start,
        period_end: period.end,
        employees,
        team,
        unattributed_items: workload.unattributed_items,
    }
}
