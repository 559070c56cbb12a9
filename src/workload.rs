// src/workload.rs
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::models::{add_hours, AnalysisPeriod, Employee, EmployeeId, Task};

/// Two-step assignee lookup: linked account first, employee id second.
///
/// When several employees share a linked account id, the first one listed wins.
#[derive(Debug, Clone)]
pub struct AssigneeIndex<'a> {
    by_account: HashMap<&'a str, &'a Employee>,
    by_id: HashMap<&'a str, &'a Employee>,
}

impl<'a> AssigneeIndex<'a> {
    pub fn new(employees: &'a [Employee]) -> Self {
        let mut by_account = HashMap::new();
        let mut by_id = HashMap::new();
        for employee in employees {
            if let Some(account_id) = employee.linked_account_id.as_deref() {
                by_account.entry(account_id).or_insert(employee);
            }
            by_id.entry(employee.id.as_str()).or_insert(employee);
        }
        Self { by_account, by_id }
    }

    pub fn resolve(&self, assignee_id: &str) -> Option<&'a Employee> {
        self.by_account
            .get(assignee_id)
            .or_else(|| self.by_id.get(assignee_id))
            .copied()
    }
}

/// Linear version of [`AssigneeIndex::resolve`] for one-off lookups.
pub fn resolve_assignee<'a>(assignee_id: &str, employees: &'a [Employee]) -> Option<&'a Employee> {
    employees
        .iter()
        .find(|employee| employee.linked_account_id.as_deref() == Some(assignee_id))
        .or_else(|| employees.iter().find(|employee| employee.id == assignee_id))
}

/// Undated items are open commitments and always count.
pub fn falls_in_period(task: &Task, period: &AnalysisPeriod) -> bool {
    task.due_date.map_or(true, |due| period.contains(due))
}

/// Missing or negative estimates contribute nothing.
pub fn task_hours(task: &Task) -> Decimal {
    task.estimated_hours
        .filter(|hours| !hours.is_sign_negative())
        .unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkloadTotals {
    /// Every employee is present, with zero when nothing was assigned.
    pub hours_by_employee: HashMap<EmployeeId, Decimal>,
    pub unattributed_items: usize,
}

impl WorkloadTotals {
    pub fn hours_for(&self, employee_id: &str) -> Decimal {
        self.hours_by_employee
            .get(employee_id)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

pub fn aggregate_workload(
    tasks: &[Task],
    employees: &[Employee],
    period: &AnalysisPeriod,
) -> WorkloadTotals {
    let index = AssigneeIndex::new(employees);
    let mut totals = WorkloadTotals {
        hours_by_employee: employees
            .iter()
            .map(|employee| (employee.id.clone(), Decimal::ZERO))
            .collect(),
        unattributed_items: 0,
    };

    for task in tasks.iter().filter(|task| falls_in_period(task, period)) {
        let employee = task
            .assignee_id
            .as_deref()
            .and_then(|assignee_id| index.resolve(assignee_id));
        match employee {
            Some(employee) => {
                let hours = totals
                    .hours_by_employee
                    .entry(employee.id.clone())
                    .or_insert(Decimal::ZERO);
                *hours = add_hours(*hours, task_hours(task));
            }
            None => {
                trace!(
                    "Workload item {:?} (assignee {:?}) matches no employee, excluded",
                    task.id,
                    task.assignee_id
                );
                totals.unattributed_items += 1;
            }
        }
    }

    debug!(
        "Aggregated workload for {} employees, {} unattributed items",
        employees.len(),
        totals.unattributed_items
    );
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn week() -> AnalysisPeriod {
        AnalysisPeriod::new(d("2024-05-06"), d("2024-05-12"))
    }

    fn team() -> Vec<Employee> {
        vec![
            Employee::new("E1").linked_account("U1"),
            Employee::new("E2"),
            // E3's account id collides with E2's employee id.
            Employee::new("E3").linked_account("E2"),
        ]
    }

    #[test]
    fn test_resolves_linked_account_before_employee_id() {
        let employees = team();
        let index = AssigneeIndex::new(&employees);

        assert_eq!(index.resolve("U1").map(|e| e.id.as_str()), Some("E1"));
        assert_eq!(index.resolve("E1").map(|e| e.id.as_str()), Some("E1"));
        assert_eq!(index.resolve("E2").map(|e| e.id.as_str()), Some("E3"));
        assert!(index.resolve("nobody").is_none());
    }

    #[test]
    fn test_linear_and_indexed_resolution_agree() {
        let employees = team();
        let index = AssigneeIndex::new(&employees);
        for assignee in ["U1", "E1", "E2", "E3", "nobody"] {
            assert_eq!(
                resolve_assignee(assignee, &employees).map(|e| &e.id),
                index.resolve(assignee).map(|e| &e.id),
                "assignee {}",
                assignee
            );
        }
    }

    #[test]
    fn test_sums_hours_per_employee() {
        let employees = team();
        let tasks = vec![
            Task::assigned("U1", dec!(10)).due(d("2024-05-07")),
            Task::assigned("E1", dec!(5.5)),
            Task::assigned("E3", dec!(8)).due(d("2024-05-12")),
        ];
        let totals = aggregate_workload(&tasks, &employees, &week());

        assert_eq!(totals.hours_for("E1"), dec!(15.5));
        assert_eq!(totals.hours_for("E2"), dec!(0));
        assert_eq!(totals.hours_for("E3"), dec!(8));
        assert_eq!(totals.hours_by_employee.len(), 3);
        assert_eq!(totals.unattributed_items, 0);
    }

    #[test]
    fn test_out_of_period_items_are_skipped() {
        let employees = team();
        let tasks = vec![
            Task::assigned("E1", dec!(10)).due(d("2024-05-05")),
            Task::assigned("E1", dec!(10)).due(d("2024-05-13")),
            Task::assigned("E1", dec!(3)).due(d("2024-05-06")),
        ];
        let totals = aggregate_workload(&tasks, &employees, &week());
        assert_eq!(totals.hours_for("E1"), dec!(3));
        assert_eq!(totals.unattributed_items, 0);
    }

    #[test]
    fn test_unmatched_assignee_is_excluded() {
        let employees = team();
        let tasks = vec![
            Task::assigned("ghost", dec!(40)).id("T1"),
            Task {
                id: Some("T2".to_string()),
                estimated_hours: Some(dec!(12)),
                ..Default::default()
            },
            Task::assigned("E2", dec!(4)),
        ];
        let totals = aggregate_workload(&tasks, &employees, &week());

        assert_eq!(totals.unattributed_items, 2);
        let total: Decimal = totals.hours_by_employee.values().copied().sum();
        assert_eq!(total, dec!(4));
    }

    #[test]
    fn test_missing_or_negative_estimates_count_as_zero() {
        let employees = team();
        let tasks = vec![
            Task {
                assignee_id: Some("E1".to_string()),
                ..Default::default()
            },
            Task::assigned("E1", dec!(-6)),
            Task::assigned("E1", dec!(2)),
        ];
        let totals = aggregate_workload(&tasks, &employees, &week());
        assert_eq!(totals.hours_for("E1"), dec!(2));
    }

    #[test]
    fn test_overflowing_estimates_saturate() {
        let employees = team();
        let huge = Decimal::from_i128_with_scale(70_000_000_000_000_000_000_000_000_000, 0);
        let tasks = vec![
            Task::assigned("E1", huge).id("T1"),
            Task::assigned("U1", huge).id("T2"),
            Task::assigned("E3", dec!(4)),
        ];
        let totals = aggregate_workload(&tasks, &employees, &week());
        assert_eq!(totals.hours_for("E1"), Decimal::MAX);
        assert_eq!(totals.hours_for("E3"), dec!(4));
    }
}
