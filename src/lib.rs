// src/lib.rs
//! Capacity and utilization engine for a team workload dashboard.

pub mod calendar;
pub mod capacity;
pub mod config;
pub mod export;
pub mod models;
pub mod report;
pub mod server;
pub mod source;
pub mod utilization;
pub mod validation;
pub mod working_days;
pub mod workload;


pub use calendar::{is_working_day, ExclusionIndex};
pub use capacity::{calculate_available_capacity, calculate_weekly_capacity, weekly_breakdown};
pub use models::{
    Absence, AnalysisPeriod, CapacityResult, Employee, PublicHoliday, Snapshot, Task,
    UtilizationReport, UtilizationResult, UtilizationStatus,
};
pub use report::build_utilization_report;
pub use utilization::classify;
pub use working_days::count_working_days;
pub use workload::aggregate_workload;
