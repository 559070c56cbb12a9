// src/export.rs
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::models::{UtilizationReport, UtilizationResult, UtilizationStatus};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV write failed")]
    Csv(#[from] csv::Error),

    #[error("File I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },
}

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    employee_id: &'a str,
    name: &'a str,
    working_days: u32,
    capacity_hours: Decimal,
    workload_hours: Decimal,
    remaining_hours: Decimal,
    utilization_percent: Decimal,
    status: UtilizationStatus,
}

impl<'a> From<&'a UtilizationResult> for ReportRow<'a> {
    fn from(result: &'a UtilizationResult) -> Self {
        Self {
            employee_id: &result.employee_id,
            name: result.name.as_deref().unwrap_or(""),
            working_days: result.working_days,
            capacity_hours: result.capacity_hours.normalize(),
            workload_hours: result.workload_hours.normalize(),
            remaining_hours: result.remaining_hours.normalize(),
            utilization_percent: result.utilization_percent.round_dp(1),
            status: result.status,
        }
    }
}

pub const REPORT_CSV_HEADER: [&str; 8] = [
    "employee_id",
    "name",
    "working_days",
    "capacity_hours",
    "workload_hours",
    "remaining_hours",
    "utilization_percent",
    "status",
];

/// One row per employee. The header is written even when the report has no rows.
pub fn write_report_csv<W: Write>(report: &UtilizationReport, writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(REPORT_CSV_HEADER)?;
    for result in &report.employees {
        csv_writer.serialize(ReportRow::from(result))?;
    }
    csv_writer.flush().map_err(|source| ExportError::Io {
        source,
        context: "flushing CSV output".to_string(),
    })?;
    Ok(())
}

pub fn export_report_to_file(report: &UtilizationReport, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|source| ExportError::Io {
        source,
        context: format!("creating {}", path.display()),
    })?;
    write_report_csv(report, file)?;
    info!(
        "Wrote {} report rows to {}",
        report.employees.len(),
        path.display()
    );
    Ok(())
}
