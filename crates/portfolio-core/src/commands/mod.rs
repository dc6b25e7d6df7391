//! Commands module - all operations as library functions
//!
//! These are the operations the CLI (or any other front end) calls. Each
//! repository borrows a [`Database`](crate::storage::Database) and returns
//! canonical domain types.

pub mod dashboard;
pub mod history;
pub mod project;
pub mod task;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::storage::{Fields, Record};

pub use dashboard::{DashboardStats, get_dashboard_stats};
pub use history::HistoryRepository;
pub use project::{ProjectFilters, ProjectRepository};
pub use task::{TaskFilters, TaskRepository, TaskStatistics, score_task};

/// Write a value under the canonical (first) name of a field
pub(crate) fn put<T: Serialize>(record: &mut Record, fields: Fields, value: &T) -> Result<()> {
    record.insert(fields[0].to_string(), serde_json::to_value(value)?);
    Ok(())
}

/// Write an optional value, storing `null` when absent
pub(crate) fn put_opt<T: Serialize>(
    record: &mut Record,
    fields: Fields,
    value: Option<&T>,
) -> Result<()> {
    match value {
        Some(value) => put(record, fields, value),
        None => {
            record.insert(fields[0].to_string(), Value::Null);
            Ok(())
        }
    }
}

pub(crate) fn require_name(name: &str, what: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation(format!("{what} name must not be empty")));
    }
    Ok(())
}

pub(crate) fn check_progress(progress: Option<f64>) -> Result<()> {
    match progress {
        Some(p) if !(0.0..=100.0).contains(&p) => Err(Error::Validation(format!(
            "progress must be between 0 and 100, got {p}"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn check_amount(label: &str, amount: Option<f64>) -> Result<()> {
    match amount {
        Some(a) if !a.is_finite() || a < 0.0 => Err(Error::Validation(format!(
            "{label} must be a non-negative amount, got {a}"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(Error::Validation(format!(
            "end date {end} is before start date {start}"
        ))),
        _ => Ok(()),
    }
}
