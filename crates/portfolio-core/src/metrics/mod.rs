//! Derived project metrics
//!
//! Pure functions that turn stored dates, budgets and progress counters into
//! the indicators used by listings, prompts and the local analysis fallback.
//!
//! # Date convention
//!
//! Project and task dates are calendar dates. Whenever a date has to be
//! compared with an instant it is read as UTC midnight of that day, and day
//! counts are whole days between calendar dates.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Interpret a calendar date as the instant it starts (UTC midnight)
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Planned progress by date, unrounded
///
/// 0 before the start or when either date is missing, 100 after the end,
/// linear in between.
pub fn planned_progress_exact(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> f64 {
    let (Some(start), Some(end)) = (start, end) else {
        return 0.0;
    };

    let start = start_of_day(start);
    let end = start_of_day(end);

    if now < start {
        return 0.0;
    }
    if now > end || end <= start {
        return 100.0;
    }

    let total = (end - start).num_seconds() as f64;
    let elapsed = (now - start).num_seconds() as f64;
    (elapsed / total * 100.0).clamp(0.0, 100.0)
}

/// Planned progress by date, rounded to the nearest whole percent
///
/// This is the canonical value exposed on projects and fed to SPI.
pub fn planned_progress(start: Option<NaiveDate>, end: Option<NaiveDate>, now: DateTime<Utc>) -> f64 {
    planned_progress_exact(start, end, now).round()
}

/// Schedule Performance Index: actual / planned
///
/// A project with no planned progress yet is reported as on track (1.0).
pub fn schedule_performance_index(actual_progress: f64, planned_progress: f64) -> f64 {
    if planned_progress > 0.0 {
        actual_progress / planned_progress
    } else {
        1.0
    }
}

/// Cost Performance Index: earned value / actual cost
///
/// Nothing spent yet is reported as on budget (1.0).
pub fn cost_performance_index(budget_total: f64, budget_consumed: f64, actual_progress: f64) -> f64 {
    if budget_consumed > 0.0 {
        (budget_total * (actual_progress / 100.0)) / budget_consumed
    } else {
        1.0
    }
}

/// Absolute number of whole days between two dates
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days().abs()
}

/// Signed number of days from `today` until `date` (negative once passed)
pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}

/// Percentage of completed items, 0 for an empty set
pub fn completion_rate(completed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}

/// Linear extrapolation of the completion date from the progress rate so far
///
/// Falls back to the planned end date when no rate can be measured (nothing
/// elapsed yet or no progress reported).
pub fn predicted_completion_date(
    start: NaiveDate,
    end: Option<NaiveDate>,
    actual_progress: f64,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let days_elapsed = (today - start).num_days();
    if days_elapsed <= 0 || actual_progress <= 0.0 {
        return end;
    }

    let rate = actual_progress / days_elapsed as f64;
    let predicted_total_days = (100.0 / rate).trunc();
    if !predicted_total_days.is_finite() || predicted_total_days > i32::MAX as f64 {
        return end;
    }

    start
        .checked_add_signed(Duration::days(predicted_total_days as i64))
        .or(end)
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Timeline figures for a project with both dates set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineMetrics {
    pub total_days: i64,
    pub elapsed_days: i64,
    pub remaining_days: i64,
    pub time_elapsed_percentage: f64,
}

impl TimelineMetrics {
    /// Compute timeline figures; `None` unless both dates are known
    pub fn compute(start: Option<NaiveDate>, end: Option<NaiveDate>, today: NaiveDate) -> Option<Self> {
        let (start, end) = (start?, end?);
        let total_days = (end - start).num_days();
        let elapsed_days = (today - start).num_days();
        let remaining_days = (end - today).num_days();
        let time_elapsed_percentage = if total_days > 0 {
            elapsed_days as f64 / total_days as f64 * 100.0
        } else {
            0.0
        };

        Some(Self {
            total_days,
            elapsed_days,
            remaining_days,
            time_elapsed_percentage,
        })
    }
}

/// Budget figures for a project
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    pub budget_total: f64,
    pub budget_consumed: f64,
    pub budget_remaining: f64,
    /// Share of the budget already spent, in percent
    pub consumption_percentage: f64,
    pub cost_performance_index: f64,
}

impl FinancialMetrics {
    pub fn compute(budget_total: f64, budget_consumed: f64, actual_progress: f64) -> Self {
        let consumption_percentage = if budget_total > 0.0 {
            budget_consumed / budget_total * 100.0
        } else {
            0.0
        };

        Self {
            budget_total,
            budget_consumed,
            budget_remaining: budget_total - budget_consumed,
            consumption_percentage,
            cost_performance_index: cost_performance_index(
                budget_total,
                budget_consumed,
                actual_progress,
            ),
        }
    }

    /// Spending runs ahead of delivered progress by more than `margin` points
    pub fn overspent_by_more_than(&self, actual_progress: f64, margin: f64) -> bool {
        self.consumption_percentage > actual_progress + margin
    }
}
