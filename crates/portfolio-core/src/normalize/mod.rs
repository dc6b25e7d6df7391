//! Record normalizer
//!
//! Stored records are loosely shaped JSON documents whose field names have
//! drifted over time. The functions here reconcile a raw record into the
//! canonical [`Project`], [`Task`] and [`HistoryEntry`] types using the
//! ordered alias tables in [`aliases`]. Normalization is total: missing or
//! malformed optional fields fall back to defaults instead of failing.

pub mod aliases;
pub mod code;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::domain::{
    AiAnalysis, HistoryEntry, Priority, Project, ProjectStatus, Task, TaskStatus,
    UNASSIGNED_LEADER,
};
use crate::metrics::planned_progress;
use crate::risk::{ProjectRiskLevel, TaskRiskLevel};
use crate::storage::Record;

/// Look up a possibly dotted path in a record
fn lookup<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = record.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// First non-blank value among the aliases
pub fn first<'a>(record: &'a Record, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| lookup(record, alias))
        .find(|value| !is_blank(value))
}

/// First alias as text; numbers and booleans are stringified
pub fn text(record: &Record, aliases: &[&str]) -> Option<String> {
    match first(record, aliases)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First alias as a number; numeric strings are accepted
pub fn number(record: &Record, aliases: &[&str]) -> Option<f64> {
    aliases
        .iter()
        .filter_map(|alias| lookup(record, alias))
        .find_map(|value| match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|n| n.is_finite())
}

/// Parse a calendar date, also accepting a full timestamp
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(raw).map(|ts| ts.date_naive()))
}

/// Parse an RFC 3339 or SQLite `YYYY-MM-DD HH:MM:SS` timestamp
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

pub fn date(record: &Record, aliases: &[&str]) -> Option<NaiveDate> {
    first(record, aliases)?.as_str().and_then(parse_date)
}

pub fn timestamp(record: &Record, aliases: &[&str]) -> Option<DateTime<Utc>> {
    first(record, aliases)?.as_str().and_then(parse_timestamp)
}

fn string_list(record: &Record, aliases: &[&str]) -> Vec<String> {
    match first(record, aliases) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn integer(record: &Record, aliases: &[&str]) -> i64 {
    first(record, aliases).and_then(Value::as_i64).unwrap_or(0)
}

fn progress(record: &Record, aliases: &[&str]) -> f64 {
    number(record, aliases).unwrap_or(0.0).clamp(0.0, 100.0)
}

/// Stored analysis, or `None` when it does not match the typed shape
fn analysis(record: &Record, id: i64) -> Option<AiAnalysis> {
    let value = first(record, aliases::project::AI_ANALYSIS)?;
    // legacy rows sometimes hold the analysis as a JSON string
    let parsed = match value {
        Value::String(raw) => serde_json::from_str::<AiAnalysis>(raw),
        other => serde_json::from_value::<AiAnalysis>(other.clone()),
    };
    match parsed {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            warn!(project_id = id, error = %e, "Ignoring malformed stored analysis");
            None
        }
    }
}

/// Reconcile a stored project record into the canonical shape
///
/// `planned_progress` is always recomputed from the dates against `now`,
/// whatever the record holds.
pub fn normalize_project(record: &Record, now: DateTime<Utc>) -> Project {
    use aliases::project as f;

    let id = integer(record, aliases::meta::ID);
    let name = text(record, f::NAME).unwrap_or_default();
    let start_date = date(record, f::START_DATE);
    let end_date = date(record, f::END_DATE);

    let code = text(record, f::CODE)
        .unwrap_or_else(|| code::project_code(&name, start_date, id, now.year()));

    let status = text(record, f::STATUS)
        .map(|s| ProjectStatus::parse(&s))
        .unwrap_or(ProjectStatus::InProgress);
    let status_label = status.display_label().to_string();

    let priority = text(record, f::PRIORITY)
        .and_then(|p| Priority::parse(&p))
        .unwrap_or_default();

    Project {
        id,
        code,
        name,
        description: text(record, f::DESCRIPTION),
        status,
        status_label,
        priority,
        start_date,
        end_date,
        budget_total: number(record, f::BUDGET_TOTAL).unwrap_or(0.0),
        budget_consumed: number(record, f::BUDGET_CONSUMED).unwrap_or(0.0),
        planned_progress: planned_progress(start_date, end_date, now),
        actual_progress: progress(record, f::ACTUAL_PROGRESS),
        leader: text(record, f::LEADER).unwrap_or_else(|| UNASSIGNED_LEADER.to_string()),
        management_system: text(record, f::MANAGEMENT_SYSTEM),
        management_path: text(record, f::MANAGEMENT_PATH),
        ai_analysis: analysis(record, id),
        ai_risk_level: text(record, f::AI_RISK_LEVEL).and_then(|l| ProjectRiskLevel::parse(&l)),
        ai_last_analysis_date: timestamp(record, f::AI_LAST_ANALYSIS_DATE),
        created_at: timestamp(record, aliases::meta::CREATED_AT),
        updated_at: timestamp(record, aliases::meta::UPDATED_AT),
        tasks: Vec::new(),
        history: Vec::new(),
    }
}

/// Reconcile a stored task record into the canonical shape
pub fn normalize_task(record: &Record) -> Task {
    use aliases::task as f;

    Task {
        id: integer(record, aliases::meta::ID),
        project_id: integer(record, aliases::meta::PROJECT_ID),
        task_code: text(record, f::TASK_CODE).unwrap_or_default(),
        name: text(record, f::NAME).unwrap_or_default(),
        description: text(record, f::DESCRIPTION),
        stage: text(record, f::STAGE),
        milestone: text(record, f::MILESTONE),
        status: text(record, f::STATUS)
            .map(|s| TaskStatus::parse(&s))
            .unwrap_or(TaskStatus::Pending),
        responsible: text(record, f::RESPONSIBLE),
        start_date: date(record, f::START_DATE),
        end_date: date(record, f::END_DATE),
        actual_progress: progress(record, f::ACTUAL_PROGRESS),
        ai_risk_level: text(record, f::AI_RISK_LEVEL).and_then(|l| TaskRiskLevel::parse(&l)),
        ai_validation_status: text(record, f::AI_VALIDATION_STATUS),
        ai_risk_reasons: string_list(record, f::AI_RISK_REASONS),
        created_at: timestamp(record, aliases::meta::CREATED_AT),
        updated_at: timestamp(record, aliases::meta::UPDATED_AT),
    }
}

/// Reconcile a stored history record
pub fn normalize_history(record: &Record) -> HistoryEntry {
    use aliases::history as f;

    HistoryEntry {
        id: integer(record, aliases::meta::ID),
        project_id: integer(record, aliases::meta::PROJECT_ID),
        change_type: text(record, f::CHANGE_TYPE).unwrap_or_else(|| "update".to_string()),
        field_changed: text(record, f::FIELD_CHANGED),
        old_value: text(record, f::OLD_VALUE),
        new_value: text(record, f::NEW_VALUE),
        changed_by: text(record, f::CHANGED_BY),
        description: text(record, f::DESCRIPTION),
        change_date: timestamp(record, aliases::meta::CREATED_AT),
    }
}
