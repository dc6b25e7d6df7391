//! Canonical task representation

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::risk::TaskRiskLevel;

/// Task workflow status
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
    Cancelled,
    /// Legacy status found in older records
    Delayed,
    Other(String),
}

impl TaskStatus {
    /// The five statuses a task is created and edited with
    pub const WORKFLOW: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Blocked,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "Pendiente",
            TaskStatus::InProgress => "En Progreso",
            TaskStatus::Completed => "Completada",
            TaskStatus::Blocked => "Bloqueada",
            TaskStatus::Cancelled => "Cancelada",
            TaskStatus::Delayed => "Retrasada",
            TaskStatus::Other(raw) => raw,
        }
    }

    /// Stored spellings that parse to this status, for storage filters
    pub fn stored_forms(&self) -> Vec<String> {
        let legacy = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Delayed => "delayed",
            TaskStatus::Other(raw) => return vec![raw.clone()],
        };
        vec![self.as_str().to_string(), legacy.to_string()]
    }

    /// Parse a stored status; English snake_case spellings are accepted too
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "pendiente" | "pending" => TaskStatus::Pending,
            "en progreso" | "in_progress" => TaskStatus::InProgress,
            "completada" | "completed" => TaskStatus::Completed,
            "bloqueada" | "blocked" => TaskStatus::Blocked,
            "cancelada" | "cancelled" => TaskStatus::Cancelled,
            "retrasada" | "delayed" => TaskStatus::Delayed,
            _ => TaskStatus::Other(trimmed.to_string()),
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task belonging to a project
///
/// The `ai_*` fields cache the last output of the task risk scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub task_code: String,
    pub name: String,
    pub description: Option<String>,
    pub stage: Option<String>,
    pub milestone: Option<String>,
    pub status: TaskStatus,
    pub responsible: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub actual_progress: f64,
    pub ai_risk_level: Option<TaskRiskLevel>,
    pub ai_validation_status: Option<String>,
    pub ai_risk_reasons: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Build an unsaved task with defaults, mostly for scoring ad-hoc input
    pub fn draft(name: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: 0,
            project_id: 0,
            task_code: String::new(),
            name: name.into(),
            description: None,
            stage: None,
            milestone: None,
            status,
            responsible: None,
            start_date: None,
            end_date: None,
            actual_progress: 0.0,
            ai_risk_level: None,
            ai_validation_status: None,
            ai_risk_reasons: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.actual_progress = progress;
        self
    }

    pub fn with_end_date(mut self, end: NaiveDate) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn with_responsible(mut self, responsible: impl Into<String>) -> Self {
        self.responsible = Some(responsible.into());
        self
    }

    /// Has a non-blank assignee
    pub fn has_owner(&self) -> bool {
        self.responsible
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty())
    }
}

/// Fields accepted when creating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub name: String,
    /// Explicit code; generated from the project code when absent
    pub task_code: Option<String>,
    pub description: Option<String>,
    pub stage: Option<String>,
    pub milestone: Option<String>,
    pub status: Option<TaskStatus>,
    pub responsible: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub actual_progress: Option<f64>,
}

impl NewTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Partial update of a task; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub stage: Option<String>,
    pub milestone: Option<String>,
    pub status: Option<TaskStatus>,
    pub responsible: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub actual_progress: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_round_trip() {
        for status in TaskStatus::WORKFLOW {
            assert_eq!(TaskStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_task_status_accepts_english_forms() {
        assert_eq!(TaskStatus::parse("completed"), TaskStatus::Completed);
        assert_eq!(TaskStatus::parse("in_progress"), TaskStatus::InProgress);
        assert_eq!(TaskStatus::parse("Retrasada"), TaskStatus::Delayed);
    }

    #[test]
    fn test_stored_forms_parse_back() {
        for status in TaskStatus::WORKFLOW.into_iter().chain([TaskStatus::Delayed]) {
            let forms = status.stored_forms();
            assert_eq!(forms.len(), 2);
            assert!(forms.iter().all(|f| TaskStatus::parse(f) == status));
        }
        assert_eq!(
            TaskStatus::Other("QA".to_string()).stored_forms(),
            vec!["QA".to_string()]
        );
    }

    #[test]
    fn test_task_status_unknown_passes_through() {
        assert_eq!(
            TaskStatus::parse("En Revisión"),
            TaskStatus::Other("En Revisión".to_string())
        );
    }

    #[test]
    fn test_has_owner() {
        let task = Task::draft("Diseño", TaskStatus::Pending);
        assert!(!task.has_owner());
        assert!(!task.clone().with_responsible("   ").has_owner());
        assert!(task.with_responsible("Ana").has_owner());
    }
}
