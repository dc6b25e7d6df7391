//! Canonical project representation

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::analysis::AiAnalysis;
use super::history::HistoryEntry;
use super::task::Task;
use crate::risk::ProjectRiskLevel;

/// Project lifecycle status
///
/// Stored values may be the internal form (`in_progress`) or the display
/// label (`Activo`); both parse to the same variant. Values outside the
/// table are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
    Other(String),
}

impl ProjectStatus {
    /// Every known status, in lifecycle order
    pub const KNOWN: [ProjectStatus; 5] = [
        ProjectStatus::Planning,
        ProjectStatus::InProgress,
        ProjectStatus::Completed,
        ProjectStatus::OnHold,
        ProjectStatus::Cancelled,
    ];

    /// Internal form used for storage
    pub fn as_str(&self) -> &str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Cancelled => "cancelled",
            ProjectStatus::Other(raw) => raw,
        }
    }

    /// Display label shown to users; unknown values pass through
    pub fn display_label(&self) -> &str {
        match self {
            ProjectStatus::Planning => "En Planificación",
            ProjectStatus::InProgress => "Activo",
            ProjectStatus::Completed => "Completado",
            ProjectStatus::OnHold => "En Pausa",
            ProjectStatus::Cancelled => "Cancelado",
            ProjectStatus::Other(raw) => raw,
        }
    }

    /// Parse either the internal form or the display label
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        Self::KNOWN
            .into_iter()
            .find(|status| {
                status.as_str().eq_ignore_ascii_case(trimmed)
                    || status.display_label().eq_ignore_ascii_case(trimmed)
            })
            .unwrap_or_else(|| ProjectStatus::Other(trimmed.to_string()))
    }

    /// Stored spellings that mean this status, for storage filters
    pub fn stored_forms(&self) -> Vec<String> {
        match self {
            ProjectStatus::Other(raw) => vec![raw.clone()],
            known => vec![known.as_str().to_string(), known.display_label().to_string()],
        }
    }
}

impl From<String> for ProjectStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ProjectStatus> for String {
    fn from(status: ProjectStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_label())
    }
}

/// Project priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" | "baja" => Some(Priority::Low),
            "medium" | "media" => Some(Priority::Medium),
            "high" | "alta" => Some(Priority::High),
            "critical" | "crítica" | "critica" => Some(Priority::Critical),
            _ => None,
        }
    }
}

/// Leader shown when nobody is assigned
pub const UNASSIGNED_LEADER: &str = "No asignado";

/// A project as exposed to callers
///
/// `planned_progress` is always recomputed from the dates when the record is
/// read; `actual_progress` is the stored source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    /// Display form of `status`
    pub status_label: String,
    pub priority: Priority,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget_total: f64,
    pub budget_consumed: f64,
    pub planned_progress: f64,
    pub actual_progress: f64,
    pub leader: String,
    pub management_system: Option<String>,
    pub management_path: Option<String>,
    pub ai_analysis: Option<AiAnalysis>,
    pub ai_risk_level: Option<ProjectRiskLevel>,
    pub ai_last_analysis_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
}

impl Project {
    /// Difference between actual and planned progress, in points
    pub fn schedule_deviation(&self) -> f64 {
        self.actual_progress - self.planned_progress
    }
}

/// Fields accepted when creating a project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget_total: Option<f64>,
    pub budget_consumed: Option<f64>,
    pub actual_progress: Option<f64>,
    pub leader: Option<String>,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_budget(mut self, total: f64, consumed: f64) -> Self {
        self.budget_total = Some(total);
        self.budget_consumed = Some(consumed);
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.actual_progress = Some(progress);
        self
    }

    pub fn with_leader(mut self, leader: impl Into<String>) -> Self {
        self.leader = Some(leader.into());
        self
    }
}

/// Partial update of a project; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget_total: Option<f64>,
    pub budget_consumed: Option<f64>,
    pub actual_progress: Option<f64>,
    pub leader: Option<String>,
    /// Recorded as the author of the resulting history entries
    pub changed_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_internal_and_display_forms() {
        assert_eq!(ProjectStatus::parse("in_progress"), ProjectStatus::InProgress);
        assert_eq!(ProjectStatus::parse("Activo"), ProjectStatus::InProgress);
        assert_eq!(ProjectStatus::parse("En Pausa"), ProjectStatus::OnHold);
        assert_eq!(ProjectStatus::parse(" completed "), ProjectStatus::Completed);
    }

    #[test]
    fn test_status_display_table() {
        assert_eq!(ProjectStatus::Planning.display_label(), "En Planificación");
        assert_eq!(ProjectStatus::InProgress.display_label(), "Activo");
        assert_eq!(ProjectStatus::Completed.display_label(), "Completado");
        assert_eq!(ProjectStatus::OnHold.display_label(), "En Pausa");
        assert_eq!(ProjectStatus::Cancelled.display_label(), "Cancelado");
    }

    #[test]
    fn test_unknown_status_passes_through() {
        let status = ProjectStatus::parse("archived");
        assert_eq!(status, ProjectStatus::Other("archived".to_string()));
        assert_eq!(status.display_label(), "archived");
        assert_eq!(status.as_str(), "archived");
    }

    #[test]
    fn test_status_serializes_internal_form() {
        let json = serde_json::to_string(&ProjectStatus::OnHold).unwrap();
        assert_eq!(json, "\"on_hold\"");
        let back: ProjectStatus = serde_json::from_str("\"Cancelado\"").unwrap();
        assert_eq!(back, ProjectStatus::Cancelled);
    }

    #[test]
    fn test_stored_forms() {
        assert_eq!(
            ProjectStatus::InProgress.stored_forms(),
            vec!["in_progress".to_string(), "Activo".to_string()]
        );
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!(Priority::parse("HIGH"), Some(Priority::High));
        assert_eq!(Priority::parse("alta"), Some(Priority::High));
        assert_eq!(Priority::parse("urgent"), None);
    }
}
