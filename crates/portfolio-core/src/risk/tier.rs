//! Risk tiers and the project health classifier

use serde::{Deserialize, Serialize};

/// Coarse project risk tier derived from the AI health score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRiskLevel {
    Green,
    Yellow,
    Red,
}

impl ProjectRiskLevel {
    pub const ALL: [ProjectRiskLevel; 3] = [
        ProjectRiskLevel::Green,
        ProjectRiskLevel::Yellow,
        ProjectRiskLevel::Red,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRiskLevel::Green => "green",
            ProjectRiskLevel::Yellow => "yellow",
            ProjectRiskLevel::Red => "red",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl std::fmt::Display for ProjectRiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health score at or above which a project is green
pub const GREEN_THRESHOLD: f64 = 80.0;
/// Health score at or above which a project is yellow
pub const YELLOW_THRESHOLD: f64 = 60.0;

/// Map a health score to a project risk tier
///
/// A missing or non-numeric score means not enough information, which is
/// reported as yellow.
pub fn classify(health_score: Option<f64>) -> ProjectRiskLevel {
    match health_score {
        Some(score) if score.is_nan() => ProjectRiskLevel::Yellow,
        Some(score) if score >= GREEN_THRESHOLD => ProjectRiskLevel::Green,
        Some(score) if score >= YELLOW_THRESHOLD => ProjectRiskLevel::Yellow,
        Some(_) => ProjectRiskLevel::Red,
        None => ProjectRiskLevel::Yellow,
    }
}

/// Task risk tier as cached on task records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskRiskLevel {
    Low,
    Medium,
    High,
    Critical,
    /// Not scored yet
    Unknown,
}

impl TaskRiskLevel {
    pub const ALL: [TaskRiskLevel; 5] = [
        TaskRiskLevel::Low,
        TaskRiskLevel::Medium,
        TaskRiskLevel::High,
        TaskRiskLevel::Critical,
        TaskRiskLevel::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskRiskLevel::Low => "low",
            TaskRiskLevel::Medium => "medium",
            TaskRiskLevel::High => "high",
            TaskRiskLevel::Critical => "critical",
            TaskRiskLevel::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Tier for a clamped task score
    pub fn from_score(score: u32) -> Self {
        if score >= 70 {
            TaskRiskLevel::Critical
        } else if score >= 50 {
            TaskRiskLevel::High
        } else if score >= 30 {
            TaskRiskLevel::Medium
        } else {
            TaskRiskLevel::Low
        }
    }

    /// High or critical
    pub fn needs_escalation(&self) -> bool {
        matches!(self, TaskRiskLevel::High | TaskRiskLevel::Critical)
    }
}

impl std::fmt::Display for TaskRiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
