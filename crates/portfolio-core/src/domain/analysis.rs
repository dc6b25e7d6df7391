//! Typed AI analysis result
//!
//! The same shape is produced by the LLM path and by local synthesis, so
//! callers never need to know which one ran. The only difference is the
//! `synthetic` marker.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Severity of a risk, also used as recommendation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "critical", alias = "CRITICAL")]
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One identified project risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskEntry {
    pub category: String,
    pub severity: Severity,
    pub description: String,
    pub impact: String,
    pub mitigation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_effort: Option<String>,
}

/// One recommended action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationEntry {
    pub priority: Severity,
    pub action: String,
    pub rationale: String,
    pub expected_impact: String,
    pub timeframe: String,
}

/// Headline indicators attached to an analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMetrics {
    pub schedule_performance_index: f64,
    pub cost_performance_index: f64,
    pub task_completion_rate: f64,
    pub critical_issues_count: u32,
}

/// Full project analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub status: String,
    pub health_score: f64,
    pub risks: Vec<RiskEntry>,
    pub recommendations: Vec<RecommendationEntry>,
    pub insights: Vec<String>,
    pub predicted_completion_date: String,
    pub confidence_level: f64,
    pub key_metrics: KeyMetrics,
    /// Set when the analysis was synthesized locally instead of by the LLM
    #[serde(default)]
    pub synthetic: bool,
}

impl AiAnalysis {
    /// Check the invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.status.trim().is_empty() {
            return Err(Error::AnalysisParse("status is empty".to_string()));
        }
        if self.risks.is_empty() {
            return Err(Error::AnalysisParse("risks list is empty".to_string()));
        }
        if self.recommendations.is_empty() {
            return Err(Error::AnalysisParse(
                "recommendations list is empty".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.health_score) {
            return Err(Error::AnalysisParse(format!(
                "healthScore {} is outside 0-100",
                self.health_score
            )));
        }
        if !(0.0..=100.0).contains(&self.confidence_level) {
            return Err(Error::AnalysisParse(format!(
                "confidenceLevel {} is outside 0-100",
                self.confidence_level
            )));
        }
        Ok(())
    }

    /// Number of risks at or above the given severity
    pub fn risks_at_least(&self, severity: Severity) -> usize {
        self.risks.iter().filter(|r| r.severity >= severity).count()
    }
}
