//! Deterministic task risk scoring
//!
//! Scoring is additive over four independent factors evaluated in a fixed
//! order: status, deadline pressure, stagnation and ownership. The result is
//! a pure function of the task and the reference date.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::tier::TaskRiskLevel;
use crate::domain::{Task, TaskStatus};
use crate::metrics::days_until;

const BLOCKED_POINTS: u32 = 30;
const PENDING_POINTS: u32 = 10;
const OVERDUE_POINTS: u32 = 40;
const DEADLINE_NEAR_POINTS: u32 = 30;
const DEADLINE_APPROACHING_POINTS: u32 = 20;
const STAGNATION_POINTS: u32 = 15;
const NO_OWNER_POINTS: u32 = 10;

const MAX_SCORE: u32 = 100;

/// Impact label attached to a fired factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
    Critical,
}

/// Which factor fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Blocked,
    Pending,
    Overdue,
    DeadlineNear,
    LowProgressNearDeadline,
    Stagnant,
    Unassigned,
}

impl FactorKind {
    pub fn label(&self) -> &'static str {
        match self {
            FactorKind::Blocked => "Estado bloqueado",
            FactorKind::Pending => "Estado pendiente",
            FactorKind::Overdue => "Tarea atrasada",
            FactorKind::DeadlineNear => "Fecha límite próxima",
            FactorKind::LowProgressNearDeadline => "Progreso bajo",
            FactorKind::Stagnant => "Progreso estancado",
            FactorKind::Unassigned => "Sin responsable asignado",
        }
    }

    fn points(&self) -> u32 {
        match self {
            FactorKind::Blocked => BLOCKED_POINTS,
            FactorKind::Pending => PENDING_POINTS,
            FactorKind::Overdue => OVERDUE_POINTS,
            FactorKind::DeadlineNear => DEADLINE_NEAR_POINTS,
            FactorKind::LowProgressNearDeadline => DEADLINE_APPROACHING_POINTS,
            FactorKind::Stagnant => STAGNATION_POINTS,
            FactorKind::Unassigned => NO_OWNER_POINTS,
        }
    }

    fn impact(&self) -> Impact {
        match self {
            FactorKind::Overdue => Impact::Critical,
            FactorKind::Blocked | FactorKind::DeadlineNear => Impact::High,
            FactorKind::Pending | FactorKind::LowProgressNearDeadline | FactorKind::Stagnant => {
                Impact::Medium
            }
            FactorKind::Unassigned => Impact::Low,
        }
    }

    /// Recommendation keyed to this factor, if the table has one
    fn recommendation(&self) -> Option<TaskRecommendation> {
        let (priority, action, rationale) = match self {
            FactorKind::Blocked => (
                Impact::High,
                "Identificar y resolver bloqueador de la tarea",
                "La tarea bloqueada impide el avance del proyecto",
            ),
            FactorKind::Overdue => (
                Impact::High,
                "Revisar fecha límite y reasignar recursos si es necesario",
                "La tarea está fuera de tiempo y requiere intervención",
            ),
            FactorKind::DeadlineNear => (
                Impact::Medium,
                "Aumentar dedicación de recursos a esta tarea",
                "Se acerca la fecha límite y el progreso es insuficiente",
            ),
            FactorKind::Unassigned => (
                Impact::Medium,
                "Asignar responsable a la tarea",
                "Las tareas sin responsable tienen baja probabilidad de completarse",
            ),
            FactorKind::Pending | FactorKind::LowProgressNearDeadline | FactorKind::Stagnant => {
                return None;
            }
        };
        Some(TaskRecommendation::new(priority, action, rationale))
    }
}

/// A fired factor with its explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub kind: FactorKind,
    pub factor: String,
    pub impact: Impact,
    pub points: u32,
    pub description: String,
}

impl RiskFactor {
    fn new(kind: FactorKind, description: String) -> Self {
        Self {
            kind,
            factor: kind.label().to_string(),
            impact: kind.impact(),
            points: kind.points(),
            description,
        }
    }
}

/// Suggested action for a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecommendation {
    pub priority: Impact,
    pub action: String,
    pub rationale: String,
}

impl TaskRecommendation {
    fn new(priority: Impact, action: &str, rationale: &str) -> Self {
        Self {
            priority,
            action: action.to_string(),
            rationale: rationale.to_string(),
        }
    }

    fn escalate() -> Self {
        Self::new(
            Impact::High,
            "Escalar tarea a líder de proyecto inmediatamente",
            "El nivel de riesgo requiere atención urgente",
        )
    }

    fn keep_monitoring() -> Self {
        Self::new(
            Impact::Low,
            "Continuar con monitoreo regular de la tarea",
            "La tarea está en buen estado",
        )
    }
}

/// Scorer output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRiskAssessment {
    pub risk_level: TaskRiskLevel,
    pub risk_score: u32,
    pub factors: Vec<RiskFactor>,
    pub recommendations: Vec<TaskRecommendation>,
}

impl TaskRiskAssessment {
    pub fn has_factor(&self, kind: FactorKind) -> bool {
        self.factors.iter().any(|f| f.kind == kind)
    }

    /// Factor descriptions, as cached in `ai_risk_reasons`
    pub fn reasons(&self) -> Vec<String> {
        self.factors.iter().map(|f| f.description.clone()).collect()
    }
}

/// Score a task against today's date (UTC)
pub fn score_task_now(task: &Task) -> TaskRiskAssessment {
    score_task(task, Utc::now().date_naive())
}

/// Score a task against a reference date
pub fn score_task(task: &Task, today: NaiveDate) -> TaskRiskAssessment {
    let mut factors = Vec::new();
    let progress = task.actual_progress;

    match task.status {
        TaskStatus::Blocked => factors.push(RiskFactor::new(
            FactorKind::Blocked,
            "La tarea está bloqueada y no puede avanzar".to_string(),
        )),
        TaskStatus::Pending => factors.push(RiskFactor::new(
            FactorKind::Pending,
            "La tarea no ha iniciado".to_string(),
        )),
        _ => {}
    }

    if let Some(end) = task.end_date {
        let days_left = days_until(end, today);
        if days_left < 0 && progress < 100.0 {
            factors.push(RiskFactor::new(
                FactorKind::Overdue,
                format!(
                    "La tarea debía finalizar hace {} días y está al {}%",
                    days_left.abs(),
                    progress
                ),
            ));
        } else if days_left <= 7 && progress < 70.0 {
            factors.push(RiskFactor::new(
                FactorKind::DeadlineNear,
                format!("Quedan {days_left} días y la tarea está al {progress}%"),
            ));
        } else if days_left <= 14 && progress < 50.0 {
            factors.push(RiskFactor::new(
                FactorKind::LowProgressNearDeadline,
                format!("Quedan {days_left} días y el progreso es solo {progress}%"),
            ));
        }
    }

    if task.status == TaskStatus::InProgress && progress < 30.0 {
        factors.push(RiskFactor::new(
            FactorKind::Stagnant,
            "La tarea está en progreso pero con avance menor al 30%".to_string(),
        ));
    }

    if !task.has_owner() {
        factors.push(RiskFactor::new(
            FactorKind::Unassigned,
            "La tarea no tiene un responsable claramente asignado".to_string(),
        ));
    }

    let risk_score = factors.iter().map(|f| f.points).sum::<u32>().min(MAX_SCORE);
    let risk_level = TaskRiskLevel::from_score(risk_score);
    let recommendations = recommend(&factors, risk_level);

    TaskRiskAssessment {
        risk_level,
        risk_score,
        factors,
        recommendations,
    }
}

fn recommend(factors: &[RiskFactor], level: TaskRiskLevel) -> Vec<TaskRecommendation> {
    let mut recommendations = Vec::new();

    if level.needs_escalation() {
        recommendations.push(TaskRecommendation::escalate());
    }

    recommendations.extend(factors.iter().filter_map(|f| f.kind.recommendation()));

    if recommendations.is_empty() && level == TaskRiskLevel::Low {
        recommendations.push(TaskRecommendation::keep_monitoring());
    }

    recommendations
}
