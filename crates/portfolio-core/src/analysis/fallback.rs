//! Local analysis synthesis
//!
//! Builds an [`AiAnalysis`] from the metric calculator and the task risk
//! scorer alone. It has no external dependencies and cannot fail, so it
//! backs both mock mode and upstream failures.

use crate::domain::{AiAnalysis, KeyMetrics, Project, RecommendationEntry, RiskEntry, Severity};
use crate::metrics::round_to;
use crate::risk::{TaskRiskLevel, score_task};

use super::snapshot::ProjectSnapshot;

const BASE_HEALTH: i64 = 85;
const SEVERE_DEVIATION: f64 = 10.0;
const MODERATE_DEVIATION: f64 = 5.0;
const SEVERE_DEVIATION_PENALTY: i64 = 20;
const MODERATE_DEVIATION_PENALTY: i64 = 10;
/// Spending may lead progress by this many points before it counts as overrun
const OVERSPEND_MARGIN: f64 = 10.0;
const OVERSPEND_PENALTY: i64 = 15;
const BLOCKED_TASK_PENALTY: i64 = 5;

fn risk(
    category: &str,
    severity: Severity,
    description: String,
    impact: &str,
    mitigation: &str,
    effort: Option<&str>,
) -> RiskEntry {
    RiskEntry {
        category: category.to_string(),
        severity,
        description,
        impact: impact.to_string(),
        mitigation: mitigation.to_string(),
        estimated_effort: effort.map(str::to_string),
    }
}

fn recommendation(
    priority: Severity,
    action: &str,
    rationale: &str,
    expected_impact: &str,
    timeframe: &str,
) -> RecommendationEntry {
    RecommendationEntry {
        priority,
        action: action.to_string(),
        rationale: rationale.to_string(),
        expected_impact: expected_impact.to_string(),
        timeframe: timeframe.to_string(),
    }
}

fn status_text(health: f64) -> &'static str {
    if health >= 80.0 {
        "Proyecto en buen estado general con algunos puntos de atención"
    } else if health >= 60.0 {
        "Proyecto requiere atención en áreas críticas identificadas"
    } else {
        "Proyecto en riesgo alto, requiere intervención inmediata"
    }
}

/// Synthesize an analysis for a project with its tasks loaded
pub fn synthesize(project: &Project, snapshot: &ProjectSnapshot) -> AiAnalysis {
    let mut health = BASE_HEALTH;
    let mut risks = Vec::new();
    let mut recommendations = Vec::new();

    let deviation = snapshot.deviation;
    let counts = &snapshot.tasks;

    if deviation.abs() > SEVERE_DEVIATION {
        health -= SEVERE_DEVIATION_PENALTY;
        risks.push(risk(
            "Schedule",
            Severity::High,
            format!("El proyecto presenta una desviación de {deviation:.1}% respecto al plan"),
            "Alto riesgo de no cumplir la fecha de entrega planificada",
            "Revisar el cronograma, reasignar recursos críticos y reducir alcance no esencial",
            Some("40-80 hours"),
        ));
        recommendations.push(recommendation(
            Severity::Critical,
            "Realizar sesión de replanning con el equipo",
            "La desviación supera el 10% e indica problemas estructurales de planificación",
            "Realinear expectativas y compromisos con los stakeholders",
            "immediate",
        ));
    } else if deviation.abs() > MODERATE_DEVIATION {
        health -= MODERATE_DEVIATION_PENALTY;
        risks.push(risk(
            "Schedule",
            Severity::Medium,
            format!("Desviación moderada de {deviation:.1}% en el avance del proyecto"),
            "Requiere monitoreo cercano para evitar escalamiento",
            "Implementar checkpoints semanales y revisar tareas críticas",
            Some("20-40 hours"),
        ));
        recommendations.push(recommendation(
            Severity::Medium,
            "Establecer checkpoints semanales de avance",
            "La desviación supera el 5% y puede crecer sin seguimiento",
            "Detectar a tiempo nuevas desviaciones",
            "short-term",
        ));
    }

    let financial = &snapshot.financial;
    if financial.overspent_by_more_than(project.actual_progress, OVERSPEND_MARGIN) {
        health -= OVERSPEND_PENALTY;
        risks.push(risk(
            "Budget",
            Severity::High,
            format!(
                "Presupuesto consumido ({:.1}%) supera significativamente el avance ({}%)",
                financial.consumption_percentage, project.actual_progress
            ),
            "Riesgo de sobrecosto al finalizar el proyecto",
            "Revisar gastos, negociar con proveedores y optimizar el uso de recursos",
            Some("40-60 hours"),
        ));
        recommendations.push(recommendation(
            Severity::High,
            "Auditar gastos y establecer controles de presupuesto más estrictos",
            "El ritmo de gasto actual proyecta un sobrecosto",
            "Mantener el proyecto dentro del presupuesto",
            "short-term",
        ));
    }

    if counts.blocked > 0 {
        health -= BLOCKED_TASK_PENALTY * counts.blocked as i64;
        let many = counts.blocked > 2;
        risks.push(risk(
            "Resources",
            if many { Severity::High } else { Severity::Medium },
            format!("{} tarea(s) bloqueada(s) impidiendo el avance normal", counts.blocked),
            "Retrasos en cadena sobre tareas dependientes",
            "Resolver los bloqueos de forma urgente y escalar si es necesario",
            Some(if many { "60-100 hours" } else { "30-60 hours" }),
        ));
        recommendations.push(recommendation(
            Severity::Critical,
            "Desbloquear inmediatamente las tareas críticas",
            "Las tareas bloqueadas generan un efecto cascada",
            "Restaurar el flujo de trabajo normal",
            "immediate",
        ));
    }

    if deviation > 0.0 && deviation <= MODERATE_DEVIATION {
        recommendations.push(recommendation(
            Severity::Low,
            "Documentar buenas prácticas del equipo",
            "El proyecto va adelantado; conviene capturar los factores de éxito",
            "Replicar el resultado en futuros proyectos",
            "long-term",
        ));
    }

    recommendations.push(recommendation(
        Severity::Medium,
        "Realizar retrospectiva con el equipo",
        "Identificar oportunidades de mejora continua",
        "Mejorar eficiencia y moral del equipo",
        "short-term",
    ));

    if risks.is_empty() {
        risks.push(risk(
            "Schedule",
            Severity::Low,
            "No se detectan desviaciones significativas de plazo, costo o bloqueos".to_string(),
            "Sin impacto previsto en la entrega",
            "Mantener el seguimiento periódico de indicadores",
            None,
        ));
    }

    let health = health.clamp(0, 100) as f64;
    let spi = snapshot.schedule_performance_index;
    let cpi = snapshot.cost_performance_index();
    let completion_rate = counts.completion_rate();

    let mut insights = vec![
        format!("Tasa de completitud de tareas: {completion_rate:.1}%"),
        format!("Salud general del proyecto: {health}/100"),
        if deviation > 0.0 {
            format!("Proyecto adelantado {deviation:.1}%, mantener el ritmo")
        } else {
            format!("Proyecto atrasado {:.1}%, requiere acción", deviation.abs())
        },
        format!("{} tareas pendientes de {} totales", counts.open(), counts.total),
        format!("SPI: {spi:.2} | CPI: {cpi:.2}"),
    ];

    let at_risk = project
        .tasks
        .iter()
        .filter(|t| {
            matches!(
                score_task(t, snapshot.today).risk_level,
                TaskRiskLevel::High | TaskRiskLevel::Critical
            )
        })
        .count();
    if at_risk > 0 {
        insights.push(format!("{at_risk} tarea(s) con riesgo alto o crítico"));
    }

    let critical_issues = counts.blocked
        + risks
            .iter()
            .filter(|r| r.severity == Severity::High)
            .count();

    AiAnalysis {
        status: status_text(health).to_string(),
        health_score: health,
        risks,
        recommendations,
        insights,
        predicted_completion_date: snapshot.predicted_completion_label(),
        confidence_level: if health > 70.0 { 85.0 } else { 65.0 },
        key_metrics: KeyMetrics {
            schedule_performance_index: round_to(spi, 2),
            cost_performance_index: round_to(cpi, 2),
            task_completion_rate: round_to(completion_rate, 1),
            critical_issues_count: critical_issues as u32,
        },
        synthetic: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, ProjectStatus, Task, TaskStatus};
    use chrono::NaiveDate;

    fn project(planned: f64, actual: f64) -> Project {
        Project {
            id: 1,
            code: "PRJ-2026-001".to_string(),
            name: "Plataforma".to_string(),
            description: None,
            status: ProjectStatus::InProgress,
            status_label: "Activo".to_string(),
            priority: Priority::Medium,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31),
            budget_total: 100_000.0,
            budget_consumed: 0.0,
            planned_progress: planned,
            actual_progress: actual,
            leader: "Luis".to_string(),
            management_system: None,
            management_path: None,
            ai_analysis: None,
            ai_risk_level: None,
            ai_last_analysis_date: None,
            created_at: None,
            updated_at: None,
            tasks: Vec::new(),
            history: Vec::new(),
        }
    }

    fn run(project: &Project) -> AiAnalysis {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        synthesize(project, &ProjectSnapshot::compute(project, today))
    }

    #[test]
    fn test_perfect_project_still_has_entries() {
        let analysis = run(&project(50.0, 50.0));
        assert_eq!(analysis.health_score, 85.0);
        assert_eq!(analysis.risks.len(), 1);
        assert_eq!(analysis.risks[0].severity, Severity::Low);
        assert!(!analysis.recommendations.is_empty());
        assert!(analysis.synthetic);
        analysis.validate().unwrap();
    }

    #[test]
    fn test_severe_deviation_penalty() {
        let analysis = run(&project(50.0, 35.0));
        assert_eq!(analysis.health_score, 65.0);
        assert_eq!(analysis.risks[0].category, "Schedule");
        assert_eq!(analysis.risks[0].severity, Severity::High);
        assert_eq!(analysis.recommendations[0].priority, Severity::Critical);
        assert_eq!(analysis.confidence_level, 65.0);
    }

    #[test]
    fn test_moderate_deviation_penalty() {
        let analysis = run(&project(50.0, 57.0));
        assert_eq!(analysis.health_score, 75.0);
        assert_eq!(analysis.risks[0].severity, Severity::Medium);
    }

    #[test]
    fn test_overspend_penalty() {
        let mut p = project(40.0, 40.0);
        p.budget_consumed = 60_000.0;
        let analysis = run(&p);
        assert_eq!(analysis.health_score, 70.0);
        assert!(analysis.risks.iter().any(|r| r.category == "Budget"));
        assert_eq!(analysis.key_metrics.critical_issues_count, 1);
    }

    #[test]
    fn test_blocked_tasks_penalty_and_clamp() {
        let mut p = project(80.0, 20.0);
        p.budget_consumed = 90_000.0;
        p.tasks = (0..20)
            .map(|i| Task::draft(format!("t{i}"), TaskStatus::Blocked))
            .collect();
        let analysis = run(&p);
        assert_eq!(analysis.health_score, 0.0);
        assert_eq!(analysis.status, status_text(0.0));
        let resources = analysis.risks.iter().find(|r| r.category == "Resources").unwrap();
        assert_eq!(resources.severity, Severity::High);
        // 20 blocked + schedule High + budget High + resources High
        assert_eq!(analysis.key_metrics.critical_issues_count, 23);
    }

    #[test]
    fn test_slightly_ahead_adds_positive_recommendation() {
        let analysis = run(&project(50.0, 53.0));
        assert!(
            analysis
                .recommendations
                .iter()
                .any(|r| r.priority == Severity::Low && r.timeframe == "long-term")
        );
    }

    #[test]
    fn test_key_metrics_rounded() {
        let mut p = project(30.0, 10.0);
        p.budget_consumed = 30_000.0;
        p.tasks = vec![
            Task::draft("a", TaskStatus::Completed),
            Task::draft("b", TaskStatus::Pending),
            Task::draft("c", TaskStatus::Pending),
        ];
        let metrics = run(&p).key_metrics;
        assert_eq!(metrics.schedule_performance_index, 0.33);
        assert_eq!(metrics.cost_performance_index, 0.33);
        assert_eq!(metrics.task_completion_rate, 33.3);
    }

    #[test]
    fn test_deterministic() {
        let p = project(50.0, 35.0);
        assert_eq!(run(&p), run(&p));
    }
}
