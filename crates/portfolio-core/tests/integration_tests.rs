//! Portfolio Core Integration Tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use portfolio_core::{
    Error, Result,
    analysis::Analyzer,
    commands::{
        HistoryRepository, ProjectFilters, ProjectRepository, TaskFilters, TaskRepository,
        get_dashboard_stats, score_task,
    },
    domain::{NewHistoryEntry, NewProject, NewTask, ProjectPatch, ProjectStatus, TaskStatus},
    config::Config,
    llm::{LlmClient, TextGenerator},
    risk::{ProjectRiskLevel, TaskRiskLevel},
    storage::Database,
};

const ANALYSIS: &str = r#"{
    "status": "Proyecto con retrasos moderados",
    "healthScore": 72,
    "risks": [
        {"category": "Cronograma", "severity": "Medium", "description": "Retraso en integración", "impact": "Entrega tardía", "mitigation": "Reforzar equipo"}
    ],
    "recommendations": [
        {"priority": "High", "action": "Replanificar hitos", "rationale": "Desviación acumulada", "expectedImpact": "Recuperar 2 semanas", "timeframe": "immediate"}
    ],
    "insights": ["El avance real va por detrás del planificado"],
    "predictedCompletionDate": "2027-01-15",
    "confidenceLevel": 80,
    "keyMetrics": {"schedulePerformanceIndex": 0.85, "costPerformanceIndex": 1.02, "taskCompletionRate": 40, "criticalIssuesCount": 0}
}"#;

/// Stand-in for the LLM endpoint
struct StubGenerator {
    reply: std::result::Result<String, String>,
    calls: AtomicUsize,
}

impl StubGenerator {
    fn replying(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!system.is_empty());
        assert!(user.contains("Migración ERP"));
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(Error::UpstreamRequest(message.clone())),
        }
    }
}

fn erp() -> NewProject {
    NewProject::new("Migración ERP")
        .with_dates(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        )
        .with_budget(250_000.0, 90_000.0)
        .with_progress(35.0)
        .with_leader("Carla Méndez")
}

#[tokio::test]
async fn test_project_lifecycle_in_mock_mode() {
    let db = Database::in_memory().await.unwrap();
    let projects = ProjectRepository::new(&db);
    let tasks = TaskRepository::new(&db);

    let project = projects.create(erp(), &Analyzer::mock()).await.unwrap();
    assert!(project.code.ends_with(&format!("-2026-{:03}", project.id)));
    assert_eq!(project.status, ProjectStatus::Planning);
    let analysis = project.ai_analysis.as_ref().expect("initial analysis stored");
    assert!(analysis.synthetic);
    assert!(project.ai_risk_level.is_some());
    assert!(project.ai_last_analysis_date.is_some());

    let mut blocked = NewTask::new("Migrar maestros de clientes");
    blocked.status = Some(TaskStatus::Blocked);
    let blocked = tasks.create(project.id, blocked).await.unwrap();
    assert_eq!(blocked.task_code, format!("{}-T001", project.code));

    let mut owned = NewTask::new("Configurar módulos");
    owned.responsible = Some("Jorge".to_string());
    owned.status = Some(TaskStatus::InProgress);
    owned.actual_progress = Some(60.0);
    tasks.create(project.id, owned).await.unwrap();

    let patch = ProjectPatch {
        status: Some(ProjectStatus::InProgress),
        actual_progress: Some(45.0),
        changed_by: Some("Carla Méndez".to_string()),
        ..Default::default()
    };
    let updated = projects.update(project.id, patch).await.unwrap();
    assert_eq!(updated.status, ProjectStatus::InProgress);
    assert_eq!(updated.actual_progress, 45.0);
    assert_eq!(updated.tasks.len(), 2);
    assert_eq!(updated.history.len(), 2);
    assert!(
        updated
            .history
            .iter()
            .all(|h| h.changed_by.as_deref() == Some("Carla Méndez"))
    );

    let active = ProjectFilters {
        status: Some(ProjectStatus::InProgress),
        ..Default::default()
    };
    assert_eq!(projects.list(&active).await.unwrap().len(), 1);

    let risky = TaskFilters {
        risk_level: Some(TaskRiskLevel::Medium),
        ..Default::default()
    };
    let found = tasks.list_by_project(project.id, &risky).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].task_code, blocked.task_code);

    projects.delete(project.id).await.unwrap();
    assert!(projects.get(project.id).await.unwrap_err().is_not_found());
    assert!(matches!(
        tasks.get_by_code(&blocked.task_code).await.unwrap_err(),
        Error::TaskNotFound(_)
    ));
}

#[tokio::test]
async fn test_generator_analysis_is_stored_and_reused() {
    let db = Database::in_memory().await.unwrap();
    let generator = StubGenerator::replying(ANALYSIS);
    let analyzer = Analyzer::with_generator(generator.clone());
    let projects = ProjectRepository::new(&db);

    let project = projects.create(erp(), &analyzer).await.unwrap();
    assert_eq!(generator.calls(), 1);

    let stored = project.ai_analysis.expect("analysis stored");
    assert!(!stored.synthetic);
    assert_eq!(stored.health_score, 72.0);
    assert_eq!(project.ai_risk_level, Some(ProjectRiskLevel::Yellow));

    let cached = projects.analysis(project.id, false, &analyzer).await.unwrap();
    assert_eq!(cached.health_score, 72.0);
    assert_eq!(generator.calls(), 1);

    projects.analysis(project.id, true, &analyzer).await.unwrap();
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn test_fenced_generator_reply_is_accepted() {
    let db = Database::in_memory().await.unwrap();
    let reply = format!("Aquí está el análisis:\n```json\n{ANALYSIS}\n```\n");
    let analyzer = Analyzer::with_generator(StubGenerator::replying(reply));

    let project = ProjectRepository::new(&db)
        .create(erp(), &analyzer)
        .await
        .unwrap();
    let analysis = project.ai_analysis.expect("analysis stored");
    assert!(!analysis.synthetic);
    assert_eq!(analysis.recommendations[0].action, "Replanificar hitos");
}

#[tokio::test]
async fn test_upstream_failure_falls_back_to_local_analysis() {
    let db = Database::in_memory().await.unwrap();
    let analyzer = Analyzer::with_generator(StubGenerator::failing("503 Service Unavailable"));

    let project = ProjectRepository::new(&db)
        .create(erp(), &analyzer)
        .await
        .unwrap();
    let analysis = project.ai_analysis.expect("fallback analysis stored");
    assert!(analysis.synthetic);
    assert!(!analysis.risks.is_empty());
}

#[tokio::test]
async fn test_live_client_without_token_endpoint_still_analyzes() {
    let mut config = Config::default();
    config.llm.mock_mode = false;
    config.llm.base_url = Some("http://127.0.0.1:9/v1".to_string());
    config.llm.token.url = None;

    let db = Database::in_memory().await.unwrap();
    let analyzer = Analyzer::with_generator(Arc::new(LlmClient::new(config.llm.clone()).unwrap()));
    let projects = ProjectRepository::new(&db);

    let project = projects.create(erp(), &analyzer).await.unwrap();
    assert!(project.ai_analysis.expect("fallback analysis stored").synthetic);

    let refreshed = projects.analysis(project.id, true, &analyzer).await.unwrap();
    assert!(refreshed.synthetic);
    assert!(projects.get(project.id).await.unwrap().ai_risk_level.is_some());
}

#[tokio::test]
async fn test_failure_without_fallback_does_not_block_creation() {
    let db = Database::in_memory().await.unwrap();
    let analyzer = Analyzer::with_generator(StubGenerator::replying("sin formato"))
        .fallback_on_error(false);
    let projects = ProjectRepository::new(&db);

    let project = projects.create(erp(), &analyzer).await.unwrap();
    assert!(project.ai_analysis.is_none());

    let err = projects
        .analysis(project.id, false, &analyzer)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E200");
}

#[tokio::test]
async fn test_history_and_dashboard() {
    let db = Database::in_memory().await.unwrap();
    let project = ProjectRepository::new(&db)
        .create(erp(), &Analyzer::mock())
        .await
        .unwrap();

    let note = NewHistoryEntry {
        change_type: "comment".to_string(),
        description: Some("Comité aprobó ampliación de alcance".to_string()),
        ..Default::default()
    };
    HistoryRepository::new(&db).add(project.id, note).await.unwrap();
    let history = HistoryRepository::new(&db).list(project.id).await.unwrap();
    assert_eq!(history[0].change_type, "comment");

    let tasks = TaskRepository::new(&db);
    let mut done = NewTask::new("Kickoff");
    done.status = Some(TaskStatus::Completed);
    done.actual_progress = Some(100.0);
    tasks.create(project.id, done).await.unwrap();
    tasks.create(project.id, NewTask::new("Diseño")).await.unwrap();

    let stats = tasks.statistics(project.id).await.unwrap();
    assert_eq!(stats.completion_rate, 50);
    assert_eq!(stats.average_progress, 50);

    let dashboard = get_dashboard_stats(&db).await.unwrap();
    assert_eq!(dashboard.overview.total_projects, 1);
    assert_eq!(dashboard.overview.completion_rate, 50.0);
    assert_eq!(dashboard.overview.total_budget, 250_000.0);
    assert_eq!(dashboard.tasks.completed, 1);
}

#[tokio::test]
async fn test_task_scoring_matches_cache() {
    let db = Database::in_memory().await.unwrap();
    let project = ProjectRepository::new(&db)
        .create(erp(), &Analyzer::mock())
        .await
        .unwrap();
    let tasks = TaskRepository::new(&db);

    let mut stalled = NewTask::new("Pruebas de carga");
    stalled.status = Some(TaskStatus::InProgress);
    stalled.actual_progress = Some(10.0);
    let task = tasks.create(project.id, stalled).await.unwrap();

    let assessment = score_task(&task);
    assert_eq!(task.ai_risk_level, Some(assessment.risk_level));
    assert_eq!(task.ai_risk_reasons, assessment.reasons());
    assert_eq!(tasks.score(&task.task_code).await.unwrap().risk_score, assessment.risk_score);
}

#[test]
fn test_error_codes() {
    let errors = [
        Error::ProjectNotFound("1".to_string()),
        Error::TaskNotFound("X-T001".to_string()),
        Error::Validation("test".to_string()),
        Error::AnalysisParse("test".to_string()),
        Error::UpstreamAuth("test".to_string()),
        Error::UpstreamRequest("test".to_string()),
        Error::ConfigError("test".to_string()),
        Error::Other("test".to_string()),
    ];

    for error in &errors {
        let code = error.code();
        assert!(code.starts_with('E'), "Error code should start with 'E': {}", code);
        assert!(!error.to_string().is_empty());
    }
}
