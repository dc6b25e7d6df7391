//! AI analysis orchestrator
//!
//! One analysis request moves through
//! `prompt_built -> token_acquired -> request_sent -> parsed_ok | parse_failed | request_failed -> persisted`.
//! Each transition is logged as a tracing event with a `stage` field.
//!
//! When no generator is configured (mock mode) the analysis is synthesized
//! locally. When the generator fails and `fallback_on_error` is set, the
//! local synthesis replaces it and the result carries `synthetic: true`.

pub mod fallback;
pub mod parse;
pub mod prompt;
pub mod snapshot;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{AiAnalysis, Project};
use crate::error::{Error, Result};
use crate::llm::{LlmClient, TextGenerator};
use crate::normalize::aliases;
use crate::risk::{ProjectRiskLevel, classify};
use crate::storage::{Collection, Database, Record, RecordStore};

pub use fallback::synthesize;
pub use parse::{extract_json, parse_analysis};
pub use prompt::{SYSTEM_PROMPT, build_user_prompt, high_risk_tasks};
pub use snapshot::{ProjectSnapshot, TaskCounts};

/// Runs project analyses through an optional text generator
#[derive(Clone)]
pub struct Analyzer {
    generator: Option<Arc<dyn TextGenerator>>,
    fallback_on_error: bool,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("mock", &self.generator.is_none())
            .field("fallback_on_error", &self.fallback_on_error)
            .finish()
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::mock()
    }
}

impl Analyzer {
    /// Local synthesis only
    pub fn mock() -> Self {
        Self {
            generator: None,
            fallback_on_error: true,
        }
    }

    /// Analyze through a generator, falling back on failure
    pub fn with_generator(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
            fallback_on_error: true,
        }
    }

    /// Build from configuration: mock mode, or an [`LlmClient`]
    pub fn from_config(config: &Config) -> Result<Self> {
        let analyzer = if config.llm.mock_mode {
            Self::mock()
        } else {
            Self::with_generator(Arc::new(LlmClient::new(config.llm.clone())?))
        };
        Ok(analyzer.fallback_on_error(config.analysis.fallback_on_error))
    }

    pub fn fallback_on_error(mut self, enabled: bool) -> Self {
        self.fallback_on_error = enabled;
        self
    }

    pub fn is_mock(&self) -> bool {
        self.generator.is_none()
    }

    /// Analyze a project (tasks and history loaded) without any fallback
    pub async fn analyze(&self, project: &Project, now: DateTime<Utc>) -> Result<AiAnalysis> {
        let snapshot = ProjectSnapshot::compute(project, now.date_naive());

        let Some(generator) = &self.generator else {
            debug!(project_id = project.id, "Mock mode, synthesizing analysis");
            return Ok(synthesize(project, &snapshot));
        };

        let user_prompt = build_user_prompt(project, &snapshot);
        debug!(
            project_id = project.id,
            stage = "prompt_built",
            prompt_chars = user_prompt.len(),
            "Built analysis prompt"
        );

        let text = match generator.generate(SYSTEM_PROMPT, &user_prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(project_id = project.id, stage = "request_failed", error = %e, "Analysis request failed");
                return Err(e);
            }
        };

        match parse_analysis(&text) {
            Ok(analysis) => {
                info!(
                    project_id = project.id,
                    stage = "parsed_ok",
                    health_score = analysis.health_score,
                    "Parsed analysis response"
                );
                Ok(analysis)
            }
            Err(e) => {
                warn!(project_id = project.id, stage = "parse_failed", error = %e, "Rejected analysis response");
                Err(e)
            }
        }
    }

    /// Analyze, replacing any generation failure with local synthesis when enabled
    pub async fn analyze_or_fallback(
        &self,
        project: &Project,
        now: DateTime<Utc>,
    ) -> Result<AiAnalysis> {
        match self.analyze(project, now).await {
            Err(e) if self.fallback_on_error => {
                warn!(
                    project_id = project.id,
                    upstream = e.is_upstream(),
                    error = %e,
                    "Falling back to local analysis"
                );
                let snapshot = ProjectSnapshot::compute(project, now.date_naive());
                Ok(synthesize(project, &snapshot))
            }
            other => other,
        }
    }

    /// Analyze and store the result on the project record
    ///
    /// Storing is best effort: a failed write is logged and the analysis is
    /// still returned.
    pub async fn run(
        &self,
        db: &Database,
        project: &Project,
        now: DateTime<Utc>,
    ) -> Result<AiAnalysis> {
        let analysis = self.analyze_or_fallback(project, now).await?;
        if let Err(e) = persist(db, project.id, &analysis, now).await {
            warn!(project_id = project.id, error = %e, "Could not store analysis");
        }
        Ok(analysis)
    }
}

/// Record fields written for an analysis
pub fn analysis_fields(analysis: &AiAnalysis, now: DateTime<Utc>) -> Result<Record> {
    let level: ProjectRiskLevel = classify(Some(analysis.health_score));
    let mut patch = Record::new();
    patch.insert(
        aliases::project::AI_ANALYSIS[0].to_string(),
        serde_json::to_value(analysis)?,
    );
    patch.insert(
        aliases::project::AI_LAST_ANALYSIS_DATE[0].to_string(),
        json!(now.to_rfc3339_opts(SecondsFormat::Micros, true)),
    );
    patch.insert(
        aliases::project::AI_RISK_LEVEL[0].to_string(),
        Value::String(level.as_str().to_string()),
    );
    Ok(patch)
}

/// Write an analysis, its date and its risk tier onto a project
pub async fn persist(
    db: &Database,
    project_id: i64,
    analysis: &AiAnalysis,
    now: DateTime<Utc>,
) -> Result<()> {
    let patch = analysis_fields(analysis, now)?;
    RecordStore::new(db)
        .update(Collection::Projects, project_id, patch)
        .await?
        .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))?;
    info!(
        project_id,
        stage = "persisted",
        health_score = analysis.health_score,
        "Stored analysis"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, ProjectStatus, Task, TaskStatus};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct Canned(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _system: &str, user: &str) -> Result<String> {
            assert!(user.contains("PRJ-2026-001"));
            match self.0 {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => Err(Error::UpstreamRequest(msg.to_string())),
            }
        }
    }

    const RESPONSE: &str = r#"```json
    {
        "status": "Bien encaminado",
        "healthScore": 91,
        "risks": [{"category": "Scope", "severity": "Low", "description": "d", "impact": "i", "mitigation": "m"}],
        "recommendations": [{"priority": "Low", "action": "a", "rationale": "r", "expectedImpact": "e", "timeframe": "long-term"}],
        "insights": ["SPI 1.0"],
        "predictedCompletionDate": "2026-12-31",
        "confidenceLevel": 90,
        "keyMetrics": {"schedulePerformanceIndex": 1.0, "costPerformanceIndex": 1.1, "taskCompletionRate": 50, "criticalIssuesCount": 0}
    }
    ```"#;

    fn project() -> Project {
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
            budget_total: 0.0,
            budget_consumed: 0.0,
            planned_progress: 40.0,
            actual_progress: 40.0,
            leader: "Luis".to_string(),
            management_system: None,
            management_path: None,
            ai_analysis: None,
            ai_risk_level: None,
            ai_last_analysis_date: None,
            created_at: None,
            updated_at: None,
            tasks: vec![Task::draft("t", TaskStatus::InProgress)],
            history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_mock_mode_synthesizes() {
        let analysis = Analyzer::mock().analyze(&project(), Utc::now()).await.unwrap();
        assert!(analysis.synthetic);
    }

    #[tokio::test]
    async fn test_generator_response_parsed() {
        let analyzer = Analyzer::with_generator(Arc::new(Canned(Ok(RESPONSE))));
        let analysis = analyzer.analyze(&project(), Utc::now()).await.unwrap();
        assert_eq!(analysis.health_score, 91.0);
        assert!(!analysis.synthetic);
    }

    #[tokio::test]
    async fn test_unconfigured_token_endpoint_falls_back() {
        let mut config = Config::default();
        config.llm.mock_mode = false;
        config.llm.base_url = Some("http://127.0.0.1:9".to_string());
        config.llm.token.url = None;

        let analyzer = Analyzer::from_config(&config).unwrap();
        assert!(!analyzer.is_mock());

        let err = analyzer.analyze(&project(), Utc::now()).await.unwrap_err();
        assert_eq!(err.code(), "E201");

        let analysis = analyzer
            .analyze_or_fallback(&project(), Utc::now())
            .await
            .unwrap();
        assert!(analysis.synthetic);

        let strict = Analyzer::from_config(&config).unwrap().fallback_on_error(false);
        assert!(strict.analyze_or_fallback(&project(), Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn test_strict_analyze_surfaces_failure() {
        let analyzer = Analyzer::with_generator(Arc::new(Canned(Err("boom"))));
        let err = analyzer.analyze(&project(), Utc::now()).await.unwrap_err();
        assert_eq!(err.code(), "E202");
    }

    #[tokio::test]
    async fn test_fallback_marks_synthetic() {
        let analyzer = Analyzer::with_generator(Arc::new(Canned(Ok("not json"))));
        let analysis = analyzer
            .analyze_or_fallback(&project(), Utc::now())
            .await
            .unwrap();
        assert!(analysis.synthetic);
        assert!(!analysis.risks.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_disabled_propagates() {
        let analyzer =
            Analyzer::with_generator(Arc::new(Canned(Err("down")))).fallback_on_error(false);
        assert!(
            analyzer
                .analyze_or_fallback(&project(), Utc::now())
                .await
                .is_err()
        );
    }

    #[test]
    fn test_from_config_defaults_to_mock() {
        let analyzer = Analyzer::from_config(&Config::default()).unwrap();
        assert!(analyzer.is_mock());
    }

    #[test]
    fn test_analysis_fields_classify_score() {
        let analysis: AiAnalysis = parse_analysis(RESPONSE).unwrap();
        let fields = analysis_fields(&analysis, Utc::now()).unwrap();
        assert_eq!(fields["ai_risk_level"], "green");
        assert_eq!(fields["ai_analysis"]["healthScore"], 91.0);
        assert!(fields["ai_last_analysis_date"].is_string());
    }

    #[tokio::test]
    async fn test_run_persists_best_effort() {
        let db = Database::in_memory().await.unwrap();
        // no project row with this id: persistence fails, analysis still returned
        let analysis = Analyzer::mock().run(&db, &project(), Utc::now()).await.unwrap();
        assert!(analysis.synthetic);
    }
}
