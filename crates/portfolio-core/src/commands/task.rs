//! Task management commands
//!
//! Task codes are `<projectCode>-TNNN`, allocated from a per-project
//! sequence. The cached risk fields on every written task are refreshed from
//! the scorer.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::{NewTask, Project, Task, TaskPatch, TaskStatus};
use crate::error::{Error, Result};
use crate::metrics::completion_rate;
use crate::normalize::{aliases::task as fields, code, normalize_project, normalize_task};
use crate::risk::{self, TaskRiskAssessment, TaskRiskLevel};
use crate::storage::{Collection, Database, Filter, Record, RecordStore};

use super::{check_dates, check_progress, put, put_opt, require_name};

/// Allocation attempts before giving up on a conflicting task code
const MAX_CODE_ATTEMPTS: u32 = 3;

/// Marker stored in `ai_validation_status` when the scorer filled the cache
pub const LOCAL_VALIDATION: &str = "local";

/// Score a task against today's date
pub fn score_task(task: &Task) -> TaskRiskAssessment {
    risk::score_task_now(task)
}

/// Filters for listing a project's tasks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilters {
    /// Case-insensitive substring of the task code
    pub task_code: Option<String>,
    pub stage: Option<String>,
    pub status: Option<TaskStatus>,
    pub milestone: Option<String>,
    /// Case-insensitive substring of the assignee
    pub responsible: Option<String>,
    pub risk_level: Option<TaskRiskLevel>,
}

impl TaskFilters {
    fn to_filter(&self, project_id: i64) -> Filter {
        let mut filter = Filter::new().project(project_id);
        if let Some(code) = &self.task_code {
            filter = filter.contains(fields::TASK_CODE, code.clone());
        }
        if let Some(stage) = &self.stage {
            filter = filter.eq(fields::STAGE, stage.clone());
        }
        if let Some(status) = &self.status {
            filter = filter.one_of_ignore_case(fields::STATUS, status.stored_forms());
        }
        if let Some(milestone) = &self.milestone {
            filter = filter.eq(fields::MILESTONE, milestone.clone());
        }
        if let Some(responsible) = &self.responsible {
            filter = filter.contains(fields::RESPONSIBLE, responsible.clone());
        }
        if let Some(level) = self.risk_level {
            filter = filter.eq(fields::AI_RISK_LEVEL, level.as_str());
        }
        filter
    }
}

/// Per-project task statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatistics {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_risk_level: BTreeMap<String, usize>,
    /// Mean progress, rounded to a whole percent
    pub average_progress: u32,
    /// Completed share, rounded to a whole percent
    pub completion_rate: u32,
}

impl TaskStatistics {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut by_status: BTreeMap<String, usize> = TaskStatus::WORKFLOW
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        let mut by_risk_level: BTreeMap<String, usize> = TaskRiskLevel::ALL
            .iter()
            .map(|l| (l.as_str().to_string(), 0))
            .collect();

        for task in tasks {
            if let Some(count) = by_status.get_mut(task.status.as_str()) {
                *count += 1;
            }
            let level = task.ai_risk_level.unwrap_or(TaskRiskLevel::Unknown);
            if let Some(count) = by_risk_level.get_mut(level.as_str()) {
                *count += 1;
            }
        }

        let total = tasks.len();
        let (average_progress, completion) = if total == 0 {
            (0, 0)
        } else {
            let progress: f64 = tasks.iter().map(|t| t.actual_progress).sum();
            let completed = by_status
                .get(TaskStatus::Completed.as_str())
                .copied()
                .unwrap_or(0);
            (
                (progress / total as f64).round() as u32,
                completion_rate(completed, total).round() as u32,
            )
        };

        Self {
            total,
            by_status,
            by_risk_level,
            average_progress,
            completion_rate: completion,
        }
    }
}

/// Refresh the cached risk fields from the scorer
fn refresh_risk(task: &mut Task, today: NaiveDate) {
    let assessment = risk::score_task(task, today);
    task.ai_risk_level = Some(assessment.risk_level);
    task.ai_risk_reasons = assessment.reasons();
    task.ai_validation_status = Some(LOCAL_VALIDATION.to_string());
}

/// Canonical body for a task
fn task_body(task: &Task) -> Result<Record> {
    let mut body = Record::new();
    put(&mut body, fields::TASK_CODE, &task.task_code)?;
    put(&mut body, fields::NAME, &task.name)?;
    put_opt(&mut body, fields::DESCRIPTION, task.description.as_ref())?;
    put_opt(&mut body, fields::STAGE, task.stage.as_ref())?;
    put_opt(&mut body, fields::MILESTONE, task.milestone.as_ref())?;
    put(&mut body, fields::STATUS, &task.status)?;
    put_opt(&mut body, fields::RESPONSIBLE, task.responsible.as_ref())?;
    put_opt(&mut body, fields::START_DATE, task.start_date.as_ref())?;
    put_opt(&mut body, fields::END_DATE, task.end_date.as_ref())?;
    put(&mut body, fields::ACTUAL_PROGRESS, &task.actual_progress)?;
    put_opt(&mut body, fields::AI_RISK_LEVEL, task.ai_risk_level.as_ref())?;
    put_opt(&mut body, fields::AI_VALIDATION_STATUS, task.ai_validation_status.as_ref())?;
    put(&mut body, fields::AI_RISK_REASONS, &task.ai_risk_reasons)?;
    Ok(body)
}

/// Task repository for database operations
pub struct TaskRepository<'a> {
    db: &'a Database,
}

impl<'a> TaskRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn store(&self) -> RecordStore<'a> {
        RecordStore::new(self.db)
    }

    async fn project(&self, project_id: i64) -> Result<Project> {
        self.store()
            .find_one(Collection::Projects, project_id)
            .await?
            .map(|record| normalize_project(&record, Utc::now()))
            .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))
    }

    async fn record_by_code(&self, task_code: &str) -> Result<Record> {
        self.store()
            .find_first(
                Collection::Tasks,
                &Filter::new().eq(fields::TASK_CODE, task_code),
            )
            .await?
            .ok_or_else(|| Error::TaskNotFound(task_code.to_string()))
    }

    /// Tasks of a project matching the filters, newest first
    pub async fn list_by_project(&self, project_id: i64, filters: &TaskFilters) -> Result<Vec<Task>> {
        self.project(project_id).await?;
        let records = self
            .store()
            .find(Collection::Tasks, &filters.to_filter(project_id))
            .await?;
        Ok(records.iter().map(normalize_task).collect())
    }

    pub async fn get_by_code(&self, task_code: &str) -> Result<Task> {
        Ok(normalize_task(&self.record_by_code(task_code).await?))
    }

    /// Next code for a project: count-seeded sequence, time-based on failure
    async fn allocate_code(&self, project: &Project) -> String {
        let store = self.store();
        let allocation = async {
            let existing = store
                .count(Collection::Tasks, &Filter::new().project(project.id))
                .await?;
            store
                .next_sequence(&format!("tasks:{}", project.id), existing + 1)
                .await
        };
        match allocation.await {
            Ok(sequence) => code::task_code(&project.code, sequence),
            Err(e) => {
                warn!(project_id = project.id, error = %e, "Task code allocation failed, using time-based code");
                code::fallback_task_code(Utc::now())
            }
        }
    }

    /// Create a task under an existing project
    pub async fn create(&self, project_id: i64, new: NewTask) -> Result<Task> {
        require_name(&new.name, "Task")?;
        check_progress(new.actual_progress)?;
        check_dates(new.start_date, new.end_date)?;

        let project = self.project(project_id).await?;
        let given_code = new
            .task_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let mut task = Task::draft(new.name.trim(), new.status.unwrap_or_default());
        task.project_id = project_id;
        task.description = new.description;
        task.stage = new.stage;
        task.milestone = new.milestone;
        task.responsible = new.responsible;
        task.start_date = new.start_date;
        task.end_date = new.end_date;
        task.actual_progress = new.actual_progress.unwrap_or(0.0);
        refresh_risk(&mut task, Utc::now().date_naive());

        let mut attempt = 0;
        let record = loop {
            attempt += 1;
            task.task_code = match &given_code {
                Some(code) => code.clone(),
                None => self.allocate_code(&project).await,
            };

            match self
                .store()
                .insert(Collection::Tasks, Some(project_id), task_body(&task)?)
                .await
            {
                Ok(record) => break record,
                Err(e) if e.is_conflict() && given_code.is_some() => {
                    return Err(Error::Validation(format!(
                        "task code {} already exists",
                        task.task_code
                    )));
                }
                Err(e) if e.is_conflict() && attempt < MAX_CODE_ATTEMPTS => {
                    debug!(task_code = %task.task_code, attempt, "Task code taken, retrying");
                }
                Err(e) => return Err(e),
            }
        };

        let created = normalize_task(&record);
        info!(project_id, task_code = %created.task_code, "Created task");
        Ok(created)
    }

    /// Apply a partial update and refresh the cached risk fields
    pub async fn update(&self, task_code: &str, patch: TaskPatch) -> Result<Task> {
        let record = self.record_by_code(task_code).await?;
        let mut task = normalize_task(&record);

        if let Some(name) = &patch.name {
            require_name(name, "Task")?;
        }
        check_progress(patch.actual_progress)?;
        check_dates(
            patch.start_date.or(task.start_date),
            patch.end_date.or(task.end_date),
        )?;

        if let Some(name) = patch.name {
            task.name = name.trim().to_string();
        }
        if patch.description.is_some() {
            task.description = patch.description;
        }
        if patch.stage.is_some() {
            task.stage = patch.stage;
        }
        if patch.milestone.is_some() {
            task.milestone = patch.milestone;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if patch.responsible.is_some() {
            task.responsible = patch.responsible;
        }
        if patch.start_date.is_some() {
            task.start_date = patch.start_date;
        }
        if patch.end_date.is_some() {
            task.end_date = patch.end_date;
        }
        if let Some(progress) = patch.actual_progress {
            task.actual_progress = progress;
        }
        refresh_risk(&mut task, Utc::now().date_naive());

        let updated = self
            .store()
            .update(Collection::Tasks, task.id, task_body(&task)?)
            .await?
            .ok_or_else(|| Error::TaskNotFound(task_code.to_string()))?;

        info!(task_code, "Updated task");
        Ok(normalize_task(&updated))
    }

    pub async fn delete(&self, task_code: &str) -> Result<()> {
        let record = self.record_by_code(task_code).await?;
        let id = record.get("id").and_then(Value::as_i64).unwrap_or_default();
        if !self.store().delete(Collection::Tasks, id).await? {
            return Err(Error::TaskNotFound(task_code.to_string()));
        }
        info!(task_code, "Deleted task");
        Ok(())
    }

    /// Score a stored task
    pub async fn score(&self, task_code: &str) -> Result<TaskRiskAssessment> {
        Ok(score_task(&self.get_by_code(task_code).await?))
    }

    pub async fn statistics(&self, project_id: i64) -> Result<TaskStatistics> {
        let tasks = self
            .list_by_project(project_id, &TaskFilters::default())
            .await?;
        Ok(TaskStatistics::from_tasks(&tasks))
    }
}
