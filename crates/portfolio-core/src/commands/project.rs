//! Project management commands
//!
//! Provides CRUD operations for projects, plus the analysis entry point.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::analysis::Analyzer;
use crate::domain::{
    AiAnalysis, NewHistoryEntry, NewProject, Priority, Project, ProjectPatch, ProjectStatus,
};
use crate::error::{Error, Result};
use crate::normalize::{aliases::project as fields, code, normalize_project, normalize_task};
use crate::risk::ProjectRiskLevel;
use crate::storage::{Collection, Database, Fields, Filter, Record, RecordStore};

use super::history::HistoryRepository;
use super::{check_amount, check_dates, check_progress, put, put_opt, require_name};

/// Filters for listing projects; all set filters must match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilters {
    /// Case-insensitive substring of the project code
    pub code: Option<String>,
    pub status: Option<ProjectStatus>,
    /// Projects still running on or after this date
    pub start_date: Option<NaiveDate>,
    /// Projects started on or before this date
    pub end_date: Option<NaiveDate>,
    pub risk_level: Option<ProjectRiskLevel>,
}

impl ProjectFilters {
    fn to_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(status) = &self.status {
            filter = filter.one_of_ignore_case(fields::STATUS, status.stored_forms());
        }
        if let Some(start) = self.start_date {
            filter = filter.on_or_after(fields::END_DATE, start);
        }
        if let Some(end) = self.end_date {
            filter = filter.on_or_before(fields::START_DATE, end);
        }
        if let Some(level) = self.risk_level {
            filter = filter.eq(fields::AI_RISK_LEVEL, level.as_str());
        }
        filter
    }
}

/// One field changed by an update
struct FieldChange {
    key: &'static str,
    old: Option<String>,
    new: String,
    value: Value,
}

fn track<T: Serialize>(
    changes: &mut Vec<FieldChange>,
    fields: Fields,
    old: Option<String>,
    new: Option<T>,
    show: impl Fn(&T) -> String,
) -> Result<()> {
    let Some(new) = new else {
        return Ok(());
    };
    let shown = show(&new);
    if old.as_deref() == Some(shown.as_str()) {
        return Ok(());
    }
    changes.push(FieldChange {
        key: fields[0],
        old,
        new: shown,
        value: serde_json::to_value(&new)?,
    });
    Ok(())
}

fn diff(current: &Project, patch: &ProjectPatch) -> Result<Vec<FieldChange>> {
    let mut changes = Vec::new();
    let date = |d: &NaiveDate| d.to_string();
    let amount = |a: &f64| a.to_string();

    track(&mut changes, fields::NAME, Some(current.name.clone()), patch.name.clone(), String::clone)?;
    track(
        &mut changes,
        fields::DESCRIPTION,
        current.description.clone(),
        patch.description.clone(),
        String::clone,
    )?;
    track(
        &mut changes,
        fields::STATUS,
        Some(current.status.as_str().to_string()),
        patch.status.clone(),
        |s: &ProjectStatus| s.as_str().to_string(),
    )?;
    track(
        &mut changes,
        fields::PRIORITY,
        Some(current.priority.as_str().to_string()),
        patch.priority,
        |p: &Priority| p.as_str().to_string(),
    )?;
    track(&mut changes, fields::START_DATE, current.start_date.map(|d| d.to_string()), patch.start_date, date)?;
    track(&mut changes, fields::END_DATE, current.end_date.map(|d| d.to_string()), patch.end_date, date)?;
    track(
        &mut changes,
        fields::BUDGET_TOTAL,
        Some(current.budget_total.to_string()),
        patch.budget_total,
        amount,
    )?;
    track(
        &mut changes,
        fields::BUDGET_CONSUMED,
        Some(current.budget_consumed.to_string()),
        patch.budget_consumed,
        amount,
    )?;
    track(
        &mut changes,
        fields::ACTUAL_PROGRESS,
        Some(current.actual_progress.to_string()),
        patch.actual_progress,
        amount,
    )?;
    track(&mut changes, fields::LEADER, Some(current.leader.clone()), patch.leader.clone(), String::clone)?;
    Ok(changes)
}

/// Project repository for database operations
pub struct ProjectRepository<'a> {
    db: &'a Database,
}

impl<'a> ProjectRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn store(&self) -> RecordStore<'a> {
        RecordStore::new(self.db)
    }

    /// Projects matching the filters, newest first, without tasks
    ///
    /// The code filter runs after normalization so synthesized codes match.
    pub async fn list(&self, filters: &ProjectFilters) -> Result<Vec<Project>> {
        let now = Utc::now();
        let records = self
            .store()
            .find(Collection::Projects, &filters.to_filter())
            .await?;
        let needle = filters.code.as_deref().map(str::to_lowercase);
        Ok(records
            .iter()
            .map(|r| normalize_project(r, now))
            .filter(|p| match &needle {
                Some(needle) => p.code.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .collect())
    }

    /// A project with its tasks and history embedded
    pub async fn get(&self, id: i64) -> Result<Project> {
        let record = self
            .store()
            .find_one(Collection::Projects, id)
            .await?
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))?;

        let mut project = normalize_project(&record, Utc::now());
        project.tasks = self
            .store()
            .find(Collection::Tasks, &Filter::new().project(id))
            .await?
            .iter()
            .map(normalize_task)
            .collect();
        project.history = HistoryRepository::new(self.db).list(id).await?;
        Ok(project)
    }

    /// Create a project and run a best-effort analysis on it
    ///
    /// A missing code is synthesized from the name, start year and id. The
    /// analysis never fails the creation; the returned project carries it
    /// when it could be stored.
    pub async fn create(&self, new: NewProject, analyzer: &Analyzer) -> Result<Project> {
        require_name(&new.name, "Project")?;
        check_progress(new.actual_progress)?;
        check_amount("budget_total", new.budget_total)?;
        check_amount("budget_consumed", new.budget_consumed)?;
        check_dates(new.start_date, new.end_date)?;

        let mut body = Record::new();
        put(&mut body, fields::NAME, &new.name.trim())?;
        if let Some(code) = new.code.as_deref().filter(|c| !c.trim().is_empty()) {
            put(&mut body, fields::CODE, &code.trim())?;
        }
        put_opt(&mut body, fields::DESCRIPTION, new.description.as_ref())?;
        put(
            &mut body,
            fields::STATUS,
            &new.status.unwrap_or(ProjectStatus::Planning),
        )?;
        put(&mut body, fields::PRIORITY, &new.priority.unwrap_or_default())?;
        put_opt(&mut body, fields::START_DATE, new.start_date.as_ref())?;
        put_opt(&mut body, fields::END_DATE, new.end_date.as_ref())?;
        put(&mut body, fields::BUDGET_TOTAL, &new.budget_total.unwrap_or(0.0))?;
        put(&mut body, fields::BUDGET_CONSUMED, &new.budget_consumed.unwrap_or(0.0))?;
        put(&mut body, fields::ACTUAL_PROGRESS, &new.actual_progress.unwrap_or(0.0))?;
        put_opt(&mut body, fields::LEADER, new.leader.as_ref())?;

        let store = self.store();
        let record = store.insert(Collection::Projects, None, body).await?;
        let id = record
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Other("inserted project has no id".to_string()))?;

        if !record.contains_key(fields::CODE[0]) {
            let now = Utc::now();
            let generated = code::project_code(&new.name, new.start_date, id, now.year());
            let mut patch = Record::new();
            put(&mut patch, fields::CODE, &generated)?;
            store.update(Collection::Projects, id, patch).await?;
        }

        let project = self.get(id).await?;
        info!(project_id = id, code = %project.code, "Created project");

        if let Err(e) = analyzer.run(self.db, &project, Utc::now()).await {
            warn!(project_id = id, error = %e, "Initial analysis failed");
        }

        self.get(id).await
    }

    /// Apply a partial update, recording one history entry per changed field
    pub async fn update(&self, id: i64, patch: ProjectPatch) -> Result<Project> {
        let current = self.get(id).await?;

        if let Some(name) = &patch.name {
            require_name(name, "Project")?;
        }
        check_progress(patch.actual_progress)?;
        check_amount("budget_total", patch.budget_total)?;
        check_amount("budget_consumed", patch.budget_consumed)?;
        check_dates(
            patch.start_date.or(current.start_date),
            patch.end_date.or(current.end_date),
        )?;

        let changes = diff(&current, &patch)?;
        if changes.is_empty() {
            return Ok(current);
        }

        let mut body = Record::new();
        for change in &changes {
            body.insert(change.key.to_string(), change.value.clone());
        }
        self.store()
            .update(Collection::Projects, id, body)
            .await?
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))?;

        let history = HistoryRepository::new(self.db);
        for change in changes {
            let mut entry = NewHistoryEntry::field_update(change.key, change.old, Some(change.new));
            entry.changed_by = patch.changed_by.clone();
            history.add(id, entry).await?;
        }

        info!(project_id = id, "Updated project");
        self.get(id).await
    }

    /// Delete a project and, through the store, its tasks and history
    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.store().delete(Collection::Projects, id).await? {
            return Err(Error::ProjectNotFound(id.to_string()));
        }
        info!(project_id = id, "Deleted project");
        Ok(())
    }

    /// Stored analysis, or a fresh one when absent or `force_refresh` is set
    pub async fn analysis(
        &self,
        id: i64,
        force_refresh: bool,
        analyzer: &Analyzer,
    ) -> Result<AiAnalysis> {
        self.analysis_at(id, force_refresh, analyzer, Utc::now()).await
    }

    pub async fn analysis_at(
        &self,
        id: i64,
        force_refresh: bool,
        analyzer: &Analyzer,
        now: DateTime<Utc>,
    ) -> Result<AiAnalysis> {
        let project = self.get(id).await?;
        match project.ai_analysis.clone() {
            Some(stored) if !force_refresh => Ok(stored),
            _ => analyzer.run(self.db, &project, now).await,
        }
    }
}
