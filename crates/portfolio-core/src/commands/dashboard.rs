//! Portfolio-wide dashboard counters

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::{Project, Task, TaskStatus};
use crate::error::Result;
use crate::metrics::{completion_rate, round_to};
use crate::normalize::{normalize_project, normalize_task};
use crate::storage::{Collection, Database, Filter, RecordStore};

/// Risk bucket for projects never analyzed
const UNKNOWN_RISK: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_projects: usize,
    pub total_tasks: usize,
    /// Completed share of all tasks, two decimals
    pub completion_rate: f64,
    pub total_budget: f64,
    pub avg_budget: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBreakdown {
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_risk: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBreakdown {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub overview: Overview,
    pub projects: ProjectBreakdown,
    pub tasks: TaskBreakdown,
}

impl DashboardStats {
    pub fn from_parts(projects: &[Project], tasks: &[Task]) -> Self {
        let mut breakdown = ProjectBreakdown::default();
        for project in projects {
            *breakdown
                .by_status
                .entry(project.status.as_str().to_string())
                .or_default() += 1;
            *breakdown
                .by_priority
                .entry(project.priority.as_str().to_string())
                .or_default() += 1;
            let risk = project
                .ai_risk_level
                .map(|level| level.as_str())
                .unwrap_or(UNKNOWN_RISK);
            *breakdown.by_risk.entry(risk.to_string()).or_default() += 1;
        }

        let mut task_breakdown = TaskBreakdown {
            total: tasks.len(),
            ..Default::default()
        };
        for task in tasks {
            *task_breakdown
                .by_status
                .entry(task.status.as_str().to_string())
                .or_default() += 1;
            if task.status == TaskStatus::Completed {
                task_breakdown.completed += 1;
            }
        }

        let total_budget: f64 = projects.iter().map(|p| p.budget_total).sum();
        let avg_budget = if projects.is_empty() {
            0.0
        } else {
            total_budget / projects.len() as f64
        };

        Self {
            overview: Overview {
                total_projects: projects.len(),
                total_tasks: tasks.len(),
                completion_rate: round_to(
                    completion_rate(task_breakdown.completed, tasks.len()),
                    2,
                ),
                total_budget: round_to(total_budget, 2),
                avg_budget: round_to(avg_budget, 2),
            },
            projects: breakdown,
            tasks: task_breakdown,
        }
    }
}

/// Aggregate counters over every project and task
pub async fn get_dashboard_stats(db: &Database) -> Result<DashboardStats> {
    let store = RecordStore::new(db);
    let now = Utc::now();

    let projects: Vec<Project> = store
        .find(Collection::Projects, &Filter::new())
        .await?
        .iter()
        .map(|record| normalize_project(record, now))
        .collect();
    let tasks: Vec<Task> = store
        .find(Collection::Tasks, &Filter::new())
        .await?
        .iter()
        .map(normalize_task)
        .collect();

    Ok(DashboardStats::from_parts(&projects, &tasks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::commands::{ProjectRepository, TaskRepository};
    use crate::domain::{NewProject, NewTask};

    #[tokio::test]
    async fn test_empty_portfolio() {
        let db = Database::in_memory().await.unwrap();
        let stats = get_dashboard_stats(&db).await.unwrap();
        assert_eq!(stats.overview.total_projects, 0);
        assert_eq!(stats.overview.completion_rate, 0.0);
        assert_eq!(stats.overview.avg_budget, 0.0);
        assert!(stats.projects.by_status.is_empty());
    }

    #[tokio::test]
    async fn test_counts_and_budget() {
        let db = Database::in_memory().await.unwrap();
        let projects = ProjectRepository::new(&db);
        let a = projects
            .create(NewProject::new("ERP").with_budget(1000.0, 0.0), &Analyzer::mock())
            .await
            .unwrap();
        projects
            .create(NewProject::new("Portal").with_budget(500.5, 0.0), &Analyzer::mock())
            .await
            .unwrap();

        let tasks = TaskRepository::new(&db);
        let mut done = NewTask::new("a");
        done.status = Some(TaskStatus::Completed);
        tasks.create(a.id, done).await.unwrap();
        tasks.create(a.id, NewTask::new("b")).await.unwrap();
        tasks.create(a.id, NewTask::new("c")).await.unwrap();

        let stats = get_dashboard_stats(&db).await.unwrap();
        assert_eq!(stats.overview.total_projects, 2);
        assert_eq!(stats.overview.total_tasks, 3);
        assert_eq!(stats.overview.completion_rate, 33.33);
        assert_eq!(stats.overview.total_budget, 1500.5);
        assert_eq!(stats.overview.avg_budget, 750.25);
        assert_eq!(stats.tasks.completed, 1);
        assert_eq!(stats.tasks.by_status["Pendiente"], 2);
        assert_eq!(stats.projects.by_priority["medium"], 2);
        assert_eq!(stats.projects.by_risk.values().sum::<usize>(), 2);
    }

    #[test]
    fn test_unanalyzed_projects_count_as_unknown() {
        let record = serde_json::json!({ "id": 1, "name": "Legacy" });
        let project = normalize_project(record.as_object().unwrap(), Utc::now());
        let stats = DashboardStats::from_parts(&[project], &[]);
        assert_eq!(stats.projects.by_risk[UNKNOWN_RISK], 1);
        assert_eq!(stats.overview.total_budget, 0.0);
    }
}
