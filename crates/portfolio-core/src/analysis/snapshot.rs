//! Metrics computed once per analysis and shared by the prompt and the
//! local synthesis

use chrono::NaiveDate;

use crate::domain::{Project, Task, TaskStatus};
use crate::metrics::{
    FinancialMetrics, TimelineMetrics, completion_rate, predicted_completion_date,
    schedule_performance_index,
};

/// Task counts by workflow status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub blocked: usize,
    pub delayed: usize,
}

impl TaskCounts {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(
            Self {
                total: tasks.len(),
                ..Self::default()
            },
            |mut counts, task| {
                match task.status {
                    TaskStatus::Completed => counts.completed += 1,
                    TaskStatus::InProgress => counts.in_progress += 1,
                    TaskStatus::Pending => counts.pending += 1,
                    TaskStatus::Blocked => counts.blocked += 1,
                    TaskStatus::Delayed => counts.delayed += 1,
                    TaskStatus::Cancelled | TaskStatus::Other(_) => {}
                }
                counts
            },
        )
    }

    /// Tasks not yet completed
    pub fn open(&self) -> usize {
        self.total - self.completed
    }

    pub fn completion_rate(&self) -> f64 {
        completion_rate(self.completed, self.total)
    }

    /// Share of all tasks in a given count, in percent
    pub fn ratio(&self, count: usize) -> f64 {
        completion_rate(count, self.total)
    }
}

/// Derived view of a project at a reference date
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    pub today: NaiveDate,
    pub timeline: Option<TimelineMetrics>,
    pub financial: FinancialMetrics,
    pub schedule_performance_index: f64,
    /// Actual minus planned progress, in points
    pub deviation: f64,
    pub tasks: TaskCounts,
    pub predicted_completion: Option<NaiveDate>,
}

impl ProjectSnapshot {
    pub fn compute(project: &Project, today: NaiveDate) -> Self {
        let predicted_completion = match project.start_date {
            Some(start) => {
                predicted_completion_date(start, project.end_date, project.actual_progress, today)
            }
            None => project.end_date,
        };

        Self {
            today,
            timeline: TimelineMetrics::compute(project.start_date, project.end_date, today),
            financial: FinancialMetrics::compute(
                project.budget_total,
                project.budget_consumed,
                project.actual_progress,
            ),
            schedule_performance_index: schedule_performance_index(
                project.actual_progress,
                project.planned_progress,
            ),
            deviation: project.schedule_deviation(),
            tasks: TaskCounts::from_tasks(&project.tasks),
            predicted_completion,
        }
    }

    pub fn cost_performance_index(&self) -> f64 {
        self.financial.cost_performance_index
    }

    /// Predicted completion as `YYYY-MM-DD`, or today when nothing is known
    pub fn predicted_completion_label(&self) -> String {
        self.predicted_completion
            .unwrap_or(self.today)
            .format("%Y-%m-%d")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks() -> Vec<Task> {
        vec![
            Task::draft("a", TaskStatus::Completed),
            Task::draft("b", TaskStatus::Completed),
            Task::draft("c", TaskStatus::Blocked),
            Task::draft("d", TaskStatus::InProgress),
            Task::draft("e", TaskStatus::Pending),
        ]
    }

    #[test]
    fn test_task_counts() {
        let counts = TaskCounts::from_tasks(&tasks());
        assert_eq!(counts.total, 5);
        assert_eq!(counts.completed, 2);
        assert_eq!(counts.blocked, 1);
        assert_eq!(counts.open(), 3);
        assert_eq!(counts.completion_rate(), 40.0);
        assert_eq!(counts.ratio(counts.in_progress), 20.0);
    }

    #[test]
    fn test_empty_counts_have_zero_rate() {
        let counts = TaskCounts::from_tasks(&[]);
        assert_eq!(counts.completion_rate(), 0.0);
        assert_eq!(counts.open(), 0);
    }
}
