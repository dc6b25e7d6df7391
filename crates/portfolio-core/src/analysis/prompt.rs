//! Prompt construction
//!
//! Pure text assembly from a project and its [`ProjectSnapshot`]; nothing
//! here touches the network or storage.

use crate::domain::{HistoryEntry, Project, Task, TaskStatus};

use super::snapshot::ProjectSnapshot;

/// At most this many tasks are listed as high risk
pub const MAX_RISK_TASKS: usize = 5;

/// At most this many history entries are included
pub const MAX_HISTORY_ENTRIES: usize = 3;

/// Instructions sent as the system message
pub const SYSTEM_PROMPT: &str = r#"You are a senior project management analyst. You review project health using earned value indicators, task flow and recent changes, and you report risks and actions a delivery lead can act on this week.

Reply with a single JSON object and nothing else. Every field is required unless marked optional:

{
  "status": "one or two sentences summarizing project health",
  "healthScore": 0-100,
  "risks": [
    {
      "category": "Schedule|Budget|Resources|Quality|Scope|Technical|External",
      "severity": "Critical|High|Medium|Low",
      "description": "specific description of the risk",
      "impact": "effect on dates, cost, quality or deliverables",
      "mitigation": "concrete steps to reduce the risk",
      "estimatedEffort": "optional effort needed to mitigate"
    }
  ],
  "recommendations": [
    {
      "priority": "Critical|High|Medium|Low",
      "action": "verb-led action",
      "rationale": "evidence from the metrics below",
      "expectedImpact": "measurable expected outcome",
      "timeframe": "immediate|short-term|long-term"
    }
  ],
  "insights": ["observation backed by a metric"],
  "predictedCompletionDate": "YYYY-MM-DD",
  "confidenceLevel": 0-100,
  "keyMetrics": {
    "schedulePerformanceIndex": number,
    "costPerformanceIndex": number,
    "taskCompletionRate": number,
    "criticalIssuesCount": number
  }
}

Rules:
- risks and recommendations must each contain at least one entry.
- Base every statement on the data provided; say so when data is missing.
- SPI = actual progress / planned progress. CPI = (budget * progress) / spent. Values below 1.0 are unhealthy."#;

/// Tasks worth calling out: blocked, delayed, or in progress under 50%
pub fn high_risk_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| match t.status {
            TaskStatus::Blocked | TaskStatus::Delayed => true,
            TaskStatus::InProgress => t.actual_progress < 50.0,
            _ => false,
        })
        .take(MAX_RISK_TASKS)
        .collect()
}

fn history_line(entry: &HistoryEntry) -> String {
    let when = entry
        .change_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Recent".to_string());
    format!("- {}: {}", when, entry.summary())
}

fn task_line(task: &Task) -> String {
    if task.actual_progress > 0.0 {
        format!(
            "- {}: {} ({}, {}% complete)",
            task.task_code, task.name, task.status, task.actual_progress
        )
    } else {
        format!("- {}: {} ({})", task.task_code, task.name, task.status)
    }
}

fn health_marker(index: f64) -> &'static str {
    if index >= 1.0 { "on track" } else { "below target" }
}

/// Format an amount with thousands separators, no decimals
fn amount(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn optional_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "not set".to_string())
}

/// Build the user message for one project
pub fn build_user_prompt(project: &Project, snapshot: &ProjectSnapshot) -> String {
    let mut out = String::new();
    let counts = &snapshot.tasks;
    let financial = &snapshot.financial;
    let spi = snapshot.schedule_performance_index;
    let cpi = snapshot.cost_performance_index();

    out.push_str("# Project analysis request\n\n");
    out.push_str("## Identity\n");
    out.push_str(&format!("- Code: {}\n", project.code));
    out.push_str(&format!("- Name: {}\n", project.name));
    out.push_str(&format!("- Status: {}\n", project.status_label));
    out.push_str(&format!("- Leader: {}\n", project.leader));
    out.push_str(&format!(
        "- Description: {}\n\n",
        project.description.as_deref().unwrap_or("No description provided")
    ));

    out.push_str("## Timeline\n");
    out.push_str(&format!("- Start date: {}\n", optional_date(project.start_date)));
    out.push_str(&format!("- End date: {}\n", optional_date(project.end_date)));
    match &snapshot.timeline {
        Some(t) => {
            out.push_str(&format!("- Total duration: {} days\n", t.total_days));
            out.push_str(&format!(
                "- Elapsed: {} days ({:.1}%)\n",
                t.elapsed_days, t.time_elapsed_percentage
            ));
            out.push_str(&format!("- Remaining: {} days\n\n", t.remaining_days));
        }
        None => {
            out.push_str("- Duration unknown: dates incomplete\n\n");
        }
    }

    out.push_str("## Progress\n");
    out.push_str(&format!("- Planned progress: {}%\n", project.planned_progress));
    out.push_str(&format!("- Actual progress: {}%\n", project.actual_progress));
    out.push_str(&format!("- Schedule deviation: {:+.2}%\n", snapshot.deviation));
    out.push_str(&format!("- SPI: {:.2} ({})\n\n", spi, health_marker(spi)));

    out.push_str("## Budget\n");
    out.push_str(&format!("- Total: ${}\n", amount(financial.budget_total)));
    out.push_str(&format!("- Consumed: ${}\n", amount(financial.budget_consumed)));
    out.push_str(&format!("- Remaining: ${}\n", amount(financial.budget_remaining)));
    out.push_str(&format!(
        "- Consumption: {:.2}%\n",
        financial.consumption_percentage
    ));
    out.push_str(&format!("- CPI: {:.2} ({})\n", cpi, health_marker(cpi)));
    let health = if financial.overspent_by_more_than(project.actual_progress, 10.0) {
        "WARNING: spending runs ahead of progress, possible cost overrun"
    } else if financial.consumption_percentage < project.actual_progress - 10.0 {
        "Spending is below progress"
    } else {
        "Spending is aligned with progress"
    };
    out.push_str(&format!("- Financial health: {}\n\n", health));

    out.push_str("## Tasks\n");
    out.push_str(&format!("- Total: {}\n", counts.total));
    out.push_str(&format!(
        "- Completed: {} ({:.1}%)\n",
        counts.completed,
        counts.completion_rate()
    ));
    out.push_str(&format!("- In progress: {}\n", counts.in_progress));
    out.push_str(&format!("- Pending: {}\n", counts.pending));
    out.push_str(&format!("- Blocked: {}\n", counts.blocked));
    out.push_str(&format!(
        "- Blocked ratio: {:.1}%\n\n",
        counts.ratio(counts.blocked)
    ));

    let risky = high_risk_tasks(&project.tasks);
    if !risky.is_empty() {
        out.push_str("## High-risk tasks\n");
        for task in risky {
            out.push_str(&format!("{}\n", task_line(task)));
        }
        out.push('\n');
    }

    out.push_str("## Recent activity\n");
    if project.history.is_empty() {
        out.push_str("No recent activity recorded\n\n");
    } else {
        for entry in project.history.iter().take(MAX_HISTORY_ENTRIES) {
            out.push_str(&format!("{}\n", history_line(entry)));
        }
        out.push('\n');
    }

    out.push_str("## Instructions\n");
    out.push_str(&format!(
        "Assess schedule, cost, resource and scope risk from the data above. \
         Compare SPI {:.2} and CPI {:.2} against 1.0, weigh the {} blocked task(s) \
         and the {:.0}% of work left, then return the JSON object described in \
         the system message.\n",
        spi,
        cpi,
        counts.blocked,
        100.0 - project.actual_progress
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, ProjectStatus};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn project() -> Project {
        Project {
            id: 7,
            code: "CRM-2026-007".to_string(),
            name: "CRM Corporativo".to_string(),
            description: None,
            status: ProjectStatus::InProgress,
            status_label: "Activo".to_string(),
            priority: Priority::High,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31),
            budget_total: 1_250_000.0,
            budget_consumed: 700_000.0,
            planned_progress: 50.0,
            actual_progress: 42.0,
            leader: "Ana".to_string(),
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

    fn history(n: i64) -> HistoryEntry {
        HistoryEntry {
            id: n,
            project_id: 7,
            change_type: "update".to_string(),
            field_changed: None,
            old_value: None,
            new_value: None,
            changed_by: None,
            description: Some(format!("change {n}")),
            change_date: Utc.with_ymd_and_hms(2026, 6, n as u32, 9, 0, 0).single(),
        }
    }

    #[test]
    fn test_high_risk_tasks_bounded() {
        let mut tasks: Vec<Task> = (0..8)
            .map(|i| Task::draft(format!("t{i}"), TaskStatus::Blocked))
            .collect();
        tasks.push(Task::draft("fine", TaskStatus::InProgress).with_progress(80.0));
        assert_eq!(high_risk_tasks(&tasks).len(), MAX_RISK_TASKS);

        let tasks = vec![
            Task::draft("slow", TaskStatus::InProgress).with_progress(20.0),
            Task::draft("late", TaskStatus::Delayed),
            Task::draft("done", TaskStatus::Completed),
        ];
        let names: Vec<_> = high_risk_tasks(&tasks).iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["slow", "late"]);
    }

    #[test]
    fn test_prompt_embeds_metrics() {
        let mut project = project();
        project.tasks = vec![Task::draft("Integración", TaskStatus::Blocked)];
        let today = NaiveDate::from_ymd_opt(2026, 7, 2).unwrap();
        let snapshot = ProjectSnapshot::compute(&project, today);
        let prompt = build_user_prompt(&project, &snapshot);

        assert!(prompt.contains("CRM-2026-007"));
        assert!(prompt.contains("SPI: 0.84"));
        assert!(prompt.contains("$1,250,000"));
        assert!(prompt.contains("Blocked: 1"));
        assert!(prompt.contains("## High-risk tasks"));
        assert!(prompt.contains("No recent activity recorded"));
        assert!(prompt.contains("Schedule deviation: -8.00%"));
    }

    #[test]
    fn test_prompt_section_layout() {
        let project = project();
        let snapshot = ProjectSnapshot::compute(&project, NaiveDate::from_ymd_opt(2026, 7, 2).unwrap());
        let prompt = build_user_prompt(&project, &snapshot);

        assert!(prompt.starts_with("# Project analysis request\n\n## Identity\n- Code: CRM-2026-007\n"));
        assert!(prompt.contains("- Description: No description provided\n\n## Timeline\n"));
        assert!(prompt.contains("No recent activity recorded\n\n## Instructions\n"));
        assert!(prompt.ends_with("the system message.\n"));
        assert!(!prompt.contains("## High-risk tasks"));
    }

    #[test]
    fn test_prompt_limits_history() {
        let mut project = project();
        project.history = (1..=5).map(history).collect();
        let snapshot = ProjectSnapshot::compute(&project, NaiveDate::from_ymd_opt(2026, 7, 2).unwrap());
        let prompt = build_user_prompt(&project, &snapshot);

        assert!(prompt.contains("- 2026-06-01: change 1"));
        assert!(prompt.contains("change 3"));
        assert!(!prompt.contains("change 4"));
    }

    #[test]
    fn test_amount_grouping() {
        assert_eq!(amount(0.0), "0");
        assert_eq!(amount(999.4), "999");
        assert_eq!(amount(1000.0), "1,000");
        assert_eq!(amount(-1234567.0), "-1,234,567");
    }

    #[test]
    fn test_system_prompt_describes_shape() {
        for field in ["healthScore", "risks", "recommendations", "keyMetrics", "predictedCompletionDate"] {
            assert!(SYSTEM_PROMPT.contains(field));
        }
    }
}
