//! Ordered source-name tables for every canonical field
//!
//! Each list is tried front to back; the current snake_case name comes
//! first, legacy spellings after it. A dotted entry addresses a nested
//! object. Storage filters compile the same lists, so a filter matches a
//! record exactly when the normalizer would read the same value.

pub mod project {
    pub const NAME: &[&str] = &["name", "project_name"];
    pub const CODE: &[&str] = &["code", "project_code"];
    pub const DESCRIPTION: &[&str] = &["description"];
    pub const STATUS: &[&str] = &["status"];
    pub const PRIORITY: &[&str] = &["priority"];
    pub const START_DATE: &[&str] = &["start_date", "startDate"];
    pub const END_DATE: &[&str] = &["end_date", "endDate"];
    pub const BUDGET_TOTAL: &[&str] = &["budget_total", "budget", "budgetTotal"];
    pub const BUDGET_CONSUMED: &[&str] = &["budget_consumed", "budgetConsumed"];
    pub const ACTUAL_PROGRESS: &[&str] = &["actual_progress", "progress", "actualProgress"];
    pub const LEADER: &[&str] = &["project_manager", "leader"];
    pub const MANAGEMENT_SYSTEM: &[&str] = &["management_system", "managementSystem"];
    pub const MANAGEMENT_PATH: &[&str] = &["management_path", "managementPath"];
    pub const AI_ANALYSIS: &[&str] = &["ai_analysis", "aiAnalysis"];
    pub const AI_RISK_LEVEL: &[&str] = &["ai_risk_level", "ai_risk_assessment.level", "aiRiskLevel"];
    pub const AI_LAST_ANALYSIS_DATE: &[&str] = &["ai_last_analysis_date", "aiLastAnalysisDate"];
}

pub mod task {
    pub const TASK_CODE: &[&str] = &["task_code", "taskCode"];
    pub const NAME: &[&str] = &["name", "task_name", "taskName"];
    pub const DESCRIPTION: &[&str] = &["description"];
    pub const STAGE: &[&str] = &["stage"];
    pub const MILESTONE: &[&str] = &["milestone"];
    pub const STATUS: &[&str] = &["status"];
    pub const RESPONSIBLE: &[&str] = &["responsible"];
    pub const START_DATE: &[&str] = &["start_date", "startDate"];
    pub const END_DATE: &[&str] = &["end_date", "endDate"];
    pub const ACTUAL_PROGRESS: &[&str] = &["actual_progress", "actualProgress"];
    pub const AI_RISK_LEVEL: &[&str] = &["ai_risk_level", "aiRiskLevel"];
    pub const AI_VALIDATION_STATUS: &[&str] = &["ai_validation_status", "aiValidationStatus"];
    pub const AI_RISK_REASONS: &[&str] = &["ai_risk_reasons", "aiRiskReasons"];
}

pub mod history {
    pub const CHANGE_TYPE: &[&str] = &["change_type", "changeType"];
    pub const FIELD_CHANGED: &[&str] = &["field_changed", "fieldChanged"];
    pub const OLD_VALUE: &[&str] = &["old_value", "oldValue"];
    pub const NEW_VALUE: &[&str] = &["new_value", "newValue"];
    pub const CHANGED_BY: &[&str] = &["changed_by", "changedBy"];
    pub const DESCRIPTION: &[&str] = &["change_description", "description"];
}

/// Record metadata injected by the store on every read
pub mod meta {
    pub const ID: &[&str] = &["id"];
    pub const PROJECT_ID: &[&str] = &["project_id"];
    pub const CREATED_AT: &[&str] = &["created_at"];
    pub const UPDATED_AT: &[&str] = &["updated_at"];
}
