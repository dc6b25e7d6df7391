//! Portfolio Core Library
//!
//! This crate provides the core functionality for the project portfolio
//! backend, including:
//! - Commands (projects, tasks, history, dashboard)
//! - Storage (SQLite document store with drifting field names)
//! - Record normalization into canonical domain types
//! - Schedule and financial metrics
//! - Task risk scoring and project risk tiers
//! - AI analysis orchestration with local fallback
//! - LLM integration (token-authenticated text generation)

pub mod analysis;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod normalize;
pub mod risk;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::analysis::Analyzer;
    pub use crate::commands::{
        DashboardStats, HistoryRepository, ProjectFilters, ProjectRepository, TaskFilters,
        TaskRepository, TaskStatistics, get_dashboard_stats, score_task,
    };
    pub use crate::config::Config;
    pub use crate::domain::{
        AiAnalysis, HistoryEntry, NewHistoryEntry, NewProject, NewTask, Priority, Project,
        ProjectPatch, ProjectStatus, Task, TaskPatch, TaskStatus,
    };
    pub use crate::error::{Error, Result};
    pub use crate::llm::TextGenerator;
    pub use crate::risk::{ProjectRiskLevel, TaskRiskAssessment, TaskRiskLevel};
    pub use crate::storage::Database;
}
