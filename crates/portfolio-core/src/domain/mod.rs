//! Canonical domain types
//!
//! These are the strongly typed shapes every stored record is normalized
//! into before metrics, scoring or analysis touch it.

pub mod analysis;
pub mod history;
pub mod project;
pub mod task;

pub use analysis::{AiAnalysis, KeyMetrics, RecommendationEntry, RiskEntry, Severity};
pub use history::{HistoryEntry, NewHistoryEntry};
pub use project::{NewProject, Priority, Project, ProjectPatch, ProjectStatus, UNASSIGNED_LEADER};
pub use task::{NewTask, Task, TaskPatch, TaskStatus};
