//! Risk scoring and classification
//!
//! - [`task`]: multi-factor scoring of a single task
//! - [`tier`]: tiers for tasks and projects, and the health score classifier

pub mod task;
pub mod tier;

pub use task::{
    FactorKind, Impact, RiskFactor, TaskRecommendation, TaskRiskAssessment, score_task,
    score_task_now,
};
pub use tier::{ProjectRiskLevel, TaskRiskLevel, classify};
