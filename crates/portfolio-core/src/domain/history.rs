//! Project change history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded change to a project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub project_id: i64,
    pub change_type: String,
    pub field_changed: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: Option<String>,
    pub description: Option<String>,
    pub change_date: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    /// Human-readable one-line summary
    pub fn summary(&self) -> String {
        if let Some(description) = self.description.as_deref().filter(|d| !d.trim().is_empty()) {
            return description.to_string();
        }

        match &self.field_changed {
            Some(field) => format!(
                "{} {}: {} -> {}",
                self.change_type,
                field,
                self.old_value.as_deref().unwrap_or("-"),
                self.new_value.as_deref().unwrap_or("-")
            ),
            None => self.change_type.clone(),
        }
    }
}

/// Fields accepted when recording a history entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHistoryEntry {
    pub change_type: String,
    pub field_changed: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: Option<String>,
    pub description: Option<String>,
}

impl NewHistoryEntry {
    /// A field change entry
    pub fn field_update(
        field: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            change_type: "update".to_string(),
            field_changed: Some(field.into()),
            old_value,
            new_value,
            ..Default::default()
        }
    }
}
