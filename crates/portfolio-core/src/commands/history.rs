//! Project change history

use tracing::debug;

use crate::domain::{HistoryEntry, NewHistoryEntry};
use crate::error::{Error, Result};
use crate::normalize::{aliases::history as fields, normalize_history};
use crate::storage::{Collection, Database, Filter, Record, RecordStore};

use super::{put, put_opt};

/// History repository
pub struct HistoryRepository<'a> {
    db: &'a Database,
}

impl<'a> HistoryRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Entries for a project, newest first
    pub async fn list(&self, project_id: i64) -> Result<Vec<HistoryEntry>> {
        let records = RecordStore::new(self.db)
            .find(Collection::History, &Filter::new().project(project_id))
            .await?;
        Ok(records.iter().map(normalize_history).collect())
    }

    /// Record a change against an existing project
    pub async fn add(&self, project_id: i64, entry: NewHistoryEntry) -> Result<HistoryEntry> {
        if entry.change_type.trim().is_empty() {
            return Err(Error::Validation("change type must not be empty".to_string()));
        }

        let store = RecordStore::new(self.db);
        if store.find_one(Collection::Projects, project_id).await?.is_none() {
            return Err(Error::ProjectNotFound(project_id.to_string()));
        }

        let mut body = Record::new();
        put(&mut body, fields::CHANGE_TYPE, &entry.change_type)?;
        put_opt(&mut body, fields::FIELD_CHANGED, entry.field_changed.as_ref())?;
        put_opt(&mut body, fields::OLD_VALUE, entry.old_value.as_ref())?;
        put_opt(&mut body, fields::NEW_VALUE, entry.new_value.as_ref())?;
        put_opt(&mut body, fields::CHANGED_BY, entry.changed_by.as_ref())?;
        put_opt(&mut body, fields::DESCRIPTION, entry.description.as_ref())?;

        let record = store
            .insert(Collection::History, Some(project_id), body)
            .await?;
        debug!(project_id, change_type = %entry.change_type, "Recorded history entry");
        Ok(normalize_history(&record))
    }
}
