//! Document record store
//!
//! Records are JSON objects kept in a `body` column. Every read injects the
//! row metadata (`id`, `project_id`, `created_at`, `updated_at`) into the
//! returned map so the normalizer sees a single flat document.
//!
//! Filters address fields through alias lists: a condition on
//! `["end_date", "endDate"]` compares against the first non-null of those
//! paths, the same precedence the normalizer applies.

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite};

use super::Database;
use crate::error::{Error, Result};

/// A raw stored record
pub type Record = Map<String, Value>;

/// Keys owned by the store, never written into a body
const META_KEYS: [&str; 4] = ["id", "project_id", "created_at", "updated_at"];

/// Record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Projects,
    Tasks,
    History,
}

impl Collection {
    fn table(&self) -> &'static str {
        match self {
            Collection::Projects => "projects",
            Collection::Tasks => "tasks",
            Collection::History => "project_history",
        }
    }

    /// Whether rows carry an owning `project_id`
    fn owned(&self) -> bool {
        !matches!(self, Collection::Projects)
    }

    fn select_columns(&self) -> &'static str {
        if self.owned() {
            "id, project_id, body, created_at, updated_at"
        } else {
            "id, NULL AS project_id, body, created_at, updated_at"
        }
    }
}

/// Field aliases in priority order
pub type Fields = &'static [&'static str];

/// One filter condition
#[derive(Debug, Clone)]
pub enum Condition {
    /// Equal to a value
    Eq(Fields, Value),
    /// Equal to any of the values
    In(Fields, Vec<Value>),
    /// Trimmed text equal to any of the values, ignoring ASCII case
    InIgnoreCase(Fields, Vec<String>),
    /// Case-insensitive substring match
    Contains(Fields, String),
    /// Date on or after
    OnOrAfter(Fields, NaiveDate),
    /// Date on or before
    OnOrBefore(Fields, NaiveDate),
}

/// Conjunction of conditions
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, fields: Fields, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(fields, value.into()));
        self
    }

    pub fn one_of<V: Into<Value>>(mut self, fields: Fields, values: impl IntoIterator<Item = V>) -> Self {
        self.conditions.push(Condition::In(
            fields,
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn one_of_ignore_case(
        mut self,
        fields: Fields,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.conditions.push(Condition::InIgnoreCase(
            fields,
            values
                .into_iter()
                .map(|v| v.into().trim().to_ascii_lowercase())
                .collect(),
        ));
        self
    }

    pub fn contains(mut self, fields: Fields, needle: impl Into<String>) -> Self {
        self.conditions.push(Condition::Contains(fields, needle.into()));
        self
    }

    pub fn on_or_after(mut self, fields: Fields, date: NaiveDate) -> Self {
        self.conditions.push(Condition::OnOrAfter(fields, date));
        self
    }

    pub fn on_or_before(mut self, fields: Fields, date: NaiveDate) -> Self {
        self.conditions.push(Condition::OnOrBefore(fields, date));
        self
    }

    /// Restrict to one owning project
    pub fn project(self, project_id: i64) -> Self {
        self.eq(&["project_id"], project_id)
    }

    /// Restrict to any of several owning projects
    pub fn projects(self, project_ids: impl IntoIterator<Item = i64>) -> Self {
        self.one_of(&["project_id"], project_ids)
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (i, condition) in self.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            match condition {
                Condition::Eq(fields, value) => {
                    push_field(qb, fields);
                    qb.push(" = ");
                    push_value(qb, value);
                }
                Condition::In(_, values) if values.is_empty() => {
                    qb.push("0");
                }
                Condition::InIgnoreCase(_, values) if values.is_empty() => {
                    qb.push("0");
                }
                Condition::In(fields, values) => {
                    push_field(qb, fields);
                    qb.push(" IN (");
                    for (j, value) in values.iter().enumerate() {
                        if j > 0 {
                            qb.push(", ");
                        }
                        push_value(qb, value);
                    }
                    qb.push(")");
                }
                Condition::InIgnoreCase(fields, values) => {
                    qb.push("LOWER(TRIM(");
                    push_field(qb, fields);
                    qb.push(")) IN (");
                    for (j, value) in values.iter().enumerate() {
                        if j > 0 {
                            qb.push(", ");
                        }
                        qb.push_bind(value.clone());
                    }
                    qb.push(")");
                }
                Condition::Contains(fields, needle) => {
                    qb.push("LOWER(");
                    push_field(qb, fields);
                    qb.push(") LIKE ");
                    qb.push_bind(like_pattern(needle));
                    qb.push(" ESCAPE '\\'");
                }
                Condition::OnOrAfter(fields, date) => {
                    qb.push("date(");
                    push_field(qb, fields);
                    qb.push(") >= ");
                    qb.push_bind(date.format("%Y-%m-%d").to_string());
                }
                Condition::OnOrBefore(fields, date) => {
                    qb.push("date(");
                    push_field(qb, fields);
                    qb.push(") <= ");
                    qb.push_bind(date.format("%Y-%m-%d").to_string());
                }
            }
        }
    }
}

/// Compile an alias list to the first non-empty JSON value
fn push_field(qb: &mut QueryBuilder<'_, Sqlite>, fields: Fields) {
    match fields {
        ["id"] => {
            qb.push("id");
        }
        ["project_id"] => {
            qb.push("project_id");
        }
        [field] => push_extract(qb, field),
        _ => {
            // SQLite rejects COALESCE with fewer than two arguments
            qb.push("COALESCE(");
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_extract(qb, field);
            }
            qb.push(")");
        }
    }
}

fn push_extract(qb: &mut QueryBuilder<'_, Sqlite>, field: &str) {
    qb.push("NULLIF(json_extract(body, ");
    qb.push_bind(format!("$.{field}"));
    qb.push("), '')");
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::Bool(b) => {
            qb.push_bind(*b);
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                qb.push_bind(i);
            }
            None => {
                qb.push_bind(n.as_f64().unwrap_or_default());
            }
        },
        Value::String(s) => {
            qb.push_bind(s.clone());
        }
        Value::Null => {
            qb.push("NULL");
        }
        other => {
            qb.push_bind(other.to_string());
        }
    }
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Remove store-owned keys from a body
fn strip_meta(mut body: Record) -> Record {
    for key in META_KEYS {
        body.remove(key);
    }
    body
}

type Row = (i64, Option<i64>, String, String, String);

fn into_record(row: Row) -> Result<Record> {
    let (id, project_id, body, created_at, updated_at) = row;
    let mut record: Record = serde_json::from_str(&body)?;
    record.insert("id".to_string(), Value::from(id));
    if let Some(project_id) = project_id {
        record.insert("project_id".to_string(), Value::from(project_id));
    }
    record.insert("created_at".to_string(), Value::String(created_at));
    record.insert("updated_at".to_string(), Value::String(updated_at));
    Ok(record)
}

/// Record store over a [`Database`]
pub struct RecordStore<'a> {
    db: &'a Database,
}

impl<'a> RecordStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Records matching a filter, newest first
    pub async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM {}",
            collection.select_columns(),
            collection.table()
        ));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows: Vec<Row> = qb
            .build_query_as()
            .fetch_all(self.db.pool())
            .await
            .map_err(Error::storage(format!("find {}", collection.table())))?;

        rows.into_iter().map(into_record).collect()
    }

    /// First record matching a filter, newest first
    pub async fn find_first(&self, collection: Collection, filter: &Filter) -> Result<Option<Record>> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    /// A record by id
    pub async fn find_one(&self, collection: Collection, id: i64) -> Result<Option<Record>> {
        self.find_first(collection, &Filter::new().eq(&["id"], id)).await
    }

    /// Number of records matching a filter
    pub async fn count(&self, collection: Collection, filter: &Filter) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", collection.table()));
        filter.push_where(&mut qb);

        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(self.db.pool())
            .await
            .map_err(Error::storage(format!("count {}", collection.table())))?;
        Ok(count)
    }

    /// Insert a record and return it as stored
    pub async fn insert(
        &self,
        collection: Collection,
        project_id: Option<i64>,
        body: Record,
    ) -> Result<Record> {
        let body = serde_json::to_string(&strip_meta(body))?;
        let now = timestamp_now();
        let operation = format!("insert into {}", collection.table());

        let id = if collection.owned() {
            let project_id = project_id.ok_or_else(|| {
                Error::Validation(format!("{} records need a project", collection.table()))
            })?;
            sqlx::query(&format!(
                "INSERT INTO {} (project_id, body, created_at, updated_at) VALUES (?, ?, ?, ?)",
                collection.table()
            ))
            .bind(project_id)
            .bind(&body)
            .bind(&now)
            .bind(&now)
            .execute(self.db.pool())
            .await
            .map_err(Error::storage(operation))?
            .last_insert_rowid()
        } else {
            sqlx::query(&format!(
                "INSERT INTO {} (body, created_at, updated_at) VALUES (?, ?, ?)",
                collection.table()
            ))
            .bind(&body)
            .bind(&now)
            .bind(&now)
            .execute(self.db.pool())
            .await
            .map_err(Error::storage(operation))?
            .last_insert_rowid()
        };

        self.find_one(collection, id)
            .await?
            .ok_or_else(|| Error::Other(format!("{} record {id} vanished after insert", collection.table())))
    }

    /// Merge a patch into a record; `None` when the record does not exist
    pub async fn update(&self, collection: Collection, id: i64, patch: Record) -> Result<Option<Record>> {
        let operation = format!("update {}", collection.table());
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(Error::storage(operation.clone()))?;

        let row: Option<(String,)> =
            sqlx::query_as(&format!("SELECT body FROM {} WHERE id = ?", collection.table()))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::storage(operation.clone()))?;

        let Some((body,)) = row else {
            return Ok(None);
        };

        let mut current: Record = serde_json::from_str(&body)?;
        current.extend(strip_meta(patch));

        sqlx::query(&format!(
            "UPDATE {} SET body = ?, updated_at = ? WHERE id = ?",
            collection.table()
        ))
        .bind(serde_json::to_string(&current)?)
        .bind(timestamp_now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::storage(operation.clone()))?;

        tx.commit().await.map_err(Error::storage(operation))?;

        self.find_one(collection, id).await
    }

    /// Delete a record; `false` when it did not exist
    pub async fn delete(&self, collection: Collection, id: i64) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", collection.table()))
            .bind(id)
            .execute(self.db.pool())
            .await
            .map_err(Error::storage(format!("delete from {}", collection.table())))?;
        Ok(result.rows_affected() > 0)
    }

    /// Allocate the next value of a named sequence
    ///
    /// The first call for a scope returns `seed`; later calls return
    /// `max(previous + 1, seed)`. The allocation is a single atomic
    /// statement, so concurrent callers never receive the same value.
    pub async fn next_sequence(&self, scope: &str, seed: i64) -> Result<i64> {
        let (value,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO sequences (scope, value) VALUES (?, ?)
            ON CONFLICT(scope) DO UPDATE SET value = MAX(value + 1, excluded.value)
            RETURNING value
            "#,
        )
        .bind(scope)
        .bind(seed)
        .fetch_one(self.db.pool())
        .await
        .map_err(Error::storage("allocate sequence"))?;
        Ok(value)
    }
}
