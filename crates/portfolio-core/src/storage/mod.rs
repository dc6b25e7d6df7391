//! Storage layer - SQLite document store
//!
//! # Architecture
//!
//! - `database`: Connection pool and schema setup
//! - `migrations`: Schema versioning and automatic migration
//! - `records`: JSON document collections with alias-aware filters
//!
//! # Usage
//!
//! ```ignore
//! use portfolio_core::storage::{Collection, Database, Filter, RecordStore};
//!
//! let db = Database::in_memory().await?;
//! let store = RecordStore::new(&db);
//! let projects = store.find(Collection::Projects, &Filter::new()).await?;
//! ```

pub mod database;
pub mod migrations;
pub mod records;

pub use database::{Database, default_database_path};
pub use migrations::{CURRENT_VERSION, MigrationStatus, migration_status, run_migrations};
pub use records::{Collection, Condition, Fields, Filter, Record, RecordStore};
