//! Row-oriented record store consumed by the repositories.
//!
//! Records are JSON objects keyed by column name. The repositories only see
//! the [`Store`] trait; [`sqlite::SqliteStore`] is the bundled backend.

pub mod sqlite;

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

pub use sqlite::{Provision, SqliteStore};

/// One row, keyed by column name
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    MoodEntries,
    RelationshipEvents,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::MoodEntries => "mood_entries",
            Collection::RelationshipEvents => "relationship_events",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: &'static str,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(field: &'static str) -> Self {
        Self { field, ascending: true }
    }

    pub fn desc(field: &'static str) -> Self {
        Self { field, ascending: false }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The record names a field the collection's schema does not have
    #[error("Column '{field}' does not exist in {collection}")]
    Schema { collection: Collection, field: String },
    #[error("No row with id '{id}' in {collection}")]
    NotFound { collection: Collection, id: String },
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to encode value: {0}")]
    EncodeError(#[from] serde_json::Error),
    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Field named by a schema error, if this is one
    pub fn schema_field(&self) -> Option<&str> {
        match self {
            StoreError::Schema { field, .. } => Some(field),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// CRUD over named collections. Every call is one round trip and may fail.
pub trait Store {
    fn select(&self, collection: Collection, order: Option<OrderBy>) -> Result<Vec<Record>, StoreError>;

    fn select_by_id(&self, collection: Collection, id: &str) -> Result<Record, StoreError>;

    /// Insert and return the stored row, including store-assigned fields
    fn insert(&self, collection: Collection, record: Record) -> Result<Record, StoreError>;

    fn update(&self, collection: Collection, id: &str, changes: Record) -> Result<(), StoreError>;

    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;
}
