use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

use super::{Collection, OrderBy, Record, Store, StoreError};
use crate::utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Text,
    Integer,
    Bool,
    Json,
}

/// Value filled in by the store when an insert leaves the column out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Generated {
    Uuid,
    Now,
    Owner,
}

#[derive(Debug)]
struct ColumnSpec {
    name: &'static str,
    kind: ColumnKind,
    ddl: &'static str,
    optional: bool,
    generated: Option<Generated>,
}

const fn column(name: &'static str, kind: ColumnKind, ddl: &'static str) -> ColumnSpec {
    ColumnSpec { name, kind, ddl, optional: false, generated: None }
}

const fn optional(name: &'static str, kind: ColumnKind, ddl: &'static str) -> ColumnSpec {
    ColumnSpec { name, kind, ddl, optional: true, generated: None }
}

const fn generated(name: &'static str, ddl: &'static str, generated: Generated) -> ColumnSpec {
    ColumnSpec { name, kind: ColumnKind::Text, ddl, optional: false, generated: Some(generated) }
}

const MOOD_ENTRY_COLUMNS: &[ColumnSpec] = &[
    generated("id", "TEXT PRIMARY KEY", Generated::Uuid),
    generated("created_at", "TEXT NOT NULL", Generated::Now),
    column("mood", ColumnKind::Text, "TEXT NOT NULL"),
    column("event", ColumnKind::Text, "TEXT NOT NULL"),
    generated("user_id", "TEXT", Generated::Owner),
    optional("description", ColumnKind::Text, "TEXT"),
    optional("punishments", ColumnKind::Json, "TEXT"),
    optional("completed", ColumnKind::Bool, "INTEGER DEFAULT 0"),
];

const RELATIONSHIP_EVENT_COLUMNS: &[ColumnSpec] = &[
    generated("id", "TEXT PRIMARY KEY", Generated::Uuid),
    column("title", ColumnKind::Text, "TEXT NOT NULL"),
    column("tasks", ColumnKind::Json, "TEXT NOT NULL DEFAULT '[]'"),
    column("completionPercentage", ColumnKind::Integer, "INTEGER NOT NULL DEFAULT 0"),
    generated("createdAt", "TEXT NOT NULL", Generated::Now),
    column("columnId", ColumnKind::Text, "TEXT NOT NULL"),
    generated("user_id", "TEXT", Generated::Owner),
    optional("description", ColumnKind::Text, "TEXT"),
];

fn column_specs(collection: Collection) -> &'static [ColumnSpec] {
    match collection {
        Collection::MoodEntries => MOOD_ENTRY_COLUMNS,
        Collection::RelationshipEvents => RELATIONSHIP_EVENT_COLUMNS,
    }
}

const COLLECTIONS: [Collection; 2] = [Collection::MoodEntries, Collection::RelationshipEvents];

/// Which optional columns the migration step adds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provision {
    /// Every optional column
    Full,
    /// Mandatory columns only, as an old database would have
    Legacy,
    /// Only the named optional columns (matched in every collection)
    Only(Vec<String>),
}

impl Provision {
    fn includes(&self, column: &str) -> bool {
        match self {
            Provision::Full => true,
            Provision::Legacy => false,
            Provision::Only(names) => names.iter().any(|n| n == column),
        }
    }
}

pub struct SqliteStore {
    conn: Connection,
    owner: String,
    present: HashMap<Collection, Vec<&'static ColumnSpec>>,
}

impl SqliteStore {
    /// Open (or create) the database file and bring the schema up to `provision`
    pub fn open(path: &str, owner: &str, provision: &Provision) -> Result<Self, StoreError> {
        let db_path = PathBuf::from(path);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Backend(format!("Failed to create database directory: {}", e)))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        Self::with_connection(conn, owner, provision)
    }

    /// Fresh in-memory database, mostly for tests
    pub fn open_in_memory(owner: &str, provision: &Provision) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, owner, provision)
    }

    fn with_connection(conn: Connection, owner: &str, provision: &Provision) -> Result<Self, StoreError> {
        let mut store = SqliteStore {
            conn,
            owner: owner.to_string(),
            present: HashMap::new(),
        };
        store.initialize_schema()?;
        store.migrate_optional_columns(provision)?;
        store.load_present_columns()?;
        Ok(store)
    }

    /// Create tables with their mandatory columns, plus indexes
    fn initialize_schema(&self) -> Result<(), StoreError> {
        for collection in COLLECTIONS {
            let columns = column_specs(collection)
                .iter()
                .filter(|c| !c.optional)
                .map(|c| format!("{} {}", quote(c.name), c.ddl))
                .collect::<Vec<_>>()
                .join(",\n                ");
            self.conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (\n                {}\n            )",
                    collection.table(),
                    columns
                ),
                [],
            )?;
        }

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_mood_entries_created_at ON mood_entries(created_at)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_relationship_events_column ON relationship_events(\"columnId\")",
            [],
        )?;

        Ok(())
    }

    /// Add optional columns that the provision asks for and the table lacks
    fn migrate_optional_columns(&self, provision: &Provision) -> Result<(), StoreError> {
        for collection in COLLECTIONS {
            for spec in column_specs(collection).iter().filter(|c| c.optional) {
                if provision.includes(spec.name) && !column_exists(&self.conn, collection.table(), spec.name)? {
                    info!(table = collection.table(), column = spec.name, "adding optional column");
                    self.conn.execute(
                        &format!(
                            "ALTER TABLE {} ADD COLUMN {} {}",
                            collection.table(),
                            quote(spec.name),
                            spec.ddl
                        ),
                        [],
                    )?;
                }
            }
        }
        Ok(())
    }

    fn load_present_columns(&mut self) -> Result<(), StoreError> {
        for collection in COLLECTIONS {
            let mut present = Vec::new();
            for spec in column_specs(collection) {
                if column_exists(&self.conn, collection.table(), spec.name)? {
                    present.push(spec);
                }
            }
            self.present.insert(collection, present);
        }
        Ok(())
    }

    /// Names of the columns the collection's table actually has
    pub fn columns(&self, collection: Collection) -> Vec<&'static str> {
        self.specs(collection).iter().map(|c| c.name).collect()
    }

    fn specs(&self, collection: Collection) -> &[&'static ColumnSpec] {
        self.present.get(&collection).map(Vec::as_slice).unwrap_or(&[])
    }

    fn spec(&self, collection: Collection, field: &str) -> Result<&'static ColumnSpec, StoreError> {
        self.specs(collection)
            .iter()
            .copied()
            .find(|c| c.name == field)
            .ok_or_else(|| StoreError::Schema {
                collection,
                field: field.to_string(),
            })
    }

    fn select_sql(&self, collection: Collection) -> String {
        let columns = self
            .specs(collection)
            .iter()
            .map(|c| quote(c.name))
            .collect::<Vec<_>>()
            .join(", ");
        format!("SELECT {} FROM {}", columns, collection.table())
    }

    fn row_to_record(&self, collection: Collection, values: Vec<SqlValue>) -> Result<Record, StoreError> {
        let mut record = Record::new();
        for (spec, value) in self.specs(collection).iter().zip(values) {
            if let Some(value) = from_sql(spec.kind, value)? {
                record.insert(spec.name.to_string(), value);
            }
        }
        Ok(record)
    }

    fn generate(&self, generated: Generated) -> Value {
        match generated {
            Generated::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
            Generated::Now => Value::String(utils::now_timestamp()),
            Generated::Owner => Value::String(self.owner.clone()),
        }
    }
}

impl Store for SqliteStore {
    fn select(&self, collection: Collection, order: Option<OrderBy>) -> Result<Vec<Record>, StoreError> {
        let mut sql = self.select_sql(collection);
        if let Some(order) = order {
            let spec = self.spec(collection, order.field)?;
            sql.push_str(&format!(
                " ORDER BY {} {}",
                quote(spec.name),
                if order.ascending { "ASC" } else { "DESC" }
            ));
        }

        let width = self.specs(collection).len();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| (0..width).map(|i| row.get::<_, SqlValue>(i)).collect::<Result<Vec<_>, _>>())?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(table = collection.table(), rows = rows.len(), "select");
        rows.into_iter()
            .map(|values| self.row_to_record(collection, values))
            .collect()
    }

    fn select_by_id(&self, collection: Collection, id: &str) -> Result<Record, StoreError> {
        let sql = format!("{} WHERE \"id\" = ?1", self.select_sql(collection));
        let width = self.specs(collection).len();
        let mut stmt = self.conn.prepare(&sql)?;

        let values = stmt.query_row(rusqlite::params![id], |row| {
            (0..width).map(|i| row.get::<_, SqlValue>(i)).collect::<Result<Vec<_>, _>>()
        });

        match values {
            Ok(values) => self.row_to_record(collection, values),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            }),
            Err(e) => Err(StoreError::from(e)),
        }
    }

    fn insert(&self, collection: Collection, mut record: Record) -> Result<Record, StoreError> {
        // Reject unknown fields before touching the table
        for field in record.keys() {
            self.spec(collection, field)?;
        }

        for spec in self.specs(collection) {
            if let Some(generated) = spec.generated {
                if !record.contains_key(spec.name) {
                    record.insert(spec.name.to_string(), self.generate(generated));
                }
            }
        }

        let id = record
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Backend("Record id must be a string".to_string()))?;

        let mut names = Vec::with_capacity(record.len());
        let mut values = Vec::with_capacity(record.len());
        for (field, value) in &record {
            let spec = self.spec(collection, field)?;
            names.push(quote(spec.name));
            values.push(to_sql(spec, value)?);
        }
        let placeholders = (1..=values.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({})",
                collection.table(),
                names.join(", "),
                placeholders
            ),
            rusqlite::params_from_iter(values.iter()),
        )?;
        tx.commit()?;

        debug!(table = collection.table(), %id, "insert");
        self.select_by_id(collection, &id)
    }

    fn update(&self, collection: Collection, id: &str, changes: Record) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut assignments = Vec::with_capacity(changes.len());
        let mut values = Vec::with_capacity(changes.len() + 1);
        for (i, (field, value)) in changes.iter().enumerate() {
            let spec = self.spec(collection, field)?;
            assignments.push(format!("{} = ?{}", quote(spec.name), i + 1));
            values.push(to_sql(spec, value)?);
        }
        values.push(SqlValue::Text(id.to_string()));

        let tx = self.conn.unchecked_transaction()?;
        let affected = tx.execute(
            &format!(
                "UPDATE {} SET {} WHERE \"id\" = ?{}",
                collection.table(),
                assignments.join(", "),
                values.len()
            ),
            rusqlite::params_from_iter(values.iter()),
        )?;
        tx.commit()?;

        if affected == 0 {
            return Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            });
        }
        debug!(table = collection.table(), %id, fields = changes.len(), "update");
        Ok(())
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            &format!("DELETE FROM {} WHERE \"id\" = ?1", collection.table()),
            rusqlite::params![id],
        )?;
        tx.commit()?;
        debug!(table = collection.table(), %id, "delete");
        Ok(())
    }
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, StoreError> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2")?;
    let count: i64 = stmt.query_row(rusqlite::params![table, column], |row| row.get(0))?;
    Ok(count > 0)
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name)
}

fn to_sql(spec: &ColumnSpec, value: &Value) -> Result<SqlValue, StoreError> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }
    let mismatch = || StoreError::Backend(format!("Column '{}' cannot hold {}", spec.name, value));
    Ok(match spec.kind {
        ColumnKind::Text => SqlValue::Text(value.as_str().ok_or_else(mismatch)?.to_string()),
        ColumnKind::Integer => match value {
            Value::Number(n) => SqlValue::Integer(
                n.as_i64()
                    .or_else(|| n.as_f64().map(|f| f.round() as i64))
                    .ok_or_else(mismatch)?,
            ),
            _ => return Err(mismatch()),
        },
        ColumnKind::Bool => SqlValue::Integer(i64::from(value.as_bool().ok_or_else(mismatch)?)),
        ColumnKind::Json => SqlValue::Text(serde_json::to_string(value)?),
    })
}

fn from_sql(kind: ColumnKind, value: SqlValue) -> Result<Option<Value>, StoreError> {
    Ok(match (kind, value) {
        (_, SqlValue::Null) => None,
        (ColumnKind::Json, SqlValue::Text(text)) => Some(serde_json::from_str(&text)?),
        (ColumnKind::Bool, SqlValue::Integer(i)) => Some(Value::Bool(i != 0)),
        (_, SqlValue::Integer(i)) => Some(Value::from(i)),
        (_, SqlValue::Real(f)) => Some(Value::from(f)),
        (_, SqlValue::Text(text)) => Some(Value::String(text)),
        (_, SqlValue::Blob(_)) => {
            return Err(StoreError::Backend("Unexpected blob value".to_string()));
        }
    })
}
