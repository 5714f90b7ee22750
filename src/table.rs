//! # Table Façade
//!
//! The surface the evaluator calls into on the storage side. [`TableStore`] is
//! the seam; [`MemoryStore`] is the bundled in-memory implementation used by
//! tests and embedders that do not bring their own storage.
//!
//! Rows are objects keyed by a primary key field (`id` unless configured
//! otherwise). Scans return rows in ascending primary-key order under the
//! cross-kind value order.

use std::collections::BTreeMap;
use std::sync::{LazyLock, PoisonError, RwLock};

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::{config::EngineConfig, value::Value};

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("table name pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("Table `{0}` does not exist")]
    NoSuchTable(String),

    #[error("Table name `{0}` is invalid (use A-Za-z0-9_ only)")]
    InvalidName(String),

    #[error("Table `{0}` already exists")]
    AlreadyExists(String),

    #[error("Row is missing attribute `{0}` (its primary key)")]
    MissingPrimaryKey(String),

    #[error("Primary key must be a number or string, but found {0}")]
    InvalidPrimaryKey(&'static str),

    #[error("Duplicate primary key {0}")]
    DuplicateKey(String),

    #[error("Primary key `{key}` cannot be changed ({old} to {new})")]
    PrimaryKeyChanged { key: String, old: String, new: String },

    #[error("Expected type object but found {0}")]
    NotAnObject(&'static str),
}

/// Outcome of inserting a batch of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertSummary {
    pub inserted: usize,
    pub errors: usize,
    pub first_error: Option<String>,
}

impl InsertSummary {
    pub(crate) fn record_error(&mut self, message: String) {
        self.errors += 1;
        self.first_error.get_or_insert(message);
    }

    /// Response document: `{inserted, errors}` plus `first_error` when errors occurred.
    pub fn to_value(&self) -> Value {
        let mut fields = vec![
            ("inserted", Value::from(self.inserted)),
            ("errors", Value::from(self.errors)),
        ];
        if let Some(message) = &self.first_error {
            fields.push(("first_error", Value::from(message.as_str())));
        }
        Value::object(fields)
    }
}

pub fn validate_table_name(name: &str) -> Result<(), TableError> {
    if TABLE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(TableError::InvalidName(name.to_string()))
    }
}

/// Extract and check a row's primary key.
pub fn primary_key_of(row: &Value, primary_key: &str) -> Result<Value, TableError> {
    let fields = row
        .as_object()
        .ok_or(TableError::NotAnObject(row.kind_name()))?;
    let key = fields
        .get(primary_key)
        .ok_or_else(|| TableError::MissingPrimaryKey(primary_key.to_string()))?;
    match key {
        Value::Number(_) | Value::String(_) => Ok(key.clone()),
        other => Err(TableError::InvalidPrimaryKey(other.kind_name())),
    }
}

/// Storage operations the evaluator depends on.
///
/// All methods take `&self`; implementations synchronize internally so one
/// store can serve concurrent queries.
pub trait TableStore: Send + Sync {
    /// Name of the primary key field of `table`.
    fn primary_key(&self, table: &str) -> Result<String, TableError>;

    fn get(&self, table: &str, key: &Value) -> Result<Option<Value>, TableError>;

    /// Every row, in ascending primary-key order.
    fn scan(&self, table: &str) -> Result<Vec<Value>, TableError>;

    /// Insert new rows; rows whose key already exists are counted as errors.
    fn insert(&self, table: &str, rows: Vec<Value>) -> Result<InsertSummary, TableError>;

    /// Write `row` under its primary key, overwriting any existing row.
    fn replace_row(&self, table: &str, row: Value) -> Result<(), TableError>;

    /// Returns whether a row was removed.
    fn delete_row(&self, table: &str, key: &Value) -> Result<bool, TableError>;

    fn count(&self, table: &str) -> Result<usize, TableError> {
        Ok(self.scan(table)?.len())
    }

    /// Rows whose primary key lies in `[lower, upper]`.
    fn between(&self, table: &str, lower: &Value, upper: &Value) -> Result<Vec<Value>, TableError> {
        let primary_key = self.primary_key(table)?;
        let rows = self.scan(table)?;
        Ok(rows
            .into_iter()
            .filter(|row| {
                row.as_object()
                    .and_then(|fields| fields.get(&primary_key))
                    .is_some_and(|key| key >= lower && key <= upper)
            })
            .collect())
    }
}

type Rows = BTreeMap<Value, Value>;

/// In-memory [`TableStore`].
///
/// Tables spring into existence on their first insert, or explicitly through
/// [`MemoryStore::create_table`].
#[derive(Debug)]
pub struct MemoryStore {
    primary_key: String,
    tables: RwLock<BTreeMap<String, Rows>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new("id")
    }
}

impl MemoryStore {
    pub fn new(primary_key: impl Into<String>) -> Self {
        MemoryStore {
            primary_key: primary_key.into(),
            tables: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        MemoryStore::new(config.primary_key.clone())
    }

    pub fn create_table(&self, name: &str) -> Result<(), TableError> {
        validate_table_name(name)?;
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        if tables.contains_key(name) {
            return Err(TableError::AlreadyExists(name.to_string()));
        }
        tables.insert(name.to_string(), Rows::new());
        debug!(table = name, "created table");
        Ok(())
    }

    pub fn table_names(&self) -> Vec<String> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.keys().cloned().collect()
    }

    fn with_rows<T>(&self, table: &str, f: impl FnOnce(&Rows) -> T) -> Result<T, TableError> {
        validate_table_name(table)?;
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(table)
            .map(f)
            .ok_or_else(|| TableError::NoSuchTable(table.to_string()))
    }

    fn with_rows_mut<T>(
        &self,
        table: &str,
        create: bool,
        f: impl FnOnce(&mut Rows) -> T,
    ) -> Result<T, TableError> {
        validate_table_name(table)?;
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        if create && !tables.contains_key(table) {
            debug!(table, "creating table on first insert");
            tables.insert(table.to_string(), Rows::new());
        }
        tables
            .get_mut(table)
            .map(f)
            .ok_or_else(|| TableError::NoSuchTable(table.to_string()))
    }
}

impl TableStore for MemoryStore {
    fn primary_key(&self, table: &str) -> Result<String, TableError> {
        self.with_rows(table, |_| self.primary_key.clone())
    }

    fn get(&self, table: &str, key: &Value) -> Result<Option<Value>, TableError> {
        self.with_rows(table, |rows| rows.get(key).cloned())
    }

    fn scan(&self, table: &str) -> Result<Vec<Value>, TableError> {
        self.with_rows(table, |rows| rows.values().cloned().collect())
    }

    fn insert(&self, table: &str, rows: Vec<Value>) -> Result<InsertSummary, TableError> {
        let primary_key = self.primary_key.clone();
        self.with_rows_mut(table, true, |stored| {
            let mut summary = InsertSummary::default();
            for row in rows {
                match primary_key_of(&row, &primary_key) {
                    Ok(key) if stored.contains_key(&key) => {
                        summary.record_error(TableError::DuplicateKey(key.to_string()).to_string())
                    }
                    Ok(key) => {
                        stored.insert(key, row);
                        summary.inserted += 1;
                    }
                    Err(e) => summary.record_error(e.to_string()),
                }
            }
            summary
        })
    }

    fn replace_row(&self, table: &str, row: Value) -> Result<(), TableError> {
        let key = primary_key_of(&row, &self.primary_key)?;
        self.with_rows_mut(table, false, |stored| {
            stored.insert(key, row);
        })
    }

    fn delete_row(&self, table: &str, key: &Value) -> Result<bool, TableError> {
        self.with_rows_mut(table, false, |stored| stored.remove(key).is_some())
    }

    fn count(&self, table: &str) -> Result<usize, TableError> {
        self.with_rows(table, |rows| rows.len())
    }

    fn between(&self, table: &str, lower: &Value, upper: &Value) -> Result<Vec<Value>, TableError> {
        if lower > upper {
            return Ok(vec![]);
        }
        self.with_rows(table, |rows| {
            rows.range(lower.clone()..=upper.clone())
                .map(|(_, row)| row.clone())
                .collect()
        })
    }
}
