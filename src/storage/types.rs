//! Table Store Data Types
//!
//! The entity, filter and error model shared by every `TableStore`
//! implementation. An entity is deliberately flat: a partition key, a row key
//! and a map of string properties.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved property name addressing the partition key in filters and on the wire.
pub const PARTITION_KEY: &str = "PartitionKey";
/// Reserved property name addressing the row key in filters and on the wire.
pub const ROW_KEY: &str = "RowKey";

/// A single row of a partitioned table.
///
/// `(partition_key, row_key)` is the primary key: a store never holds two
/// entities with the same pair in one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntity {
    pub partition_key: String,
    pub row_key: String,
    pub properties: BTreeMap<String, String>,
}

impl TableEntity {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Looks up a field by name, resolving the two reserved key names.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            PARTITION_KEY => Some(self.partition_key.as_str()),
            ROW_KEY => Some(self.row_key.as_str()),
            _ => self.properties.get(name).map(String::as_str),
        }
    }

    /// Wire form: a flat JSON object with `PartitionKey`, `RowKey` and one
    /// string member per property.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        object.insert(PARTITION_KEY.to_string(), self.partition_key.clone().into());
        object.insert(ROW_KEY.to_string(), self.row_key.clone().into());
        for (name, value) in &self.properties {
            object.insert(name.clone(), value.clone().into());
        }
        serde_json::Value::Object(object)
    }

    /// Parses the wire form. Members that are not strings (service metadata
    /// such as `odata.etag` or typed columns) are ignored; the two keys are
    /// required.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let partition_key = object.get(PARTITION_KEY)?.as_str()?;
        let row_key = object.get(ROW_KEY)?.as_str()?;

        let mut entity = TableEntity::new(partition_key, row_key);
        for (name, value) in object {
            if name == PARTITION_KEY || name == ROW_KEY || name.starts_with("odata.") {
                continue;
            }
            if let Some(text) = value.as_str() {
                entity.properties.insert(name.clone(), text.to_string());
            }
        }
        Some(entity)
    }
}

/// A conjunction of equality predicates. The empty filter matches every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<(String, String)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn partition_key_eq(self, value: impl Into<String>) -> Self {
        self.field_eq(PARTITION_KEY, value)
    }

    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.predicates.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Partition the filter is pinned to, if any. Lets stores skip a full scan.
    pub fn partition(&self) -> Option<&str> {
        self.predicates
            .iter()
            .find(|(field, _)| field == PARTITION_KEY)
            .map(|(_, value)| value.as_str())
    }

    pub fn matches(&self, entity: &TableEntity) -> bool {
        self.predicates
            .iter()
            .all(|(field, value)| entity.field(field) == Some(value.as_str()))
    }

    /// Renders the OData `$filter` expression, e.g.
    /// `PartitionKey eq 'alice' and BadgeName eq 'docker-basics'`.
    ///
    /// String literals are quoted with single quotes, embedded quotes doubled.
    pub fn to_odata(&self) -> String {
        self.predicates
            .iter()
            .map(|(field, value)| format!("{} eq '{}'", field, value.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

/// Failures surfaced by a `TableStore`.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The table (on create) or the `(PartitionKey, RowKey)` pair (on insert)
    /// is already present.
    #[error("resource already exists")]
    AlreadyExists,

    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Any other non-success response from the remote service.
    #[error("table service returned {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("table service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed table service payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),
}

pub type TableResult<T> = Result<T, TableError>;
