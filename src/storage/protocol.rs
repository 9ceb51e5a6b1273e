//! Table Service Wire Protocol
//!
//! Endpoints, headers and payloads of the Azure Table Storage REST API, as
//! far as `HttpTableStore` uses them.
//!
//! Requests and responses are JSON with `odata=nometadata`, so entities come
//! back as flat objects without type annotations.

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Collection of tables; `POST` creates one.
pub const ENDPOINT_TABLES: &str = "/Tables";

// --- Headers ---

pub const API_VERSION: &str = "2019-02-02";
pub const HEADER_VERSION: &str = "x-ms-version";
pub const HEADER_DATE: &str = "x-ms-date";
pub const HEADER_DATA_SERVICE_VERSION: &str = "DataServiceVersion";
pub const HEADER_PREFER: &str = "Prefer";
pub const HEADER_CONTINUATION_PARTITION: &str = "x-ms-continuation-NextPartitionKey";
pub const HEADER_CONTINUATION_ROW: &str = "x-ms-continuation-NextRowKey";

pub const ACCEPT_JSON: &str = "application/json;odata=nometadata";
pub const PREFER_NO_CONTENT: &str = "return-no-content";

// --- Query Parameters ---

pub const QUERY_FILTER: &str = "$filter";
pub const QUERY_NEXT_PARTITION: &str = "NextPartitionKey";
pub const QUERY_NEXT_ROW: &str = "NextRowKey";

// --- Error Codes ---

/// Conflict codes meaning the resource is already there. Other 409s (such
/// as `TableBeingDeleted`) are real failures.
pub const ERROR_TABLE_ALREADY_EXISTS: &str = "TableAlreadyExists";
pub const ERROR_ENTITY_ALREADY_EXISTS: &str = "EntityAlreadyExists";

// --- Data Transfer Objects ---

/// Body of a create-table request.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTableRequest {
    #[serde(rename = "TableName")]
    pub table_name: String,
}

/// One page of a query response. Entities stay untyped until
/// `TableEntity::from_json` picks out the string columns.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub value: Vec<serde_json::Value>,
}

/// Error envelope returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "odata.error")]
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: ErrorMessage,
}

#[derive(Debug, Deserialize)]
pub struct ErrorMessage {
    pub value: String,
}

/// Resource path for one table's entity collection, e.g. `/achievements`.
pub fn entities_path(table: &str) -> String {
    format!("/{}", table)
}

/// Resource path for querying a table, e.g. `/achievements()`.
pub fn query_path(table: &str) -> String {
    format!("/{}()", table)
}
