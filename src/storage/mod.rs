//! Partitioned Table Storage Module
//!
//! A small abstraction over key-partitioned table services, in the shape the
//! badge ledger needs: create a table, insert an entity, query entities by a
//! conjunction of equality filters.
//!
//! ## Core Concepts
//! - **Entity**: a flat row addressed by `(PartitionKey, RowKey)` with string properties.
//! - **Filter**: equality predicates joined with `and`, rendered to OData for remote services.
//! - **Uniqueness**: every store rejects a duplicate `(PartitionKey, RowKey)` insert
//!   with `TableError::AlreadyExists`.
//!
//! ## Implementations
//! - `MemoryTableStore`: in-process, partition-sharded maps. Backs the test suites; no startup
//!   configuration selects it.
//! - `HttpTableStore`: Azure Table Storage REST client (shared key or SAS authentication).

pub mod connection;
pub mod http;
pub mod memory;
pub mod protocol;
pub mod store;
pub mod types;

pub use http::HttpTableStore;
pub use memory::MemoryTableStore;
pub use store::TableStore;
pub use types::{Filter, TableEntity, TableError, TableResult};

#[cfg(test)]
mod tests;
