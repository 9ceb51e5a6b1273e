use super::types::{Filter, TableEntity, TableResult};

use async_trait::async_trait;

/// The contract the ledger needs from a partitioned table service.
///
/// Implementations must reject a second insert of the same
/// `(PartitionKey, RowKey)` with `TableError::AlreadyExists`, atomically with
/// respect to concurrent inserts.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Creates `table`. Returns `TableError::AlreadyExists` if it is present.
    async fn create_table(&self, table: &str) -> TableResult<()>;

    async fn insert_entity(&self, table: &str, entity: TableEntity) -> TableResult<()>;

    /// Returns every entity in `table` matching `filter`, across all result pages.
    async fn query_entities(&self, table: &str, filter: &Filter) -> TableResult<Vec<TableEntity>>;
}
