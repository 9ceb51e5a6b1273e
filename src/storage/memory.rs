use super::store::TableStore;
use super::types::{Filter, TableEntity, TableError, TableResult};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

type Partition = DashMap<String, TableEntity>;
type Table = DashMap<String, Partition>;

/// In-process table store: table -> partition -> row.
///
/// Inserts go through the row map's entry API, so two racing inserts of the
/// same `(PartitionKey, RowKey)` resolve to exactly one winner.
#[derive(Default)]
pub struct MemoryTableStore {
    tables: DashMap<String, Arc<Table>>,
}

impl MemoryTableStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn table(&self, name: &str) -> TableResult<Arc<Table>> {
        self.tables
            .get(name)
            .map(|table| table.value().clone())
            .ok_or_else(|| TableError::TableNotFound(name.to_string()))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn entity_count(&self, name: &str) -> usize {
        self.tables
            .get(name)
            .map(|table| table.iter().map(|partition| partition.value().len()).sum())
            .unwrap_or(0)
    }

    pub fn partition_count(&self, name: &str) -> usize {
        self.tables
            .get(name)
            .map(|table| table.iter().filter(|p| !p.value().is_empty()).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn create_table(&self, table: &str) -> TableResult<()> {
        match self.tables.entry(table.to_string()) {
            Entry::Occupied(_) => Err(TableError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(DashMap::new()));
                tracing::debug!("Created in-memory table {}", table);
                Ok(())
            }
        }
    }

    async fn insert_entity(&self, table: &str, entity: TableEntity) -> TableResult<()> {
        let rows = self.table(table)?;
        let partition = rows
            .entry(entity.partition_key.clone())
            .or_insert_with(DashMap::new);

        match partition.entry(entity.row_key.clone()) {
            Entry::Occupied(_) => Err(TableError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(entity);
                Ok(())
            }
        }
    }

    async fn query_entities(&self, table: &str, filter: &Filter) -> TableResult<Vec<TableEntity>> {
        let rows = self.table(table)?;
        let mut matches = Vec::new();

        match filter.partition() {
            Some(partition_key) => {
                if let Some(partition) = rows.get(partition_key) {
                    for entry in partition.iter() {
                        if filter.matches(entry.value()) {
                            matches.push(entry.value().clone());
                        }
                    }
                }
            }
            None => {
                for partition in rows.iter() {
                    for entry in partition.value().iter() {
                        if filter.matches(entry.value()) {
                            matches.push(entry.value().clone());
                        }
                    }
                }
            }
        }

        Ok(matches)
    }
}
