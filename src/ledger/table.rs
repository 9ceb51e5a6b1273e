use super::backend::LedgerBackend;
use super::types::{Badge, LedgerStats, RecordOutcome, StorageKind};
use crate::storage::{Filter, TableEntity, TableError, TableStore};

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub const FIELD_BADGE_NAME: &str = "BadgeName";
pub const FIELD_CHALLENGE_ID: &str = "ChallengeId";
pub const FIELD_EARNED_DATE: &str = "EarnedDate";

/// Namespace for deriving row keys from `(username, badge_name)`.
const ROW_KEY_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a7e_93d4_4b0e_a5c8_1e2f_7d9b_3c40);

/// Ledger stored as entities of a partitioned table.
///
/// Partition key is the username, so one user's badges are colocated. The
/// row key is a name-based UUID of `(username, badge_name)`: the table's own
/// primary-key check then rejects a second insert of the same badge, even
/// from another process.
pub struct TableLedger {
    store: Arc<dyn TableStore>,
    table: String,
}

impl TableLedger {
    /// Ensures `table` exists and returns a ledger over it. An existing table
    /// is fine; any other setup failure is returned.
    pub async fn connect(store: Arc<dyn TableStore>, table: &str) -> Result<Self> {
        match store.create_table(table).await {
            Ok(()) => tracing::info!("Created badge table {}", table),
            Err(TableError::AlreadyExists) => {
                tracing::debug!("Badge table {} already exists", table)
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to prepare badge table {}", table));
            }
        }

        Ok(Self {
            store,
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn row_key_for(username: &str, badge_name: &str) -> String {
        // Unit separator keeps ("ab", "c") and ("a", "bc") apart.
        let name = format!("{}\u{1f}{}", username, badge_name);
        Uuid::new_v5(&ROW_KEY_NAMESPACE, name.as_bytes()).to_string()
    }

    fn to_entity(badge: &Badge) -> TableEntity {
        TableEntity::new(&badge.username, &badge.id)
            .with(FIELD_BADGE_NAME, &badge.badge_name)
            .with(FIELD_CHALLENGE_ID, &badge.challenge_id)
            .with(FIELD_EARNED_DATE, &badge.earned_date)
    }

    fn from_entity(entity: TableEntity) -> Option<Badge> {
        Some(Badge {
            badge_name: entity.properties.get(FIELD_BADGE_NAME)?.clone(),
            challenge_id: entity.properties.get(FIELD_CHALLENGE_ID)?.clone(),
            earned_date: entity.properties.get(FIELD_EARNED_DATE)?.clone(),
            id: entity.row_key,
            username: entity.partition_key,
        })
    }

    async fn query(&self, filter: &Filter) -> Result<Vec<TableEntity>> {
        self.store
            .query_entities(&self.table, filter)
            .await
            .with_context(|| format!("Query on badge table {} failed", self.table))
    }
}

#[async_trait]
impl LedgerBackend for TableLedger {
    fn kind(&self) -> StorageKind {
        StorageKind::Azure
    }

    async fn record(
        &self,
        username: &str,
        badge_name: &str,
        challenge_id: &str,
    ) -> Result<RecordOutcome> {
        // Rows written with random keys (older deployments) are only found by query.
        let existing = self
            .query(
                &Filter::all()
                    .partition_key_eq(username)
                    .field_eq(FIELD_BADGE_NAME, badge_name),
            )
            .await?;
        if !existing.is_empty() {
            return Ok(RecordOutcome::AlreadyExists);
        }

        let badge = Badge::with_id(
            Self::row_key_for(username, badge_name),
            username,
            badge_name,
            challenge_id,
        );

        match self
            .store
            .insert_entity(&self.table, Self::to_entity(&badge))
            .await
        {
            Ok(()) => Ok(RecordOutcome::Created(badge)),
            Err(TableError::AlreadyExists) => {
                tracing::debug!(
                    "Concurrent insert won for {} / {}",
                    username,
                    badge_name
                );
                Ok(RecordOutcome::AlreadyExists)
            }
            Err(e) => Err(e)
                .with_context(|| format!("Insert into badge table {} failed", self.table)),
        }
    }

    async fn list_for(&self, username: &str) -> Result<Vec<Badge>> {
        let entities = self.query(&Filter::all().partition_key_eq(username)).await?;

        let mut badges = Vec::with_capacity(entities.len());
        for entity in entities {
            let row_key = entity.row_key.clone();
            match Self::from_entity(entity) {
                Some(badge) => badges.push(badge),
                None => tracing::warn!(
                    "Skipping incomplete badge entity {}/{} in {}",
                    username,
                    row_key,
                    self.table
                ),
            }
        }
        Ok(badges)
    }

    async fn stats(&self) -> Result<LedgerStats> {
        let entities = self.query(&Filter::all()).await?;
        Ok(LedgerStats::from_usernames(
            entities.iter().map(|e| e.partition_key.as_str()),
        ))
    }
}
