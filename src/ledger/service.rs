use super::backend::LedgerBackend;
use super::file::FileLedger;
use super::table::TableLedger;
use super::types::{Badge, LedgerStats, RecordOutcome, StorageKind};
use crate::config::StorageConfig;
use crate::storage::HttpTableStore;

use anyhow::{Context, Result};
use std::sync::Arc;

/// Entry point used by the HTTP layer.
///
/// Wraps the strategy chosen at startup; cloning shares the same backend.
#[derive(Clone)]
pub struct Ledger {
    backend: Arc<dyn LedgerBackend>,
}

impl Ledger {
    /// Builds the strategy described by `config`: opens (or creates) the badge
    /// file, or connects to the remote table and ensures it exists.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        match config {
            StorageConfig::File { path } => {
                let ledger = FileLedger::open(path.clone()).await?;
                tracing::info!("Using local badge file {}", ledger.path().display());
                Ok(Self::from_backend(Arc::new(ledger)))
            }
            StorageConfig::Table {
                connection_string,
                table_name,
            } => {
                let store = HttpTableStore::from_connection_string(connection_string)
                    .context("Unusable storage connection string")?;
                tracing::info!("Using badge table {} at {}", table_name, store.endpoint());
                let ledger = TableLedger::connect(Arc::new(store), table_name).await?;
                Ok(Self::from_backend(Arc::new(ledger)))
            }
        }
    }

    pub fn from_backend(backend: Arc<dyn LedgerBackend>) -> Self {
        Self { backend }
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.backend.kind()
    }

    pub async fn record(
        &self,
        username: &str,
        badge_name: &str,
        challenge_id: &str,
    ) -> Result<RecordOutcome> {
        let outcome = self
            .backend
            .record(username, badge_name, challenge_id)
            .await?;

        match &outcome {
            RecordOutcome::Created(badge) => tracing::info!(
                "Badge '{}' unlocked by {} (challenge {})",
                badge.badge_name,
                badge.username,
                badge.challenge_id
            ),
            RecordOutcome::AlreadyExists => {
                tracing::debug!("{} already holds badge '{}'", username, badge_name)
            }
        }

        Ok(outcome)
    }

    pub async fn list_for(&self, username: &str) -> Result<Vec<Badge>> {
        let badges = self.backend.list_for(username).await?;
        tracing::debug!("Listed {} badges for {}", badges.len(), username);
        Ok(badges)
    }

    pub async fn stats(&self) -> Result<LedgerStats> {
        self.backend.stats().await
    }
}
