use super::types::{Badge, LedgerStats, RecordOutcome, StorageKind};

use anyhow::Result;
use async_trait::async_trait;

/// A storage strategy for the badge ledger.
///
/// Implementations own the persisted representation and must keep
/// `(username, badge_name)` unique even when `record` is called concurrently.
/// No state is cached between calls.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    fn kind(&self) -> StorageKind;

    /// Persists a new badge unless the user already holds `badge_name`.
    async fn record(
        &self,
        username: &str,
        badge_name: &str,
        challenge_id: &str,
    ) -> Result<RecordOutcome>;

    /// All badges of `username`, in no particular order.
    async fn list_for(&self, username: &str) -> Result<Vec<Badge>>;

    /// Totals computed from a single read of the store.
    async fn stats(&self) -> Result<LedgerStats>;
}
