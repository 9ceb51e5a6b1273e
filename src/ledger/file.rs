use super::backend::LedgerBackend;
use super::types::{Badge, LedgerStats, RecordOutcome, StorageKind};

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Ledger kept as one JSON array in a single file.
///
/// Every operation reads the whole file. `record` holds `write_lock` across
/// load, duplicate check and rewrite, which makes check-then-write atomic for
/// every caller sharing this instance. Rewrites go through a temporary file
/// and a rename so readers never see a partial array.
pub struct FileLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLedger {
    /// Opens the ledger at `path`, creating an empty one if the file is missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let exists = tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("Failed to check badge file {}", path.display()))?;

        if !exists {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
            }
            write_atomic(&path, &[]).await?;
            tracing::info!("Initialized empty badge file at {}", path.display());
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Badge>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read badge file {}", self.path.display()))?;

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&text)
            .with_context(|| format!("Malformed badge file {}", self.path.display()))
    }
}

#[async_trait]
impl LedgerBackend for FileLedger {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    async fn record(
        &self,
        username: &str,
        badge_name: &str,
        challenge_id: &str,
    ) -> Result<RecordOutcome> {
        let _guard = self.write_lock.lock().await;

        let mut badges = self.load().await?;
        if badges.iter().any(|b| b.is_same_badge(username, badge_name)) {
            return Ok(RecordOutcome::AlreadyExists);
        }

        let badge = Badge::new(username, badge_name, challenge_id);
        badges.push(badge.clone());
        write_atomic(&self.path, &badges).await?;

        Ok(RecordOutcome::Created(badge))
    }

    async fn list_for(&self, username: &str) -> Result<Vec<Badge>> {
        let badges = self.load().await?;
        Ok(badges
            .into_iter()
            .filter(|b| b.username == username)
            .collect())
    }

    async fn stats(&self) -> Result<LedgerStats> {
        let badges = self.load().await?;
        Ok(LedgerStats::from_usernames(
            badges.iter().map(|b| b.username.as_str()),
        ))
    }
}

async fn write_atomic(path: &Path, badges: &[Badge]) -> Result<()> {
    let json = serde_json::to_string_pretty(badges)?;
    let staging = staging_path(path);

    tokio::fs::write(&staging, json)
        .await
        .with_context(|| format!("Failed to write {}", staging.display()))?;
    tokio::fs::rename(&staging, path)
        .await
        .with_context(|| format!("Failed to replace badge file {}", path.display()))?;

    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "badges.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
