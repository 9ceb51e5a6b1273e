use serde::{Deserialize, Serialize};

/// A badge earned by one user for completing a challenge.
///
/// This is also the on-disk shape of the file store and the JSON returned by
/// the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// Generated at creation; never reused.
    pub id: String,
    pub username: String,
    pub badge_name: String,
    pub challenge_id: String,
    /// RFC 3339 UTC timestamp, so lexical order is chronological.
    pub earned_date: String,
}

impl Badge {
    /// Builds a fresh record with a random id stamped with the current time.
    pub fn new(username: &str, badge_name: &str, challenge_id: &str) -> Self {
        Self::with_id(
            uuid::Uuid::new_v4().to_string(),
            username,
            badge_name,
            challenge_id,
        )
    }

    pub fn with_id(id: String, username: &str, badge_name: &str, challenge_id: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            badge_name: badge_name.to_string(),
            challenge_id: challenge_id.to_string(),
            earned_date: now_rfc3339(),
        }
    }

    /// Whether this record occupies the `(username, badge_name)` slot.
    pub fn is_same_badge(&self, username: &str, badge_name: &str) -> bool {
        self.username == username && self.badge_name == badge_name
    }
}

/// Result of `record`. Both variants are successful outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new record was persisted.
    Created(Badge),
    /// The user already holds this badge; nothing was written.
    AlreadyExists,
}

impl RecordOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, RecordOutcome::Created(_))
    }
}

/// Aggregate counts computed from one snapshot of the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_badges: usize,
    pub total_users: usize,
}

impl LedgerStats {
    /// Counts records and distinct users from a single pass over one snapshot.
    pub fn from_usernames<'a>(usernames: impl IntoIterator<Item = &'a str>) -> Self {
        let mut users = std::collections::HashSet::new();
        let mut total_badges = 0;
        for username in usernames {
            total_badges += 1;
            users.insert(username);
        }
        Self {
            total_badges,
            total_users: users.len(),
        }
    }
}

/// Which strategy backs the ledger. Reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Azure,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Local => "local",
            StorageKind::Azure => "azure",
        }
    }
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
