//! HTTP API Data Types
//!
//! Request and response bodies of the badge endpoints. Field names are the
//! JSON names clients send and receive.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/badges`.
///
/// Fields are optional at the type level so a missing field is reported as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateBadgeRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub badge_name: Option<String>,
    #[serde(default)]
    pub challenge_id: Option<String>,
}

impl CreateBadgeRequest {
    /// Returns `(username, badge_name, challenge_id)` as sent, or `None` if
    /// any of them is absent or only whitespace.
    pub fn required_fields(&self) -> Option<(&str, &str, &str)> {
        fn present(field: &Option<String>) -> Option<&str> {
            field.as_deref().filter(|v| !v.trim().is_empty())
        }
        Some((
            present(&self.username)?,
            present(&self.badge_name)?,
            present(&self.challenge_id)?,
        ))
    }
}

/// Plain `{"message": ...}` body used for outcomes and errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub storage: String,
    pub total_badges: usize,
    pub total_users: usize,
}
