use super::types::{CreateBadgeRequest, MessageResponse, StatusResponse};
use crate::ledger::{Badge, Ledger, RecordOutcome};

use axum::extract::rejection::JsonRejection;
use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
};

pub const MSG_CREATED: &str = "Badge created successfully";
pub const MSG_ALREADY_EXISTS: &str = "Badge already exists";
pub const MSG_MISSING_FIELDS: &str = "Missing required fields";

type ApiError = (StatusCode, Json<MessageResponse>);

fn storage_error(err: anyhow::Error) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(MessageResponse::new(format!("Storage error: {:#}", err))),
    )
}

pub async fn handle_create_badge(
    Extension(ledger): Extension<Ledger>,
    payload: Result<Json<CreateBadgeRequest>, JsonRejection>,
) -> (StatusCode, Json<MessageResponse>) {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => {
            tracing::debug!("Rejected badge request body: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(MessageResponse::new(MSG_MISSING_FIELDS)),
            );
        }
    };

    let Some((username, badge_name, challenge_id)) = req.required_fields() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(MessageResponse::new(MSG_MISSING_FIELDS)),
        );
    };

    match ledger.record(username, badge_name, challenge_id).await {
        Ok(RecordOutcome::Created(_)) => (
            StatusCode::CREATED,
            Json(MessageResponse::new(MSG_CREATED)),
        ),
        Ok(RecordOutcome::AlreadyExists) => (
            StatusCode::OK,
            Json(MessageResponse::new(MSG_ALREADY_EXISTS)),
        ),
        Err(e) => {
            tracing::error!("Failed to record badge '{}' for {}: {:#}", badge_name, username, e);
            storage_error(e)
        }
    }
}

pub async fn handle_get_badges(
    Extension(ledger): Extension<Ledger>,
    Path(username): Path<String>,
) -> Result<Json<Vec<Badge>>, ApiError> {
    ledger.list_for(&username).await.map(Json).map_err(|e| {
        tracing::error!("Failed to list badges for {}: {:#}", username, e);
        storage_error(e)
    })
}

pub async fn handle_status(
    Extension(ledger): Extension<Ledger>,
) -> Result<Json<StatusResponse>, ApiError> {
    let stats = ledger.stats().await.map_err(|e| {
        tracing::error!("Failed to compute ledger stats: {:#}", e);
        storage_error(e)
    })?;

    Ok(Json(StatusResponse {
        status: "online".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: ledger.storage_kind().as_str().to_string(),
        total_badges: stats.total_badges,
        total_users: stats.total_users,
    }))
}
