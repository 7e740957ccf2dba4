use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::generation::coordinator::CoordinatorError;
use crate::models::messages::JobDetails;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMessage {
    pub job_details: JobDetails,
}

/// Response shape of the `generate` message. Failures are part of the
/// contract body (a surface renders them), not HTTP errors — except
/// storage faults, which genuinely are server errors.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<bool>,
}

impl GenerateReply {
    fn ok() -> Self {
        GenerateReply {
            success: true,
            download_complete: Some(true),
            error: None,
            cancelled: None,
        }
    }

    fn failed(error: String, cancelled: bool) -> Self {
        GenerateReply {
            success: false,
            download_complete: None,
            error: Some(error),
            cancelled: cancelled.then_some(true),
        }
    }
}

/// POST /api/v1/messages/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(msg): Json<GenerateMessage>,
) -> Result<Json<GenerateReply>, AppError> {
    match state.coordinator.start(msg.job_details).await {
        Ok(_outcome) => Ok(Json(GenerateReply::ok())),
        Err(CoordinatorError::Cancelled) => Ok(Json(GenerateReply::failed(
            CoordinatorError::Cancelled.to_string(),
            true,
        ))),
        Err(CoordinatorError::Storage(e)) => Err(e.into()),
        Err(e) => Ok(Json(GenerateReply::failed(e.to_string(), false))),
    }
}

/// POST /api/v1/messages/cancel — fire-and-forget; no body expected back.
pub async fn handle_cancel(State(state): State<AppState>) -> StatusCode {
    if let Err(e) = state.coordinator.cancel().await {
        // Fire-and-forget contract: log, never surface.
        tracing::warn!("cancel failed to persist its terminal state: {e}");
    }
    StatusCode::NO_CONTENT
}

/// GET /api/v1/messages/status — `checkRequestStatus`, with staleness
/// reconciliation on the read path.
pub async fn handle_status(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let status = state.coordinator.reconcile().await?;
    Ok(Json(json!({
        "isActive": state.coordinator.is_active().await,
        "generationStatus": status,
    })))
}
