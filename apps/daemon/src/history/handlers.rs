use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::AppError;
use crate::history::import::{self, DataPack, ImportReport};
use crate::history::job_id::derive_job_id;
use crate::history::ledger;
use crate::models::history::HistoryEntry;
use crate::state::AppState;
use crate::surfaces::IndicatorUpdate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckHistoryMessage {
    #[serde(default)]
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PageVisitMessage {
    pub url: String,
}

/// POST /api/v1/messages/check-history
///
/// A found hit is also pushed to the indicator stream, best-effort, so an
/// overlay that asked the question can render without a second request.
pub async fn handle_check_history(
    State(state): State<AppState>,
    Json(msg): Json<CheckHistoryMessage>,
) -> Json<Value> {
    if msg.job_id.is_empty() {
        debug!("no job id provided, returning not found");
        return Json(json!({"found": false}));
    }

    match ledger::lookup(&state.store, &msg.job_id) {
        Some(hit) => {
            let delivery = state.notifier.push(&IndicatorUpdate {
                job_id: msg.job_id.clone(),
                job_history: hit.clone(),
            });
            debug!("indicator push after history check: {delivery:?}");
            Json(found_body(&hit))
        }
        None => Json(json!({"found": false})),
    }
}

/// POST /api/v1/messages/page-visit
///
/// The overlay announces the page it landed on; the daemon derives the
/// job id from the URL and answers (and pushes) any prior application.
pub async fn handle_page_visit(
    State(state): State<AppState>,
    Json(msg): Json<PageVisitMessage>,
) -> Json<Value> {
    let job_id = derive_job_id(&msg.url);
    if job_id.is_empty() {
        return Json(json!({"found": false}));
    }

    match ledger::lookup(&state.store, &job_id) {
        Some(hit) => {
            let delivery = state.notifier.push(&IndicatorUpdate {
                job_id: job_id.clone(),
                job_history: hit.clone(),
            });
            debug!("indicator push after page visit: {delivery:?}");
            let mut body = found_body(&hit);
            body["jobId"] = json!(job_id);
            Json(body)
        }
        None => Json(json!({"found": false})),
    }
}

/// GET /api/v1/history — newest-first view.
pub async fn handle_list(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    Json(ledger::list(&state.store))
}

/// DELETE /api/v1/history/:display_index
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(display_index): Path<usize>,
) -> Result<Json<HistoryEntry>, AppError> {
    match ledger::delete(&state.store, display_index)? {
        Some(removed) => Ok(Json(removed)),
        None => Err(AppError::NotFound(format!(
            "no history entry at display index {display_index}"
        ))),
    }
}

/// DELETE /api/v1/history — clear all.
pub async fn handle_clear(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    ledger::clear(&state.store)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/history/import
pub async fn handle_import(
    State(state): State<AppState>,
    Json(pack): Json<DataPack>,
) -> Result<Json<ImportReport>, AppError> {
    let report = import::apply(&state.store, pack)?;
    Ok(Json(report))
}

fn found_body(hit: &ledger::HistoryMatch) -> Value {
    json!({
        "found": true,
        "jobTitle": hit.job_title,
        "companyName": hit.company_name,
        "filename": hit.filename,
        "applicationDate": hit.application_date,
        "jobPostUrl": hit.job_post_url,
    })
}
