//! REST handlers over the orchestrator.

use std::path::PathBuf;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use uplink_core::{Credentials, SessionId, WorkItem};
use uplink_runtime::OrchestratorError;

use crate::health::{HealthResponse, health_check};
use crate::server::AppState;

/// Body of `POST /api/sessions`.
///
/// Files are staged on local disk before the session starts (how they get
/// there is the caller's concern); the session uploads them in the order
/// given.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Account username for the target admin console.
    pub username: String,
    /// Account password.
    pub password: String,
    /// Staged files to upload, in order.
    pub files: Vec<StagedFile>,
}

/// One staged file in a create request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFile {
    /// Display filename.
    pub filename: String,
    /// Path to the staged bytes on local disk.
    pub path: PathBuf,
}

/// Body of `POST /api/sessions/{id}/second-factor`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondFactorRequest {
    /// The one-time code.
    pub code: String,
}

/// File types accepted for upload.
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

fn allowed_extension(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Copy the request's files into a fresh session-owned staging directory.
///
/// The returned directory becomes the session's scratch dir, reclaimed on
/// teardown. On error the partially-filled directory is removed.
async fn stage_files(files: &[StagedFile]) -> std::io::Result<(PathBuf, Vec<WorkItem>)> {
    let staging = tempfile::Builder::new()
        .prefix("uplink-session-")
        .tempdir()?;
    let mut work_items = Vec::with_capacity(files.len());
    for file in files {
        let dest = staging.path().join(&file.filename);
        let _ = tokio::fs::copy(&file.path, &dest).await?;
        work_items.push(WorkItem::new(file.filename.clone(), dest));
    }
    Ok((staging.keep(), work_items))
}

/// `POST /api/sessions` — create a session and resolve its login.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Response {
    if state.shutdown.is_shutting_down() {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "server is shutting down");
    }
    if req.files.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "no files provided");
    }

    for file in &req.files {
        if file.filename.is_empty() || file.filename.contains(['/', '\\']) {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid filename: {}", file.filename),
            );
        }
        if !allowed_extension(&file.filename) {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!(
                    "invalid file type: {} (allowed: {})",
                    file.filename,
                    ALLOWED_EXTENSIONS.join(", ")
                ),
            );
        }
        match tokio::fs::metadata(&file.path).await {
            Ok(meta) if meta.len() > state.max_upload_bytes => {
                return error_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("{} exceeds the upload size limit", file.filename),
                );
            }
            Ok(_) => {}
            Err(_) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("staged file not found: {}", file.filename),
                );
            }
        }
    }

    let (scratch_dir, work_items) = match stage_files(&req.files).await {
        Ok(staged) => staged,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("failed to stage files: {err}"),
            );
        }
    };

    let credentials = Credentials {
        username: req.username,
        password: req.password,
    };

    match state
        .orchestrator
        .create_session(credentials, work_items, Some(scratch_dir.clone()))
        .await
    {
        Ok(view) => Json(view).into_response(),
        Err(err) => {
            // The session never took ownership of the staging dir.
            let _ = tokio::fs::remove_dir_all(&scratch_dir).await;
            api_error(&err)
        }
    }
}

/// `POST /api/sessions/{id}/second-factor` — submit a one-time code.
pub async fn submit_second_factor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SecondFactorRequest>,
) -> Response {
    let id = SessionId::from(id);
    match state.orchestrator.submit_second_factor(&id, &req.code).await {
        Ok(reply) => Json(reply).into_response(),
        Err(err) => api_error(&err),
    }
}

/// `GET /api/sessions/{id}` — poll session status.
pub async fn session_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = SessionId::from(id);
    match state.orchestrator.get_status(&id) {
        Ok(view) => Json(view).into_response(),
        Err(err) => api_error(&err),
    }
}

/// `DELETE /api/sessions/{id}` — cancel a session.
pub async fn cancel_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = SessionId::from(id);
    if state.orchestrator.cancel(&id).await {
        Json(json!({"success": true, "message": "Session cancelled"})).into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "session not found or expired")
    }
}

/// `GET /health`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health_check(
        state.start_time,
        state.orchestrator.active_sessions(),
        state.orchestrator.config().max_concurrent_sessions,
    ))
}

fn api_error(err: &OrchestratorError) -> Response {
    debug!(category = err.category(), %err, "request rejected");
    let status = match err {
        OrchestratorError::CapacityExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
    };
    error_response(status, err.to_string())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
