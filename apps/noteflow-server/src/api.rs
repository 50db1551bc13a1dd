//! API handlers for the noteflow server
//!
//! Handlers stay thin: extract, call into the core crates, serialize. No
//! workflow logic lives here.

use std::path::PathBuf;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use annot_codec::AnnotationGroup;
use docstore_client::{DocumentStore, SessionId, WorkflowEngine};
use noteflow_core::{NoteOutcome, RunOutcome, WorkItemRef};

use crate::error::ServerError;
use crate::AppState;

/// Pull the session handle out of the `sessionId` header.
fn session_from(headers: &HeaderMap) -> Result<SessionId, ServerError> {
    headers
        .get("sessionId")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or(ServerError::MissingSession)
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "noteflow-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Login request body
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

/// Login response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub session_id: SessionId,
}

/// Handler: POST /api/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServerError> {
    info!(user = %req.user_name, "login requested");
    let session_id = state
        .inner
        .sessions
        .get_or_connect(&req.user_name, &req.password)
        .await?;
    Ok(Json(LoginResponse {
        success: true,
        session_id,
    }))
}

/// Logout response
#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Handler: POST /api/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, ServerError> {
    let session = session_from(&headers)?;
    state.inner.sessions.invalidate_by_id(session);
    // Releasing the upstream session is best-effort; the cache entry is
    // already gone either way.
    if let Err(err) = state.inner.engine.disconnect(session).await {
        tracing::warn!(%err, "workflow disconnect failed");
    }
    Ok(Json(LogoutResponse { success: true }))
}

/// Republish request body
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepublishRequest {
    /// Path to the replacement content on server-local storage.
    pub content_path: PathBuf,
    /// Drop generated View hyperlinks from the restored annotations.
    #[serde(default)]
    pub filter_view_hyperlinks: bool,
}

/// Republish response
#[derive(Serialize)]
pub struct RepublishResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

/// Handler: POST /api/documents/:id/republish
pub async fn handle_republish(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<RepublishRequest>,
) -> Result<Json<RepublishResponse>, ServerError> {
    let session = session_from(&headers)?;
    info!(document_id, filter = req.filter_view_hyperlinks, "republish requested");

    let outcome = state
        .inner
        .orchestrator
        .run(
            &state.inner.store,
            &document_id,
            &req.content_path,
            session,
            req.filter_view_hyperlinks,
        )
        .await?;

    Ok(Json(RepublishResponse {
        success: true,
        outcome,
    }))
}

/// Note creation request body
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub process_instance_id: String,
    pub work_item_id: String,
}

/// Note creation response
#[derive(Serialize)]
pub struct CreateNoteResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: NoteOutcome,
}

/// Handler: POST /api/notes
pub async fn handle_create_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateNoteRequest>,
) -> Result<Json<CreateNoteResponse>, ServerError> {
    let session = session_from(&headers)?;
    let work_item = WorkItemRef {
        process_instance_id: req.process_instance_id,
        work_item_id: req.work_item_id,
    };
    info!(
        process = %work_item.process_instance_id,
        item = %work_item.work_item_id,
        "note creation requested"
    );

    let outcome = state
        .inner
        .builder
        .build_and_publish(
            &state.inner.store,
            &state.inner.engine,
            &state.inner.orchestrator,
            &work_item,
            session,
        )
        .await?;

    Ok(Json(CreateNoteResponse {
        success: true,
        outcome,
    }))
}

/// Annotation list response
#[derive(Serialize)]
pub struct AnnotationsResponse {
    pub success: bool,
    pub count: usize,
    pub groups: Vec<AnnotationGroup>,
}

/// Handler: GET /api/documents/:id/annotations
pub async fn handle_get_annotations(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AnnotationsResponse>, ServerError> {
    let session = session_from(&headers)?;
    let groups = state
        .inner
        .store
        .get_annotations(&document_id, session)
        .await?;

    Ok(Json(AnnotationsResponse {
        success: true,
        count: groups.len(),
        groups,
    }))
}
