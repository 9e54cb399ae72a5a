//! HTTP handlers

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::dashboard::{ConceptContent, StudentView};
use crate::levels::{IngestError, ManualOutcome};
use crate::server::ServerState;
use crate::types::{Concept, MasteryTier};

/// Level update request
#[derive(Debug, Deserialize)]
pub struct LevelUpdateRequest {
    pub tier: String,
}

/// Student content response
#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub student: StudentView,
    pub content: Vec<ConceptContent>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn student_not_found(id: u32) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Student id {} not found. Please check the id.", id),
    )
}

/// Liveness and store size
pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "students": state.dashboard.student_count().await,
    }))
}

/// Student name and level chart
pub async fn student_handler(State(state): State<ServerState>, Path(id): Path<u32>) -> Response {
    match state.dashboard.student(id).await {
        Some(view) => Json(view).into_response(),
        None => student_not_found(id),
    }
}

/// Per-concept content at the student's current tiers
pub async fn content_handler(State(state): State<ServerState>, Path(id): Path<u32>) -> Response {
    let Some(student) = state.dashboard.student(id).await else {
        return student_not_found(id);
    };
    match state.dashboard.student_content(id).await {
        Some(content) => Json(ContentResponse { student, content }).into_response(),
        None => student_not_found(id),
    }
}

/// Bulk update from an exam-results CSV sent as the request body
pub async fn ingest_handler(State(state): State<ServerState>, body: String) -> Response {
    match state.dashboard.ingest_upload(body.as_bytes()).await {
        Ok(report) => {
            let messages = report.messages();
            Json(json!({
                "updated": report.updated(),
                "warnings": report.warnings(),
                "messages": messages,
                "report": report,
            }))
            .into_response()
        }
        Err(e @ (IngestError::Malformed { .. } | IngestError::MissingColumn { .. })) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            error!("Ingestion failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Manual edit of one concept level
pub async fn update_level_handler(
    State(state): State<ServerState>,
    Path((id, concept)): Path<(u32, String)>,
    Json(req): Json<LevelUpdateRequest>,
) -> Response {
    let concept: Concept = match concept.parse() {
        Ok(c) => c,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("{}", e)),
    };
    let tier: MasteryTier = match req.tier.parse() {
        Ok(t) => t,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("{}", e)),
    };

    match state.dashboard.manual_update(id, concept, tier).await {
        Ok(outcome @ ManualOutcome::Updated { .. }) => {
            let message = outcome.message();
            Json(json!({ "message": message, "outcome": outcome })).into_response()
        }
        Ok(outcome @ ManualOutcome::NotFound { .. }) => {
            error_response(StatusCode::NOT_FOUND, outcome.message())
        }
        Err(e) => {
            error!("Manual update failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
