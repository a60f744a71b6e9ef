//! Session planning API (§6): `/plan_next`, `/pack`, `/mark_served`.
//!
//! Handlers are thin adapters — all planning and state-transition logic
//! lives in `quantis_core::orchestrator`.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;
use quantis_core::orchestrator;
use quantis_core::storage::questions::get_question;
use quantis_core::storage::sessions::get_pack;

#[derive(Debug, Deserialize)]
pub struct PlanNextRequest {
    pub student_id: String,
    pub last_session_id: Option<String>,
    pub next_session_id: String,
}

fn idempotency_key(headers: &HeaderMap, req: &PlanNextRequest) -> String {
    if let Some(key) = headers.get("Idempotency-Key").and_then(|v| v.to_str().ok()) {
        return key.to_string();
    }
    format!(
        "{}:{}:{}",
        req.student_id,
        req.last_session_id.as_deref().unwrap_or("none"),
        req.next_session_id
    )
}

/// `POST /plan_next` — plan (or replay) the next session for a student.
pub async fn plan_next(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<PlanNextRequest>,
) -> Result<Json<Value>, ApiError> {
    let key = idempotency_key(&headers, &req);
    let (session, planned) = orchestrator::plan_next(&state.db, &state.config, &req.student_id, &key).await?;

    Ok(Json(json!({
        "status": "planned",
        "session_id": session.id,
        "constraint_report": planned.telemetry,
    })))
}

#[derive(Debug, Deserialize)]
pub struct PackQuery {
    pub student_id: String,
    pub session_id: String,
}

/// `GET /pack?student_id=…&session_id=…` — fetch the planned pack with
/// question metadata attached.
pub async fn get_pack_route(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PackQuery>,
) -> Result<Json<Value>, ApiError> {
    let session = quantis_core::storage::sessions::get_session(&state.db, &query.session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("session {} not found", query.session_id)))?;

    if session.student_id != query.student_id {
        return Err(ApiError::BadRequest("session does not belong to student_id".to_string()));
    }

    let pack = get_pack(&state.db, &query.session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no pack planned for session {}", query.session_id)))?;

    let question_ids: Vec<String> = serde_json::from_str(&pack.question_ids)
        .map_err(|e| ApiError::BadRequest(format!("corrupt stored question_ids: {e}")))?;

    let mut questions = Vec::with_capacity(question_ids.len());
    for id in &question_ids {
        if let Some(question) = get_question(&state.db, id).await? {
            questions.push(question);
        }
    }

    Ok(Json(json!({
        "pack": questions,
        "status": session.status,
    })))
}

#[derive(Debug, Deserialize)]
pub struct MarkServedRequest {
    pub student_id: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// `POST /mark_served {student_id, session_id}` — idempotent.
pub async fn mark_served(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MarkServedRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let session = quantis_core::storage::sessions::get_session(&state.db, &req.session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("session {} not found", req.session_id)))?;

    if session.student_id != req.student_id {
        return Err(ApiError::BadRequest("session does not belong to student_id".to_string()));
    }

    if session.status == "served" || session.status == "completed" {
        return Ok(Json(OkResponse { ok: true }));
    }

    orchestrator::mark_served(&state.db, &req.session_id).await?;
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub student_id: String,
    pub session_id: String,
    pub question_id: String,
    pub correct: bool,
    pub time_taken_seconds: f64,
}

/// `POST /submit_attempt {student_id, session_id, question_id, correct, time_taken_seconds}`
/// — records one attempt against a served session and folds it into mastery.
pub async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let session = quantis_core::storage::sessions::get_session(&state.db, &req.session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("session {} not found", req.session_id)))?;

    if session.student_id != req.student_id {
        return Err(ApiError::BadRequest("session does not belong to student_id".to_string()));
    }

    orchestrator::record_attempt(
        &state.db,
        &state.config.mastery,
        &req.session_id,
        &req.question_id,
        req.correct,
        req.time_taken_seconds,
    )
    .await?;

    Ok(Json(OkResponse { ok: true }))
}

#[derive(Debug, Deserialize)]
pub struct CompleteSessionRequest {
    pub student_id: String,
    pub session_id: String,
}

/// `POST /complete_session {student_id, session_id}` — idempotent.
pub async fn complete_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompleteSessionRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let session = quantis_core::storage::sessions::get_session(&state.db, &req.session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("session {} not found", req.session_id)))?;

    if session.student_id != req.student_id {
        return Err(ApiError::BadRequest("session does not belong to student_id".to_string()));
    }

    if session.status == "completed" {
        return Ok(Json(OkResponse { ok: true }));
    }

    orchestrator::complete(&state.db, &req.session_id).await?;
    Ok(Json(OkResponse { ok: true }))
}
