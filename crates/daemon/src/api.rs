// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP API served by `hvd serve`.
//!
//! Search jobs run inside the request. A job that hands off to a successor
//! worker answers `202 {"status": "healing"}` immediately. Interactive
//! actions never touch the automation session directly: every one goes
//! through the [`InteractionQueue`].

use crate::app::Engine;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use hv_core::{Interaction, JobState, SearchFilters, SystemClock};
use hv_engine::{GateError, HealAuthorizationGate, InteractionQueue, JobError, JobOutcome, QueueError};
use hv_storage::HealStoreError;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub struct AppState {
    pub engine: Engine,
    pub queue: InteractionQueue,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", post(search))
        .route("/heal-restore/status", get(heal_status))
        .route("/heal-restore/authorize", post(heal_authorize))
        .route("/heal-restore/cancel", post(heal_cancel))
        .route("/actions/send-message", post(send_message))
        .route("/actions/add-connection", post(add_connection))
        .route("/actions/create-post", post(create_post))
        .route("/queue", get(queue_jobs))
        .with_state(state)
}

fn error(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(flatten)]
    filters: SearchFilters,
    credentials_ref: String,
}

async fn search(State(state): State<Arc<AppState>>, Json(body): Json<SearchRequest>) -> Response {
    if body.filters.target.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "target must not be empty");
    }
    if body.credentials_ref.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "credentialsRef must not be empty");
    }

    let mut job = JobState::new(body.filters, body.credentials_ref, &SystemClock);
    tracing::info!(job_id = %job.id, target = %job.filters.target, "search job started");

    match state.engine.orchestrator.run(&mut job).await {
        Ok(JobOutcome::Completed(stats)) => Json(json!({
            "jobId": job.id,
            "analyzed": stats.analyzed,
            "classified": stats.classified,
            "successRate": stats.success_rate,
        }))
        .into_response(),
        Ok(JobOutcome::HandedOff { checkpoint, phase }) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "status": "healing",
                "jobId": job.id,
                "checkpoint": checkpoint,
                "healPhase": phase,
            })),
        )
            .into_response(),
        Err(e @ JobError::Auth(_)) => error(StatusCode::UNAUTHORIZED, e),
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// Gate calls take the heal store's file lock, so run them on the blocking pool.
async fn on_gate<T, F>(state: &AppState, f: F) -> Result<T, GateError>
where
    T: Send + 'static,
    F: FnOnce(&HealAuthorizationGate<SystemClock>) -> Result<T, GateError> + Send + 'static,
{
    let gate = Arc::clone(&state.engine.gate);
    tokio::task::spawn_blocking(move || f(&gate)).await?
}

async fn heal_status(State(state): State<Arc<AppState>>) -> Response {
    match on_gate(&state, |gate| gate.status()).await {
        Ok(session) => Json(json!({ "session": session })).into_response(),
        Err(e) => gate_error(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    session_id: String,
    #[serde(default)]
    auto_approve: bool,
}

async fn heal_authorize(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AuthorizeRequest>,
) -> Response {
    let AuthorizeRequest { session_id, auto_approve } = body;
    match on_gate(&state, move |gate| gate.authorize(&session_id, auto_approve)).await {
        Ok(session) => Json(json!({ "success": true, "session": session })).into_response(),
        Err(e) => gate_error(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    session_id: String,
}

async fn heal_cancel(State(state): State<Arc<AppState>>, Json(body): Json<CancelRequest>) -> Response {
    match on_gate(&state, move |gate| gate.cancel(&body.session_id)).await {
        Ok(session) => Json(json!({ "success": true, "session": session })).into_response(),
        Err(e) => gate_error(e),
    }
}

fn gate_error(e: GateError) -> Response {
    match e {
        GateError::Store(HealStoreError::NotFound(_)) => error(StatusCode::NOT_FOUND, e),
        GateError::Store(HealStoreError::NotPending { .. }) => error(StatusCode::CONFLICT, e),
        _ => error(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    recipient: String,
    message: String,
}

#[derive(Deserialize)]
pub struct AddConnectionRequest {
    profile: String,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    content: String,
}

async fn send_message(State(state): State<Arc<AppState>>, Json(body): Json<SendMessageRequest>) -> Response {
    run_action(&state, Interaction::SendMessage { recipient: body.recipient, message: body.message }).await
}

async fn add_connection(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddConnectionRequest>,
) -> Response {
    run_action(&state, Interaction::AddConnection { profile: body.profile, note: body.note }).await
}

async fn create_post(State(state): State<Arc<AppState>>, Json(body): Json<CreatePostRequest>) -> Response {
    run_action(&state, Interaction::CreatePost { content: body.content }).await
}

async fn run_action(state: &AppState, action: Interaction) -> Response {
    match state.queue.enqueue(action).await {
        Ok(result) => Json(json!({ "result": result })).into_response(),
        Err(e @ QueueError::Action(_)) => error(StatusCode::BAD_GATEWAY, e),
        Err(e) => error(StatusCode::SERVICE_UNAVAILABLE, e),
    }
}

async fn queue_jobs(State(state): State<Arc<AppState>>) -> Response {
    Json(state.queue.jobs()).into_response()
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
