// src/server/api.rs

//! The public HTTP interface over the shared filter.

use crate::core::BloomGuardError;
use crate::core::persistence::Snapshot;
use crate::core::state::{Durability, FilterInfo, ServerState};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

const ADDED_MESSAGE: &str = "Password added to Bloom Filter";
const PRESENT_MESSAGE: &str = "Password is probably present in common password list";
const ABSENT_MESSAGE: &str = "Password is not present in common password list";

/// Builds the router for the public endpoints.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/add", post(add_password))
        .route("/check", post(check_password))
        .route("/bloom-filter", get(get_bloom_filter))
        .route("/bloom-filter/info", get(get_bloom_filter_info))
        .with_state(state)
}

#[derive(Deserialize)]
struct PasswordRequest {
    password: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddResponse {
    pub message: String,
    pub newly_added: bool,
    /// Present only when the add is held in memory but the snapshot is stale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub possibly_present: bool,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for BloomGuardError {
    fn into_response(self) -> Response {
        let status = match &self {
            BloomGuardError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Pulls a non-empty password out of the request body.
fn extract_password(
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> Result<String, BloomGuardError> {
    let Json(request) = payload.map_err(|e| BloomGuardError::InvalidRequest(e.body_text()))?;
    match request.password {
        Some(password) if !password.is_empty() => Ok(password),
        _ => Err(BloomGuardError::InvalidRequest(
            "field 'password' is required".to_string(),
        )),
    }
}

async fn add_password(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AddResponse>), BloomGuardError> {
    let password = extract_password(payload)?;

    // The add and its save run on their own task so a dropped connection
    // cannot cut the critical section short.
    let task_state = state.clone();
    let outcome = tokio::spawn(async move { task_state.add(password.as_bytes()).await })
        .await
        .map_err(|e| {
            error!("Add task failed: {e}");
            BloomGuardError::Internal("add did not complete".to_string())
        })?;

    let warning = match outcome.durability {
        Durability::Persisted => None,
        Durability::Stale { reason } => Some(format!(
            "Password is held in memory but the snapshot could not be saved: {reason}"
        )),
    };
    debug!(
        "Add handled (newly_added={}, stale={})",
        outcome.newly_added,
        warning.is_some()
    );

    Ok((
        StatusCode::CREATED,
        Json(AddResponse {
            message: ADDED_MESSAGE.to_string(),
            newly_added: outcome.newly_added,
            warning,
        }),
    ))
}

async fn check_password(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> Result<Json<CheckResponse>, BloomGuardError> {
    let password = extract_password(payload)?;
    let possibly_present = state.check(password.as_bytes()).await;
    let message = if possibly_present {
        PRESENT_MESSAGE
    } else {
        ABSENT_MESSAGE
    };
    Ok(Json(CheckResponse {
        possibly_present,
        message: message.to_string(),
    }))
}

async fn get_bloom_filter(State(state): State<Arc<ServerState>>) -> Json<Snapshot> {
    Json(state.structure().await)
}

async fn get_bloom_filter_info(State(state): State<Arc<ServerState>>) -> Json<FilterInfo> {
    Json(state.info().await)
}
