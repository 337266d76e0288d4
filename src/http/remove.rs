//! `POST /api/remove`: delete every file whose label contains a pattern.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::error::RelayError;
use crate::http::response::{success, ApiError};
use crate::http::server::AppState;
use crate::observability::metrics;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBody {
    pub search_pattern: Option<String>,
    pub admin_password: Option<String>,
}

pub async fn remove_handler(
    State(state): State<AppState>,
    body: Result<Json<RemoveBody>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let response = match handle(&state, body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    metrics::record_request("remove", response.status().as_u16(), start);
    response
}

async fn handle(
    state: &AppState,
    body: Result<Json<RemoveBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let runtime = state.runtime.load_full();
    let remover = runtime
        .remover
        .as_ref()
        .map_err(|msg| RelayError::ServerMisconfigured(msg.clone()))?;

    let Json(body) = body.map_err(|e| RelayError::InvalidInput(e.body_text()))?;

    let report = remover
        .remove(body.search_pattern.as_deref(), body.admin_password.as_deref())
        .await
        .inspect_err(|e| {
            if matches!(e, RelayError::Unauthorized) {
                tracing::warn!("Removal attempted with missing or wrong password");
            }
        })?;

    Ok(success(StatusCode::OK, report))
}
