//! `POST /api/upload`: relay a new image, or recheck an earlier one.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::http::response::{success, ApiError};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pipeline::AssetStatus;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBody {
    pub filename: Option<String>,
    /// Data URI.
    pub image: Option<String>,
    /// Present alone for a status recheck.
    pub file_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Ready {
    url: String,
    file_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Pending {
    ready: bool,
    status: String,
    file_id: String,
}

pub async fn upload_handler(
    State(state): State<AppState>,
    body: Result<Json<UploadBody>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let response = match handle(&state, body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    metrics::record_request("upload", response.status().as_u16(), start);
    response
}

async fn handle(
    state: &AppState,
    body: Result<Json<UploadBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let runtime = state.runtime.load_full();
    let pipeline = runtime
        .pipeline
        .as_ref()
        .map_err(|msg| RelayError::ServerMisconfigured(msg.clone()))?;

    let Json(body) = body.map_err(|e| RelayError::InvalidInput(e.body_text()))?;

    let recheck = body.image.is_none() && body.filename.is_none();
    if let (true, Some(file_id)) = (recheck, body.file_id.as_deref()) {
        return Ok(match pipeline.check_status(file_id).await? {
            AssetStatus::Ready(asset) => success(
                StatusCode::OK,
                Ready {
                    url: asset.url,
                    file_id: asset.asset_id,
                },
            ),
            AssetStatus::Pending { asset_id, status } => success(
                StatusCode::ACCEPTED,
                Pending {
                    ready: false,
                    status,
                    file_id: asset_id,
                },
            ),
        });
    }

    let (Some(filename), Some(image)) = (body.filename.as_deref(), body.image.as_deref()) else {
        return Err(RelayError::InvalidInput("filename and image are required".to_string()).into());
    };

    let asset = pipeline.upload(filename, image).await?;
    Ok(success(
        StatusCode::OK,
        Ready {
            url: asset.url,
            file_id: asset.asset_id,
        },
    ))
}
