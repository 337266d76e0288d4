//! Stage → transfer → finalize → poll.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::UploadConfig;
use crate::error::{RelayError, RelayResult};
use crate::observability::metrics;
use crate::pipeline::data_uri::{clean_filename, decode_image};
use crate::shopify::types::StagedUploadInput;
use crate::shopify::{CallError, CreatedAsset, FileStatus, ShopifyClient};

/// Tuning for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_image_bytes: usize,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

impl From<&UploadConfig> for PipelineSettings {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_image_bytes: config.max_image_bytes,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
        }
    }
}

/// A file that is ready to be served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedAsset {
    pub url: String,
    pub asset_id: String,
}

/// Result of a one-off status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStatus {
    Ready(UploadedAsset),
    Pending { asset_id: String, status: String },
}

/// Relays one image into the storefront's file storage.
#[derive(Debug, Clone)]
pub struct UploadPipeline {
    client: ShopifyClient,
    settings: PipelineSettings,
}

impl UploadPipeline {
    pub fn new(client: ShopifyClient, settings: PipelineSettings) -> Self {
        Self { client, settings }
    }

    /// Run the full hand-off for one image. Nothing is retried: any failure
    /// ends the request and the caller must resubmit.
    pub async fn upload(&self, filename: &str, image_data_uri: &str) -> RelayResult<UploadedAsset> {
        // 1. Validate (no network before this passes)
        let filename = clean_filename(filename)?;
        if image_data_uri.trim().is_empty() {
            return Err(RelayError::InvalidInput("image data is required".to_string()));
        }
        let image = decode_image(image_data_uri, self.settings.max_image_bytes)?;
        let byte_len = image.bytes.len();

        tracing::info!(
            filename = %filename,
            content_type = %image.mime_type,
            bytes = byte_len,
            "Starting upload"
        );

        // 2. Stage
        let input = StagedUploadInput::image(&filename, &image.mime_type, byte_len);
        let target = self
            .client
            .create_staged_upload(&input)
            .await
            .inspect_err(|e| self.log_stage_failure("stage", &filename, e))?;

        tracing::debug!(
            filename = %filename,
            resource_url = %target.resource_url,
            parameters = target.parameters.len(),
            "Staged upload target issued"
        );

        // 3. Transfer
        self.client
            .transfer(&target, input.http_method, &filename, &image.mime_type, image.bytes)
            .await
            .inspect_err(|e| self.log_stage_failure("transfer", &filename, e))?;

        tracing::debug!(filename = %filename, bytes = byte_len, "Transfer complete");

        // 4. Finalize
        let asset = self
            .client
            .create_file(&target.resource_url, &filename)
            .await
            .inspect_err(|e| self.log_stage_failure("finalize", &filename, e))?;

        tracing::info!(
            filename = %filename,
            asset_id = %asset.id,
            kind = asset.kind.name(),
            status = asset.status.as_str(),
            "File created"
        );

        // 5. Resolve readiness
        let uploaded = self
            .await_ready(asset)
            .await
            .inspect_err(|e| self.log_stage_failure("processing", &filename, e))?;

        tracing::info!(
            filename = %filename,
            asset_id = %uploaded.asset_id,
            url = %uploaded.url,
            "Upload ready"
        );
        Ok(uploaded)
    }

    /// Poll until the asset is ready, failed, or the ceiling is reached.
    async fn await_ready(&self, asset: CreatedAsset) -> RelayResult<UploadedAsset> {
        if let Some(ready) = resolve(&asset)? {
            return Ok(ready);
        }

        let asset_id = asset.id;
        let mut last_status = asset.status;
        let started = Instant::now();
        let mut polls = 0u32;

        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.settings.poll_timeout {
                return Err(RelayError::ProcessingTimeout {
                    asset_id,
                    status: last_status.as_str().to_string(),
                    waited_secs: elapsed.as_secs(),
                });
            }
            tokio::time::sleep(self.settings.poll_interval.min(self.settings.poll_timeout - elapsed)).await;
            polls += 1;

            let current = self
                .client
                .file_status(&asset_id)
                .await
                .map_err(|e| status_query_error(&asset_id, e))?
                .ok_or_else(|| RelayError::ProcessingFailed {
                    asset_id: asset_id.clone(),
                    reason: "file disappeared while processing".to_string(),
                })?;

            tracing::debug!(asset_id = %asset_id, status = current.status.as_str(), poll = polls, "Polled file status");

            if let Some(ready) = resolve(&current)? {
                return Ok(ready);
            }
            last_status = current.status;
        }
    }

    /// Check an earlier upload once, without waiting.
    pub async fn check_status(&self, asset_id: &str) -> RelayResult<AssetStatus> {
        let asset_id = asset_id.trim();
        if asset_id.is_empty() {
            return Err(RelayError::InvalidInput("fileId is required".to_string()));
        }
        // The platform rejects malformed ids with a top-level error that
        // would otherwise read as an upstream failure.
        if !is_global_id(asset_id) {
            return Err(RelayError::InvalidInput(format!("'{}' is not a file id", asset_id)));
        }

        let asset = self
            .client
            .file_status(asset_id)
            .await
            .map_err(|e| status_query_error(asset_id, e))?
            .ok_or_else(|| RelayError::InvalidInput(format!("unknown file id '{}'", asset_id)))?;

        Ok(match resolve(&asset)? {
            Some(ready) => AssetStatus::Ready(ready),
            None => AssetStatus::Pending {
                asset_id: asset.id,
                status: asset.status.as_str().to_string(),
            },
        })
    }

    fn log_stage_failure(&self, stage: &'static str, filename: &str, err: &RelayError) {
        metrics::record_upload_failure(stage, err.kind());
        tracing::error!(stage, filename = %filename, error = %err, "Upload step failed");
    }
}

/// Decide whether an observed asset is finished.
///
/// `Ok(None)` means keep waiting. A URL on a non-failed asset is enough;
/// READY without a URL is an inconsistent upstream state and fails rather
/// than polling on.
fn resolve(asset: &CreatedAsset) -> RelayResult<Option<UploadedAsset>> {
    match (&asset.status, asset.url()) {
        (FileStatus::Failed, _) => Err(RelayError::ProcessingFailed {
            asset_id: asset.id.clone(),
            reason: if asset.errors.is_empty() {
                "platform reported FAILED".to_string()
            } else {
                asset.errors.join("; ")
            },
        }),
        (_, Some(url)) => Ok(Some(UploadedAsset {
            url: url.to_string(),
            asset_id: asset.id.clone(),
        })),
        (FileStatus::Ready, None) => Err(RelayError::ProcessingFailed {
            asset_id: asset.id.clone(),
            reason: format!("{} reported READY without a URL", asset.kind.name()),
        }),
        _ => Ok(None),
    }
}

/// `gid://shopify/<Type>/<id>`.
fn is_global_id(raw: &str) -> bool {
    raw.strip_prefix("gid://shopify/")
        .and_then(|rest| rest.split_once('/'))
        .is_some_and(|(kind, id)| !kind.is_empty() && !id.is_empty())
}

fn status_query_error(asset_id: &str, err: CallError) -> RelayError {
    err.into_relay(|msg| RelayError::Upstream(format!("status query for {} failed: {}", asset_id, msg)))
}
