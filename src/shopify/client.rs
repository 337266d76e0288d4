//! Admin GraphQL client.
//!
//! # Responsibilities
//! - Authenticate every GraphQL call with the Admin access token
//! - Map transport, HTTP and GraphQL failures into one internal shape
//! - Expose one method per platform operation the relay needs
//! - Perform the direct-to-blob-store transfer for staged uploads

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::ShopConfig;
use crate::error::{RelayError, RelayResult};
use crate::shopify::queries;
use crate::shopify::types::{
    describe_user_errors, CreatedAsset, DeleteOutcome, FileConnection, FileCreateData,
    FileDeleteData, FileNode, FilesData, GraphQlResponse, NodeData, StagedTarget,
    StagedUploadInput, StagedUploadsData, TransferMethod,
};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Upstream bodies are echoed back for diagnosis; cap how much.
const MAX_DIAGNOSTIC_BODY: usize = 2048;

/// Why a GraphQL call did not yield data.
#[derive(Debug)]
pub enum CallError {
    /// Request never completed.
    Network(String),
    /// Non-2xx HTTP response.
    Status { status: u16, body: String },
    /// Top-level GraphQL `errors`.
    GraphQl(String),
    /// Response body did not have the expected shape.
    Malformed(String),
}

impl CallError {
    /// Map into the relay taxonomy. Network failures always surface as
    /// `UpstreamUnreachable`; everything else is attributed to `step`.
    pub fn into_relay<F>(self, step: F) -> RelayError
    where
        F: FnOnce(String) -> RelayError,
    {
        match self {
            CallError::Network(msg) => RelayError::UpstreamUnreachable(msg),
            other => step(other.to_string()),
        }
    }
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallError::Network(msg) => write!(f, "network error: {}", msg),
            CallError::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            CallError::GraphQl(msg) => write!(f, "GraphQL error: {}", msg),
            CallError::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_DIAGNOSTIC_BODY {
        let mut cut = MAX_DIAGNOSTIC_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push('…');
    }
    body
}

/// One page of the file listing.
#[derive(Debug)]
pub struct FilePage {
    pub files: Vec<FileNode>,
    pub next_cursor: Option<String>,
}

/// Client for the storefront's Admin API.
#[derive(Clone)]
pub struct ShopifyClient {
    http: Client,
    endpoint: String,
    access_token: SecretString,
}

impl ShopifyClient {
    /// Build a client, failing with `ServerMisconfigured` when the shop
    /// domain or access token is absent.
    pub fn new(config: &ShopConfig) -> RelayResult<Self> {
        let endpoint = config.endpoint().ok_or_else(|| {
            RelayError::ServerMisconfigured("shop domain is not configured".to_string())
        })?;
        let access_token = config
            .access_token
            .clone()
            .filter(|t| !t.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                RelayError::ServerMisconfigured("shop access token is not configured".to_string())
            })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RelayError::ServerMisconfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            access_token,
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, CallError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(ACCESS_TOKEN_HEADER, self.access_token.expose_secret())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| CallError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CallError::Network(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(CallError::Status {
                status: status.as_u16(),
                body: truncate(text),
            });
        }

        let envelope: GraphQlResponse<T> = serde_json::from_str(&text)
            .map_err(|e| CallError::Malformed(format!("{} in {}", e, truncate(text.clone()))))?;

        if !envelope.errors.is_empty() {
            let messages: Vec<_> = envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(CallError::GraphQl(messages.join("; ")));
        }

        envelope
            .data
            .ok_or_else(|| CallError::Malformed("response has no data".to_string()))
    }

    /// Request a one-time upload target.
    pub async fn create_staged_upload(&self, input: &StagedUploadInput) -> RelayResult<StagedTarget> {
        let data: StagedUploadsData = self
            .execute(queries::STAGED_UPLOADS_CREATE, json!({ "input": [input] }))
            .await
            .map_err(|e| e.into_relay(RelayError::StagingFailed))?;

        let payload = data.staged_uploads_create.ok_or_else(|| {
            RelayError::StagingFailed("stagedUploadsCreate returned null".to_string())
        })?;
        if !payload.user_errors.is_empty() {
            return Err(RelayError::StagingFailed(describe_user_errors(&payload.user_errors)));
        }

        payload
            .staged_targets
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::StagingFailed("no staged target returned".to_string()))
    }

    /// Send bytes straight to the staged target.
    ///
    /// For POST targets every parameter becomes a form field, in the order
    /// the platform listed them, followed by the file part. PUT targets take
    /// the raw body, with the parameters as headers.
    pub async fn transfer(
        &self,
        target: &StagedTarget,
        method: TransferMethod,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> RelayResult<()> {
        let request = match method {
            TransferMethod::Post => {
                let mut form = Form::new();
                for param in &target.parameters {
                    form = form.text(param.name.clone(), param.value.clone());
                }
                let part = Part::bytes(bytes)
                    .file_name(filename.to_string())
                    .mime_str(mime_type)
                    .map_err(|e| RelayError::InvalidInput(format!("content type: {}", e)))?;
                self.http.post(&target.url).multipart(form.part("file", part))
            }
            TransferMethod::Put => {
                let mut request = self
                    .http
                    .put(&target.url)
                    .header(reqwest::header::CONTENT_TYPE, mime_type);
                for param in &target.parameters {
                    if !param.name.eq_ignore_ascii_case("content_type") {
                        request = request.header(param.name.as_str(), param.value.as_str());
                    }
                }
                request.body(bytes)
            }
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(RelayError::TransferFailed {
            status: status.as_u16(),
            body: truncate(body),
        })
    }

    /// Register a transferred resource as a permanent file.
    pub async fn create_file(&self, resource_url: &str, alt: &str) -> RelayResult<CreatedAsset> {
        let variables = json!({
            "files": [{
                "originalSource": resource_url,
                "contentType": "IMAGE",
                "alt": alt,
            }]
        });
        let data: FileCreateData = self
            .execute(&queries::file_create(), variables)
            .await
            .map_err(|e| e.into_relay(RelayError::FinalizationFailed))?;

        let payload = data.file_create.ok_or_else(|| {
            RelayError::FinalizationFailed("fileCreate returned null".to_string())
        })?;
        if !payload.user_errors.is_empty() {
            return Err(RelayError::FinalizationFailed(describe_user_errors(&payload.user_errors)));
        }

        payload
            .files
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::FinalizationFailed("no file returned".to_string()))?
            .into_asset()
            .map_err(RelayError::FinalizationFailed)
    }

    /// Look up one file by id. `Ok(None)` means the id does not name a file:
    /// unknown to the platform, or some other kind of node.
    pub async fn file_status(&self, id: &str) -> Result<Option<CreatedAsset>, CallError> {
        let data: NodeData = self
            .execute(&queries::file_status(), json!({ "id": id }))
            .await?;

        match data.node {
            Some(node) if node.is_file() => node.into_asset().map(Some).map_err(CallError::Malformed),
            _ => Ok(None),
        }
    }

    /// Fetch one page of the file listing.
    pub async fn list_files(&self, first: u32, after: Option<&str>) -> Result<FilePage, CallError> {
        let data: FilesData = self
            .execute(&queries::list_files(), json!({ "first": first, "after": after }))
            .await?;

        let FileConnection { nodes, page_info } = data.files;
        let next_cursor = if page_info.has_next_page {
            match page_info.end_cursor {
                Some(cursor) => Some(cursor),
                None => {
                    return Err(CallError::Malformed(
                        "hasNextPage without endCursor".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        Ok(FilePage {
            files: nodes,
            next_cursor,
        })
    }

    /// Delete a batch of files.
    pub async fn delete_files(&self, ids: &[String]) -> Result<DeleteOutcome, CallError> {
        let data: FileDeleteData = self
            .execute(queries::FILE_DELETE, json!({ "fileIds": ids }))
            .await?;

        let payload = data
            .file_delete
            .ok_or_else(|| CallError::Malformed("fileDelete returned null".to_string()))?;

        Ok(DeleteOutcome {
            deleted_ids: payload.deleted_file_ids.unwrap_or_default(),
            user_errors: payload.user_errors,
        })
    }
}

impl std::fmt::Debug for ShopifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_domain_is_misconfigured() {
        let config = ShopConfig {
            access_token: Some(SecretString::new("shpat_x".to_string())),
            ..ShopConfig::default()
        };
        let err = ShopifyClient::new(&config).unwrap_err();
        assert!(matches!(err, RelayError::ServerMisconfigured(_)));
    }

    #[test]
    fn test_blank_token_is_misconfigured() {
        let config = ShopConfig {
            domain: Some("example.myshopify.com".to_string()),
            access_token: Some(SecretString::new("  ".to_string())),
            ..ShopConfig::default()
        };
        let err = ShopifyClient::new(&config).unwrap_err();
        assert!(err.to_string().contains("access token"));
    }

    #[test]
    fn test_debug_hides_token() {
        let config = ShopConfig {
            domain: Some("example.myshopify.com".to_string()),
            access_token: Some(SecretString::new("shpat_secret".to_string())),
            ..ShopConfig::default()
        };
        let client = ShopifyClient::new(&config).unwrap();
        assert!(!format!("{:?}", client).contains("shpat_secret"));
    }

    #[test]
    fn test_network_errors_stay_distinct() {
        let err = CallError::Network("connection refused".into()).into_relay(RelayError::StagingFailed);
        assert!(matches!(err, RelayError::UpstreamUnreachable(_)));

        let err = CallError::GraphQl("Throttled".into()).into_relay(RelayError::StagingFailed);
        assert!(matches!(err, RelayError::StagingFailed(msg) if msg.contains("Throttled")));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let body = "é".repeat(MAX_DIAGNOSTIC_BODY);
        let cut = truncate(body);
        assert!(cut.ends_with('…'));
        assert!(cut.len() <= MAX_DIAGNOSTIC_BODY + '…'.len_utf8());
    }
}
