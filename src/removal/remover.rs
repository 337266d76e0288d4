//! Bulk removal of stored files by label substring.

use std::collections::HashSet;
use std::time::Duration;

use secrecy::SecretString;
use serde::Serialize;

use crate::config::RemovalConfig;
use crate::error::{RelayError, RelayResult};
use crate::observability::metrics;
use crate::security::verify_shared_secret;
use crate::shopify::types::{describe_user_errors, FileNode};
use crate::shopify::ShopifyClient;

/// Patterns shorter than this would match nearly everything.
pub const MIN_PATTERN_LEN: usize = 2;

#[derive(Debug, Clone)]
pub struct RemovalSettings {
    pub max_matches: usize,
    pub batch_size: usize,
    pub page_size: u32,
    pub inter_batch_delay: Duration,
}

impl From<&RemovalConfig> for RemovalSettings {
    fn from(config: &RemovalConfig) -> Self {
        Self {
            max_matches: config.max_matches,
            batch_size: config.batch_size.max(1),
            page_size: config.page_size,
            inter_batch_delay: Duration::from_millis(config.inter_batch_delay_ms),
        }
    }
}

/// Per-file outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalDetail {
    pub id: String,
    pub label: String,
    pub deleted: bool,
}

/// A delete call that failed, in whole or in part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchError {
    pub batch: usize,
    pub file_ids: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalReport {
    pub files_removed: usize,
    pub total_matched: usize,
    pub details: Vec<RemovalDetail>,
    pub errors: Vec<BatchError>,
}

/// The text a file is matched on: its alt text, else the filename from its
/// URL, else its id.
pub fn file_label(node: &FileNode) -> String {
    if let Some(alt) = node.alt.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        return alt.to_string();
    }
    node.any_url()
        .as_deref()
        .and_then(filename_from_url)
        .unwrap_or_else(|| node.id.clone())
}

fn filename_from_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(|s| s.to_string())
}

/// Deletes every file whose label contains a pattern.
#[derive(Debug, Clone)]
pub struct BulkRemover {
    client: ShopifyClient,
    admin_password: Option<SecretString>,
    settings: RemovalSettings,
}

impl BulkRemover {
    pub fn new(
        client: ShopifyClient,
        admin_password: Option<SecretString>,
        settings: RemovalSettings,
    ) -> Self {
        Self {
            client,
            admin_password,
            settings,
        }
    }

    /// Authorize, enumerate, filter and delete.
    ///
    /// The platform is not contacted until the secret check passes. Batch
    /// failures are reported in the result rather than aborting the run.
    pub async fn remove(
        &self,
        search_pattern: Option<&str>,
        supplied_secret: Option<&str>,
    ) -> RelayResult<RemovalReport> {
        verify_shared_secret(self.admin_password.as_ref(), supplied_secret)?;

        let pattern = search_pattern.map(str::trim).unwrap_or_default();
        if pattern.chars().count() < MIN_PATTERN_LEN {
            return Err(RelayError::PatternTooShort {
                min: MIN_PATTERN_LEN,
            });
        }
        let needle = pattern.to_lowercase();

        let files = self.list_all().await?;
        let matched: Vec<(String, String)> = files
            .iter()
            .map(|node| (node.id.clone(), file_label(node)))
            .filter(|(_, label)| label.to_lowercase().contains(&needle))
            .collect();

        tracing::info!(
            pattern = %pattern,
            scanned = files.len(),
            matched = matched.len(),
            "Removal candidates collected"
        );

        if matched.len() > self.settings.max_matches {
            return Err(RelayError::TooManyMatches {
                matched: matched.len(),
                limit: self.settings.max_matches,
            });
        }

        let ids: Vec<String> = matched.iter().map(|(id, _)| id.clone()).collect();
        let (deleted, errors) = self.delete_in_batches(&ids).await;

        let details: Vec<RemovalDetail> = matched
            .into_iter()
            .map(|(id, label)| RemovalDetail {
                deleted: deleted.contains(&id),
                id,
                label,
            })
            .collect();
        let files_removed = details.iter().filter(|d| d.deleted).count();
        metrics::record_assets_deleted(files_removed);

        tracing::info!(
            pattern = %pattern,
            removed = files_removed,
            matched = details.len(),
            failed_batches = errors.len(),
            "Removal finished"
        );

        Ok(RemovalReport {
            files_removed,
            total_matched: details.len(),
            details,
            errors,
        })
    }

    /// Walk the full listing, page by page.
    async fn list_all(&self) -> RelayResult<Vec<FileNode>> {
        let mut files = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = self
                .client
                .list_files(self.settings.page_size, cursor.as_deref())
                .await
                .map_err(|e| e.into_relay(|msg| RelayError::Upstream(format!("file listing failed: {}", msg))))?;
            pages += 1;
            files.extend(page.files);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!(pages, files = files.len(), "File listing complete");
        Ok(files)
    }

    async fn delete_in_batches(&self, ids: &[String]) -> (HashSet<String>, Vec<BatchError>) {
        let mut deleted = HashSet::new();
        let mut errors = Vec::new();

        for (index, chunk) in ids.chunks(self.settings.batch_size).enumerate() {
            if index > 0 && !self.settings.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_batch_delay).await;
            }
            let batch = index + 1;

            match self.client.delete_files(chunk).await {
                Ok(outcome) => {
                    tracing::debug!(batch, requested = chunk.len(), deleted = outcome.deleted_ids.len(), "Batch deleted");
                    if !outcome.user_errors.is_empty() {
                        errors.push(BatchError {
                            batch,
                            file_ids: chunk.to_vec(),
                            message: describe_user_errors(&outcome.user_errors),
                        });
                    }
                    deleted.extend(outcome.deleted_ids);
                }
                Err(e) => {
                    tracing::warn!(batch, error = %e, "Batch delete failed");
                    errors.push(BatchError {
                        batch,
                        file_ids: chunk.to_vec(),
                        message: e.to_string(),
                    });
                }
            }
        }

        (deleted, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: serde_json::Value) -> FileNode {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_label_prefers_alt() {
        let n = node(json!({
            "__typename": "MediaImage",
            "id": "gid://shopify/MediaImage/1",
            "alt": "Thomas_Family_1.jpg",
            "image": { "url": "https://cdn.example.com/files/other.jpg?v=1" }
        }));
        assert_eq!(file_label(&n), "Thomas_Family_1.jpg");
    }

    #[test]
    fn test_label_falls_back_to_url_filename() {
        let n = node(json!({
            "__typename": "MediaImage",
            "id": "gid://shopify/MediaImage/1",
            "alt": "  ",
            "image": { "url": "https://cdn.example.com/s/files/1/Thomas_Family.jpg?v=17" }
        }));
        assert_eq!(file_label(&n), "Thomas_Family.jpg");
    }

    #[test]
    fn test_label_falls_back_to_id() {
        let n = node(json!({ "__typename": "MediaImage", "id": "gid://shopify/MediaImage/9" }));
        assert_eq!(file_label(&n), "gid://shopify/MediaImage/9");
    }

    #[test]
    fn test_settings_clamp_batch_size() {
        let settings = RemovalSettings::from(&RemovalConfig {
            batch_size: 0,
            ..RemovalConfig::default()
        });
        assert_eq!(settings.batch_size, 1);
    }
}
