//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges. All errors are collected
//! so an operator sees every problem in one pass.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::RelayConfig;

/// Largest id list the platform accepts in one delete call.
pub const MAX_DELETE_BATCH: usize = 250;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded configuration.
///
/// Missing shop credentials are not an error here: they surface as
/// misconfiguration on each request instead, so the process still starts.
/// Room for the JSON envelope, filename and data-URI prefix.
const BODY_HEADROOM: usize = 64 * 1024;

/// Smallest body limit that admits an image of `max_image_bytes` once
/// base64-encoded.
pub fn min_body_bytes(max_image_bytes: usize) -> usize {
    max_image_bytes.div_ceil(3).saturating_mul(4).saturating_add(BODY_HEADROOM)
}

pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }
    let min_body = min_body_bytes(config.upload.max_image_bytes);
    if config.server.max_body_bytes < min_body {
        errors.push(ValidationError::new(
            "server.max_body_bytes",
            format!(
                "must be at least {} to carry a base64-encoded upload.max_image_bytes",
                min_body
            ),
        ));
    }

    if let Some(endpoint) = &config.shop.graphql_endpoint {
        if url::Url::parse(endpoint).is_err() {
            errors.push(ValidationError::new(
                "shop.graphql_endpoint",
                format!("'{}' is not a valid URL", endpoint),
            ));
        }
    }

    if config.upload.max_image_bytes == 0 {
        errors.push(ValidationError::new("upload.max_image_bytes", "must be > 0"));
    }
    if config.upload.poll_interval_ms == 0 {
        errors.push(ValidationError::new("upload.poll_interval_ms", "must be > 0"));
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be > 0"));
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be > 0"));
    }
    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("rate_limit.sweep_interval_secs", "must be > 0"));
    }

    if config.removal.batch_size == 0 || config.removal.batch_size > MAX_DELETE_BATCH {
        errors.push(ValidationError::new(
            "removal.batch_size",
            format!("must be between 1 and {}", MAX_DELETE_BATCH),
        ));
    }
    if config.removal.page_size == 0 || config.removal.page_size > 250 {
        errors.push(ValidationError::new("removal.page_size", "must be between 1 and 250"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
