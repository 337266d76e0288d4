//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Root configuration for the media relay.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// External storefront connection.
    pub shop: ShopConfig,

    /// Upload pipeline tuning.
    pub upload: UploadConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Bulk removal settings.
    pub removal: RemovalConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Overall per-request ceiling in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted JSON body in bytes. Base64 inflates payloads by a
    /// third, so this must cover four thirds of `upload.max_image_bytes`
    /// plus room for the envelope.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 60,
            max_body_bytes: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// Storefront (Shopify Admin API) connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Shop domain, e.g. "example.myshopify.com".
    pub domain: Option<String>,

    /// Admin API version segment.
    pub api_version: String,

    /// Admin API access token.
    pub access_token: Option<SecretString>,

    /// Full GraphQL endpoint. Overrides the URL derived from `domain`.
    pub graphql_endpoint: Option<String>,

    /// Per-call timeout for outbound requests in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            domain: None,
            api_version: "2024-10".to_string(),
            access_token: None,
            graphql_endpoint: None,
            request_timeout_secs: 30,
        }
    }
}

impl ShopConfig {
    /// Resolve the GraphQL endpoint, if enough is configured to build one.
    pub fn endpoint(&self) -> Option<String> {
        if let Some(endpoint) = &self.graphql_endpoint {
            return Some(endpoint.clone());
        }
        self.domain
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(|domain| {
                format!(
                    "https://{}/admin/api/{}/graphql.json",
                    domain.trim().trim_end_matches('/'),
                    self.api_version
                )
            })
    }
}

/// Upload pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Ceiling on decoded image size in bytes.
    pub max_image_bytes: usize,

    /// Delay between readiness polls in milliseconds.
    pub poll_interval_ms: u64,

    /// Total time to wait for processing before giving up, in seconds.
    pub poll_timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 10 * 1024 * 1024, // 10MB
            poll_interval_ms: 1000,
            poll_timeout_secs: 20,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per identity per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// How often expired windows are swept, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 50,
            window_secs: 3600,
            sweep_interval_secs: 300, // 5 minutes
        }
    }
}

/// Bulk removal configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    /// Shared secret required by the removal endpoint. Removal is disabled
    /// when absent.
    pub admin_password: Option<SecretString>,

    /// Abort without deleting when more assets than this match.
    pub max_matches: usize,

    /// Ids per delete call.
    pub batch_size: usize,

    /// Assets fetched per listing page.
    pub page_size: u32,

    /// Pause between delete batches in milliseconds.
    pub inter_batch_delay_ms: u64,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            admin_password: None,
            max_matches: 1000,
            batch_size: 10,
            page_size: 250,
            inter_batch_delay_ms: 500,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
