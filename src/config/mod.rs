//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! relay.toml (optional)
//!     → loader.rs (parse, overlay SHOPIFY_* / ADMIN_PASSWORD env vars)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → server swaps its runtime (client, pipeline, remover)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Secrets are wrapped in `SecretString` so they never reach logs
//! - Missing credentials are a per-request error, not a startup failure

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::ObservabilityConfig;
pub use schema::RateLimitConfig;
pub use schema::RelayConfig;
pub use schema::RemovalConfig;
pub use schema::ServerConfig;
pub use schema::ShopConfig;
pub use schema::UploadConfig;
