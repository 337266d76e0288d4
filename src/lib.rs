//! Shop media relay library.
//!
//! Relays customer image uploads into a shop's file storage through the
//! Admin GraphQL API, waits for the platform to finish processing them, and
//! offers a password-gated bulk removal of stored files.

// Upstream platform
pub mod shopify;

// Core operations
pub mod pipeline;
pub mod removal;

// HTTP boundary
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use http::RelayServer;
pub use lifecycle::Shutdown;
