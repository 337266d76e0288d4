//! HTTP boundary.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (router, CORS, request ID, trace span, timeout)
//!     → security::rate_limit (upload route only)
//!     → upload.rs / remove.rs (parse JSON, call pipeline or remover)
//!     → response.rs (RelayError → status + JSON body)
//! ```

pub mod remove;
pub mod request;
pub mod response;
pub mod server;
pub mod upload;

pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{AppState, RelayServer, Runtime};
