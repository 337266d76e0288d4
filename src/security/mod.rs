//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/upload:
//!     → rate_limit.rs (per-identity fixed window, quota headers)
//!     → upload handler
//!
//! POST /api/remove:
//!     → secret.rs (shared-secret check, before any platform call)
//!     → remove handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: unidentifiable callers share one bucket
//! - Limiter state is process-local and approximate across instances
//! - Secrets compared in constant time and never logged

pub mod rate_limit;
pub mod secret;

pub use rate_limit::{client_identity, Admission, RateLimiter};
pub use secret::verify_shared_secret;
