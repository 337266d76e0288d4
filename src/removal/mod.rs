//! Bulk removal.
//!
//! # Data Flow
//! ```text
//! {searchPattern, adminPassword}
//!     → security::secret (Unauthorized / ServerMisconfigured)
//!     → pattern floor (PatternTooShort)
//!     → files(first, after) until hasNextPage = false
//!     → case-insensitive label match
//!     → ceiling (TooManyMatches, nothing deleted)
//!     → fileDelete per batch, paced
//!     → RemovalReport (per-file confirmation, per-batch errors)
//! ```

pub mod remover;

pub use remover::{BatchError, BulkRemover, RemovalDetail, RemovalReport, RemovalSettings};
