//! Storefront platform integration.
//!
//! # Data Flow
//! ```text
//! pipeline / removal
//!     → client.rs (authenticated GraphQL POST, blob transfer)
//!     → queries.rs (documents)
//!     → types.rs (envelopes → CreatedAsset / StagedTarget / DeleteOutcome)
//! ```
//!
//! # Design Decisions
//! - One client per loaded configuration; rebuilt on reload
//! - File subtypes become a tagged enum at the boundary, never strings
//! - Transport failures are kept apart from platform-reported errors

pub mod client;
pub mod queries;
pub mod types;

pub use client::{CallError, FilePage, ShopifyClient};
pub use types::{AssetKind, CreatedAsset, FileStatus, StagedTarget};
