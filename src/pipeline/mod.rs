//! Upload pipeline.
//!
//! # Data Flow
//! ```text
//! {filename, data URI}
//!     → data_uri.rs (validate, decode, sniff)         InvalidInput
//!     → stagedUploadsCreate                           StagingFailed
//!     → multipart POST to the staged target           TransferFailed
//!     → fileCreate                                    FinalizationFailed
//!     → node(id) every poll_interval until READY      ProcessingFailed / ProcessingTimeout
//!     → {url, assetId}
//! ```
//!
//! # Design Decisions
//! - Strictly sequential; each step consumes the previous step's output
//! - No step is retried; the caller resubmits the whole request
//! - A timed-out asset can be rechecked later by id

pub mod data_uri;
pub mod upload;

pub use upload::{AssetStatus, PipelineSettings, UploadPipeline, UploadedAsset};
