//! Error taxonomy shared by the upload pipeline, the remover and the HTTP
//! boundary.

use thiserror::Error;

/// Every way a relay request can fail.
///
/// Nothing in the relay retries; each variant is terminal for the request
/// and carries enough upstream detail for the caller to decide what to do.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Caller supplied a missing or malformed field.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Caller exhausted its request window.
    #[error("Rate limit exceeded, retry in {reset_in_minutes} minutes")]
    RateLimited { reset_in_minutes: u64 },

    /// Missing or wrong shared secret.
    #[error("Unauthorized")]
    Unauthorized,

    /// A required credential or setting is absent.
    #[error("Server misconfigured: {0}")]
    ServerMisconfigured(String),

    /// The platform refused or garbled the staged upload request.
    #[error("Staging failed: {0}")]
    StagingFailed(String),

    /// The blob store rejected the byte transfer.
    #[error("Transfer failed with status {status}: {body}")]
    TransferFailed { status: u16, body: String },

    /// The platform refused to register the transferred file.
    #[error("Finalization failed: {0}")]
    FinalizationFailed(String),

    /// The platform reported processing failure for the asset.
    #[error("Processing failed for {asset_id}: {reason}")]
    ProcessingFailed { asset_id: String, reason: String },

    /// The asset was still pending when the poll ceiling was reached.
    #[error("Asset {asset_id} still {status} after {waited_secs} seconds")]
    ProcessingTimeout {
        asset_id: String,
        status: String,
        waited_secs: u64,
    },

    /// Removal pattern below the minimum length.
    #[error("Search pattern must be at least {min} characters")]
    PatternTooShort { min: usize },

    /// Removal pattern matched more assets than allowed in one run.
    #[error("Pattern matched {matched} files, more than the limit of {limit}")]
    TooManyMatches { matched: usize, limit: usize },

    /// Network-level failure talking to the platform.
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The platform answered a query (listing, status) with an error.
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl RelayError {
    /// Short, stable phrase for the `error` field of a response body.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::InvalidInput(_) => "Invalid input",
            RelayError::RateLimited { .. } => "Rate limit exceeded",
            RelayError::Unauthorized => "Unauthorized",
            RelayError::ServerMisconfigured(_) => "Server configuration error",
            RelayError::StagingFailed(_) => "Failed to create staged upload",
            RelayError::TransferFailed { .. } => "Failed to upload file to storage",
            RelayError::FinalizationFailed(_) => "Failed to create file",
            RelayError::ProcessingFailed { .. } => "File processing failed",
            RelayError::ProcessingTimeout { .. } => "File still processing",
            RelayError::PatternTooShort { .. } => "Search pattern too short",
            RelayError::TooManyMatches { .. } => "Too many matches",
            RelayError::UpstreamUnreachable(_) => "Upstream unreachable",
            RelayError::Upstream(_) => "Upstream error",
        }
    }

    /// Label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::InvalidInput(_) => "invalid_input",
            RelayError::RateLimited { .. } => "rate_limited",
            RelayError::Unauthorized => "unauthorized",
            RelayError::ServerMisconfigured(_) => "server_misconfigured",
            RelayError::StagingFailed(_) => "staging_failed",
            RelayError::TransferFailed { .. } => "transfer_failed",
            RelayError::FinalizationFailed(_) => "finalization_failed",
            RelayError::ProcessingFailed { .. } => "processing_failed",
            RelayError::ProcessingTimeout { .. } => "processing_timeout",
            RelayError::PatternTooShort { .. } => "pattern_too_short",
            RelayError::TooManyMatches { .. } => "too_many_matches",
            RelayError::UpstreamUnreachable(_) => "upstream_unreachable",
            RelayError::Upstream(_) => "upstream",
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        // Strip the URL: staged targets carry signed query strings.
        RelayError::UpstreamUnreachable(err.without_url().to_string())
    }
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RelayError::TransferFailed {
            status: 403,
            body: "SignatureDoesNotMatch".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Transfer failed with status 403: SignatureDoesNotMatch"
        );

        let err = RelayError::TooManyMatches {
            matched: 1500,
            limit: 1000,
        };
        assert!(err.to_string().contains("1500"));
    }

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            RelayError::InvalidInput(String::new()),
            RelayError::RateLimited { reset_in_minutes: 1 },
            RelayError::Unauthorized,
            RelayError::ServerMisconfigured(String::new()),
            RelayError::StagingFailed(String::new()),
            RelayError::TransferFailed { status: 500, body: String::new() },
            RelayError::FinalizationFailed(String::new()),
            RelayError::ProcessingFailed { asset_id: String::new(), reason: String::new() },
            RelayError::ProcessingTimeout { asset_id: String::new(), status: String::new(), waited_secs: 0 },
            RelayError::PatternTooShort { min: 2 },
            RelayError::TooManyMatches { matched: 0, limit: 0 },
            RelayError::UpstreamUnreachable(String::new()),
            RelayError::Upstream(String::new()),
        ];
        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }
}
