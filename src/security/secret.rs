//! Shared-secret check for administrative operations.

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::error::RelayError;

/// Verify a caller-supplied secret against the configured one.
///
/// No configured secret disables the operation outright
/// (`ServerMisconfigured`); a missing or different supplied secret is
/// `Unauthorized`.
pub fn verify_shared_secret(
    configured: Option<&SecretString>,
    supplied: Option<&str>,
) -> Result<(), RelayError> {
    let configured = configured
        .map(|s| s.expose_secret().as_bytes())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            RelayError::ServerMisconfigured("admin password is not configured".to_string())
        })?;

    let supplied = supplied.filter(|s| !s.is_empty()).ok_or(RelayError::Unauthorized)?;

    if bool::from(configured.ct_eq(supplied.as_bytes())) {
        Ok(())
    } else {
        Err(RelayError::Unauthorized)
    }
}
