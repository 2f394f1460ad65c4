//! One-call registration of the built-in formats.

use crate::error::SdkResult;

/// Register save, read, and validate handlers for every built-in value
/// type. Idempotent; registrations already in place are left alone, so
/// applications may install their own handlers first.
pub fn install() -> SdkResult<()> {
    selenite_formats::install()?;
    Ok(())
}
