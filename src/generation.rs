use crate::{Error, HResult, Result};
use tracing::info;

/// A platform interface that exists in a newer and an older revision
#[derive(Debug)]
pub enum Generation<M, L> {
    Modern(M),
    Legacy(L),
}

/// Create the modern interface, falling back to the legacy one when that fails.
///
/// The creators return the failing status code, when both fail the legacy code is reported.
pub fn create_with_fallback<M, L>(
    modern: impl FnOnce() -> Result<M, i32>,
    legacy: impl FnOnce() -> Result<L, i32>,
) -> Result<Generation<M, L>> {
    match modern() {
        Ok(modern) => return Ok(Generation::Modern(modern)),
        Err(hr) => info!(hr = %HResult(hr), "modern interface not available, falling back"),
    }
    legacy()
        .map(Generation::Legacy)
        .map_err(|hr| Error::CreateFactory { hr: HResult(hr) })
}
