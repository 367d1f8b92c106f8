//! Required directory checks
//!
//! A directory passes when it exists, is a directory, and its entries can
//! be listed by this process.

use std::fs;
use std::path::Path;

use super::errors::{PreconditionError, PreconditionResult};

/// Verify a single directory is present and readable.
pub fn check_readable_dir(path: &Path) -> PreconditionResult<()> {
    let unavailable = |detail: String| PreconditionError::PathUnavailable {
        path: path.to_path_buf(),
        detail,
    };

    let metadata = fs::metadata(path).map_err(|e| unavailable(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(unavailable("not a directory".to_string()));
    }

    fs::read_dir(path).map_err(|e| unavailable(e.to_string()))?;

    Ok(())
}

/// Verify every path in order, stopping at the first violation.
pub fn validate_paths<P: AsRef<Path>>(paths: &[P]) -> PreconditionResult<()> {
    for path in paths {
        check_readable_dir(path.as_ref())?;
    }
    Ok(())
}
