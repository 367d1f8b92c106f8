//! Recovery host guard
//!
//! Restore and drop are destructive. They only ever run on the host named
//! as the recovery target; any difference, including case, is a mismatch.

use super::errors::{PreconditionError, PreconditionResult};

/// Compare the expected recovery host against the actual one.
pub fn check_host(expected: &str, actual: &str) -> PreconditionResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(PreconditionError::HostMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}
