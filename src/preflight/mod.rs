//! Preconditions of a verification run
//!
//! Checked in this order, each one fatal:
//!
//! 1. Required directories exist and are readable
//! 2. The process runs on the designated recovery host
//! 3. The engine is running
//! 4. The target database does not exist yet
//!
//! Nothing here changes state. The dump selector ([`crate::dump`]) runs
//! right after and reports through the same error type.

mod environment;
mod errors;
mod host;
mod state;

pub use environment::{check_readable_dir, validate_paths};
pub use errors::{PreconditionError, PreconditionResult};
pub use host::check_host;
pub use state::{check_engine_running, check_target_absent};
