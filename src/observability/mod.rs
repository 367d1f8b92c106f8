//! Console observability for restore-verify
//!
//! - Structured logging (JSON lines on stderr)
//! - Typed lifecycle events
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on the run
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! The durable, operator-facing record of a run lives in [`crate::runlog`];
//! this module is the console mirror of it.
//!
//! # Usage
//!
//! ```ignore
//! use restore_verify::observability::{log_event_with_fields, Event, Severity};
//!
//! log_event_with_fields(Event::DumpSelected, Severity::Info, &[("path", "/backups/x")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event with fields to the console
pub fn log_event_with_fields(event: Event, severity: Severity, fields: &[(&str, &str)]) {
    Logger::log(severity, event.as_str(), fields);
}
