//! restore-verify - scheduled proof that the latest database dump restores
//!
//! On a dedicated recovery host, one run selects the newest dump, restores
//! it into a fresh database, audits the engine log, measures the result,
//! drops the database and reports a single outcome to the operator.

pub mod audit;
pub mod cli;
pub mod context;
pub mod dump;
pub mod engine;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod preflight;
pub mod runlog;
pub mod stats;
