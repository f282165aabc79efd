//! Shared time types, configuration, error, and logging plumbing used by
//! every `fathom-*` crate.

pub mod config;
pub mod error;
pub mod logging;
pub mod signals;
pub mod snapshot;
pub mod time;

pub use error::FathomError;
pub use signals::RttSignals;
pub use snapshot::{ReportSnapshot, NO_SAMPLE};
pub use time::{Duration, Instant};
