//! Hitos core data models.
//!
//! This crate defines the indicator/milestone hierarchy shared by the
//! store, the statistics engine and the command line front end.

#![warn(missing_docs)]

// Core identities
mod id;

// Indicators and their milestones
mod indicator;
mod milestone;

mod error;

// Re-exports
pub use id::*;

pub use indicator::{Indicator, IndicatorPatch, NewIndicator};
pub use milestone::{Milestone, MilestonePatch, NewMilestone};
pub use error::{validate_progress, ValidationError};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

/// Treat empty and whitespace-only text as missing.
///
/// Returns the value unchanged otherwise, so observed labels keep their
/// original spelling.
pub fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
