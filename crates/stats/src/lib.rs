//! Statistics aggregation (dashboard)
//!
//! Counts by organizational unit, area and type, milestone status
//! distribution, progress averages and data-completeness signals.

#![warn(missing_docs)]

pub mod engine;
pub mod report;

pub use engine::{StatisticsEngine, StatisticsService};
pub use report::{CompletenessMetrics, StatisticsReport};
