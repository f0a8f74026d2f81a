//! Identifiers for Hitos entities.
//!
//! Ids are assigned by the store on insert and never change afterwards.

use serde::{Deserialize, Serialize};

/// Unique identifier for an Indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorId(i64);

impl IndicatorId {
    /// Wrap a raw row id
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw row id
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for IndicatorId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for IndicatorId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Unique identifier for a Milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MilestoneId(i64);

impl MilestoneId {
    /// Wrap a raw row id
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw row id
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for MilestoneId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for MilestoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for MilestoneId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}
