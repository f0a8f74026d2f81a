//! Milestone model - a dated sub-task of an indicator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::error::{validate_progress, ValidationError};
use crate::id::{IndicatorId, MilestoneId};
use crate::Time;

/// A milestone belongs to exactly one indicator for its whole life.
///
/// `status` is whatever label the data carries. It is not derived from
/// `progress` and the two may disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique identifier
    pub id: MilestoneId,

    /// Owning indicator
    pub indicator_id: IndicatorId,

    /// Milestone name
    pub name: Option<String>,

    /// Planned start
    pub start_date: Option<NaiveDate>,

    /// Planned end
    pub end_date: Option<NaiveDate>,

    /// Percentage complete (0-100)
    pub progress: f64,

    /// Free-text state label
    pub status: Option<String>,

    /// Person in charge
    pub responsible: Option<String>,

    /// When created
    pub created_at: Time,

    /// Last updated
    pub updated_at: Time,
}

/// Attributes for a new milestone. The owner is passed separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewMilestone {
    /// Milestone name
    pub name: Option<String>,
    /// Planned start
    pub start_date: Option<NaiveDate>,
    /// Planned end
    pub end_date: Option<NaiveDate>,
    /// Percentage complete, 0 when omitted
    pub progress: Option<f64>,
    /// Free-text state label
    pub status: Option<String>,
    /// Person in charge
    pub responsible: Option<String>,
}

impl NewMilestone {
    /// Progress to store, defaulting to 0.
    pub fn checked_progress(&self) -> Result<f64, ValidationError> {
        validate_progress(self.progress.unwrap_or(0.0))
    }
}

/// Partial update of a milestone. The owning indicator cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestonePatch {
    /// New name
    pub name: Option<String>,
    /// New planned start
    pub start_date: Option<NaiveDate>,
    /// New planned end
    pub end_date: Option<NaiveDate>,
    /// New percentage complete (0-100)
    pub progress: Option<f64>,
    /// New state label
    pub status: Option<String>,
    /// New person in charge
    pub responsible: Option<String>,
}

impl MilestonePatch {
    /// No field is set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.progress.is_none()
            && self.status.is_none()
            && self.responsible.is_none()
    }

    /// Write the provided fields into `milestone` and stamp `now`.
    ///
    /// The milestone is left untouched when validation fails.
    pub fn apply_to(&self, milestone: &mut Milestone, now: Time) -> Result<(), ValidationError> {
        let progress = self.progress.map(validate_progress).transpose()?;

        if let Some(name) = &self.name {
            milestone.name = Some(name.clone());
        }
        if let Some(date) = self.start_date {
            milestone.start_date = Some(date);
        }
        if let Some(date) = self.end_date {
            milestone.end_date = Some(date);
        }
        if let Some(progress) = progress {
            milestone.progress = progress;
        }
        if let Some(status) = &self.status {
            milestone.status = Some(status.clone());
        }
        if let Some(responsible) = &self.responsible {
            milestone.responsible = Some(responsible.clone());
        }
        milestone.updated_at = now;
        Ok(())
    }
}
