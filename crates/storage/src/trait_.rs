//! Storage trait abstraction.

use async_trait::async_trait;
use hitos_core::{
    Indicator, IndicatorId, IndicatorPatch, Milestone, MilestoneId, MilestonePatch,
    NewIndicator, NewMilestone, ValidationError,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attribute set with the wrong shape
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Connection or transaction failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// Whether this is a missing-reference error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Persistence for indicators and their milestones.
///
/// Every call runs in its own transaction. A lookup of an absent id is
/// reported as `Ok(None)` or `Ok(false)`. Only a missing parent on
/// milestone operations is an error.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Indicator operations ===

    /// Insert a new indicator without milestones.
    async fn create_indicator(&self, new: &NewIndicator) -> Result<Indicator>;

    /// Load an indicator together with its milestones.
    async fn get_indicator(&self, id: IndicatorId) -> Result<Option<Indicator>>;

    /// Page through indicators by id. `limit: None` returns everything
    /// after `offset`.
    async fn list_indicators(&self, offset: u32, limit: Option<u32>) -> Result<Vec<Indicator>>;

    /// Indicators whose area matches exactly.
    async fn list_indicators_by_area(&self, area: &str) -> Result<Vec<Indicator>>;

    /// Apply a partial update. Milestones are left alone.
    async fn update_indicator(&self, id: IndicatorId, patch: &IndicatorPatch) -> Result<Option<Indicator>>;

    /// Delete an indicator and every milestone it owns.
    async fn delete_indicator(&self, id: IndicatorId) -> Result<bool>;

    /// Number of stored indicators.
    async fn count_indicators(&self) -> Result<u64>;

    // === Milestone operations ===

    /// Insert a milestone under an existing indicator.
    async fn create_milestone(&self, indicator_id: IndicatorId, new: &NewMilestone) -> Result<Milestone>;

    /// Load a milestone by ID.
    async fn get_milestone(&self, id: MilestoneId) -> Result<Option<Milestone>>;

    /// Milestones of an existing indicator, in insertion order.
    async fn list_milestones(&self, indicator_id: IndicatorId) -> Result<Vec<Milestone>>;

    /// Apply a partial update to a milestone.
    async fn update_milestone(&self, id: MilestoneId, patch: &MilestonePatch) -> Result<Option<Milestone>>;

    /// Delete a single milestone.
    async fn delete_milestone(&self, id: MilestoneId) -> Result<bool>;

    /// Number of stored milestones.
    async fn count_milestones(&self) -> Result<u64>;
}
