//! Statistics service over the indicator store.

use std::sync::Arc;

use async_trait::async_trait;
use hitos_storage::{Storage, StorageError};
use tracing::debug;

use crate::report::StatisticsReport;

/// Statistics service.
#[async_trait]
pub trait StatisticsService: Send + Sync {
    /// Summarize every indicator and milestone in the store.
    async fn compute_statistics(&self) -> Result<StatisticsReport, StorageError>;

    /// Summarize the indicators of one area only.
    async fn compute_area_statistics(&self, area: &str) -> Result<StatisticsReport, StorageError>;
}

/// Computes reports straight from the store.
///
/// Nothing is cached: every call re-reads the current state, so two calls
/// with no write in between return equal reports.
pub struct StatisticsEngine<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> StatisticsEngine<S> {
    /// Create a new statistics engine.
    pub fn new(storage: S) -> Self {
        Self::with_shared(Arc::new(storage))
    }

    /// Create an engine over a store that is also used elsewhere.
    pub fn with_shared(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: Storage + 'static> StatisticsService for StatisticsEngine<S> {
    async fn compute_statistics(&self) -> Result<StatisticsReport, StorageError> {
        // One read transaction, so the report matches a committed snapshot.
        let indicators = self.storage.list_indicators(0, None).await?;
        let report = StatisticsReport::from_indicators(&indicators);

        debug!(
            indicators = report.total_indicators,
            milestones = report.total_milestones,
            "computed statistics"
        );
        Ok(report)
    }

    async fn compute_area_statistics(&self, area: &str) -> Result<StatisticsReport, StorageError> {
        let indicators = self.storage.list_indicators_by_area(area).await?;
        let report = StatisticsReport::from_indicators(&indicators);

        debug!(area, indicators = report.total_indicators, "computed area statistics");
        Ok(report)
    }
}
