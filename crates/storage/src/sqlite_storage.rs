//! SQLite storage backend for Hitos.
//!
//! Indicators and milestones live in two relational tables. Every operation
//! opens one transaction on a pooled connection and either commits all of its
//! writes or none: a transaction dropped before `commit` rolls back.
//!
//! Writing transactions start with a write statement. SQLite then takes the
//! write lock up front and a competing writer waits out `busy_timeout`
//! instead of failing on a read-to-write upgrade.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hitos_core::{
    Indicator, IndicatorId, IndicatorPatch, Milestone, MilestoneId, MilestonePatch,
    NewIndicator, NewMilestone,
};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info, warn};

use super::config::StorageConfig;
use super::trait_::{Result, Storage, StorageError};

/// Upper bound on ids bound into a single `IN (...)` clause.
const BIND_CHUNK: usize = 500;

/// SQLite storage implementation.
#[derive(Clone)]
pub struct SqliteStorage {
    /// Database connection pool
    pool: sqlx::SqlitePool,
}

impl SqliteStorage {
    /// Open (and if needed create) the database described by `config`.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let mut options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(config.create_if_missing)
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));
        if !config.is_in_memory() {
            // Readers keep going while a writer holds the lock.
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections.max(1));
        if config.is_in_memory() {
            // The database vanishes with its last connection.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;

        let storage = Self { pool };
        storage.init_schema().await?;

        info!(url = %config.database_url, "opened indicator store");
        Ok(storage)
    }

    /// Create an in-memory SQLite storage for testing.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&StorageConfig::in_memory()).await
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS indicators (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vp TEXT,
                area TEXT,
                name TEXT,
                kind TEXT,
                start_date TEXT,
                end_date TEXT,
                responsible TEXT,
                data_entry_responsible TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS milestones (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                indicator_id INTEGER NOT NULL REFERENCES indicators(id) ON DELETE CASCADE,
                name TEXT,
                start_date TEXT,
                end_date TEXT,
                progress REAL NOT NULL DEFAULT 0,
                status TEXT,
                responsible TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // Create indexes
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_indicators_vp ON indicators(vp)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_indicators_area ON indicators(area)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_milestones_indicator ON milestones(indicator_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Check if the database is healthy.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn indicator_from_row(row: &SqliteRow) -> Result<Indicator> {
    Ok(Indicator {
        id: IndicatorId::new(row.try_get("id")?),
        vp: row.try_get("vp")?,
        area: row.try_get("area")?,
        name: row.try_get("name")?,
        kind: row.try_get("kind")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        responsible: row.try_get("responsible")?,
        data_entry_responsible: row.try_get("data_entry_responsible")?,
        milestones: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn milestone_from_row(row: &SqliteRow) -> Result<Milestone> {
    Ok(Milestone {
        id: MilestoneId::new(row.try_get("id")?),
        indicator_id: IndicatorId::new(row.try_get("indicator_id")?),
        name: row.try_get("name")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        progress: row.try_get("progress")?,
        status: row.try_get("status")?,
        responsible: row.try_get("responsible")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn indicator_exists(conn: &mut SqliteConnection, id: IndicatorId) -> Result<bool> {
    let row = sqlx::query("SELECT id FROM indicators WHERE id = ?")
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

async fn fetch_indicator(conn: &mut SqliteConnection, id: IndicatorId) -> Result<Option<Indicator>> {
    let row = sqlx::query(
        "SELECT id, vp, area, name, kind, start_date, end_date, responsible,
                data_entry_responsible, created_at, updated_at
         FROM indicators WHERE id = ?",
    )
    .bind(id.get())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut indicator = indicator_from_row(&row)?;
    indicator.milestones = fetch_milestones_of(conn, id).await?;
    Ok(Some(indicator))
}

async fn fetch_milestones_of(conn: &mut SqliteConnection, indicator_id: IndicatorId) -> Result<Vec<Milestone>> {
    let rows = sqlx::query(
        "SELECT id, indicator_id, name, start_date, end_date, progress, status, responsible,
                created_at, updated_at
         FROM milestones WHERE indicator_id = ? ORDER BY id",
    )
    .bind(indicator_id.get())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(milestone_from_row).collect()
}

async fn fetch_milestone(conn: &mut SqliteConnection, id: MilestoneId) -> Result<Option<Milestone>> {
    let row = sqlx::query(
        "SELECT id, indicator_id, name, start_date, end_date, progress, status, responsible,
                created_at, updated_at
         FROM milestones WHERE id = ?",
    )
    .bind(id.get())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(milestone_from_row).transpose()
}

/// Load the milestones of a page of indicators with one query per chunk.
async fn attach_milestones(conn: &mut SqliteConnection, indicators: &mut [Indicator]) -> Result<()> {
    if indicators.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = indicators.iter().map(|i| i.id.get()).collect();
    let mut owned: HashMap<IndicatorId, Vec<Milestone>> = HashMap::new();

    for chunk in ids.chunks(BIND_CHUNK) {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, indicator_id, name, start_date, end_date, progress, status, responsible,
                    created_at, updated_at
             FROM milestones WHERE indicator_id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id");

        let rows = builder.build().fetch_all(&mut *conn).await?;
        for row in &rows {
            let milestone = milestone_from_row(row)?;
            owned.entry(milestone.indicator_id).or_default().push(milestone);
        }
    }

    for indicator in indicators.iter_mut() {
        indicator.milestones = owned.remove(&indicator.id).unwrap_or_default();
    }

    Ok(())
}

#[async_trait]
impl Storage for SqliteStorage {
    // === Indicator operations ===

    async fn create_indicator(&self, new: &NewIndicator) -> Result<Indicator> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            "INSERT INTO indicators (vp, area, name, kind, start_date, end_date, responsible,
                                     data_entry_responsible, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new.vp.as_deref())
        .bind(new.area.as_deref())
        .bind(new.name.as_deref())
        .bind(new.kind.as_deref())
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.responsible.as_deref())
        .bind(new.data_entry_responsible.as_deref())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let id = IndicatorId::new(id);
        let indicator = fetch_indicator(&mut tx, id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("indicator {id}")))?;
        tx.commit().await?;

        info!(indicator_id = %id, "created indicator");
        Ok(indicator)
    }

    async fn get_indicator(&self, id: IndicatorId) -> Result<Option<Indicator>> {
        let mut tx = self.pool.begin().await?;
        let indicator = fetch_indicator(&mut tx, id).await?;
        tx.commit().await?;

        debug!(indicator_id = %id, found = indicator.is_some(), "loaded indicator");
        Ok(indicator)
    }

    async fn list_indicators(&self, offset: u32, limit: Option<u32>) -> Result<Vec<Indicator>> {
        let mut tx = self.pool.begin().await?;

        // SQLite treats a negative LIMIT as unbounded.
        let rows = sqlx::query(
            "SELECT id, vp, area, name, kind, start_date, end_date, responsible,
                    data_entry_responsible, created_at, updated_at
             FROM indicators ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(limit.map(i64::from).unwrap_or(-1))
        .bind(i64::from(offset))
        .fetch_all(&mut *tx)
        .await?;

        let mut indicators = rows.iter().map(indicator_from_row).collect::<Result<Vec<_>>>()?;
        attach_milestones(&mut tx, &mut indicators).await?;
        tx.commit().await?;

        debug!(offset, ?limit, count = indicators.len(), "listed indicators");
        Ok(indicators)
    }

    async fn list_indicators_by_area(&self, area: &str) -> Result<Vec<Indicator>> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            "SELECT id, vp, area, name, kind, start_date, end_date, responsible,
                    data_entry_responsible, created_at, updated_at
             FROM indicators WHERE area = ? ORDER BY id",
        )
        .bind(area)
        .fetch_all(&mut *tx)
        .await?;

        let mut indicators = rows.iter().map(indicator_from_row).collect::<Result<Vec<_>>>()?;
        attach_milestones(&mut tx, &mut indicators).await?;
        tx.commit().await?;

        debug!(area, count = indicators.len(), "listed indicators by area");
        Ok(indicators)
    }

    async fn update_indicator(&self, id: IndicatorId, patch: &IndicatorPatch) -> Result<Option<Indicator>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Stamp first so the write lock is held before any read.
        let touched = sqlx::query("UPDATE indicators SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id.get())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if touched == 0 {
            warn!(indicator_id = %id, "update of unknown indicator");
            return Ok(None);
        }

        let mut indicator = fetch_indicator(&mut tx, id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("indicator {id}")))?;
        patch.apply_to(&mut indicator, now);

        sqlx::query(
            "UPDATE indicators
             SET vp = ?, area = ?, name = ?, kind = ?, start_date = ?, end_date = ?,
                 responsible = ?, data_entry_responsible = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(indicator.vp.as_deref())
        .bind(indicator.area.as_deref())
        .bind(indicator.name.as_deref())
        .bind(indicator.kind.as_deref())
        .bind(indicator.start_date)
        .bind(indicator.end_date)
        .bind(indicator.responsible.as_deref())
        .bind(indicator.data_entry_responsible.as_deref())
        .bind(indicator.updated_at)
        .bind(id.get())
        .execute(&mut *tx)
        .await?;

        let updated = fetch_indicator(&mut tx, id).await?;
        tx.commit().await?;

        info!(indicator_id = %id, "updated indicator");
        Ok(updated)
    }

    async fn delete_indicator(&self, id: IndicatorId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // Children first, so no milestone ever points at a missing indicator.
        let milestones = sqlx::query("DELETE FROM milestones WHERE indicator_id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM indicators WHERE id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            warn!(indicator_id = %id, "delete of unknown indicator");
            return Ok(false);
        }

        tx.commit().await?;

        info!(indicator_id = %id, milestones, "deleted indicator");
        Ok(true)
    }

    async fn count_indicators(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM indicators")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    // === Milestone operations ===

    async fn create_milestone(&self, indicator_id: IndicatorId, new: &NewMilestone) -> Result<Milestone> {
        let progress = new.checked_progress()?;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO milestones (indicator_id, name, start_date, end_date, progress, status,
                                     responsible, created_at, updated_at)
             SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?
             WHERE EXISTS (SELECT 1 FROM indicators WHERE id = ?)",
        )
        .bind(indicator_id.get())
        .bind(new.name.as_deref())
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(progress)
        .bind(new.status.as_deref())
        .bind(new.responsible.as_deref())
        .bind(now)
        .bind(now)
        .bind(indicator_id.get())
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            warn!(indicator_id = %indicator_id, "milestone for unknown indicator");
            return Err(StorageError::NotFound(format!("indicator {indicator_id}")));
        }

        let id = MilestoneId::new(inserted.last_insert_rowid());
        let milestone = fetch_milestone(&mut tx, id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("milestone {id}")))?;
        tx.commit().await?;

        info!(indicator_id = %indicator_id, milestone_id = %id, "created milestone");
        Ok(milestone)
    }

    async fn get_milestone(&self, id: MilestoneId) -> Result<Option<Milestone>> {
        let mut conn = self.pool.acquire().await?;
        fetch_milestone(&mut conn, id).await
    }

    async fn list_milestones(&self, indicator_id: IndicatorId) -> Result<Vec<Milestone>> {
        let mut tx = self.pool.begin().await?;

        if !indicator_exists(&mut tx, indicator_id).await? {
            return Err(StorageError::NotFound(format!("indicator {indicator_id}")));
        }

        let milestones = fetch_milestones_of(&mut tx, indicator_id).await?;
        tx.commit().await?;
        Ok(milestones)
    }

    async fn update_milestone(&self, id: MilestoneId, patch: &MilestonePatch) -> Result<Option<Milestone>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Stamp first so the write lock is held before any read.
        let touched = sqlx::query("UPDATE milestones SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id.get())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if touched == 0 {
            warn!(milestone_id = %id, "update of unknown milestone");
            return Ok(None);
        }

        let mut milestone = fetch_milestone(&mut tx, id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("milestone {id}")))?;
        // An invalid patch drops the transaction, which undoes the stamp above.
        patch.apply_to(&mut milestone, now)?;

        sqlx::query(
            "UPDATE milestones
             SET name = ?, start_date = ?, end_date = ?, progress = ?, status = ?,
                 responsible = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(milestone.name.as_deref())
        .bind(milestone.start_date)
        .bind(milestone.end_date)
        .bind(milestone.progress)
        .bind(milestone.status.as_deref())
        .bind(milestone.responsible.as_deref())
        .bind(milestone.updated_at)
        .bind(id.get())
        .execute(&mut *tx)
        .await?;

        let updated = fetch_milestone(&mut tx, id).await?;
        tx.commit().await?;

        info!(milestone_id = %id, "updated milestone");
        Ok(updated)
    }

    async fn delete_milestone(&self, id: MilestoneId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM milestones WHERE id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if deleted == 0 {
            warn!(milestone_id = %id, "delete of unknown milestone");
            return Ok(false);
        }

        info!(milestone_id = %id, "deleted milestone");
        Ok(true)
    }

    async fn count_milestones(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM milestones")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
