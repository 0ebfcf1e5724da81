//! Storage seam used by the import pipeline
//!
//! The pipeline only needs two operations from the database, so it talks to
//! this trait instead of a pool. Tests substitute in-memory stores.

use async_trait::async_trait;
use rfmt_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db;
use crate::import::ImportRecord;

/// Reference to a matched unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitRef {
    pub id: i64,
    pub unit_name: String,
}

/// Storage operations the import pipeline depends on
#[async_trait]
pub trait RfmtStore: Send + Sync {
    /// Bulk insert; all records are committed or none are
    async fn insert_batch(&self, records: &[ImportRecord]) -> Result<()>;

    /// First active unit whose name contains `fragment`
    async fn find_active_unit_by_name_contains(&self, fragment: &str) -> Result<Option<UnitRef>>;
}

/// [`RfmtStore`] backed by the service's SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RfmtStore for SqliteStore {
    async fn insert_batch(&self, records: &[ImportRecord]) -> Result<()> {
        db::rfmts::insert_batch(&self.pool, records).await
    }

    async fn find_active_unit_by_name_contains(&self, fragment: &str) -> Result<Option<UnitRef>> {
        let unit = db::units::find_active_unit_by_name_contains(&self.pool, fragment).await?;
        Ok(unit.map(|u| UnitRef {
            id: u.id,
            unit_name: u.unit_name,
        }))
    }
}
