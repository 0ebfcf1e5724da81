//! Database access for rfmt-server
//!
//! Query functions take a `&SqlitePool`; the import pipeline reaches them
//! through [`crate::store::SqliteStore`].

pub mod rfmts;
pub mod units;

use rfmt_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the service database, creating file and schema as needed
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", db_path.display());
    rfmt_common::db::init_database(db_path).await
}
