//! Test helper utilities shared by rfmt-server integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rfmt_common::{Error, Result};
use rfmt_server::import::{ImportProgress, ImportRecord, ImportTracker};
use rfmt_server::store::{RfmtStore, SqliteStore, UnitRef};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::sync::Semaphore;

pub const HEADER: &str = "PN;Nama;JG;ESGDESC;Kanca;Uker;UkerTujuan;Ket;Kel";

/// Temporary database with the schema applied
///
/// Keep the TempDir alive for the duration of the test.
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let pool = rfmt_server::db::init_database_pool(&temp_dir.path().join("rfmt.db"))
        .await
        .expect("Failed to initialize test database");
    (temp_dir, pool)
}

/// Write an import file with the standard header followed by `rows`
pub fn write_csv(dir: &Path, name: &str, rows: &[String]) -> PathBuf {
    let mut contents = String::from(HEADER);
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write CSV");
    path
}

/// `count` valid rows with distinct personnel numbers
pub fn valid_rows(count: usize) -> Vec<String> {
    (0..count)
        .map(|n| format!("{:05};Person {};JG{};desc;Branch{};;;;RM", n, n, n % 5, n % 3))
        .collect()
}

/// Poll until the tracker reaches a terminal state
pub async fn wait_for_terminal(tracker: &ImportTracker) -> ImportProgress {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let snapshot = tracker.snapshot().await;
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Import did not finish within 10s")
}

pub async fn count_rfmts(pool: &SqlitePool) -> i64 {
    rfmt_server::db::rfmts::count_rfmts(pool).await.unwrap()
}

/// SQLite store that records batch sizes and can fail one insert call
pub struct CountingStore {
    inner: SqliteStore,
    pub batches: Mutex<Vec<usize>>,
    fail_on_call: Option<usize>,
}

impl CountingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: SqliteStore::new(pool),
            batches: Mutex::new(Vec::new()),
            fail_on_call: None,
        }
    }

    /// Fail the `call`-th insert (1-based)
    pub fn failing_on(pool: SqlitePool, call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new(pool)
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RfmtStore for CountingStore {
    async fn insert_batch(&self, records: &[ImportRecord]) -> Result<()> {
        let call = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(records.len());
            batches.len()
        };
        if self.fail_on_call == Some(call) {
            return Err(Error::Internal("injected insert failure".to_string()));
        }
        self.inner.insert_batch(records).await
    }

    async fn find_active_unit_by_name_contains(&self, fragment: &str) -> Result<Option<UnitRef>> {
        self.inner.find_active_unit_by_name_contains(fragment).await
    }
}

/// SQLite store whose inserts wait for permits, keeping a job in flight
pub struct GatedStore {
    inner: SqliteStore,
    pub gate: Arc<Semaphore>,
}

impl GatedStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: SqliteStore::new(pool),
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    pub fn open(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

#[async_trait]
impl RfmtStore for GatedStore {
    async fn insert_batch(&self, records: &[ImportRecord]) -> Result<()> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;
        self.inner.insert_batch(records).await
    }

    async fn find_active_unit_by_name_contains(&self, fragment: &str) -> Result<Option<UnitRef>> {
        self.inner.find_active_unit_by_name_contains(fragment).await
    }
}

/// Store whose inserts panic, for jobs that die mid-flight
pub struct PanickingStore {
    inner: SqliteStore,
}

impl PanickingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: SqliteStore::new(pool),
        }
    }
}

#[async_trait]
impl RfmtStore for PanickingStore {
    async fn insert_batch(&self, _records: &[ImportRecord]) -> Result<()> {
        panic!("insert_batch blew up");
    }

    async fn find_active_unit_by_name_contains(&self, fragment: &str) -> Result<Option<UnitRef>> {
        self.inner.find_active_unit_by_name_contains(fragment).await
    }
}
