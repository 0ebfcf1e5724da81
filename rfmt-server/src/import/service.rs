//! Import orchestration
//!
//! [`ImportService::start_import`] admits a job synchronously and runs it on a
//! spawned task. The task reads the file on the blocking pool, then walks the
//! rows through parse → resolve → batch write, reporting to the tracker after
//! every row. Row-level problems are skipped; [`ImportError`] ends the job.

use std::any::Any;
use std::fs::File;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::{ByteRecord, StringRecord};
use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::batch::BatchWriter;
use super::resolver::UnitResolver;
use super::row::{parse_row, REQUIRED_COLUMNS};
use super::tracker::{AdmissionError, ImportProgress, ImportTracker};
use crate::store::RfmtStore;

/// Errors that stop an import job
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to open file: {0}")]
    Open(#[source] std::io::Error),

    #[error("Failed to read header: {0}")]
    Header(String),

    #[error("Invalid CSV format: insufficient columns")]
    InsufficientColumns { found: usize },

    #[error("Failed to insert batch: {0}")]
    BatchWrite(#[source] rfmt_common::Error),

    #[error("Import worker failed: {0}")]
    Worker(String),
}

/// Result of asking for a new import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Job admitted and running in the background
    Accepted,
    /// Another job is processing; nothing was started
    Conflict,
}

/// Counts for a finished job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub total: usize,
    pub written: usize,
    pub skipped: usize,
}

/// Runs CSV imports against a store, one at a time
#[derive(Clone)]
pub struct ImportService {
    store: Arc<dyn RfmtStore>,
    tracker: ImportTracker,
    batch_size: usize,
}

impl ImportService {
    pub fn new(store: Arc<dyn RfmtStore>, tracker: ImportTracker, batch_size: usize) -> Self {
        Self {
            store,
            tracker,
            batch_size,
        }
    }

    pub fn tracker(&self) -> &ImportTracker {
        &self.tracker
    }

    /// Current progress of the latest job
    pub async fn progress(&self) -> ImportProgress {
        self.tracker.snapshot().await
    }

    /// Admit and spawn an import of the file at `path`
    ///
    /// On `Accepted` the job owns the file and deletes it when done. On
    /// `Conflict` the file is left to the caller.
    pub async fn start_import(&self, path: PathBuf) -> StartOutcome {
        if let Err(AdmissionError::AlreadyRunning) = self.tracker.try_admit().await {
            info!(path = %path.display(), "Import rejected, another import is running");
            return StartOutcome::Conflict;
        }

        let service = self.clone();
        tokio::spawn(async move {
            let job = AssertUnwindSafe(service.run_admitted(path)).catch_unwind();
            if let Err(panic) = job.await {
                let err = ImportError::Worker(panic_message(panic.as_ref()));
                error!(error = %err, "Import job panicked");
                service.tracker.fail(err.to_string()).await;
            }
        });

        StartOutcome::Accepted
    }

    /// Drive an admitted job to a terminal state
    ///
    /// The file is gone by the time pollers can observe the terminal state.
    async fn run_admitted(&self, path: PathBuf) {
        info!(path = %path.display(), batch_size = self.batch_size, "Import started");

        let outcome = {
            let _cleanup = RemoveOnDrop(path.clone());
            self.execute(&path).await
        };

        match outcome {
            Ok(summary) => {
                self.tracker.complete().await;
                info!(
                    total = summary.total,
                    written = summary.written,
                    skipped = summary.skipped,
                    "Import completed"
                );
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Import failed");
                self.tracker.fail(e.to_string()).await;
            }
        }
    }

    async fn execute(&self, path: &Path) -> Result<ImportSummary, ImportError> {
        let read_path = path.to_path_buf();
        let rows = tokio::task::spawn_blocking(move || read_rows(&read_path))
            .await
            .map_err(|e| ImportError::Worker(e.to_string()))??;

        let total = rows.len();
        self.tracker.set_total(total as u64).await;

        let resolver = UnitResolver::new(self.store.clone());
        let mut writer = BatchWriter::new(self.store.clone(), self.batch_size);
        let mut skipped = 0;

        for (index, fields) in rows.iter().enumerate() {
            match parse_row(fields, index) {
                Ok(mut record) => {
                    record.unit_id = resolver.resolve(&record.branch_name).await;
                    writer.push(record).await.map_err(ImportError::BatchWrite)?;
                }
                Err(skip) => {
                    skipped += 1;
                    debug!(reason = %skip, "Skipping row");
                }
            }

            self.tracker.record_progress(index as u64 + 1).await;
        }

        let written = writer.finish().await.map_err(ImportError::BatchWrite)?;

        Ok(ImportSummary {
            total,
            written,
            skipped,
        })
    }
}

/// Read the header and every data row of a `;`-delimited file
///
/// Fields are decoded lossily, so bytes that are not UTF-8 never cost a row.
/// Records the reader cannot parse are dropped without being counted.
fn read_rows(path: &Path) -> Result<Vec<StringRecord>, ImportError> {
    let file = File::open(path).map_err(ImportError::Open)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut header = ByteRecord::new();
    match reader.read_byte_record(&mut header) {
        Ok(true) => {}
        Ok(false) => return Err(ImportError::Header("file is empty".to_string())),
        Err(e) => return Err(ImportError::Header(e.to_string())),
    }

    if header.len() < REQUIRED_COLUMNS {
        return Err(ImportError::InsufficientColumns {
            found: header.len(),
        });
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for result in reader.byte_records() {
        match result {
            Ok(record) => rows.push(decode_lossy(&record)),
            Err(e) if e.is_io_error() => {
                warn!(error = %e, "Stopped reading import file");
                break;
            }
            Err(e) => {
                dropped += 1;
                debug!(error = %e, "Dropping unreadable row");
            }
        }
    }

    if dropped > 0 {
        info!(dropped, "Unreadable rows dropped from import file");
    }

    Ok(rows)
}

fn decode_lossy(record: &ByteRecord) -> StringRecord {
    record.iter().map(String::from_utf8_lossy).collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "job panicked".to_string()
    }
}

/// Deletes the import file however the job ends
struct RemoveOnDrop(PathBuf);

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => debug!(path = %self.0.display(), "Removed import file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.0.display(), error = %e, "Failed to remove import file"),
        }
    }
}
