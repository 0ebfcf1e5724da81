//! Import job state machine
//!
//! One [`ImportTracker`] per service instance holds the state of the most
//! recent import job:
//!
//! ```text
//! IDLE ──try_admit──▶ PROCESSING ──complete──▶ COMPLETED
//!                         │                        │
//!                         └──────fail──────▶ ERROR │
//!                                              │   │
//!             (next try_admit resets) ◀────────┴───┘
//! ```
//!
//! All four fields live behind one `RwLock`, so a reader never sees a mix of
//! two updates. Admission is a check-and-set under the write guard.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Lifecycle of an import job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    /// No job has run since startup
    Idle,
    /// A job is running
    Processing,
    /// Last job finished successfully
    Completed,
    /// Last job stopped on a fatal error
    Error,
}

impl ImportStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Error)
    }
}

/// Raw job state guarded by the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJobState {
    pub status: ImportStatus,
    /// Rows examined so far, skipped rows included
    pub progress: u64,
    /// Rows read from the file, header excluded
    pub total: u64,
    pub message: String,
}

impl Default for ImportJobState {
    fn default() -> Self {
        Self {
            status: ImportStatus::Idle,
            progress: 0,
            total: 0,
            message: "No import in progress".to_string(),
        }
    }
}

/// Progress as reported to pollers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub status: ImportStatus,
    pub progress: u64,
    pub total: u64,
    /// `progress * 100 / total`, rounded down; 0 when total is 0
    pub percentage: u64,
    pub message: String,
}

impl From<&ImportJobState> for ImportProgress {
    fn from(state: &ImportJobState) -> Self {
        let percentage = if state.total > 0 {
            state.progress * 100 / state.total
        } else {
            0
        };

        Self {
            status: state.status,
            progress: state.progress,
            total: state.total,
            percentage,
            message: state.message.clone(),
        }
    }
}

/// Admission refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("Import already in progress")]
    AlreadyRunning,
}

/// Shared handle to the import job state
///
/// Cloning yields another handle to the same state.
#[derive(Debug, Clone, Default)]
pub struct ImportTracker {
    state: Arc<RwLock<ImportJobState>>,
}

impl ImportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the tracker for a new job
    ///
    /// Fails while another job is processing; otherwise resets the counters
    /// and enters `processing` in the same critical section.
    pub async fn try_admit(&self) -> Result<(), AdmissionError> {
        let mut state = self.state.write().await;
        if state.status == ImportStatus::Processing {
            return Err(AdmissionError::AlreadyRunning);
        }

        *state = ImportJobState {
            status: ImportStatus::Processing,
            progress: 0,
            total: 0,
            message: "Starting import...".to_string(),
        };
        Ok(())
    }

    /// Record how many rows the running job will examine
    pub async fn set_total(&self, total: u64) {
        self.update(|state| {
            state.total = total;
            state.message = format!("Processing {} records...", total);
        })
        .await;
    }

    /// Record that `progress` rows have been examined
    pub async fn record_progress(&self, progress: u64) {
        self.update(|state| {
            state.progress = progress;
            state.message = format!("Processed {} of {} records", progress, state.total);
        })
        .await;
    }

    /// Finish the running job successfully
    pub async fn complete(&self) {
        self.update(|state| {
            state.status = ImportStatus::Completed;
            state.message = format!("Successfully imported {} records", state.total);
        })
        .await;
    }

    /// Stop the running job with an error message
    pub async fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|state| {
            state.status = ImportStatus::Error;
            state.message = message;
        })
        .await;
    }

    /// Consistent view of the current state
    pub async fn snapshot(&self) -> ImportProgress {
        let state = self.state.read().await;
        ImportProgress::from(&*state)
    }

    pub async fn status(&self) -> ImportStatus {
        self.state.read().await.status
    }

    /// Apply `f` only while a job is processing
    ///
    /// Terminal states stay put until the next admission.
    async fn update(&self, f: impl FnOnce(&mut ImportJobState)) {
        let mut state = self.state.write().await;
        if state.status != ImportStatus::Processing {
            tracing::debug!(status = ?state.status, "Ignoring update outside a running import");
            return;
        }
        f(&mut state);
    }
}
