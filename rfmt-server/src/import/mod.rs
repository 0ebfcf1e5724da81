//! Asynchronous CSV import of RFMT records
//!
//! - [`row`]: per-row parsing and validation
//! - [`resolver`]: best-effort unit lookup by branch name
//! - [`batch`]: chunked, all-or-nothing writes
//! - [`tracker`]: job state machine shared with progress pollers
//! - [`service`]: admission and the background job itself

pub mod batch;
pub mod resolver;
pub mod row;
pub mod service;
pub mod tracker;

pub use batch::BatchWriter;
pub use resolver::UnitResolver;
pub use row::{parse_row, ImportRecord, RowSkip, REQUIRED_COLUMNS};
pub use service::{ImportError, ImportService, ImportSummary, StartOutcome};
pub use tracker::{AdmissionError, ImportJobState, ImportProgress, ImportStatus, ImportTracker};
