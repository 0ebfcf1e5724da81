//! Row parsing and validation
//!
//! Turns one delimited record into an [`ImportRecord`] or a [`RowSkip`].
//! A skip never fails the job; the orchestrator counts the row as processed
//! and moves on.

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Columns every data row (and the header) must carry
///
/// `PN; FullName; JobGrade; Description; Branch; Unit; TargetUnit; Remarks; NewJobGroup`
pub const REQUIRED_COLUMNS: usize = 9;

/// One validated CSV row, ready to be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub personnel_number: String,
    pub full_name: String,
    pub job_grade: String,
    pub description: String,
    pub branch_name: String,
    pub unit_name: String,
    pub target_unit_name: String,
    pub remarks: String,
    pub new_job_group: String,
    /// Unit matched from `branch_name`, if any
    pub unit_id: Option<i64>,
}

/// Why a row was not turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowSkip {
    #[error("row {row}: expected at least {} fields, found {found}", REQUIRED_COLUMNS)]
    TooFewFields { row: usize, found: usize },

    #[error("row {row}: personnel number is empty")]
    EmptyPersonnelNumber { row: usize },
}

/// Parse one data row (`index` is zero-based, header excluded)
pub fn parse_row(fields: &StringRecord, index: usize) -> Result<ImportRecord, RowSkip> {
    if fields.len() < REQUIRED_COLUMNS {
        return Err(RowSkip::TooFewFields {
            row: index,
            found: fields.len(),
        });
    }

    let field = |i: usize| fields.get(i).map(str::trim).unwrap_or_default().to_string();

    let personnel_number = field(0);
    if personnel_number.is_empty() {
        return Err(RowSkip::EmptyPersonnelNumber { row: index });
    }

    Ok(ImportRecord {
        personnel_number,
        full_name: field(1),
        job_grade: field(2),
        description: field(3),
        branch_name: field(4),
        unit_name: field(5),
        target_unit_name: field(6),
        remarks: field(7),
        new_job_group: field(8),
        unit_id: None,
    })
}
