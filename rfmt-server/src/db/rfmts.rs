//! RFMT record database operations
//!
//! Reads skip soft-deleted rows. [`delete_all_rfmts`] is the only hard delete.

use chrono::Utc;
use rfmt_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::units::Unit;
use crate::import::ImportRecord;

/// Persisted RFMT record with its matched unit
#[derive(Debug, Clone, Serialize)]
pub struct Rfmt {
    pub id: i64,
    pub personnel_number: String,
    pub full_name: String,
    pub job_grade: String,
    pub description: String,
    pub branch_name: String,
    pub unit_name: String,
    pub target_unit_name: String,
    pub remarks: String,
    pub new_job_group: String,
    pub unit_id: Option<i64>,
    pub unit: Option<Unit>,
    pub created_at: String,
    pub updated_at: String,
}

/// Editable fields, as accepted by create and update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RfmtInput {
    pub personnel_number: String,
    pub full_name: String,
    pub job_grade: String,
    pub description: String,
    pub branch_name: String,
    pub unit_name: String,
    pub target_unit_name: String,
    pub remarks: String,
    pub new_job_group: String,
    pub unit_id: Option<i64>,
}

impl RfmtInput {
    /// Trim the personnel number and reject it when empty
    pub fn validate(mut self) -> Result<Self> {
        self.personnel_number = self.personnel_number.trim().to_string();
        if self.personnel_number.is_empty() {
            return Err(Error::InvalidInput("PN is required".to_string()));
        }
        Ok(self)
    }
}

/// Filters for [`list_rfmts`]
#[derive(Debug, Clone, Default)]
pub struct RfmtFilter {
    /// Substring over personnel number, full name, job grade and branch
    pub search: Option<String>,
    /// Exact personnel number
    pub personnel_number: Option<String>,
}

const SELECT_RFMT: &str = r#"
    SELECT r.id, r.personnel_number, r.full_name, r.job_grade, r.description,
           r.branch_name, r.unit_name, r.target_unit_name, r.remarks,
           r.new_job_group, r.unit_id, r.created_at, r.updated_at,
           u.unit_code AS u_code, u.unit_name AS u_name, u.active AS u_active
    FROM rfmts r
    LEFT JOIN units u ON u.id = r.unit_id
"#;

fn rfmt_from_row(row: &SqliteRow) -> Rfmt {
    let unit_id: Option<i64> = row.get("unit_id");
    let unit_code: Option<String> = row.get("u_code");
    let unit = match (unit_id, unit_code) {
        (Some(id), Some(unit_code)) => Some(Unit {
            id,
            unit_code,
            unit_name: row.get("u_name"),
            active: row.get("u_active"),
        }),
        _ => None,
    };

    Rfmt {
        id: row.get("id"),
        personnel_number: row.get("personnel_number"),
        full_name: row.get("full_name"),
        job_grade: row.get("job_grade"),
        description: row.get("description"),
        branch_name: row.get("branch_name"),
        unit_name: row.get("unit_name"),
        target_unit_name: row.get("target_unit_name"),
        remarks: row.get("remarks"),
        new_job_group: row.get("new_job_group"),
        unit_id,
        unit,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Paginated list, newest first. Returns the page and the filtered total.
pub async fn list_rfmts(
    pool: &SqlitePool,
    filter: &RfmtFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Rfmt>, i64)> {
    let search = filter.search.as_deref().filter(|s| !s.is_empty());
    let pn = filter.personnel_number.as_deref().filter(|s| !s.is_empty());

    const WHERE: &str = r#"
        WHERE r.deleted_at IS NULL
          AND (?1 IS NULL OR r.personnel_number = ?1)
          AND (?2 IS NULL
               OR r.personnel_number LIKE '%' || ?2 || '%'
               OR r.full_name LIKE '%' || ?2 || '%'
               OR r.job_grade LIKE '%' || ?2 || '%'
               OR r.branch_name LIKE '%' || ?2 || '%')
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM rfmts r {}", WHERE))
        .bind(pn)
        .bind(search)
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(&format!(
        "{} {} ORDER BY r.created_at DESC, r.id DESC LIMIT ?3 OFFSET ?4",
        SELECT_RFMT, WHERE
    ))
    .bind(pn)
    .bind(search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok((rows.iter().map(rfmt_from_row).collect(), total))
}

/// Load one live record by id
pub async fn load_rfmt(pool: &SqlitePool, id: i64) -> Result<Option<Rfmt>> {
    let row = sqlx::query(&format!(
        "{} WHERE r.id = ? AND r.deleted_at IS NULL",
        SELECT_RFMT
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(rfmt_from_row))
}

/// All live records for one personnel number, newest first
pub async fn list_by_personnel_number(pool: &SqlitePool, pn: &str) -> Result<Vec<Rfmt>> {
    let rows = sqlx::query(&format!(
        "{} WHERE r.personnel_number = ? AND r.deleted_at IS NULL \
         ORDER BY r.created_at DESC, r.id DESC",
        SELECT_RFMT
    ))
    .bind(pn)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(rfmt_from_row).collect())
}

/// Insert one record and return it with its unit loaded
pub async fn create_rfmt(pool: &SqlitePool, input: &RfmtInput) -> Result<Rfmt> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        INSERT INTO rfmts (
            personnel_number, full_name, job_grade, description, branch_name,
            unit_name, target_unit_name, remarks, new_job_group, unit_id,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.personnel_number)
    .bind(&input.full_name)
    .bind(&input.job_grade)
    .bind(&input.description)
    .bind(&input.branch_name)
    .bind(&input.unit_name)
    .bind(&input.target_unit_name)
    .bind(&input.remarks)
    .bind(&input.new_job_group)
    .bind(input.unit_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    load_rfmt(pool, result.last_insert_rowid())
        .await?
        .ok_or_else(|| Error::Internal("Created record vanished".to_string()))
}

/// Replace the editable fields of a live record
///
/// Returns `None` when the record does not exist or is soft-deleted.
pub async fn update_rfmt(pool: &SqlitePool, id: i64, input: &RfmtInput) -> Result<Option<Rfmt>> {
    let result = sqlx::query(
        r#"
        UPDATE rfmts SET
            personnel_number = ?, full_name = ?, job_grade = ?, description = ?,
            branch_name = ?, unit_name = ?, target_unit_name = ?, remarks = ?,
            new_job_group = ?, unit_id = ?, updated_at = ?
        WHERE id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(&input.personnel_number)
    .bind(&input.full_name)
    .bind(&input.job_grade)
    .bind(&input.description)
    .bind(&input.branch_name)
    .bind(&input.unit_name)
    .bind(&input.target_unit_name)
    .bind(&input.remarks)
    .bind(&input.new_job_group)
    .bind(input.unit_id)
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    load_rfmt(pool, id).await
}

/// Mark a live record deleted. Returns false when nothing matched.
pub async fn soft_delete_rfmt(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE rfmts SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove every record, including soft-deleted ones
pub async fn delete_all_rfmts(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM rfmts").execute(pool).await?;
    Ok(result.rows_affected())
}

/// Insert imported records in one transaction
///
/// Either every record of the slice is committed or none is.
pub async fn insert_batch(pool: &SqlitePool, records: &[ImportRecord]) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(
            r#"
            INSERT INTO rfmts (
                personnel_number, full_name, job_grade, description, branch_name,
                unit_name, target_unit_name, remarks, new_job_group, unit_id,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.personnel_number)
        .bind(&record.full_name)
        .bind(&record.job_grade)
        .bind(&record.description)
        .bind(&record.branch_name)
        .bind(&record.unit_name)
        .bind(&record.target_unit_name)
        .bind(&record.remarks)
        .bind(&record.new_job_group)
        .bind(record.unit_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Count live records
pub async fn count_rfmts(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM rfmts WHERE deleted_at IS NULL")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
