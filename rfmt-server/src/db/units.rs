//! Unit (uker) database operations

use rfmt_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Maximum rows returned by [`search_units`]
pub const UNIT_SEARCH_LIMIT: i64 = 50;

/// Organizational unit an RFMT record may point at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Unit {
    pub id: i64,
    pub unit_code: String,
    pub unit_name: String,
    pub active: bool,
}

/// Insert a unit, returning its id
pub async fn insert_unit(
    pool: &SqlitePool,
    unit_code: &str,
    unit_name: &str,
    active: bool,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO units (unit_code, unit_name, active) VALUES (?, ?, ?)")
        .bind(unit_code)
        .bind(unit_name)
        .bind(active)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// First active unit whose name contains `fragment` (case-sensitive)
///
/// Ties are broken by ascending id so the same data always yields the same
/// unit.
pub async fn find_active_unit_by_name_contains(
    pool: &SqlitePool,
    fragment: &str,
) -> Result<Option<Unit>> {
    // instr() is case-sensitive, unlike LIKE
    let unit = sqlx::query_as::<_, Unit>(
        r#"
        SELECT id, unit_code, unit_name, active
        FROM units
        WHERE active = 1 AND instr(unit_name, ?) > 0
        ORDER BY id ASC
        LIMIT 1
        "#,
    )
    .bind(fragment)
    .fetch_optional(pool)
    .await?;

    Ok(unit)
}

/// Active units whose code or name contains `search`, ordered by code
pub async fn search_units(pool: &SqlitePool, search: Option<&str>) -> Result<Vec<Unit>> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());

    let units = sqlx::query_as::<_, Unit>(
        r#"
        SELECT id, unit_code, unit_name, active
        FROM units
        WHERE active = 1
          AND (?1 IS NULL
               OR unit_code LIKE '%' || ?1 || '%'
               OR unit_name LIKE '%' || ?1 || '%')
        ORDER BY unit_code ASC
        LIMIT ?2
        "#,
    )
    .bind(search)
    .bind(UNIT_SEARCH_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(units)
}
