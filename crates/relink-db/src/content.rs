//! Content rows, side tables, sites and plugins.

use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};

use relink_core::defaults::{PLUGINS_TABLE, SITES_TABLE};
use relink_core::{ContentRow, Error, FieldId, Result};

use crate::identifiers::{quote_identifier, TableNames};

/// Rows of `table` whose `column` holds a non-empty value.
pub async fn populated_rows(
    pool: &PgPool,
    tables: &TableNames,
    table: &str,
    column: &str,
) -> Result<Vec<ContentRow>> {
    let column = quote_identifier(column)?;
    let sql = format!(
        r#"SELECT id::bigint AS id, "elementId"::bigint AS element_id, "siteId"::bigint AS site_id,
                  {column}::text AS raw_value
           FROM {table}
           WHERE {column} IS NOT NULL AND {column}::text <> ''
           ORDER BY id"#,
        column = column,
        table = tables.table(table)?
    );

    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(Error::Database)?;

    Ok(rows
        .into_iter()
        .map(|row| ContentRow {
            id: row.get("id"),
            element_id: row.get("element_id"),
            site_id: row.get("site_id"),
            raw_value: row.get("raw_value"),
        })
        .collect())
}

/// Every row of a side table belonging to a field, as JSON objects.
pub async fn rows_for_field(
    pool: &PgPool,
    tables: &TableNames,
    table: &str,
    field_id: FieldId,
) -> Result<Vec<JsonValue>> {
    let sql = format!(
        r#"SELECT row_to_json(t)::jsonb AS row FROM {} t WHERE "fieldId" = $1 ORDER BY t.id"#,
        tables.table(table)?
    );

    let rows = sqlx::query(&sql)
        .bind(field_id)
        .fetch_all(pool)
        .await
        .map_err(Error::Database)?;

    Ok(rows.into_iter().map(|row| row.get("row")).collect())
}

/// The content row of an element on a site.
pub async fn row_for_element(
    pool: &PgPool,
    tables: &TableNames,
    table: &str,
    element_id: i64,
    site_id: i64,
) -> Result<Option<ContentRow>> {
    let sql = format!(
        r#"SELECT id::bigint AS id FROM {} WHERE "elementId" = $1 AND "siteId" = $2 LIMIT 1"#,
        tables.table(table)?
    );

    let row = sqlx::query(&sql)
        .bind(element_id)
        .bind(site_id)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)?;

    Ok(row.map(|row| ContentRow {
        id: row.get("id"),
        element_id,
        site_id,
        raw_value: None,
    }))
}

/// Update one column of one row.
pub async fn write_value(
    pool: &PgPool,
    tables: &TableNames,
    table: &str,
    column: &str,
    row_id: i64,
    value: &str,
) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET {} = $1 WHERE id = $2",
        tables.table(table)?,
        quote_identifier(column)?
    );

    let result = sqlx::query(&sql)
        .bind(value)
        .bind(row_id)
        .execute(pool)
        .await
        .map_err(Error::Database)?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("row #{} in {}", row_id, table)));
    }
    Ok(())
}

pub async fn site_uid(pool: &PgPool, tables: &TableNames, site_id: i64) -> Result<Option<String>> {
    let sql = format!(
        "SELECT uid::text AS uid FROM {} WHERE id = $1",
        tables.table(SITES_TABLE)?
    );

    let row = sqlx::query(&sql)
        .bind(site_id)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)?;

    Ok(row.map(|row| row.get("uid")))
}

/// Whether a plugin row exists and, where the schema tracks it, is enabled.
pub async fn plugin_enabled(pool: &PgPool, tables: &TableNames, handle: &str) -> Result<bool> {
    let plugins = format!("{}{}", tables.prefix(), PLUGINS_TABLE);

    let has_enabled: bool = sqlx::query_scalar(
        "SELECT EXISTS (
             SELECT 1 FROM information_schema.columns
             WHERE table_schema = current_schema() AND table_name = $1 AND column_name = 'enabled'
         )",
    )
    .bind(&plugins)
    .fetch_one(pool)
    .await
    .map_err(Error::Database)?;

    let condition = if has_enabled { " AND enabled" } else { "" };
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE handle = $1{})",
        tables.table(PLUGINS_TABLE)?,
        condition
    );

    sqlx::query_scalar(&sql)
        .bind(handle)
        .fetch_one(pool)
        .await
        .map_err(Error::Database)
}
